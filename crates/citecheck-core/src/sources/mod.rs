//! Bibliographic search sources

pub mod traits;

#[cfg(feature = "http")]
pub mod arxiv;
#[cfg(feature = "http")]
pub mod crossref;

pub use traits::{BibliographicSearch, Candidate, SourceError, SourceMetadata};

#[cfg(feature = "http")]
pub use arxiv::ArxivSource;
#[cfg(feature = "http")]
pub use crossref::CrossrefSource;
