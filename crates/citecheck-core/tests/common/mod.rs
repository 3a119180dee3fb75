//! Shared helpers for integration tests

pub mod doubles;
pub mod fixtures;
