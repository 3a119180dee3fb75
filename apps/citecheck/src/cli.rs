//! Command-line arguments

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use citecheck_core::{MarkerStyle, VerificationMode};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(name = "citecheck", version)]
#[command(about = "Check that a paper's citations point at real, relevant sources")]
pub struct Args {
    /// Plain-text document to check (form feeds separate pages)
    #[arg(value_name = "FILE", required_unless_present = "list_providers")]
    pub file: Option<PathBuf>,

    /// Config file (default: <config dir>/citecheck/config.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Bibliographic index to resolve references against
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Citation marker style used in the body text
    #[arg(long, value_enum)]
    pub style: Option<StyleArg>,

    /// What the judge sees about each cited source
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Minimum title similarity for a match, 0.0-1.0
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Maximum in-flight requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// LLM provider id (see --list-providers)
    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// API key for the LLM provider
    #[arg(long, env = "CITECHECK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the supported LLM providers and exit
    #[arg(long)]
    pub list_providers: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Arxiv,
    Crossref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    Numeric,
    AuthorYear,
}

impl From<StyleArg> for MarkerStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Numeric => MarkerStyle::NumericBracket,
            StyleArg::AuthorYear => MarkerStyle::AuthorYear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Lightweight,
    Standard,
}

impl From<ModeArg> for VerificationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Lightweight => VerificationMode::Lightweight,
            ModeArg::Standard => VerificationMode::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_overrides_parse() {
        let args = Args::try_parse_from([
            "citecheck",
            "paper.txt",
            "--source",
            "crossref",
            "--style",
            "author-year",
            "--threshold",
            "0.9",
            "-f",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.source, Some(SourceKind::Crossref));
        assert_eq!(args.style, Some(StyleArg::AuthorYear));
        assert_eq!(args.threshold, Some(0.9));
        assert_eq!(args.format, Format::Json);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_file_is_required_unless_listing() {
        assert!(Args::try_parse_from(["citecheck"]).is_err());
        assert!(Args::try_parse_from(["citecheck", "--list-providers"]).is_ok());
    }
}
