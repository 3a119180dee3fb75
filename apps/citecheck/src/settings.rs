//! Config file loading and flag overrides

use std::path::{Path, PathBuf};

use citecheck_core::{CheckConfig, ConfigError};
use citecheck_llm::JudgeSettings;
use serde::{Deserialize, Serialize};

use crate::cli::{Args, SourceKind};

/// Search collaborator settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub source: SourceKind,
    /// Contact address sent to Crossref's polite pool
    pub mailto: Option<String>,
}

/// Everything the binary reads from its config file
///
/// ```toml
/// [check]
/// similarity_threshold = 0.9
///
/// [search]
/// source = "crossref"
///
/// [judge]
/// provider = "mistral"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub check: CheckConfig,
    pub search: SearchSettings,
    pub judge: JudgeSettings,
}

impl AppConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Read the explicit config file, or the default one when it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Command-line flags win over the file
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(source) = args.source {
            self.search.source = source;
        }
        if let Some(style) = args.style {
            self.check.marker_style = style.into();
        }
        if let Some(mode) = args.mode {
            self.check.verification_mode = mode.into();
        }
        if let Some(threshold) = args.threshold {
            self.check.similarity_threshold = threshold;
        }
        if let Some(concurrency) = args.concurrency {
            self.check.max_concurrency = concurrency;
        }
        if let Some(batch_size) = args.batch_size {
            self.check.batch_size = batch_size;
        }
        if let Some(provider) = &args.provider {
            self.judge.provider = provider.clone();
        }
        if let Some(model) = &args.model {
            self.judge.model = Some(model.clone());
        }
    }
}

/// `<config dir>/citecheck/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("citecheck").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use citecheck_core::{MarkerStyle, VerificationMode};
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_sections_are_optional() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_file_sections() {
        let config = AppConfig::from_toml(
            r#"
[check]
similarity_threshold = 0.9
batch_size = 2

[search]
source = "crossref"
mailto = "lab@example.org"

[judge]
provider = "mistral"
batching = false
"#,
        )
        .unwrap();
        assert_eq!(config.check.similarity_threshold, 0.9);
        assert_eq!(config.check.batch_size, 2);
        assert_eq!(config.search.source, SourceKind::Crossref);
        assert_eq!(config.search.mailto.as_deref(), Some("lab@example.org"));
        assert_eq!(config.judge.provider, "mistral");
        assert!(!config.judge.batching);
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[check]\nsimilarity_threshold = 0.9\n[judge]\nprovider = \"cohere\"").unwrap();

        let mut config = AppConfig::load(Some(file.path())).unwrap();
        let args = Args::try_parse_from([
            "citecheck",
            "paper.txt",
            "--threshold",
            "0.7",
            "--style",
            "author-year",
            "--mode",
            "standard",
            "--model",
            "command-r",
        ])
        .unwrap();
        config.apply_args(&args);

        assert_eq!(config.check.similarity_threshold, 0.7);
        assert_eq!(config.check.marker_style, MarkerStyle::AuthorYear);
        assert_eq!(config.check.verification_mode, VerificationMode::Standard);
        assert_eq!(config.judge.provider, "cohere");
        assert_eq!(config.judge.model.as_deref(), Some("command-r"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/citecheck.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
