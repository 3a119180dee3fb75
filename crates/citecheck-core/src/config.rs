//! Configuration for citecheck-core
//!
//! Centralized configuration for marker grammar, resolution thresholds,
//! verification mode and the external-call budget (concurrency, retries,
//! timeouts).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::markers::MarkerStyle;
use crate::retry::RetryPolicy;
use crate::similarity::SimilarityMetric;
use crate::verifier::VerificationMode;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Marker grammar used to scan the body text
    pub marker_style: MarkerStyle,
    /// Minimum title similarity for a candidate to count as a match (inclusive)
    pub similarity_threshold: f64,
    /// Title similarity policy
    pub similarity_metric: SimilarityMetric,
    /// Evidence depth handed to the judge
    pub verification_mode: VerificationMode,
    /// Maximum in-flight external requests
    pub max_concurrency: usize,
    /// Items per batch; cancellation is checked between batches
    pub batch_size: usize,
    /// Retries after the first attempt for transient failures
    pub retry_limit: u32,
    /// First backoff delay in milliseconds (doubles per retry)
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff delay in milliseconds
    pub max_backoff_ms: u64,
    /// Timeout for one external call in milliseconds
    pub timeout_ms: u64,
    /// Consecutive failures after which a collaborator is treated as down
    pub outage_threshold: u32,
    /// Candidates requested from the search collaborator per query
    pub max_candidates: u32,
    /// Venues/categories preferred when candidate scores tie
    pub venue_allow_list: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            marker_style: MarkerStyle::NumericBracket,
            similarity_threshold: 0.85,
            similarity_metric: SimilarityMetric::BestOf,
            verification_mode: VerificationMode::Lightweight,
            max_concurrency: 4,
            batch_size: 8,
            retry_limit: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            timeout_ms: 30_000,
            outage_threshold: 5,
            max_candidates: 5,
            venue_allow_list: Vec::new(),
        }
    }
}

impl CheckConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a TOML (or `.json`) config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::OutOfRange(
                "similarity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::OutOfRange(
                "max_concurrency must be positive".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::OutOfRange(
                "batch_size must be positive".to_string(),
            ));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "timeout_ms must be positive".to_string(),
            ));
        }

        if self.max_candidates == 0 {
            return Err(ConfigError::OutOfRange(
                "max_candidates must be positive".to_string(),
            ));
        }

        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::OutOfRange(
                "max_backoff_ms must not be below initial_backoff_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retry policy shared by the resolver and the verifier
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_limit,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            timeout: self.timeout(),
        }
    }
}
