//! Type definitions for completion requests and the provider registry

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMRole {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: LLMRole,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LLMRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LLMRole::User,
            content: content.into(),
        }
    }
}

/// Request to complete a conversation
#[derive(Debug, Clone)]
pub struct LLMRequest {
    /// Provider identifier (e.g., "groq", "mistral")
    pub provider: String,
    /// Model identifier (e.g., "llama-3.3-70b-versatile")
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0-2.0)
    pub temperature: Option<f32>,
    pub api_key: String,
}

/// Response from a completion request
#[derive(Debug, Clone, PartialEq)]
pub struct LLMResponse {
    pub content: String,
    /// Number of tokens used in completion
    pub tokens_used: Option<u32>,
    /// Model that generated the response
    pub model: String,
}

/// Information about a supported provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// URL to get API keys
    pub registration_url: Option<&'static str>,
    pub default_model: &'static str,
}

/// Information about a model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    /// Maximum context window in tokens
    pub context_window: Option<u32>,
    /// Whether this is the default model for the provider
    pub is_default: bool,
}

/// Judge settings as they appear in a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    /// Provider identifier
    pub provider: String,
    /// Model identifier; the provider default when unset
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Send each batch of pairs as one completion
    pub batching: bool,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: None,
            max_tokens: Some(1_024),
            temperature: Some(0.0),
            batching: true,
        }
    }
}

/// Error types for LLM operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("Provider not found: {provider}")]
    ProviderNotFound { provider: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited: retry after {retry_after_seconds:?} seconds")]
    RateLimited { retry_after_seconds: Option<u32> },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Context length exceeded: {message}")]
    ContextLengthExceeded { message: String },
}
