//! citecheck-llm: language-model relevance judge for citecheck
//!
//! This crate reaches additional LLM providers through the graniet/llm
//! library and exposes them to the verification pipeline as a
//! [`citecheck_core::RelevanceJudge`].
//!
//! # Supported Providers
//!
//! - **Groq**: Ultra-fast inference with LPU technology
//! - **Phind**: Code-optimized AI with fast responses
//! - **Mistral**: European AI with strong multilingual capabilities
//! - **Cohere**: Enterprise-focused AI with strong RAG capabilities
//! - **DeepSeek**: Affordable AI with strong reasoning
//! - **xAI (Grok)**: Models from xAI
//! - **HuggingFace**: Access to thousands of open-source models
//!
//! Prompts and verdict parsing live in `citecheck_core::verifier`; this crate
//! only moves them over the wire.

pub mod judge;
pub mod provider;
pub mod types;

pub use judge::LlmJudge;
pub use provider::{
    classify_error, get_models, get_provider, get_providers, CompletionClient, ProviderClient,
};
pub use types::*;
