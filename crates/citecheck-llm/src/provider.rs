//! Provider registry and completion over graniet/llm backends

use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use tracing::debug;

use crate::types::*;

// ============================================================================
// Provider Registry
// ============================================================================

/// Get information about all supported providers
pub fn get_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            id: "groq",
            name: "Groq",
            description: "Ultra-fast inference with LPU technology.",
            registration_url: Some("https://console.groq.com/keys"),
            default_model: "llama-3.3-70b-versatile",
        },
        ProviderInfo {
            id: "phind",
            name: "Phind",
            description: "Code-optimized AI with fast responses.",
            registration_url: Some("https://www.phind.com/api"),
            default_model: "Phind-70B",
        },
        ProviderInfo {
            id: "mistral",
            name: "Mistral AI",
            description: "European AI with strong multilingual capabilities.",
            registration_url: Some("https://console.mistral.ai/api-keys/"),
            default_model: "mistral-large-latest",
        },
        ProviderInfo {
            id: "cohere",
            name: "Cohere",
            description: "Enterprise-focused AI with strong RAG capabilities.",
            registration_url: Some("https://dashboard.cohere.com/api-keys"),
            default_model: "command-r-plus",
        },
        ProviderInfo {
            id: "deepseek",
            name: "DeepSeek",
            description: "Affordable AI with strong reasoning capabilities.",
            registration_url: Some("https://platform.deepseek.com/api_keys"),
            default_model: "deepseek-chat",
        },
        ProviderInfo {
            id: "xai",
            name: "xAI (Grok)",
            description: "Grok models from xAI.",
            registration_url: Some("https://console.x.ai/"),
            default_model: "grok-2-1212",
        },
        ProviderInfo {
            id: "huggingface",
            name: "HuggingFace Inference",
            description: "Access to thousands of open-source models.",
            registration_url: Some("https://huggingface.co/settings/tokens"),
            default_model: "meta-llama/Meta-Llama-3-8B-Instruct",
        },
    ]
}

/// Look up one provider by id
pub fn get_provider(provider: &str) -> Option<ProviderInfo> {
    get_providers().into_iter().find(|p| p.id == provider)
}

/// Models known to work for citation judging, per provider
pub fn get_models(provider: &str) -> Vec<ModelInfo> {
    match provider {
        "groq" => vec![
            ModelInfo {
                id: "llama-3.3-70b-versatile",
                name: "Llama 3.3 70B Versatile",
                context_window: Some(128_000),
                is_default: true,
            },
            ModelInfo {
                id: "llama-3.1-8b-instant",
                name: "Llama 3.1 8B Instant",
                context_window: Some(128_000),
                is_default: false,
            },
        ],
        "phind" => vec![ModelInfo {
            id: "Phind-70B",
            name: "Phind 70B",
            context_window: Some(32_000),
            is_default: true,
        }],
        "mistral" => vec![
            ModelInfo {
                id: "mistral-large-latest",
                name: "Mistral Large",
                context_window: Some(128_000),
                is_default: true,
            },
            ModelInfo {
                id: "mistral-small-latest",
                name: "Mistral Small",
                context_window: Some(32_000),
                is_default: false,
            },
        ],
        "cohere" => vec![ModelInfo {
            id: "command-r-plus",
            name: "Command R+",
            context_window: Some(128_000),
            is_default: true,
        }],
        "deepseek" => vec![
            ModelInfo {
                id: "deepseek-chat",
                name: "DeepSeek Chat",
                context_window: Some(64_000),
                is_default: true,
            },
            ModelInfo {
                id: "deepseek-reasoner",
                name: "DeepSeek Reasoner",
                context_window: Some(64_000),
                is_default: false,
            },
        ],
        "xai" => vec![ModelInfo {
            id: "grok-2-1212",
            name: "Grok 2",
            context_window: Some(128_000),
            is_default: true,
        }],
        "huggingface" => vec![ModelInfo {
            id: "meta-llama/Meta-Llama-3-8B-Instruct",
            name: "Llama 3 8B Instruct",
            context_window: Some(8_192),
            is_default: true,
        }],
        _ => vec![],
    }
}

// ============================================================================
// Completion
// ============================================================================

/// Something that can complete a conversation
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &LLMRequest) -> Result<LLMResponse, LLMError>;
}

/// Map our provider ID to llm backend
fn get_backend(provider: &str) -> Result<LLMBackend, LLMError> {
    match provider {
        "groq" => Ok(LLMBackend::Groq),
        "phind" => Ok(LLMBackend::Phind),
        "mistral" => Ok(LLMBackend::Mistral),
        "cohere" => Ok(LLMBackend::Cohere),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        "xai" => Ok(LLMBackend::XAI),
        "huggingface" => Ok(LLMBackend::HuggingFace),
        _ => Err(LLMError::ProviderNotFound {
            provider: provider.to_string(),
        }),
    }
}

/// Sort a backend error message into our error kinds
pub fn classify_error(message: &str) -> LLMError {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("429") {
        LLMError::RateLimited {
            retry_after_seconds: Some(60),
        }
    } else if lower.contains("unauthorized")
        || lower.contains("401")
        || lower.contains("invalid api key")
        || lower.contains("invalid_api_key")
    {
        LLMError::InvalidApiKey
    } else if lower.contains("network")
        || lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("timeout")
    {
        LLMError::NetworkError {
            message: message.to_string(),
        }
    } else if ["500", "502", "503", "504", "overloaded"]
        .iter()
        .any(|code| lower.contains(code))
    {
        LLMError::ServerError {
            message: message.to_string(),
        }
    } else if lower.contains("context") && lower.contains("length") {
        LLMError::ContextLengthExceeded {
            message: message.to_string(),
        }
    } else {
        LLMError::ApiError {
            message: message.to_string(),
        }
    }
}

/// Flatten a conversation into chat messages
///
/// graniet/llm has no system role in `ChatMessage`, so a system message is
/// prepended to the next user message.
fn to_chat_messages(messages: &[LLMMessage]) -> Vec<ChatMessage> {
    let mut chat_messages = Vec::new();
    let mut system_prompt: Option<String> = None;

    for msg in messages {
        match msg.role {
            LLMRole::System => system_prompt = Some(msg.content.clone()),
            LLMRole::User => {
                let content = match system_prompt.take() {
                    Some(sys) => format!("{}\n\n{}", sys, msg.content),
                    None => msg.content.clone(),
                };
                chat_messages.push(ChatMessage::user().content(&content).build());
            }
            LLMRole::Assistant => {
                chat_messages.push(ChatMessage::assistant().content(&msg.content).build());
            }
        }
    }

    if chat_messages.is_empty() {
        if let Some(sys) = system_prompt {
            chat_messages.push(ChatMessage::user().content(&sys).build());
        }
    }
    chat_messages
}

/// Completion client backed by graniet/llm
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderClient;

impl ProviderClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompletionClient for ProviderClient {
    async fn complete(&self, request: &LLMRequest) -> Result<LLMResponse, LLMError> {
        let backend = get_backend(&request.provider)?;

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .api_key(&request.api_key)
            .model(&request.model);
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(temp) = request.temperature {
            builder = builder.temperature(temp);
        }

        let llm = builder
            .build()
            .map_err(|e: llm::error::LLMError| LLMError::InvalidRequest {
                message: e.to_string(),
            })?;

        debug!(provider = %request.provider, model = %request.model, "Sending completion");
        let response = llm
            .chat(&to_chat_messages(&request.messages))
            .await
            .map_err(|e: llm::error::LLMError| classify_error(&e.to_string()))?;

        let content = response.text().unwrap_or_default().to_string();
        let tokens_used = response.usage().map(|u| u.total_tokens as u32);

        Ok(LLMResponse {
            content,
            tokens_used,
            model: request.model.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
