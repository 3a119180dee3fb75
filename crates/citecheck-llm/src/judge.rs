//! Relevance judge backed by a language model

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use citecheck_core::verifier::{build_batch_prompt, build_prompt, SYSTEM_PROMPT};
use citecheck_core::verifier::{parse_batch_verdicts, parse_verdict};
use citecheck_core::{JudgeError, JudgeRequest, JudgeVerdict, RelevanceJudge};
use tracing::debug;

use crate::provider::{get_provider, CompletionClient, ProviderClient};
use crate::types::{JudgeSettings, LLMError, LLMMessage, LLMRequest};

impl From<LLMError> for JudgeError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::RateLimited {
                retry_after_seconds,
            } => JudgeError::RateLimited {
                retry_after: retry_after_seconds.map(|s| Duration::from_secs(u64::from(s))),
            },
            LLMError::NetworkError { message } | LLMError::ServerError { message } => {
                JudgeError::Transport { message }
            }
            other => JudgeError::Rejected {
                message: other.to_string(),
            },
        }
    }
}

/// Judge that asks a chat model whether a source supports a sentence
pub struct LlmJudge {
    client: Arc<dyn CompletionClient>,
    settings: JudgeSettings,
    model: String,
    api_key: String,
}

impl LlmJudge {
    /// Create a judge for a registered provider
    pub fn new(settings: JudgeSettings, api_key: impl Into<String>) -> Result<Self, LLMError> {
        Self::with_client(Arc::new(ProviderClient::new()), settings, api_key)
    }

    /// Create a judge over any completion client
    pub fn with_client(
        client: Arc<dyn CompletionClient>,
        settings: JudgeSettings,
        api_key: impl Into<String>,
    ) -> Result<Self, LLMError> {
        let provider = get_provider(&settings.provider).ok_or_else(|| {
            LLMError::ProviderNotFound {
                provider: settings.provider.clone(),
            }
        })?;
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LLMError::InvalidApiKey);
        }
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model.to_string());

        Ok(Self {
            client,
            settings,
            model,
            api_key,
        })
    }

    /// The model this judge sends requests to
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: String) -> LLMRequest {
        LLMRequest {
            provider: self.settings.provider.clone(),
            model: self.model.clone(),
            messages: vec![LLMMessage::system(SYSTEM_PROMPT), LLMMessage::user(prompt)],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            api_key: self.api_key.clone(),
        }
    }
}

#[async_trait]
impl RelevanceJudge for LlmJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        let response = self.client.complete(&self.request(build_prompt(request))).await?;
        debug!(tokens = ?response.tokens_used, "Judge replied");
        parse_verdict(&response.content)
    }

    async fn judge_batch(
        &self,
        requests: &[JudgeRequest],
    ) -> Result<Vec<Result<JudgeVerdict, JudgeError>>, JudgeError> {
        let response = self
            .client
            .complete(&self.request(build_batch_prompt(requests)))
            .await?;
        debug!(items = requests.len(), tokens = ?response.tokens_used, "Judge replied to batch");
        parse_batch_verdicts(&response.content, requests.len())
    }

    fn supports_batching(&self) -> bool {
        self.settings.batching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LLMResponse, LLMRole};
    use citecheck_core::retry::Transient;
    use citecheck_core::Evidence;
    use std::sync::Mutex;

    /// Replies with canned content and records what it was asked
    struct CannedClient {
        reply: Result<String, LLMError>,
        seen: Mutex<Vec<LLMRequest>>,
    }

    impl CannedClient {
        fn replying(content: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(content.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: LLMError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, request: &LLMRequest) -> Result<LLMResponse, LLMError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().map(|content| LLMResponse {
                content,
                tokens_used: Some(42),
                model: request.model.clone(),
            })
        }
    }

    fn request(title: &str) -> JudgeRequest {
        JudgeRequest::new(
            "Residual connections ease the training of deep networks [1].",
            Evidence {
                title: title.to_string(),
                abstract_text: None,
            },
        )
    }

    #[tokio::test]
    async fn test_single_verdict() {
        let client = CannedClient::replying(
            r#"{"supported": false, "rationale": "speech paper", "confidence": 0.7}"#,
        );
        let judge =
            LlmJudge::with_client(client.clone(), JudgeSettings::default(), "key").unwrap();

        let verdict = judge.judge(&request("Speech enhancement GAN")).await.unwrap();
        assert!(!verdict.supported);
        assert_eq!(verdict.rationale.as_deref(), Some("speech paper"));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].model, "llama-3.3-70b-versatile");
        assert_eq!(seen[0].messages[0].role, LLMRole::System);
        assert!(seen[0].messages[1].content.contains("Speech enhancement GAN"));
    }

    #[tokio::test]
    async fn test_batch_verdicts_in_order() {
        let client = CannedClient::replying(
            "```json\n[{\"supported\": true}, {\"supported\": false, \"rationale\": \"off topic\"}]\n```",
        );
        let settings = JudgeSettings {
            provider: "mistral".to_string(),
            model: Some("mistral-small-latest".to_string()),
            ..JudgeSettings::default()
        };
        let judge = LlmJudge::with_client(client.clone(), settings, "key").unwrap();
        assert!(judge.supports_batching());
        assert_eq!(judge.model(), "mistral-small-latest");

        let results = judge
            .judge_batch(&[request("Deep residual learning"), request("Speech GAN")])
            .await
            .unwrap();
        assert!(results[0].as_ref().unwrap().supported);
        assert!(!results[1].as_ref().unwrap().supported);
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_reply_is_malformed() {
        let judge = LlmJudge::with_client(
            CannedClient::replying("I cannot tell."),
            JudgeSettings::default(),
            "key",
        )
        .unwrap();
        let err = judge.judge(&request("Anything")).await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_rate_limit_stays_transient() {
        let judge = LlmJudge::with_client(
            CannedClient::failing(LLMError::RateLimited {
                retry_after_seconds: Some(2),
            }),
            JudgeSettings::default(),
            "key",
        )
        .unwrap();
        let err = judge.judge(&request("Anything")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_error_mapping() {
        let network: JudgeError = LLMError::NetworkError {
            message: "reset".to_string(),
        }
        .into();
        assert!(network.is_transient());

        let key: JudgeError = LLMError::InvalidApiKey.into();
        assert!(!key.is_transient());
        assert!(matches!(key, JudgeError::Rejected { .. }));
    }

    #[test]
    fn test_construction_checks() {
        let unknown = JudgeSettings {
            provider: "nowhere".to_string(),
            ..JudgeSettings::default()
        };
        assert!(matches!(
            LlmJudge::new(unknown, "key"),
            Err(LLMError::ProviderNotFound { .. })
        ));
        assert!(matches!(
            LlmJudge::new(JudgeSettings::default(), "  "),
            Err(LLMError::InvalidApiKey)
        ));
    }
}
