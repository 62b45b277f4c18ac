//! Provider HTTP client with sequential model fallback.
//!
//! Models are tried strictly one after another (never in parallel) to
//! respect rate limits and avoid duplicate costed calls.

use super::models::{
    classify_failure, clamp_max_tokens, suggestion_for, FailureKind, GenerateReply, Usage,
};
use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER_TIMEOUT_SECS: u64 = 120;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates test cases for code.";

/// The text-generation side of the remote gateway.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<GenerateReply>;
}

pub struct ProviderClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    models: Vec<String>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// One failed model attempt, before the loop decides what to do with it.
#[derive(Debug)]
pub(crate) struct AttemptFailure {
    pub message: String,
    pub kind: FailureKind,
}

impl ProviderClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: config.provider_url.clone(),
            api_key: config.provider_api_key(),
            models: config.model_priority.clone(),
        })
    }

    async fn attempt(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> std::result::Result<GenerateReply, AttemptFailure> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: clamp_max_tokens(max_tokens),
            temperature: 0.7,
        };

        debug!(%model, "calling provider");
        let resp = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AttemptFailure {
                message: e.to_string(),
                kind: FailureKind::Other,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| AttemptFailure {
            message: e.to_string(),
            kind: FailureKind::Other,
        })?;

        if !status.is_success() {
            return Err(AttemptFailure {
                message: text.clone(),
                kind: classify_failure(Some(status.as_u16()), &text),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| AttemptFailure {
            message: format!("unparsable provider reply: {}", e),
            kind: FailureKind::Other,
        })?;

        let result = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(GenerateReply {
            result,
            model_used: parsed.model.unwrap_or_else(|| model.to_string()),
            tokens_used: parsed.usage.map(|u| u.total_tokens),
        })
    }
}

#[async_trait]
impl TextGenerator for ProviderClient {
    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<GenerateReply> {
        if self.api_key.is_none() {
            return Err(Error::NotConfigured);
        }
        run_fallback(&self.models, |model| {
            self.attempt(model, prompt, max_tokens)
        })
        .await
    }
}

/// Walk the model list in order. A safety refusal aborts immediately; any
/// other failure moves on to the next model. Exhaustion reports the last
/// error together with everything that was attempted.
pub(crate) async fn run_fallback<'a, F, Fut>(models: &'a [String], mut attempt: F) -> Result<GenerateReply>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = std::result::Result<GenerateReply, AttemptFailure>>,
{
    let mut attempted = Vec::new();
    let mut last_error = String::from("no models configured");

    for model in models {
        attempted.push(model.clone());
        match attempt(model).await {
            Ok(reply) => {
                debug!(model_used = %reply.model_used, "provider call succeeded");
                return Ok(reply);
            }
            Err(failure) => match failure.kind {
                FailureKind::Safety => {
                    return Err(Error::SafetyBlocked(failure.message));
                }
                FailureKind::Quota => {
                    warn!(%model, "model over quota, falling through");
                    last_error = failure.message;
                }
                FailureKind::Other => {
                    warn!(%model, error = %failure.message, "model failed, falling through");
                    last_error = failure.message;
                }
            },
        }
    }

    let suggestion = suggestion_for(&last_error);
    Err(Error::AllModelsFailed {
        attempted_models: attempted,
        last_error,
        suggestion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn reply(text: &str, model: &str) -> GenerateReply {
        GenerateReply {
            result: text.to_string(),
            model_used: model.to_string(),
            tokens_used: None,
        }
    }

    #[tokio::test]
    async fn test_fallback_returns_first_success() {
        let list = models(&["m1", "m2"]);
        let result = run_fallback(&list, |m| async move {
            if m == "m1" {
                Ok(reply("hello", "m1"))
            } else {
                panic!("m2 should not be tried");
            }
        })
        .await
        .unwrap();
        assert_eq!(result.result, "hello");
    }

    #[tokio::test]
    async fn test_fallback_skips_failed_models() {
        let list = models(&["m1", "m2", "m3"]);
        let result = run_fallback(&list, |m| async move {
            if m == "m3" {
                Ok(reply("third time lucky", "m3"))
            } else {
                Err(AttemptFailure {
                    message: "boom".into(),
                    kind: FailureKind::Other,
                })
            }
        })
        .await
        .unwrap();
        assert_eq!(result.model_used, "m3");
    }

    #[tokio::test]
    async fn test_fallback_exhaustion_reports_attempts_in_order() {
        let list = models(&["m1", "m2", "m3"]);
        let calls = Mutex::new(Vec::new());
        let err = run_fallback(&list, |m| {
            calls.lock().unwrap().push(m.to_string());
            async move {
                let (message, kind) = if m == "m3" {
                    ("upstream exploded".to_string(), FailureKind::Other)
                } else {
                    (format!("{} quota exceeded", m), FailureKind::Quota)
                };
                Err(AttemptFailure { message, kind })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), vec!["m1", "m2", "m3"]);
        match err {
            Error::AllModelsFailed {
                attempted_models,
                last_error,
                ..
            } => {
                assert_eq!(attempted_models, vec!["m1", "m2", "m3"]);
                assert_eq!(last_error, "upstream exploded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_aborts_on_safety_refusal() {
        let list = models(&["m1", "m2"]);
        let calls = Mutex::new(0u32);
        let err = run_fallback(&list, |_m| {
            *calls.lock().unwrap() += 1;
            async move {
                Err(AttemptFailure {
                    message: "rejected by content policy".into(),
                    kind: FailureKind::Safety,
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 1, "no model after the refusal");
        assert!(matches!(err, Error::SafetyBlocked(_)));
    }

    #[tokio::test]
    async fn test_empty_model_list_fails_cleanly() {
        let list: Vec<String> = Vec::new();
        let err = run_fallback(&list, |_m| async move { panic!("never called") })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AllModelsFailed { .. }));
    }

    #[test]
    fn test_chat_response_parses_with_missing_fields() {
        let json = r#"{"choices": [{"message": {"content": "ok"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("ok"));
        assert!(parsed.usage.is_none());
        assert!(parsed.model.is_none());
    }

    #[test]
    fn test_missing_api_key_yields_not_configured() {
        // Constructed by hand so the environment cannot interfere.
        let client = ProviderClient {
            client: reqwest::Client::new(),
            url: "http://localhost:1/unused".into(),
            api_key: None,
            models: models(&["m1"]),
        };
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt.block_on(client.generate_text("hi", 100)).unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }
}
