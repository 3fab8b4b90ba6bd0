//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.
//!
//! rig owns the HTTP transport and the provider wire format. The adapter
//! maps our message list onto rig's preamble/history/prompt shape, adds the
//! request deadline, and folds rig's errors into `LlmError`.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionError, CompletionModel, Message};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Adapter from a rig completion model to `LlmProvider`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
    timeout: Duration,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(provider: &'static str, model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Fail a request that has not settled within `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prepared = prepare(self.provider, request.messages)?;

        let history = prepared.history.into_iter().map(to_rig).collect();
        let mut builder = self
            .model
            .completion_request(to_rig(prepared.prompt))
            .messages(history);
        if let Some(preamble) = prepared.preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }
        if request.json_output {
            builder = builder.additional_params(json_output_params());
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.provider.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| map_completion_error(self.provider, e))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "response has no text content".to_string(),
            });
        }

        Ok(CompletionResponse {
            content,
            input_tokens: saturate(response.usage.input_tokens),
            output_tokens: saturate(response.usage.output_tokens),
        })
    }
}

/// Our message list split into rig's request shape.
#[derive(Debug)]
struct Prepared {
    preamble: Option<String>,
    history: Vec<ChatMessage>,
    prompt: ChatMessage,
}

/// System messages become the preamble; the final user message is the
/// prompt and everything between is history.
fn prepare(provider: &str, messages: Vec<ChatMessage>) -> Result<Prepared, LlmError> {
    let (system, mut history): (Vec<_>, Vec<_>) =
        messages.into_iter().partition(|m| m.role == Role::System);

    let prompt = match history.pop() {
        Some(m) if m.role == Role::User => m,
        _ => {
            return Err(LlmError::RequestFailed {
                provider: provider.to_string(),
                reason: "request must end with a user message".to_string(),
            });
        }
    };

    let preamble = (!system.is_empty()).then(|| {
        system
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n\n")
    });

    Ok(Prepared {
        preamble,
        history,
        prompt,
    })
}

fn to_rig(message: ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content),
        Role::User | Role::System => Message::user(message.content),
    }
}

/// Gemini reads the response MIME type from its generation config.
fn json_output_params() -> serde_json::Value {
    serde_json::json!({
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

fn map_completion_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::JsonError(e) => LlmError::Json(e),
        CompletionError::ProviderError(body) => classify_provider_error(provider, body),
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason,
        },
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

/// rig hands back the provider's error body verbatim; pick out the Google
/// API status codes we treat specially.
fn classify_provider_error(provider: &str, body: String) -> LlmError {
    let provider = provider.to_string();
    if body.contains("RESOURCE_EXHAUSTED") {
        LlmError::RateLimited { provider }
    } else if ["API_KEY_INVALID", "UNAUTHENTICATED", "PERMISSION_DENIED"]
        .iter()
        .any(|code| body.contains(code))
    {
        LlmError::AuthFailed { provider }
    } else {
        LlmError::RequestFailed {
            provider,
            reason: body,
        }
    }
}

fn saturate(tokens: u64) -> u32 {
    u32::try_from(tokens).unwrap_or(u32::MAX)
}
