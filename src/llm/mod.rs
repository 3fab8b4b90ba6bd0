//! LLM integration for SwasthyaScan.
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait. The shipped
//! backend is Google Gemini; tests plug in scripted providers.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Gemini => create_gemini_provider(config),
    }
}

fn create_gemini_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::gemini;

    let client: rig::client::Client<gemini::client::GeminiExt> =
        gemini::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("Failed to create Gemini client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(
        RigAdapter::new("gemini", model, &config.model).with_timeout(config.timeout),
    ))
}
