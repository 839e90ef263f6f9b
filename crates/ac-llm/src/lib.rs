//! ac-llm: LLM provider clients behind a single completion contract.
//!
//! The Reasoner depends only on the [`LlmProvider`] trait. Three providers
//! are supported by name: `claude`, `aimlapi`, `gemini`. Each reads its API
//! key from the environment at construction; a missing key is a
//! configuration failure before any pipeline run starts.

pub mod aimlapi;
pub mod backoff;
pub mod claude;
pub mod config;
pub mod gemini;

pub use backoff::NetworkRetryPolicy;
pub use config::GenerationConfig;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing {env} environment variable")]
    MissingApiKey { env: &'static str },
    #[error("unknown provider '{0}' (supported: claude, aimlapi, gemini)")]
    UnknownProvider(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("request timed out")]
    Timeout,
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("provider API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Transport-level failures worth an immediate network retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::RateLimited | ProviderError::Timeout => {
                true
            }
            ProviderError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Failures caused by configuration, not by the network or the model.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProviderError::MissingApiKey { .. } | ProviderError::UnknownProvider(_)
        )
    }
}

/// Completion contract shared by all providers.
///
/// Implementations are process-wide and safe for concurrent use; API keys
/// are read once at construction and immutable afterwards.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one system+user prompt pair and return the raw completion text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError>;

    /// Provider-qualified model identifier, e.g. `claude:claude-haiku-4-5`.
    fn model_name(&self) -> String;
}

impl std::fmt::Debug for dyn LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn LlmProvider").field("model_name", &self.model_name()).finish()
    }
}

/// Create a provider by selector name, optionally overriding the model.
pub fn create_provider(
    name: &str,
    model_override: Option<&str>,
) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    match name.to_ascii_lowercase().as_str() {
        "claude" => Ok(Arc::new(claude::ClaudeProvider::from_env(model_override)?)),
        "aimlapi" => Ok(Arc::new(aimlapi::AimlApiProvider::from_env(model_override)?)),
        "gemini" => Ok(Arc::new(gemini::GeminiProvider::from_env(model_override)?)),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}
