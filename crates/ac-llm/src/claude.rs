//! Anthropic Claude provider (Messages API).

use crate::{GenerationConfig, LlmProvider, ProviderError};
use async_trait::async_trait;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-haiku-4-5";
const ENV_KEY: &str = "ANTHROPIC_API_KEY";

pub struct ClaudeProvider {
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl ClaudeProvider {
    pub fn from_env(model_override: Option<&str>) -> Result<Self, ProviderError> {
        let api_key =
            std::env::var(ENV_KEY).map_err(|_| ProviderError::MissingApiKey { env: ENV_KEY })?;
        Ok(Self {
            api_key,
            default_model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
            client: reqwest::Client::new(),
        })
    }

    fn model_for(&self, config: &GenerationConfig) -> String {
        if config.model.is_empty() {
            self.default_model.clone()
        } else {
            config.model.clone()
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let model = self.model_for(config);
        let body = serde_json::json!({
            "model": model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "system": system_prompt,
            "messages": [{"role": "user", "content": user_prompt}]
        });

        tracing::debug!(model = %model, "calling claude");
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .timeout(config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let text = result["content"][0]["text"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("missing content[0].text".into()))?;
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn model_name(&self) -> String {
        format!("claude:{}", self.default_model)
    }
}

pub(crate) fn map_transport(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(e.to_string())
    }
}
