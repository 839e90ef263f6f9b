//! AIMLAPI provider (OpenAI-compatible chat completions).

use crate::claude::map_transport;
use crate::{GenerationConfig, LlmProvider, ProviderError};
use async_trait::async_trait;

const API_URL: &str = "https://api.aimlapi.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "x-ai/grok-4-fast-reasoning";
const ENV_KEY: &str = "AIMLAPI_KEY";

pub struct AimlApiProvider {
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl AimlApiProvider {
    pub fn from_env(model_override: Option<&str>) -> Result<Self, ProviderError> {
        let api_key =
            std::env::var(ENV_KEY).map_err(|_| ProviderError::MissingApiKey { env: ENV_KEY })?;
        Ok(Self {
            api_key,
            default_model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl LlmProvider for AimlApiProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let model = if config.model.is_empty() {
            self.default_model.clone()
        } else {
            config.model.clone()
        };
        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": config.temperature,
            "max_tokens": config.max_tokens
        });

        tracing::debug!(model = %model, "calling aimlapi");
        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
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

        let text = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".into()))?;
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn model_name(&self) -> String {
        format!("aimlapi:{}", self.default_model)
    }
}
