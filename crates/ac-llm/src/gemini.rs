//! Google Gemini provider (generateContent API).

use crate::claude::map_transport;
use crate::{GenerationConfig, LlmProvider, ProviderError};
use async_trait::async_trait;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const ENV_KEY: &str = "GEMINI_API_KEY";

pub struct GeminiProvider {
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
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
impl LlmProvider for GeminiProvider {
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
        let url = format!("{API_BASE}/{model}:generateContent");
        let body = serde_json::json!({
            "system_instruction": {"parts": [{"text": system_prompt}]},
            "contents": [{"parts": [{"text": user_prompt}]}],
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_tokens
            }
        });

        tracing::debug!(model = %model, "calling gemini");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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

        let text = result["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("missing candidates[0].content.parts".into()))?;
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn model_name(&self) -> String {
        format!("gemini:{}", self.default_model)
    }
}
