use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::VisionConfig;
use crate::error::{BotError, BotResult};

const SYSTEM_PROMPT: &str = "Вы - опытный стоматолог, который анализирует фотографии зубов и даёт рекомендации.";
const USER_PROMPT: &str = "Проанализируйте состояние зубов на фотографии и дайте рекомендации.";
const MAX_TOKENS: u32 = 500;

/// Thin client over an OpenAI-compatible chat-completions endpoint with a
/// vision-capable model. Failures are reported as `BotError::Vision`; the
/// caller degrades to a fixed apology message.
#[derive(Clone)]
pub struct VisionService {
    client: reqwest::Client,
    config: VisionConfig,
}

impl VisionService {
    pub fn new(config: VisionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub async fn analyze(&self, image: &[u8]) -> BotResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| BotError::Vision("API key not configured".to_string()))?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": [
                    { "type": "image_url", "image_url": { "url": format!("data:image/jpeg;base64,{}", encoded) } },
                    { "type": "text", "text": USER_PROMPT }
                ]}
            ],
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Vision(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Vision(format!("API returned {}", status)));
        }

        let payload: Value = response.json().await.map_err(|e| BotError::Vision(e.to_string()))?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| BotError::Vision("Malformed response".to_string()))?;

        Ok(format!("🦷 Анализ состояния зубов:\n\n{}", content))
    }
}
