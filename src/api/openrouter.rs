use super::{strip_code_fence, BackendError, GenerationBackend};
use crate::config::Config;
use crate::error::Result;
use crate::schema::OutputSchema;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenRouterClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str, schema: OutputSchema) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name(),
                    "schema": schema.json_schema()
                }
            }
        })
    }
}

impl GenerationBackend for OpenRouterClient {
    async fn invoke(
        &self,
        prompt: &str,
        schema: OutputSchema,
    ) -> std::result::Result<Value, BackendError> {
        info!("Requesting {} from {}...", schema.name(), self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt, schema))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(BackendError::Failure(format!(
                "OpenRouter API error (HTTP {}): {}",
                status, error_text
            )));
        }

        let response_json: Value = response.json().await?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                BackendError::SchemaViolation("response carried no message content".to_string())
            })?;

        debug!("Raw model answer: {}", content);

        serde_json::from_str(strip_code_fence(content))
            .map_err(|e| BackendError::SchemaViolation(format!("answer is not valid JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            api_key: "key".into(),
            model: "anthropic/claude-3.5-sonnet".into(),
            base_url: "https://openrouter.ai/api/v1/".into(),
            request_timeout: Duration::from_secs(5),
            cache_dir: None,
        }
    }

    #[test]
    fn request_carries_schema_and_prompt() {
        let client = OpenRouterClient::new(&config()).unwrap();
        let body = client.request_body("explain", OutputSchema::Reduced);
        assert_eq!(body["model"], "anthropic/claude-3.5-sonnet");
        assert_eq!(body["messages"][0]["content"], "explain");
        assert_eq!(body["response_format"]["json_schema"]["name"], "manim_script_draft");
        assert_eq!(client.base_url, "https://openrouter.ai/api/v1");
    }
}
