/// OpenAI chat completions provider
///
/// Uses JSON-object response mode; the schema parameter is accepted for
/// interface parity but not forwarded, so prompts must spell out the
/// expected shape.
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    services::providers::GenerativeProvider,
};

const SYSTEM_PROMPT: &str = "You are a helpful local discovery assistant that provides accurate \
    recommendations for places and activities based on user queries and location. Always respond \
    with valid JSON.";

const MAX_TOKENS: u32 = 2000;

pub struct OpenAiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }
}

fn extract_content(payload: &Value) -> Option<&str> {
    payload
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
}

#[async_trait]
impl GenerativeProvider for OpenAiProvider {
    async fn generate_structured(&self, prompt: &str, _schema: Option<&Value>) -> AppResult<Value> {
        let url = format!("{}/v1/chat/completions", self.api_url);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" },
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "OpenAI API returned status {}: {}",
                status, body
            )));
        }

        let payload: Value = response.json().await?;

        let content = extract_content(&payload).ok_or_else(|| {
            AppError::Generation("OpenAI response contained no message content".to_string())
        })?;

        serde_json::from_str(content).map_err(|e| {
            AppError::Generation(format!("OpenAI returned malformed JSON: {}", e))
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content_reads_first_choice() {
        let payload = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "{\"recommendations\": []}" }
            }]
        });

        assert_eq!(extract_content(&payload), Some("{\"recommendations\": []}"));
    }

    #[test]
    fn test_extract_content_missing_choices_is_none() {
        assert_eq!(extract_content(&json!({})), None);
        assert_eq!(extract_content(&json!({ "choices": [] })), None);
    }
}
