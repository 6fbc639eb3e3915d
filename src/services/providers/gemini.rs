/// Gemini Developer API provider
///
/// Calls `generateContent` with `responseMimeType: application/json` and,
/// when the caller supplies one, a `responseSchema` for constrained decoding.
/// The model's text parts are concatenated and parsed as a JSON document.
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    services::providers::GenerativeProvider,
};

pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }
}

/// Concatenates the text parts of the first-candidate response
fn extract_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let collected: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if collected.is_empty() {
        None
    } else {
        Some(collected.concat())
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate_structured(&self, prompt: &str, schema: Option<&Value>) -> AppResult<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_url, self.model, self.api_key
        );

        let mut generation_config = json!({ "responseMimeType": "application/json" });
        if let Some(schema) = schema {
            generation_config["responseSchema"] = schema.clone();
        }

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let response = self.http_client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let payload: Value = response.json().await?;

        let text = extract_text(&payload).ok_or_else(|| {
            AppError::Generation("Gemini response contained no text parts".to_string())
        })?;

        serde_json::from_str(&text).map_err(|e| {
            AppError::Generation(format!("Gemini returned malformed JSON: {}", e))
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_concatenates_parts() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "{\"recommendations\":" },
                        { "text": "[]}" }
                    ]
                }
            }]
        });

        assert_eq!(
            extract_text(&payload).as_deref(),
            Some("{\"recommendations\":[]}")
        );
    }

    #[test]
    fn test_extract_text_missing_candidates_is_none() {
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn test_extract_text_ignores_non_text_parts() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "functionCall": {} }] }
            }]
        });

        assert_eq!(extract_text(&payload), None);
    }
}
