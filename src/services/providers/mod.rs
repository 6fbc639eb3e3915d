use std::sync::Arc;

use serde_json::Value;

/// Generative model provider abstraction
///
/// This module provides a pluggable architecture for structured-JSON
/// generation. Each provider takes a natural-language prompt (optionally with
/// a response schema) and returns the parsed JSON document the model
/// produced. The rest of the pipeline never sees provider-specific wire
/// formats.
use crate::{config::Config, error::AppResult};

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Trait for generative model providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Generates a JSON document from a natural-language prompt
    ///
    /// When `schema` is supplied, providers that support schema-constrained
    /// decoding pass it through; others fall back to JSON-object mode.
    async fn generate_structured(&self, prompt: &str, schema: Option<&Value>) -> AppResult<Value>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Builds the configured provider.
///
/// Selection happens once at startup; call sites only ever see
/// `Arc<dyn GenerativeProvider>`.
pub fn create_provider(config: &Config) -> anyhow::Result<Arc<dyn GenerativeProvider>> {
    match config.model_provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(
            config.gemini_api_key.clone(),
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
        ))),
        "openai" => Ok(Arc::new(OpenAiProvider::new(
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
            config.openai_model.clone(),
        ))),
        other => Err(anyhow::anyhow!("Unknown model provider: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_provider(provider: &str) -> Config {
        Config {
            model_provider: provider.to_string(),
            gemini_api_key: "key".to_string(),
            gemini_api_url: "http://gemini.local".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            openai_api_key: "key".to_string(),
            openai_api_url: "http://openai.local".to_string(),
            openai_model: "gpt-4o".to_string(),
            geocode_url: "http://geocode.local".to_string(),
            search_url: "http://search.local".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }

    #[test]
    fn test_create_provider_selects_gemini() {
        let provider = create_provider(&config_with_provider("gemini")).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn test_create_provider_selects_openai() {
        let provider = create_provider(&config_with_provider("openai")).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_create_provider_rejects_unknown() {
        assert!(create_provider(&config_with_provider("llama")).is_err());
    }
}
