use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::CompletionResult;
use crate::provider::Provider;

pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

/// A hosted model that turns one prompt into one answer.
///
/// Each call is stateless from the model's point of view.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> CompletionResult<String>;

    /// Model identifier, shown in the header.
    fn model(&self) -> &str;
}

/// Build the client selected by `config`.
///
/// A missing API key is not an error here: the client reports it on first use
/// so the failure lands in the transcript like any other.
pub fn build_client(config: &Config) -> Arc<dyn CompletionClient> {
    let provider = config.provider();
    let model = config.model();
    let api_key = config.api_key(provider).unwrap_or_default();

    if provider.api_key_env().is_some() && api_key.is_empty() {
        tracing::warn!(
            provider = provider.as_str(),
            "no API key configured; requests will fail until one is set"
        );
    }

    match provider {
        Provider::Gemini => match config.base_url.as_deref() {
            Some(base_url) => Arc::new(GeminiClient::with_base_url(&api_key, &model, base_url)),
            None => Arc::new(GeminiClient::new(&api_key, &model)),
        },
        Provider::OpenAI => Arc::new(OpenAIClient::new(&api_key, &model)),
        Provider::Claude => Arc::new(ClaudeClient::new(&api_key, &model)),
        Provider::Ollama => Arc::new(OllamaClient::new(
            config.base_url.as_deref().unwrap_or(ollama::OLLAMA_BASE_URL),
            &model,
        )),
    }
}
