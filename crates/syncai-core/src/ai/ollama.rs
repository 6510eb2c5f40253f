use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionClient;
use crate::error::{CompletionError, CompletionResult};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

fn extract_text(response: OllamaResponse) -> CompletionResult<String> {
    if response.response.is_empty() {
        return Err(CompletionError::MalformedResponse(
            "empty response".to_string(),
        ));
    }
    Ok(response.response)
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> CompletionResult<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                provider: "ollama",
                status,
                body,
            });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
        extract_text(ollama_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
