use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionClient;
use crate::error::{CompletionError, CompletionResult};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

/// Message content of the first choice.
fn extract_text(response: OpenAIResponse) -> CompletionResult<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::MalformedResponse("no choices".to_string()))?;

    match choice.message.content {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(CompletionError::MalformedResponse(
            "choice has no content".to_string(),
        )),
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> CompletionResult<String> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey { provider: "openai" });
        }

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                provider: "openai",
                status,
                body,
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
        extract_text(openai_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
