use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionClient;
use crate::error::{CompletionError, CompletionResult};

const CLAUDE_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

/// Concatenate the text blocks; tool-use and other blocks carry no text.
fn extract_text(response: ClaudeResponse) -> CompletionResult<String> {
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(CompletionError::MalformedResponse(
            "no text content".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl CompletionClient for ClaudeClient {
    async fn generate(&self, prompt: &str) -> CompletionResult<String> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey { provider: "claude" });
        }

        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(CLAUDE_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                provider: "claude",
                status,
                body,
            });
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
        extract_text(claude_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ClaudeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn joins_text_blocks() {
        let response = parse(
            r#"{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"2+2 "},{"type":"text","text":"is 4"}],"stop_reason":"end_turn"}"#,
        );
        assert_eq!(extract_text(response).unwrap(), "2+2 is 4");
    }

    #[test]
    fn response_without_text_blocks_is_malformed() {
        let response = parse(
            r#"{"content":[{"type":"tool_use","id":"t1","name":"calc","input":{}}]}"#,
        );
        assert!(matches!(
            extract_text(response),
            Err(CompletionError::MalformedResponse(_))
        ));

        let response = parse(r#"{"content":[]}"#);
        assert!(extract_text(response).is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = ClaudeClient::new("", "claude-3-5-haiku-20241022");
        assert!(matches!(
            client.generate("hi").await,
            Err(CompletionError::MissingApiKey { provider: "claude" })
        ));
    }
}
