use std::time::Duration;

use thiserror::Error;

/// Text appended to the transcript whenever a completion request fails.
///
/// The cause is logged but never shown.
pub const COMPLETION_ERROR_MESSAGE: &str = "Maaf, terjadi kesalahan. Coba lagi ya.";

/// Everything that can go wrong between sending a prompt and getting text back.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no API key configured for {provider}")]
    MissingApiKey { provider: &'static str },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("prompt blocked by provider: {0}")]
    Blocked(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

pub type CompletionResult<T> = Result<T, CompletionError>;
