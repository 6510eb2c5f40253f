pub mod ai;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod error;
pub mod provider;
pub mod scroll;
pub mod state;

// Re-export main types for convenience
pub use ai::{build_client, ClaudeClient, CompletionClient, GeminiClient, OllamaClient, OpenAIClient};
pub use composer::{Composer, EXAMPLE_PROMPTS};
pub use config::Config;
pub use conversation::{ConversationStatus, ConversationStore, Settlement, SubmitOutcome};
pub use error::{CompletionError, CompletionResult, COMPLETION_ERROR_MESSAGE};
pub use provider::Provider;
pub use scroll::{ScrollBehavior, ScrollController, ViewportMetrics};
pub use state::{Role, Turn};
