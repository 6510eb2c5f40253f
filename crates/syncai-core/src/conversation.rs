//! The conversation transcript and its single in-flight request.
//!
//! `ConversationStore` is the only mutator of the transcript. It moves between
//! two states: idle (`pending() == false`) and awaiting a completion. `submit`
//! is the only way out of idle; applying a settlement is the only way back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::ai::CompletionClient;
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::{CompletionError, CompletionResult, COMPLETION_ERROR_MESSAGE};
use crate::state::{Role, Turn};

/// Snapshot published to observers after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversationStatus {
    pub turn_count: usize,
    pub pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Text was empty after trimming.
    Empty,
    /// A request is already in flight.
    Busy,
    /// `retry_last` found no failed request to repeat.
    NothingToRetry,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }
}

/// Result of one completion request, delivered back to the store.
#[derive(Debug)]
pub struct Settlement {
    request_id: u64,
    result: CompletionResult<String>,
}

struct InFlight {
    id: u64,
    task: JoinHandle<()>,
}

pub struct ConversationStore {
    turns: Vec<Turn>,
    in_flight: Option<InFlight>,
    last_failed: bool,
    next_request_id: u64,
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    settled_tx: mpsc::UnboundedSender<Settlement>,
    settled_rx: mpsc::UnboundedReceiver<Settlement>,
    status_tx: watch::Sender<ConversationStatus>,
}

impl ConversationStore {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self::with_timeout(client, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(ConversationStatus::default());

        Self {
            turns: Vec::new(),
            in_flight: None,
            last_failed: false,
            next_request_id: 0,
            client,
            timeout,
            settled_tx,
            settled_rx,
            status_tx,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn status(&self) -> ConversationStatus {
        ConversationStatus {
            turn_count: self.turns.len(),
            pending: self.pending(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model()
    }

    /// Observe turn-count and pending changes.
    pub fn subscribe(&self) -> watch::Receiver<ConversationStatus> {
        self.status_tx.subscribe()
    }

    /// Append a user turn and start a completion request for it.
    ///
    /// Dropped (not queued) while a request is in flight. Must be called from
    /// within a tokio runtime.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        let prompt = text.trim();
        if prompt.is_empty() {
            return SubmitOutcome::Empty;
        }
        if self.pending() {
            tracing::debug!("submit ignored: request already in flight");
            return SubmitOutcome::Busy;
        }

        self.turns.push(Turn::user(prompt));
        self.last_failed = false;

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let client = Arc::clone(&self.client);
        let tx = self.settled_tx.clone();
        let timeout = self.timeout;
        let prompt = prompt.to_string();

        tracing::info!(request_id, chars = prompt.chars().count(), "sending prompt");

        let task = tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, client.generate(&prompt)).await {
                Ok(result) => result,
                Err(_) => Err(CompletionError::Timeout(timeout)),
            };
            // The receiver lives as long as the store; a send error means the
            // session is already gone.
            let _ = tx.send(Settlement { request_id, result });
        });

        self.in_flight = Some(InFlight {
            id: request_id,
            task,
        });
        self.publish();
        SubmitOutcome::Accepted
    }

    /// Re-send the last user text after a failed request.
    ///
    /// History stays append-only: a fresh user turn is added.
    pub fn retry_last(&mut self) -> SubmitOutcome {
        if self.pending() {
            return SubmitOutcome::Busy;
        }
        if !self.last_failed {
            return SubmitOutcome::NothingToRetry;
        }

        let last_prompt = self
            .turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.clone());

        match last_prompt {
            Some(prompt) => self.submit(&prompt),
            None => SubmitOutcome::NothingToRetry,
        }
    }

    /// Wait for the in-flight request to settle.
    ///
    /// Never resolves while idle.
    pub async fn next_settlement(&mut self) -> Option<Settlement> {
        self.settled_rx.recv().await
    }

    /// Apply a settlement: append the model turn and return to idle.
    ///
    /// Returns false if the settlement does not belong to the current request.
    pub fn apply(&mut self, settlement: Settlement) -> bool {
        match &self.in_flight {
            Some(in_flight) if in_flight.id == settlement.request_id => {}
            _ => {
                tracing::warn!(
                    request_id = settlement.request_id,
                    "dropping settlement for a request that is not in flight"
                );
                return false;
            }
        }
        self.in_flight = None;

        match settlement.result {
            Ok(text) => {
                tracing::info!(
                    request_id = settlement.request_id,
                    chars = text.chars().count(),
                    "completion received"
                );
                self.turns.push(Turn::model(text));
                self.last_failed = false;
            }
            Err(err) => {
                tracing::error!(
                    request_id = settlement.request_id,
                    error = %err,
                    "completion request failed"
                );
                self.turns.push(Turn::model(COMPLETION_ERROR_MESSAGE));
                self.last_failed = true;
            }
        }

        self.publish();
        true
    }

    /// Wait for the next settlement and apply it.
    pub async fn settle_next(&mut self) -> bool {
        match self.next_settlement().await {
            Some(settlement) => self.apply(settlement),
            None => false,
        }
    }

    /// Abort the in-flight request, if any. Used at session end.
    pub fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::debug!(request_id = in_flight.id, "aborting in-flight request");
            in_flight.task.abort();
            self.publish();
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }
}

impl Drop for ConversationStore {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
    }
}
