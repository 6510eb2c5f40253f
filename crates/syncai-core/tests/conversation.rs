use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use syncai_core::{
    Composer, CompletionClient, CompletionError, CompletionResult, ConversationStatus,
    ConversationStore, Role, SubmitOutcome, Turn, COMPLETION_ERROR_MESSAGE,
};
use tokio::sync::Notify;

/// Answers from a script and records every prompt it was given.
#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<CompletionResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(replies: Vec<CompletionResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn generate(&self, prompt: &str) -> CompletionResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("echo: {prompt}")))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Holds every request open until released.
#[derive(Default)]
struct GatedClient {
    release: Notify,
    finished: AtomicBool,
}

#[async_trait]
impl CompletionClient for GatedClient {
    async fn generate(&self, prompt: &str) -> CompletionResult<String> {
        self.release.notified().await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(format!("late: {prompt}"))
    }

    fn model(&self) -> &str {
        "gated"
    }
}

/// Never answers.
struct HangingClient;

#[async_trait]
impl CompletionClient for HangingClient {
    async fn generate(&self, _prompt: &str) -> CompletionResult<String> {
        std::future::pending::<CompletionResult<String>>().await
    }

    fn model(&self) -> &str {
        "hanging"
    }
}

fn api_error() -> CompletionError {
    CompletionError::MalformedResponse("boom".to_string())
}

#[tokio::test]
async fn answer_is_appended_after_question() {
    let client = ScriptedClient::new(vec![Ok("4".to_string())]);
    let mut store = ConversationStore::new(client.clone());

    assert_eq!(store.submit("2+2?"), SubmitOutcome::Accepted);
    assert!(store.pending());
    assert_eq!(store.turns(), &[Turn::user("2+2?")]);

    assert!(store.settle_next().await);

    assert_eq!(store.turns(), &[Turn::user("2+2?"), Turn::model("4")]);
    assert!(!store.pending());
    assert_eq!(client.prompts(), vec!["2+2?".to_string()]);
}

#[tokio::test]
async fn failure_becomes_fixed_error_turn() {
    let client = ScriptedClient::new(vec![Err(api_error())]);
    let mut store = ConversationStore::new(client);

    store.submit("hi");
    store.settle_next().await;

    assert_eq!(
        store.turns(),
        &[Turn::user("hi"), Turn::model(COMPLETION_ERROR_MESSAGE)]
    );
    assert!(!store.pending());
}

#[tokio::test]
async fn blank_and_busy_submits_change_nothing() {
    let client = Arc::new(GatedClient::default());
    let mut store = ConversationStore::new(client.clone());

    assert_eq!(store.submit(""), SubmitOutcome::Empty);
    assert_eq!(store.submit("   \n\t"), SubmitOutcome::Empty);
    assert!(store.turns().is_empty());
    assert!(!store.pending());

    assert_eq!(store.submit("a"), SubmitOutcome::Accepted);
    assert_eq!(store.submit("b"), SubmitOutcome::Busy);
    assert_eq!(store.turns(), &[Turn::user("a")]);
    assert!(store.pending());

    client.release.notify_one();
    store.settle_next().await;

    assert_eq!(store.turns(), &[Turn::user("a"), Turn::model("late: a")]);
}

#[tokio::test]
async fn user_text_is_trimmed_and_sent_alone() {
    let client = ScriptedClient::new(vec![Ok("first".to_string()), Ok("second".to_string())]);
    let mut store = ConversationStore::new(client.clone());

    store.submit("  hello there \n");
    store.settle_next().await;
    store.submit("and again");
    store.settle_next().await;

    assert_eq!(store.turns()[0], Turn::user("hello there"));
    assert_eq!(
        client.prompts(),
        vec!["hello there".to_string(), "and again".to_string()]
    );
}

#[tokio::test]
async fn turns_alternate_for_mixed_outcomes() {
    let client = ScriptedClient::new(vec![
        Ok("one".to_string()),
        Err(api_error()),
        Ok("three".to_string()),
        Err(api_error()),
    ]);
    let mut store = ConversationStore::new(client);

    for prompt in ["q1", "q2", "q3", "q4"] {
        let before = store.turns().len();
        assert!(store.submit(prompt).is_accepted());
        store.settle_next().await;
        assert!(!store.pending());
        assert_eq!(store.turns().len(), before + 2);
        assert_eq!(store.turns()[before + 1].role, Role::Model);
    }

    for pair in store.turns().windows(2) {
        assert_ne!(pair[0].role, pair[1].role);
    }
    assert_eq!(store.turns()[0].role, Role::User);
}

#[tokio::test(start_paused = true)]
async fn hung_request_times_out_into_error_turn() {
    let mut store = ConversationStore::with_timeout(Arc::new(HangingClient), Duration::from_secs(5));

    store.submit("anyone there?");
    store.settle_next().await;

    assert!(!store.pending());
    assert_eq!(
        store.turns().last(),
        Some(&Turn::model(COMPLETION_ERROR_MESSAGE))
    );
}

#[tokio::test]
async fn retry_resubmits_last_failed_prompt() {
    let client = ScriptedClient::new(vec![Err(api_error()), Ok("worked".to_string())]);
    let mut store = ConversationStore::new(client.clone());

    assert_eq!(store.retry_last(), SubmitOutcome::NothingToRetry);

    store.submit("flaky");
    store.settle_next().await;
    assert_eq!(store.retry_last(), SubmitOutcome::Accepted);
    store.settle_next().await;

    assert_eq!(
        store.turns(),
        &[
            Turn::user("flaky"),
            Turn::model(COMPLETION_ERROR_MESSAGE),
            Turn::user("flaky"),
            Turn::model("worked"),
        ]
    );
    assert_eq!(store.retry_last(), SubmitOutcome::NothingToRetry);
    assert_eq!(client.prompts().len(), 2);
}

#[tokio::test]
async fn observers_see_every_transition() {
    let client = ScriptedClient::new(vec![Ok("pong".to_string())]);
    let mut store = ConversationStore::new(client);
    let mut status = store.subscribe();

    store.submit("ping");
    assert!(status.has_changed().unwrap());
    assert_eq!(
        *status.borrow_and_update(),
        ConversationStatus {
            turn_count: 1,
            pending: true
        }
    );

    store.settle_next().await;
    assert_eq!(
        *status.borrow_and_update(),
        ConversationStatus {
            turn_count: 2,
            pending: false
        }
    );
}

#[tokio::test]
async fn dropping_the_store_aborts_the_request() {
    let client = Arc::new(GatedClient::default());
    let mut store = ConversationStore::new(client.clone());
    store.submit("never mind");
    tokio::task::yield_now().await;

    drop(store);
    client.release.notify_one();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert!(!client.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn composer_clears_draft_only_when_accepted() {
    let client = Arc::new(GatedClient::default());
    let mut store = ConversationStore::new(client.clone());
    let mut composer = Composer::new();

    for c in "first".chars() {
        composer.insert_char(c);
    }
    assert!(composer.on_submit_pressed(&mut store).is_accepted());
    assert_eq!(composer.draft(), "");

    for c in "second".chars() {
        composer.insert_char(c);
    }
    assert_eq!(composer.on_submit_pressed(&mut store), SubmitOutcome::Busy);
    assert_eq!(composer.draft(), "second");
    assert_eq!(store.turns().len(), 1);

    client.release.notify_one();
    store.settle_next().await;
}
