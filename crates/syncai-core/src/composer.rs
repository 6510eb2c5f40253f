use crate::conversation::{ConversationStore, SubmitOutcome};

/// Starter prompts offered while the transcript is empty.
pub const EXAMPLE_PROMPTS: [&str; 3] = [
    "Explain quantum computing in simple terms",
    "Suggest some team-building activities for remote teams",
    "Help me debug this Python code...",
];

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// The draft input line.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    draft: String,
    cursor: usize, // in chars
    focus_requested: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.draft.trim().is_empty()
    }

    pub fn can_submit(&self, pending: bool) -> bool {
        !pending && !self.is_blank()
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.draft.chars().count() {
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.draft.chars().count();
    }

    pub fn clear(&mut self) {
        self.draft.clear();
        self.cursor = 0;
    }

    /// Fill the draft with a starter prompt and ask for input focus.
    pub fn on_example_selected(&mut self, text: &str) {
        self.draft = text.to_string();
        self.move_end();
        self.focus_requested = true;
    }

    /// Returns and clears a pending focus request.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    /// Hand the draft to the store; the draft is cleared only if accepted.
    pub fn on_submit_pressed(&mut self, store: &mut ConversationStore) -> SubmitOutcome {
        if !self.can_submit(store.pending()) {
            return if store.pending() {
                SubmitOutcome::Busy
            } else {
                SubmitOutcome::Empty
            };
        }

        let outcome = store.submit(&self.draft);
        if outcome.is_accepted() {
            self.clear();
        }
        outcome
    }
}
