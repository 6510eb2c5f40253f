use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use syncai_core::{
    Composer, ConversationStatus, ConversationStore, Provider, Role, ScrollBehavior,
    ScrollController, SubmitOutcome, ViewportMetrics, EXAMPLE_PROMPTS,
};
use tokio::sync::watch;

use crate::markdown::render_markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub store: ConversationStore,
    pub composer: Composer,
    pub provider: Provider,
    status_rx: watch::Receiver<ConversationStatus>,

    // Starter prompts (empty transcript only)
    pub selected_example: usize,

    // Transcript scrolling, in terminal rows
    pub scroll: ScrollController,
    pub scroll_offset: u16,
    pub content_rows: u16,
    pub viewport_rows: u16,
    pending_scroll: Option<ScrollBehavior>,
    smooth_scrolling: bool,

    /// Markdown for each turn, rendered once.
    pub rendered_turns: Vec<Vec<Line<'static>>>,

    pub animation_frame: u8,
    pub notice: Option<String>,

    // Areas for mouse hit-testing, set during render
    pub chat_area: Option<Rect>,
    pub input_area: Option<Rect>,
    pub affordance_area: Option<Rect>,
    pub example_areas: Vec<Rect>,
}

impl App {
    pub fn new(store: ConversationStore, provider: Provider) -> Self {
        let status_rx = store.subscribe();

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            store,
            composer: Composer::new(),
            provider,
            status_rx,

            selected_example: 0,

            // Rows are whole numbers: "at bottom" means exactly at the end.
            scroll: ScrollController::with_tolerance(1.0),
            scroll_offset: 0,
            content_rows: 0,
            viewport_rows: 0,
            pending_scroll: None,
            smooth_scrolling: false,

            rendered_turns: Vec::new(),

            animation_frame: 0,
            notice: None,

            chat_area: None,
            input_area: None,
            affordance_area: None,
            example_areas: Vec::new(),
        }
    }

    /// Pick up store mutations: render new turns and let the scroll
    /// controller react to the new turn count.
    pub fn sync_store(&mut self) {
        if !self.status_rx.has_changed().unwrap_or(false) {
            return;
        }
        let status = *self.status_rx.borrow_and_update();

        let turns = self.store.turns();
        for turn in &turns[self.rendered_turns.len().min(turns.len())..] {
            self.rendered_turns
                .push(render_markdown(&turn.content, base_style(turn.role)));
        }

        if let Some(behavior) = self.scroll.on_content_change(status.turn_count) {
            self.pending_scroll = Some(behavior);
        }
        if !status.pending {
            self.animation_frame = 0;
        }
    }

    pub fn submit(&mut self) {
        match self.composer.on_submit_pressed(&mut self.store) {
            SubmitOutcome::Accepted => self.notice = None,
            SubmitOutcome::Busy => {
                self.notice = Some("Still waiting for the previous answer".to_string())
            }
            SubmitOutcome::Empty | SubmitOutcome::NothingToRetry => {}
        }
        self.sync_store();
    }

    pub fn retry(&mut self) {
        match self.store.retry_last() {
            SubmitOutcome::Accepted => self.notice = None,
            SubmitOutcome::Busy => {
                self.notice = Some("Still waiting for the previous answer".to_string())
            }
            SubmitOutcome::NothingToRetry | SubmitOutcome::Empty => {
                self.notice = Some("Nothing to retry".to_string())
            }
        }
        self.sync_store();
    }

    pub fn select_example(&mut self, idx: usize) {
        if !self.store.is_empty() {
            return;
        }
        if let Some(prompt) = EXAMPLE_PROMPTS.get(idx) {
            self.selected_example = idx;
            self.composer.on_example_selected(prompt);
            if self.composer.take_focus_request() {
                self.input_mode = InputMode::Editing;
            }
        }
    }

    pub fn example_nav_down(&mut self) {
        self.selected_example = (self.selected_example + 1) % EXAMPLE_PROMPTS.len();
    }

    pub fn example_nav_up(&mut self) {
        self.selected_example =
            (self.selected_example + EXAMPLE_PROMPTS.len() - 1) % EXAMPLE_PROMPTS.len();
    }

    pub fn max_scroll(&self) -> u16 {
        self.content_rows.saturating_sub(self.viewport_rows)
    }

    /// Scroll by `delta` rows on user request (negative is up).
    pub fn scroll_by(&mut self, delta: i32) {
        self.smooth_scrolling = false;
        let target = (self.scroll_offset as i32 + delta).clamp(0, self.max_scroll() as i32);
        self.scroll_offset = target as u16;
        self.scroll.on_user_scroll(self.metrics());
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_by((self.viewport_rows / 2).max(1) as i32);
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_by(-((self.viewport_rows / 2).max(1) as i32));
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_by(-(self.scroll_offset as i32));
    }

    /// The "scroll down" affordance.
    pub fn scroll_to_bottom(&mut self) {
        self.pending_scroll = Some(self.scroll.scroll_to_bottom_manual());
    }

    /// Record the transcript geometry of the frame being drawn and apply any
    /// requested scroll.
    ///
    /// A viewport that was following the tail stays on it when the geometry
    /// changes (resize, rewrap); only user scrolling detaches it.
    pub fn update_layout(&mut self, content_rows: u16, viewport_rows: u16) {
        let resized = content_rows != self.content_rows || viewport_rows != self.viewport_rows;
        let following = self.scroll.at_bottom() && !self.smooth_scrolling;
        self.content_rows = content_rows;
        self.viewport_rows = viewport_rows;

        match self.pending_scroll.take() {
            Some(ScrollBehavior::Instant) => {
                self.smooth_scrolling = false;
                self.scroll_offset = self.max_scroll();
            }
            Some(ScrollBehavior::Smooth) => self.smooth_scrolling = true,
            None if resized && following => self.scroll_offset = self.max_scroll(),
            None => {}
        }

        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
        self.scroll.on_user_scroll(self.metrics());
    }

    /// Advance animations (called on every tick event).
    pub fn tick(&mut self) {
        if self.store.pending() {
            self.animation_frame = self.animation_frame.wrapping_add(1);
        }

        if self.smooth_scrolling {
            let remaining = self.max_scroll().saturating_sub(self.scroll_offset);
            let step = (remaining / 3).max(1);
            self.scroll_offset = self.scroll_offset.saturating_add(step).min(self.max_scroll());
            if self.scroll_offset >= self.max_scroll() {
                self.smooth_scrolling = false;
            }
            self.scroll.on_user_scroll(self.metrics());
        }
    }

    pub fn metrics(&self) -> ViewportMetrics {
        ViewportMetrics::new(
            self.content_rows.max(self.viewport_rows) as f32,
            self.scroll_offset as f32,
            self.viewport_rows as f32,
        )
    }

    /// Abort any in-flight request before exit.
    pub fn shutdown(&mut self) {
        self.store.shutdown();
    }
}

pub fn base_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::White),
        Role::Model => Style::default(),
    }
}
