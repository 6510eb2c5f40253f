//! Follow-the-tail scrolling for the transcript viewport.
//!
//! The controller never touches a viewport itself. It tracks whether the
//! viewport sits at the bottom and tells the caller how to scroll.

/// Distance from the end that still counts as "at bottom", in pixels.
/// Absorbs sub-pixel layout rounding.
pub const AT_BOTTOM_TOLERANCE: f32 = 8.0;

/// Geometry of the scrollable transcript, in any consistent unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportMetrics {
    /// Total height of the content.
    pub scroll_height: f32,
    /// Distance from the top of the content to the top of the viewport.
    pub scroll_top: f32,
    /// Height of the visible area.
    pub client_height: f32,
}

impl ViewportMetrics {
    pub fn new(scroll_height: f32, scroll_top: f32, client_height: f32) -> Self {
        Self {
            scroll_height,
            scroll_top,
            client_height,
        }
    }

    fn distance_from_bottom(&self) -> f32 {
        (self.scroll_height - self.scroll_top - self.client_height).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump straight to the end.
    Instant,
    /// Animate towards the end.
    Smooth,
}

#[derive(Debug, Clone)]
pub struct ScrollController {
    at_bottom: bool,
    new_content_below: bool,
    last_turn_count: usize,
    tolerance: f32,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::with_tolerance(AT_BOTTOM_TOLERANCE)
    }

    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            at_bottom: true,
            new_content_below: false,
            last_turn_count: 0,
            tolerance,
        }
    }

    pub fn at_bottom(&self) -> bool {
        self.at_bottom
    }

    /// True while the viewport is away from the end.
    pub fn show_affordance(&self) -> bool {
        !self.at_bottom
    }

    /// True when turns were appended while the user was reading further up.
    pub fn new_content_below(&self) -> bool {
        self.new_content_below
    }

    /// React to the transcript growing to `turn_count` turns.
    ///
    /// Uses the `at_bottom` state from before the change: a viewport that was
    /// following the tail jumps to the new end, anything else stays put.
    pub fn on_content_change(&mut self, turn_count: usize) -> Option<ScrollBehavior> {
        if turn_count == self.last_turn_count {
            return None;
        }
        self.last_turn_count = turn_count;

        if self.at_bottom {
            Some(ScrollBehavior::Instant)
        } else {
            self.new_content_below = true;
            None
        }
    }

    /// Recompute `at_bottom` after a scroll, resize or layout change.
    pub fn on_user_scroll(&mut self, metrics: ViewportMetrics) {
        self.at_bottom = metrics.distance_from_bottom() < self.tolerance;
        if self.at_bottom {
            self.new_content_below = false;
        }
    }

    /// The "scroll down" affordance was activated.
    ///
    /// `at_bottom` is left alone; the next metrics update sets it once the
    /// animation reaches the end.
    pub fn scroll_to_bottom_manual(&mut self) -> ScrollBehavior {
        ScrollBehavior::Smooth
    }
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new()
    }
}
