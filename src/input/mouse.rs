use std::time::{Duration, Instant};

use glam::Vec2;

const DOUBLE_CLICK_THRESHOLD: Duration = Duration::from_millis(400);

/// Cursor travel (squared, in pixels) after which a press counts as a drag.
const DRAG_THRESHOLD_SQ: f32 = 1.0;

/// Result of processing a mouse-up event through the click state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClickResult {
    /// No selection action (drag, mismatched up/down, etc.)
    NoAction,
    /// First click on a target.
    SingleClick,
    /// Second click on the same target within the threshold. `None` is the
    /// background.
    DoubleClick {
        /// Body under the cursor, if any.
        body: Option<usize>,
    },
}

/// Tracks mouse position, drag state, and the double-click state machine.
pub(crate) struct InputState {
    pub(crate) mouse_pos: Vec2,
    pub(crate) mouse_down_body: Option<usize>,
    pub(crate) is_dragging: bool,
    press_pos: Vec2,
    last_click_time: Option<Instant>,
    last_click_body: Option<usize>,
}

impl InputState {
    /// Create a new input state with no active click.
    pub(crate) fn new() -> Self {
        Self {
            mouse_pos: Vec2::ZERO,
            mouse_down_body: None,
            is_dragging: false,
            press_pos: Vec2::ZERO,
            last_click_time: None,
            last_click_body: None,
        }
    }

    /// Record what body (if any) is under the cursor at mouse-down.
    pub(crate) fn handle_mouse_down(&mut self, hovered_body: Option<usize>) {
        self.mouse_down_body = hovered_body;
        self.is_dragging = false;
        self.press_pos = self.mouse_pos;
    }

    /// Update the cursor position. Returns the movement since the last
    /// update and marks a drag once the press has travelled far enough.
    pub(crate) fn handle_mouse_position(&mut self, pos: Vec2, pressed: bool) -> Vec2 {
        let delta = pos - self.mouse_pos;
        self.mouse_pos = pos;
        if pressed && (pos - self.press_pos).length_squared() > DRAG_THRESHOLD_SQ {
            self.is_dragging = true;
        }
        delta
    }

    /// Process a mouse-up event and return what kind of click happened.
    pub(crate) fn process_mouse_up(&mut self, hovered_body: Option<usize>) -> ClickResult {
        self.process_mouse_up_at(hovered_body, Instant::now())
    }

    pub(crate) fn process_mouse_up_at(
        &mut self,
        hovered_body: Option<usize>,
        now: Instant,
    ) -> ClickResult {
        let down = self.mouse_down_body.take();
        let was_dragging = std::mem::take(&mut self.is_dragging);

        if was_dragging || down != hovered_body {
            self.last_click_time = None;
            return ClickResult::NoAction;
        }

        let is_double = self.last_click_time.is_some_and(|t| {
            now.duration_since(t) < DOUBLE_CLICK_THRESHOLD && self.last_click_body == hovered_body
        });
        if is_double {
            self.last_click_time = None;
            ClickResult::DoubleClick { body: hovered_body }
        } else {
            self.last_click_time = Some(now);
            self.last_click_body = hovered_body;
            ClickResult::SingleClick
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(state: &mut InputState, body: Option<usize>, now: Instant) -> ClickResult {
        state.handle_mouse_down(body);
        state.process_mouse_up_at(body, now)
    }

    #[test]
    fn double_click_on_same_body() {
        let mut state = InputState::new();
        let t0 = Instant::now();
        assert_eq!(click(&mut state, Some(2), t0), ClickResult::SingleClick);
        assert_eq!(
            click(&mut state, Some(2), t0 + Duration::from_millis(150)),
            ClickResult::DoubleClick { body: Some(2) }
        );
        // A third click starts over.
        assert_eq!(
            click(&mut state, Some(2), t0 + Duration::from_millis(250)),
            ClickResult::SingleClick
        );
    }

    #[test]
    fn slow_or_different_clicks_are_single() {
        let mut state = InputState::new();
        let t0 = Instant::now();
        let _ = click(&mut state, Some(1), t0);
        assert_eq!(
            click(&mut state, Some(1), t0 + Duration::from_millis(600)),
            ClickResult::SingleClick
        );
        assert_eq!(
            click(&mut state, Some(3), t0 + Duration::from_millis(700)),
            ClickResult::SingleClick
        );
    }

    #[test]
    fn background_double_click() {
        let mut state = InputState::new();
        let t0 = Instant::now();
        let _ = click(&mut state, None, t0);
        assert_eq!(
            click(&mut state, None, t0 + Duration::from_millis(100)),
            ClickResult::DoubleClick { body: None }
        );
    }

    #[test]
    fn drag_suppresses_click() {
        let mut state = InputState::new();
        state.handle_mouse_down(Some(1));
        let delta = state.handle_mouse_position(Vec2::new(10.0, 0.0), true);
        assert_eq!(delta, Vec2::new(10.0, 0.0));
        assert_eq!(
            state.process_mouse_up_at(Some(1), Instant::now()),
            ClickResult::NoAction
        );
    }
}
