//! Converts raw platform events into engine commands.
//!
//! The `InputProcessor` owns all transient input state (mouse tracking,
//! drag detection, double-click timing, modifier keys) and the key-binding
//! map. It is the only thing that sits between raw window events and the
//! engine's [`execute`](crate::engine::SimEngine::execute) method.

use glam::Vec2;

use super::event::{InputEvent, MouseButton};
use super::keyboard::{key_string, KeyAction};
use super::mouse::{ClickResult, InputState};
use crate::engine::EngineCommand;
use crate::options::KeybindingOptions;

impl KeyAction {
    /// Convert to the corresponding parameterless [`EngineCommand`].
    fn to_command(self) -> EngineCommand {
        match self {
            Self::TogglePause => EngineCommand::TogglePause,
            Self::Reset => EngineCommand::Reset,
            Self::Reload => EngineCommand::Reload,
            Self::ToggleControlMode => EngineCommand::ToggleControlMode,
            Self::ResetCamera => EngineCommand::ResetCamera,
            Self::NextKeyframe => EngineCommand::NextKeyframe,
            Self::ToggleTracking => EngineCommand::ToggleTracking,
            Self::ClearSelection => EngineCommand::ClearSelection,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InputProcessor
// ─────────────────────────────────────────────────────────────────────────────

/// Converts raw window events into [`EngineCommand`]s.
///
/// A primary-button press over a body starts a pointer drag; over the
/// background it orbits the camera (pans with shift). The secondary and
/// middle buttons always pan. Double-clicking a body toggles its selection,
/// double-clicking the background clears it.
///
/// # Usage
///
/// ```ignore
/// for cmd in input_processor.handle_event(event, engine.hovered_body()) {
///     engine.execute(cmd);
/// }
///
/// for cmd in input_processor.handle_key_press("KeyQ") {
///     engine.execute(cmd);
/// }
/// ```
pub struct InputProcessor {
    /// Mouse tracking and double-click state machine.
    state: InputState,
    /// Whether the primary mouse button is currently held.
    mouse_pressed: bool,
    /// Whether a secondary or middle button is held.
    pan_pressed: bool,
    /// Whether the current primary press started a body drag.
    dragging_body: bool,
    /// Whether the shift modifier is currently held.
    shift_pressed: bool,
    /// Whether the control modifier is currently held.
    ctrl_pressed: bool,
    /// Key string → action mapping and actuator nudges.
    key_bindings: KeybindingOptions,
}

impl InputProcessor {
    /// Create a new processor with default key bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_key_bindings(KeybindingOptions::default())
    }

    /// Create a processor with custom key bindings.
    #[must_use]
    pub fn with_key_bindings(key_bindings: KeybindingOptions) -> Self {
        Self {
            state: InputState::new(),
            mouse_pressed: false,
            pan_pressed: false,
            dragging_body: false,
            shift_pressed: false,
            ctrl_pressed: false,
            key_bindings,
        }
    }

    /// Current cursor position in physical pixels.
    #[must_use]
    pub fn mouse_pos(&self) -> Vec2 {
        self.state.mouse_pos
    }

    /// Whether the primary mouse button is pressed.
    #[must_use]
    pub fn mouse_pressed(&self) -> bool {
        self.mouse_pressed
    }

    /// Whether the shift modifier is held.
    #[must_use]
    pub fn shift_pressed(&self) -> bool {
        self.shift_pressed
    }

    /// Read-only access to the key bindings.
    #[must_use]
    pub fn key_bindings(&self) -> &KeybindingOptions {
        &self.key_bindings
    }

    /// Replace the key bindings.
    pub fn set_key_bindings(&mut self, key_bindings: KeybindingOptions) {
        self.key_bindings = key_bindings;
    }

    /// Commands for a key press. `code` is the physical key in
    /// `winit::keyboard::KeyCode` debug format; the held modifiers are
    /// applied here.
    #[must_use]
    pub fn handle_key_press(&self, code: &str) -> Vec<EngineCommand> {
        let key = key_string(code, self.ctrl_pressed);
        let mut commands: Vec<EngineCommand> = self
            .key_bindings
            .lookup(&key)
            .map(KeyAction::to_command)
            .into_iter()
            .collect();
        commands.extend(
            self.key_bindings
                .nudges_for(&key)
                .map(|n| EngineCommand::NudgeActuator {
                    prefix: n.prefix.clone(),
                    delta: n.delta,
                }),
        );
        commands
    }

    /// Process a raw input event.
    ///
    /// `hovered` is the draggable body currently under the cursor.
    pub fn handle_event(&mut self, event: InputEvent, hovered: Option<usize>) -> Vec<EngineCommand> {
        match event {
            InputEvent::CursorMoved { x, y } => {
                self.handle_cursor_moved(Vec2::new(x, y)).into_iter().collect()
            }
            InputEvent::MouseButton { button, pressed } => {
                self.handle_mouse_button(button, pressed, hovered)
            }
            InputEvent::Scroll { delta } => vec![EngineCommand::Zoom { delta }],
            InputEvent::ModifiersChanged { shift, ctrl } => {
                self.shift_pressed = shift;
                self.ctrl_pressed = ctrl;
                Vec::new()
            }
            InputEvent::CursorLeft => self.handle_cursor_left(),
        }
    }

    /// Cursor moved: drag the grabbed body, move the camera, or hover.
    fn handle_cursor_moved(&mut self, position: Vec2) -> Option<EngineCommand> {
        let delta = self
            .state
            .handle_mouse_position(position, self.mouse_pressed || self.pan_pressed);

        if self.mouse_pressed && !self.dragging_body {
            if self.shift_pressed {
                return Some(EngineCommand::PanCamera { delta });
            }
            return Some(EngineCommand::RotateCamera { delta });
        }
        if self.pan_pressed && !self.dragging_body {
            return Some(EngineCommand::PanCamera { delta });
        }
        Some(EngineCommand::PointerMove { position })
    }

    fn handle_mouse_button(
        &mut self,
        button: MouseButton,
        pressed: bool,
        hovered: Option<usize>,
    ) -> Vec<EngineCommand> {
        if button != MouseButton::Left {
            self.pan_pressed = pressed;
            return Vec::new();
        }

        if pressed {
            self.state.handle_mouse_down(hovered);
            self.mouse_pressed = true;
            self.dragging_body = hovered.is_some();
            return if self.dragging_body {
                vec![EngineCommand::PointerDown {
                    position: self.state.mouse_pos,
                }]
            } else {
                Vec::new()
            };
        }

        // Release
        self.mouse_pressed = false;
        let mut commands = Vec::new();
        if std::mem::take(&mut self.dragging_body) {
            commands.push(EngineCommand::PointerUp);
        }
        match self.state.process_mouse_up(hovered) {
            ClickResult::DoubleClick { body: Some(body) } => {
                commands.push(EngineCommand::ToggleSelection { body });
            }
            ClickResult::DoubleClick { body: None } => {
                commands.push(EngineCommand::ClearSelection);
            }
            ClickResult::NoAction | ClickResult::SingleClick => {}
        }
        commands
    }

    fn handle_cursor_left(&mut self) -> Vec<EngineCommand> {
        self.mouse_pressed = false;
        self.pan_pressed = false;
        self.state.mouse_down_body = None;
        if std::mem::take(&mut self.dragging_body) {
            vec![EngineCommand::PointerCancel]
        } else {
            Vec::new()
        }
    }
}

impl Default for InputProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(p: &mut InputProcessor, hovered: Option<usize>) -> Vec<EngineCommand> {
        p.handle_event(
            InputEvent::MouseButton {
                button: MouseButton::Left,
                pressed: true,
            },
            hovered,
        )
    }

    fn release(p: &mut InputProcessor, hovered: Option<usize>) -> Vec<EngineCommand> {
        p.handle_event(
            InputEvent::MouseButton {
                button: MouseButton::Left,
                pressed: false,
            },
            hovered,
        )
    }

    fn move_to(p: &mut InputProcessor, x: f32, y: f32) -> Vec<EngineCommand> {
        p.handle_event(InputEvent::CursorMoved { x, y }, None)
    }

    #[test]
    fn press_on_body_drags_it() {
        let mut p = InputProcessor::new();
        let _ = move_to(&mut p, 10.0, 20.0);
        assert_eq!(
            press(&mut p, Some(3)),
            vec![EngineCommand::PointerDown {
                position: Vec2::new(10.0, 20.0)
            }]
        );
        assert_eq!(
            move_to(&mut p, 30.0, 20.0),
            vec![EngineCommand::PointerMove {
                position: Vec2::new(30.0, 20.0)
            }]
        );
        assert_eq!(release(&mut p, Some(3)), vec![EngineCommand::PointerUp]);
    }

    #[test]
    fn press_on_background_orbits() {
        let mut p = InputProcessor::new();
        let _ = move_to(&mut p, 10.0, 10.0);
        assert!(press(&mut p, None).is_empty());
        assert_eq!(
            move_to(&mut p, 15.0, 12.0),
            vec![EngineCommand::RotateCamera {
                delta: Vec2::new(5.0, 2.0)
            }]
        );
        let _ = p.handle_event(
            InputEvent::ModifiersChanged {
                shift: true,
                ctrl: false,
            },
            None,
        );
        assert_eq!(
            move_to(&mut p, 16.0, 12.0),
            vec![EngineCommand::PanCamera {
                delta: Vec2::new(1.0, 0.0)
            }]
        );
        assert!(release(&mut p, None).is_empty());
    }

    #[test]
    fn double_click_toggles_selection() {
        let mut p = InputProcessor::new();
        let _ = press(&mut p, Some(2));
        let _ = release(&mut p, Some(2));
        let _ = press(&mut p, Some(2));
        assert_eq!(
            release(&mut p, Some(2)),
            vec![
                EngineCommand::PointerUp,
                EngineCommand::ToggleSelection { body: 2 }
            ]
        );

        let _ = press(&mut p, None);
        let _ = release(&mut p, None);
        let _ = press(&mut p, None);
        assert_eq!(release(&mut p, None), vec![EngineCommand::ClearSelection]);
    }

    #[test]
    fn cursor_leaving_cancels_drag() {
        let mut p = InputProcessor::new();
        let _ = press(&mut p, Some(1));
        assert_eq!(
            p.handle_event(InputEvent::CursorLeft, None),
            vec![EngineCommand::PointerCancel]
        );
        assert!(!p.mouse_pressed());
    }

    #[test]
    fn keys_respect_ctrl() {
        let mut p = InputProcessor::new();
        assert_eq!(p.handle_key_press("Space"), vec![EngineCommand::TogglePause]);
        assert_eq!(
            p.handle_key_press("KeyA"),
            vec![EngineCommand::NudgeActuator {
                prefix: "hip_y_".to_owned(),
                delta: -0.1
            }]
        );
        let _ = p.handle_event(
            InputEvent::ModifiersChanged {
                shift: false,
                ctrl: true,
            },
            None,
        );
        assert_eq!(p.handle_key_press("KeyA"), vec![EngineCommand::ResetCamera]);
        assert_eq!(p.handle_key_press("KeyL"), vec![EngineCommand::Reload]);
        assert!(p.handle_key_press("KeyZ").is_empty());
    }

    #[test]
    fn scroll_zooms() {
        let mut p = InputProcessor::new();
        assert_eq!(
            p.handle_event(InputEvent::Scroll { delta: 2.0 }, None),
            vec![EngineCommand::Zoom { delta: 2.0 }]
        );
    }
}
