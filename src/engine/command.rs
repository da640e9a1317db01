//! The engine's complete interactive vocabulary.
//!
//! Every user-facing operation, whether triggered by a key press, a mouse
//! gesture, or a programmatic call, is an [`EngineCommand`]. Consumers
//! construct commands and pass them to
//! [`SimEngine::execute`](super::SimEngine::execute).

use glam::Vec2;

use crate::options::{ControlMode, VelocityCommand};

/// A discrete or parameterized operation the engine can perform.
///
/// ```ignore
/// engine.execute(EngineCommand::TogglePause);
/// engine.execute(EngineCommand::Zoom { delta: 1.0 });
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    // ── Camera ──────────────────────────────────────────────────────
    /// Rotate the camera by `delta` pixels of mouse movement.
    RotateCamera {
        /// Horizontal and vertical drag delta.
        delta: Vec2,
    },

    /// Pan the camera by `delta` pixels of mouse movement.
    PanCamera {
        /// Horizontal and vertical drag delta.
        delta: Vec2,
    },

    /// Zoom the camera (positive = zoom in, negative = zoom out).
    Zoom {
        /// Scroll amount.
        delta: f32,
    },

    /// Return the camera to its home pose.
    ResetCamera,

    /// Fit the camera around every body.
    FitCamera,

    /// Follow the first selected body, or stop following.
    ToggleTracking,

    // ── Pointer ─────────────────────────────────────────────────────
    /// Primary button pressed at a pixel position.
    PointerDown {
        /// Pixel position.
        position: Vec2,
    },

    /// Cursor moved to a pixel position.
    PointerMove {
        /// Pixel position.
        position: Vec2,
    },

    /// Primary button released.
    PointerUp,

    /// Cursor left the surface or the gesture was interrupted.
    PointerCancel,

    // ── Selection ───────────────────────────────────────────────────
    /// Toggle the highlight of one body, clearing any other selection.
    ToggleSelection {
        /// Body to toggle.
        body: usize,
    },

    /// Clear the body selection.
    ClearSelection,

    // ── Simulation ──────────────────────────────────────────────────
    /// Pause or resume stepping.
    TogglePause,

    /// Restore the default configuration and clear accumulated time.
    Reset,

    /// Load a keyframe.
    ResetToKeyframe {
        /// Keyframe index.
        index: usize,
    },

    /// Load the keyframe after the last one loaded, wrapping around.
    NextKeyframe,

    /// Tear down the scene and load it again.
    Reload,

    // ── Control ─────────────────────────────────────────────────────
    /// Switch between policy and direct control.
    ToggleControlMode,

    /// Select a control mode.
    SetControlMode {
        /// New mode.
        mode: ControlMode,
    },

    /// Change the manual setpoint of every actuator whose name starts with
    /// `prefix`.
    NudgeActuator {
        /// Actuator name prefix.
        prefix: String,
        /// Setpoint change.
        delta: f64,
    },

    /// Replace the commanded base velocity.
    SetVelocityCommand {
        /// New command.
        command: VelocityCommand,
    },
}
