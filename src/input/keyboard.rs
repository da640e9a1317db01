use serde::{Deserialize, Serialize};

/// Engine-level actions that can be bound to keys.
///
/// Serde serializes as `snake_case` strings so TOML presets stay readable:
/// ```toml
/// [keybindings.bindings]
/// toggle_pause = "Space"
/// reload = "Ctrl+KeyL"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    /// Pause or resume stepping.
    TogglePause,
    /// Restore the default configuration.
    Reset,
    /// Tear down and reload the scene.
    Reload,
    /// Switch between policy and direct control.
    ToggleControlMode,
    /// Return the camera to its home pose.
    ResetCamera,
    /// Load the next keyframe.
    NextKeyframe,
    /// Follow the selected body with the camera.
    ToggleTracking,
    /// Clear the body selection.
    ClearSelection,
}

/// Key string for a physical key code and modifier state, in the format
/// used by [`KeybindingOptions`](crate::options::KeybindingOptions):
/// `"KeyL"` or `"Ctrl+KeyL"`.
#[must_use]
pub fn key_string(code: &str, ctrl: bool) -> String {
    if ctrl {
        format!("Ctrl+{code}")
    } else {
        code.to_owned()
    }
}
