use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::input::KeyAction;

/// A key that nudges every actuator whose name starts with `prefix`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActuatorNudge {
    /// Key string (e.g. `"KeyQ"`).
    pub key: String,
    /// Actuator name prefix.
    pub prefix: String,
    /// Setpoint change per press.
    pub delta: f64,
}

impl ActuatorNudge {
    fn new(key: &str, prefix: &str, delta: f64) -> Self {
        Self {
            key: key.to_owned(),
            prefix: prefix.to_owned(),
            delta,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Configurable keyboard bindings mapping actions to key strings.
///
/// Key strings use the `winit::keyboard::KeyCode` debug format, optionally
/// prefixed by `Ctrl+`: `"Space"`, `"Ctrl+KeyL"`.
pub struct KeybindingOptions {
    /// Maps action → key string.
    pub bindings: HashMap<KeyAction, String>,
    /// Actuator setpoint nudges.
    pub actuator_nudges: Vec<ActuatorNudge>,
}

const NUDGE_STEP: f64 = 0.1;

impl Default for KeybindingOptions {
    fn default() -> Self {
        let bindings = HashMap::from([
            (KeyAction::TogglePause, "Space".into()),
            (KeyAction::Reset, "Backspace".into()),
            (KeyAction::Reload, "Ctrl+KeyL".into()),
            (KeyAction::ToggleControlMode, "Ctrl+KeyM".into()),
            (KeyAction::ResetCamera, "Ctrl+KeyA".into()),
            (KeyAction::NextKeyframe, "Ctrl+KeyK".into()),
            (KeyAction::ToggleTracking, "Ctrl+KeyT".into()),
            (KeyAction::ClearSelection, "Escape".into()),
        ]);

        let actuator_nudges = [
            ("KeyQ", "hip_y", NUDGE_STEP),
            ("KeyA", "hip_y_", -NUDGE_STEP),
            ("KeyW", "hip_", NUDGE_STEP),
            ("KeyS", "hip_", -NUDGE_STEP),
            ("KeyE", "knee_", NUDGE_STEP),
            ("KeyD", "knee_", -NUDGE_STEP),
            ("KeyR", "abdomen_y", NUDGE_STEP),
            ("KeyF", "abdomen_y", -NUDGE_STEP),
            ("KeyT", "ankle_", NUDGE_STEP),
            ("KeyG", "ankle_", -NUDGE_STEP),
            ("KeyY", "shoulder1_", NUDGE_STEP),
            ("KeyY", "shoulder2_", NUDGE_STEP),
            ("KeyH", "shoulder1_", -NUDGE_STEP),
            ("KeyH", "shoulder2_", -NUDGE_STEP),
            ("KeyU", "elbow_", NUDGE_STEP),
            ("KeyJ", "elbow_", -NUDGE_STEP),
        ]
        .into_iter()
        .map(|(key, prefix, delta)| ActuatorNudge::new(key, prefix, delta))
        .collect();

        Self {
            bindings,
            actuator_nudges,
        }
    }
}

impl KeybindingOptions {
    /// Look up the action for a key string.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<KeyAction> {
        self.bindings
            .iter()
            .find(|(_, bound)| bound.as_str() == key)
            .map(|(action, _)| *action)
    }

    /// Actuator nudges bound to a key string.
    pub fn nudges_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ActuatorNudge> + 'a {
        self.actuator_nudges.iter().filter(move |n| n.key == key)
    }
}
