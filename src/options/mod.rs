//! Centralized runtime options with TOML preset support.
//!
//! Every tweakable setting (stepping, drag, control, scene, camera,
//! keybindings, debug) is consolidated here. Options serialize to/from TOML
//! so presets can be stored next to model files.

mod camera;
mod control;
mod debug;
mod drag;
mod keybindings;
mod scene;
mod stepping;

use std::path::Path;

pub use camera::CameraOptions;
pub use control::{
    ControlMode, ControlOptions, JointGains, NoiseOptions, ObservationScales, VelocityCommand,
};
pub use debug::DebugOptions;
pub use drag::{DragOptions, DragProjection};
pub use keybindings::{ActuatorNudge, KeybindingOptions};
pub use scene::SceneOptions;
pub use stepping::SteppingOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SimviewError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[drag]`) work correctly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Options {
    /// Fixed-timestep stepping.
    pub stepping: SteppingOptions,
    /// Pointer drag.
    pub drag: DragOptions,
    /// Control loop.
    pub control: ControlOptions,
    /// Scene construction.
    pub scene: SceneOptions,
    /// Camera projection and control parameters.
    pub camera: CameraOptions,
    /// Keyboard binding options.
    #[schemars(skip)]
    pub keybindings: KeybindingOptions,
    /// Diagnostics.
    pub debug: DebugOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SimviewError::Io`] if the file cannot be read and
    /// [`SimviewError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, SimviewError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SimviewError::OptionsParse`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, SimviewError> {
        toml::from_str(content).map_err(|e| SimviewError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`SimviewError::OptionsParse`] if serialization fails and
    /// [`SimviewError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SimviewError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SimviewError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyAction;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = Options::from_toml(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[drag]
strength = 50.0
projection = "view_plane"

[control]
mode = "direct"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.drag.strength, 50.0);
        assert_eq!(opts.drag.projection, DragProjection::ViewPlane);
        assert_eq!(opts.control.mode, ControlMode::Direct);
        // Everything else should be default
        assert_eq!(opts.drag.paused_nudge_gain, 0.3);
        assert_eq!(opts.control.decimation, 10);
        assert_eq!(opts.stepping.stall_threshold_ms, 35.0);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Options::from_toml("[drag]\nstrength = \"strong\"").unwrap_err();
        assert!(matches!(err, SimviewError::OptionsParse(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("simview-options-{}", std::process::id()));
        let path = dir.join("preset.toml");
        let mut opts = Options::default();
        opts.camera.fovy = 60.0;
        opts.save(&path).unwrap();
        assert_eq!(Options::load(&path).unwrap(), opts);
        assert_eq!(Options::list_presets(&dir), vec!["preset".to_owned()]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn keybinding_lookup() {
        let opts = Options::default();
        assert_eq!(opts.keybindings.lookup("Space"), Some(KeyAction::TogglePause));
        assert_eq!(opts.keybindings.lookup("Ctrl+KeyL"), Some(KeyAction::Reload));
        assert_eq!(opts.keybindings.lookup("KeyL"), None);
        assert_eq!(opts.keybindings.nudges_for("KeyY").count(), 2);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value = serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("stepping"));
        assert!(props.contains_key("drag"));
        assert!(props.contains_key("control"));
        assert!(props.contains_key("camera"));
        assert!(!props.contains_key("keybindings"));

        let camera = &props["camera"]["properties"];
        assert!(camera.get("fovy").is_some());
        assert!(camera.get("znear").is_none());
    }
}
