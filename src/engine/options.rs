//! Options methods for SimEngine

use std::path::Path;

use super::SimEngine;
use crate::options::Options;

impl SimEngine {
    /// Replace options and apply all changes to subsystems.
    pub fn set_options(&mut self, new: Options) {
        self.options = new;
        self.apply_options();
    }

    /// Push current option values to every subsystem. Control topology
    /// (gains, default pose, base body) is re-resolved against the loaded
    /// model.
    pub fn apply_options(&mut self) {
        self.stepping.apply_options(&self.options.stepping);
        self.drag.apply_options(&self.options.drag);
        self.camera.apply_options(&self.options.camera);
        self.input.set_key_bindings(self.options.keybindings.clone());
        self.frame_timing.set_target_fps(self.options.debug.target_fps);

        self.control.apply_options(&self.options.control);
        if let Some(ctx) = self.context.as_ref() {
            self.control.attach(ctx.sim.model());
        }
    }

    /// Set a single option field from a JSON value, addressed as
    /// `section.field` (e.g. `"stepping"`, `"max_steps_per_frame"`).
    /// Returns false if the field does not exist or the value does not fit.
    pub fn set_option(&mut self, section: &str, field: &str, value: serde_json::Value) -> bool {
        let Ok(mut root) = serde_json::to_value(&self.options) else {
            return false;
        };
        let Some(slot) = root.get_mut(section).and_then(|s| s.get_mut(field)) else {
            log::warn!("unknown option {section}.{field}");
            return false;
        };
        *slot = value;
        match serde_json::from_value::<Options>(root) {
            Ok(options) => {
                self.set_options(options);
                true
            }
            Err(e) => {
                log::warn!("invalid value for {section}.{field}: {e}");
                false
            }
        }
    }

    /// Load a named options preset from `presets_dir`. Returns true on
    /// success.
    pub fn load_preset(&mut self, name: &str, presets_dir: &Path) -> bool {
        let path = presets_dir.join(format!("{name}.toml"));
        match Options::load(&path) {
            Ok(opts) => {
                log::info!("Loaded preset '{name}'");
                self.set_options(opts);
                true
            }
            Err(e) => {
                log::error!("Failed to load preset '{name}': {e}");
                false
            }
        }
    }

    /// Save the current options as a named preset. Returns true on success.
    pub fn save_preset(&self, name: &str, presets_dir: &Path) -> bool {
        let path = presets_dir.join(format!("{name}.toml"));
        match self.options.save(&path) {
            Ok(()) => {
                log::info!("Saved preset '{name}'");
                true
            }
            Err(e) => {
                log::error!("Failed to save preset '{name}': {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{fixtures, FnLoader, RapierSimulation, SimulationHandle};

    #[test]
    fn options_reach_subsystems() {
        let loader = FnLoader::new("walker", || {
            let sim: SimulationHandle = Box::new(RapierSimulation::new(fixtures::walker())?);
            Ok(sim)
        });
        let mut engine = SimEngine::new(Box::new(loader), Options::default());
        engine.load().unwrap();

        let mut options = Options::default();
        options.stepping.max_steps_per_frame = 2;
        let _ = options
            .control
            .default_pose
            .insert("left_knee_pitch".to_owned(), 0.0);
        engine.set_options(options);

        let report = engine.frame(0.02);
        assert!(report.capped);
        assert_eq!(report.steps, 2);
        assert_eq!(engine.control().joints()[0].default_angle, 0.0);
    }

    #[test]
    fn set_option_by_path() {
        let loader = FnLoader::new("none", || Err(crate::error::SimviewError::Load("x".into())));
        let mut engine = SimEngine::new(Box::new(loader), Options::default());
        assert!(engine.set_option("stepping", "max_steps_per_frame", serde_json::json!(3)));
        assert_eq!(engine.options().stepping.max_steps_per_frame, 3);
        assert!(!engine.set_option("stepping", "no_such_field", serde_json::json!(1)));
        assert!(!engine.set_option("stepping", "max_steps_per_frame", serde_json::json!("many")));
        assert_eq!(engine.options().stepping.max_steps_per_frame, 3);
    }

    #[test]
    fn missing_preset_fails_softly() {
        let loader = FnLoader::new("none", || Err(crate::error::SimviewError::Load("x".into())));
        let mut engine = SimEngine::new(Box::new(loader), Options::default());
        assert!(!engine.load_preset("nope", Path::new("/nonexistent")));
    }
}
