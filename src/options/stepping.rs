use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed-timestep stepping parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Stepping", inline)]
#[serde(default)]
pub struct SteppingOptions {
    /// Frames slower than this run no physics steps and drop the
    /// accumulated time instead of catching up.
    #[schemars(title = "Stall Threshold (ms)", range(min = 5.0, max = 250.0), extend("step" = 1.0))]
    pub stall_threshold_ms: f64,
    /// Upper bound on physics steps in a single frame.
    #[schemars(title = "Max Steps per Frame", range(min = 1, max = 1000))]
    pub max_steps_per_frame: u32,
    /// Enter the paused state right after a load.
    #[schemars(title = "Start Paused")]
    pub start_paused: bool,
}

impl Default for SteppingOptions {
    fn default() -> Self {
        Self {
            stall_threshold_ms: 35.0,
            max_steps_per_frame: 100,
            start_paused: false,
        }
    }
}
