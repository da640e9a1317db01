use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Diagnostics toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[schemars(title = "Debug", inline)]
#[serde(default)]
pub struct DebugOptions {
    /// Log smoothed frame rate and steps per frame once per second.
    #[schemars(title = "Log Frame Timing")]
    pub log_frame_timing: bool,
    /// Frame rate cap for the viewer (0 = unlimited).
    #[schemars(title = "Target FPS", range(min = 0, max = 240))]
    pub target_fps: u32,
}
