use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the cursor is mapped back into the world while dragging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DragProjection {
    /// Keep the grab distance along each new cursor ray.
    #[default]
    Depth,
    /// Intersect the cursor ray with the plane through the grab point
    /// facing the original ray.
    ViewPlane,
}

/// Pointer drag parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Drag", inline)]
#[serde(default)]
pub struct DragOptions {
    /// Force per unit of displacement per unit of body mass.
    #[schemars(title = "Strength", range(min = 0.0, max = 2000.0), extend("step" = 10.0))]
    pub strength: f64,
    /// Ceiling on the force magnitude in newtons; 0 disables the ceiling.
    #[schemars(title = "Max Force", range(min = 0.0, max = 100_000.0))]
    pub max_force: f64,
    /// Cursor projection mode.
    #[schemars(title = "Projection")]
    pub projection: DragProjection,
    /// Fraction of the cursor offset applied per frame when nudging a body
    /// while paused.
    #[schemars(title = "Paused Nudge Gain", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub paused_nudge_gain: f64,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            strength: 250.0,
            max_force: 0.0,
            projection: DragProjection::Depth,
            paused_nudge_gain: 0.3,
        }
    }
}
