use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scene construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Scene", inline)]
#[serde(default)]
pub struct SceneOptions {
    /// Geoms in this group or above are not visualised.
    #[schemars(title = "Max Visible Group", range(min = 0, max = 6))]
    pub max_visible_group: i32,
    /// Extent used for planes declared infinite (size 0).
    #[schemars(skip)]
    pub infinite_plane_size: f32,
    /// Add a directional light when the model declares none.
    #[schemars(title = "Default Light")]
    pub default_light: bool,
    /// Lower bound on the tendon instance pool capacity.
    #[schemars(skip)]
    pub min_tendon_capacity: usize,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            max_visible_group: 3,
            infinite_plane_size: 100.0,
            default_light: true,
            min_tendon_capacity: 0,
        }
    }
}
