use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Source of the actuator commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// PD tracking of policy targets around the default pose.
    #[default]
    Policy,
    /// PD tracking of manual joint setpoints.
    PdSetpoint,
    /// Manual setpoints written straight to the actuators.
    Direct,
    /// Actuators are left at zero.
    Off,
}

/// Per-channel observation normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ObservationScales {
    /// Commanded linear velocity.
    pub lin_vel: f64,
    /// Commanded yaw rate and base angular velocity.
    pub ang_vel: f64,
    /// Joint position offset from the default pose.
    pub dof_pos: f64,
    /// Joint velocity.
    pub dof_vel: f64,
}

impl Default for ObservationScales {
    fn default() -> Self {
        Self {
            lin_vel: 2.0,
            ang_vel: 1.0,
            dof_pos: 1.0,
            dof_vel: 0.05,
        }
    }
}

/// Commanded base velocity fed to the policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct VelocityCommand {
    /// Forward velocity.
    pub vx: f64,
    /// Lateral velocity.
    pub vy: f64,
    /// Yaw rate.
    pub dyaw: f64,
}

/// PD gains for every controlled joint whose name contains `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct JointGains {
    /// Substring matched against the joint name.
    pub pattern: String,
    /// Proportional gain.
    pub kp: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Symmetric torque limit; `None` uses `kp`.
    #[serde(default)]
    pub torque_limit: Option<f64>,
}

impl JointGains {
    fn new(pattern: &str, stiffness: f64, kd: f64) -> Self {
        Self {
            pattern: pattern.to_owned(),
            kp: stiffness * STIFFNESS_FACTOR,
            kd,
            torque_limit: None,
        }
    }

    /// Effective torque limit.
    #[must_use]
    pub fn limit(&self) -> f64 {
        self.torque_limit.unwrap_or(self.kp).abs()
    }
}

/// Scale applied to nominal joint stiffness to obtain `kp`.
const STIFFNESS_FACTOR: f64 = 0.85;

/// Temporally correlated actuator noise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct NoiseOptions {
    /// Stationary standard deviation; 0 disables the noise.
    pub std: f64,
    /// Correlation time in seconds.
    pub rate: f64,
}

/// Control loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Control", inline)]
#[serde(default)]
pub struct ControlOptions {
    /// Initial control mode.
    #[schemars(title = "Mode")]
    pub mode: ControlMode,
    /// Physics steps per control tick.
    #[schemars(title = "Decimation", range(min = 1, max = 100))]
    pub decimation: u32,
    /// Policy output to joint offset scale.
    #[schemars(title = "Action Scale", range(min = 0.0, max = 2.0), extend("step" = 0.01))]
    pub action_scale: f64,
    /// Number of observation frames fed to the policy.
    #[schemars(skip)]
    pub frame_stack: usize,
    /// Symmetric clip applied to every observation value.
    #[schemars(skip)]
    pub clip_observations: f64,
    /// Symmetric clip applied to every policy output.
    #[schemars(skip)]
    pub clip_actions: f64,
    /// Observation normalization.
    #[schemars(skip)]
    pub obs_scales: ObservationScales,
    /// Commanded base velocity.
    #[schemars(skip)]
    pub command: VelocityCommand,
    /// Period of the gait phase signal in seconds.
    #[schemars(skip)]
    pub phase_period: f64,
    /// Default joint angle by joint name; absent joints default to 0.
    #[schemars(skip)]
    pub default_pose: BTreeMap<String, f64>,
    /// Gains matched by joint name; first match wins.
    #[schemars(skip)]
    pub gains: Vec<JointGains>,
    /// Gains for joints no pattern matches.
    #[schemars(skip)]
    pub fallback_gains: JointGains,
    /// Body providing base orientation and angular velocity; `None` picks
    /// the first free-floating body.
    #[schemars(skip)]
    pub base_body: Option<String>,
    /// Actuator noise.
    #[schemars(skip)]
    pub noise: NoiseOptions,
}

impl Default for ControlOptions {
    fn default() -> Self {
        let default_pose = [
            ("left_hip_pitch", -0.157),
            ("left_hip_yaw", 0.0394),
            ("left_hip_roll", 0.0628),
            ("left_knee_pitch", 0.441),
            ("left_ankle_pitch", -0.258),
            ("right_hip_pitch", -0.22),
            ("right_hip_yaw", 0.026),
            ("right_hip_roll", 0.0314),
            ("right_knee_pitch", 0.441),
            ("right_ankle_pitch", -0.223),
        ]
        .into_iter()
        .map(|(name, q)| (name.to_owned(), q))
        .collect();

        Self {
            mode: ControlMode::Policy,
            decimation: 10,
            action_scale: 0.25,
            frame_stack: 15,
            clip_observations: 18.0,
            clip_actions: 18.0,
            obs_scales: ObservationScales::default(),
            command: VelocityCommand::default(),
            phase_period: 0.64,
            default_pose,
            gains: vec![
                JointGains::new("hip_y", 120.0, 10.0),
                JointGains::new("hip_x", 60.0, 10.0),
                JointGains::new("hip_z", 60.0, 10.0),
                JointGains::new("knee", 120.0, 10.0),
                JointGains::new("ankle_y", 17.0, 5.0),
            ],
            fallback_gains: JointGains::new("", 20.0, 1.0),
            base_body: None,
            noise: NoiseOptions::default(),
        }
    }
}

impl ControlOptions {
    /// Gains for the joint called `name`.
    #[must_use]
    pub fn gains_for(&self, name: &str) -> &JointGains {
        self.gains
            .iter()
            .find(|g| !g.pattern.is_empty() && name.contains(&g.pattern))
            .unwrap_or(&self.fallback_gains)
    }

    /// Default angle of the joint called `name`.
    #[must_use]
    pub fn default_angle(&self, name: &str) -> f64 {
        self.default_pose.get(name).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gains_match_by_substring() {
        let opts = ControlOptions::default();
        let knee = opts.gains_for("left_knee_pitch");
        assert!((knee.kp - 102.0).abs() < 1e-9);
        assert!((knee.limit() - 102.0).abs() < 1e-9);
        assert_eq!(opts.gains_for("r_ankle_y").kd, 5.0);
        assert_eq!(opts.gains_for("elbow").pattern, "");
    }

    #[test]
    fn default_pose_lookup() {
        let opts = ControlOptions::default();
        assert_eq!(opts.default_angle("left_knee_pitch"), 0.441);
        assert_eq!(opts.default_angle("unknown"), 0.0);
    }
}
