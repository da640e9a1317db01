//! Joint-space PD law.

/// `kp·(target − q) − kd·dq`, clamped to `±limit`.
#[must_use]
pub fn pd_torque(kp: f64, kd: f64, target: f64, q: f64, dq: f64, limit: f64) -> f64 {
    let limit = limit.abs();
    (kp * (target - q) - kd * dq).clamp(-limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_target() {
        assert!((pd_torque(100.0, 10.0, 0.5, 0.0, 0.0, 1000.0) - 50.0).abs() < 1e-12);
        assert!((pd_torque(100.0, 10.0, 0.0, 0.0, 2.0, 1000.0) + 20.0).abs() < 1e-12);
    }

    #[test]
    fn clamps_to_limit() {
        assert_eq!(pd_torque(100.0, 0.0, 10.0, 0.0, 0.0, 102.0), 102.0);
        assert_eq!(pd_torque(100.0, 0.0, -10.0, 0.0, 0.0, 102.0), -102.0);
        assert_eq!(pd_torque(100.0, 0.0, 0.0, 0.0, 0.0, 0.0), 0.0);
    }
}
