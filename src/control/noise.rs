//! Temporally correlated actuator noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::options::NoiseOptions;

/// Ornstein–Uhlenbeck style perturbation of `ctrl`, advanced once per
/// physics step.
#[derive(Debug, Clone)]
pub struct ActuatorNoise {
    std: f64,
    rate: f64,
    rng: StdRng,
}

impl ActuatorNoise {
    /// Noise source with a fixed seed so runs are reproducible.
    #[must_use]
    pub fn new(options: &NoiseOptions, seed: u64) -> Self {
        Self {
            std: options.std.max(0.0),
            rate: options.rate,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Whether the noise does anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.std > 0.0
    }

    /// Pull every control value toward zero by `r = exp(−dt / rate)` and add
    /// `std·sqrt(1 − r²)` times a standard normal sample.
    pub fn apply(&mut self, ctrl: &mut [f64], dt: f64) {
        if !self.is_enabled() {
            return;
        }
        let r = (-dt / self.rate.max(1e-10)).exp();
        let scale = self.std * (1.0 - r * r).max(0.0).sqrt();
        for value in ctrl {
            *value = r * *value + scale * self.standard_normal();
        }
    }

    // Box–Muller.
    fn standard_normal(&mut self) -> f64 {
        let u1 = 1.0 - self.rng.random::<f64>();
        let u2 = self.rng.random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_leaves_ctrl_alone() {
        let mut noise = ActuatorNoise::new(&NoiseOptions::default(), 1);
        let mut ctrl = [1.0, -2.0];
        noise.apply(&mut ctrl, 0.002);
        assert_eq!(ctrl, [1.0, -2.0]);
    }

    #[test]
    fn stationary_spread_matches_std() {
        let mut noise = ActuatorNoise::new(&NoiseOptions { std: 0.5, rate: 0.0 }, 7);
        // rate 0 decorrelates completely: every sample is N(0, std²).
        let mut sum_sq = 0.0;
        let n = 20_000;
        for _ in 0..n {
            let mut ctrl = [3.0];
            noise.apply(&mut ctrl, 0.002);
            sum_sq += ctrl[0] * ctrl[0];
        }
        let std = (sum_sq / f64::from(n)).sqrt();
        assert!((std - 0.5).abs() < 0.05, "std {std}");
    }

    #[test]
    fn long_correlation_time_changes_little() {
        let mut noise = ActuatorNoise::new(&NoiseOptions { std: 0.1, rate: 10.0 }, 3);
        let mut ctrl = [1.0];
        noise.apply(&mut ctrl, 0.002);
        assert!(ctrl[0].is_finite());
        assert!((ctrl[0] - 1.0).abs() < 0.05);
    }
}
