//! Frame pacing and per-window timing statistics.

use web_time::{Duration, Instant};

/// Window over which frame statistics are summarized.
const SUMMARY_WINDOW: Duration = Duration::from_secs(1);

/// Frame and physics-step statistics over the last summary window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    /// Smoothed frames per second.
    pub fps: f32,
    /// Mean physics steps per frame over the window.
    pub steps_per_frame: f32,
    /// Frames in the window that hit the stall threshold.
    pub stalls: u32,
}

/// Frame timing with FPS calculation and optional frame limiting
#[derive(Debug, Clone)]
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    /// Last frame timestamp
    last_frame: Instant,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
    window_start: Instant,
    window_frames: u32,
    window_steps: u32,
    window_stalls: u32,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let now = Instant::now();
        Self {
            target_fps,
            min_frame_duration: Self::frame_duration(target_fps),
            last_frame: now,
            smoothed_fps: 60.0,
            smoothing: 0.05,
            window_start: now,
            window_frames: 0,
            window_steps: 0,
            window_stalls: 0,
        }
    }

    fn frame_duration(target_fps: u32) -> Duration {
        if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        }
    }

    /// Change the frame rate cap.
    pub fn set_target_fps(&mut self, target_fps: u32) {
        self.target_fps = target_fps;
        self.min_frame_duration = Self::frame_duration(target_fps);
    }

    /// Whether enough time has passed since the last frame to render.
    #[must_use]
    pub fn should_render(&self) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Seconds since the previous frame, without ending it.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.last_frame.elapsed().as_secs_f64()
    }

    /// Close the current frame. Returns a summary once per window.
    pub fn end_frame(&mut self, steps: u32, stalled: bool) -> Option<TimingSummary> {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if frame_time > 0.0 {
            // Exponential moving average for smooth display
            self.smoothed_fps =
                self.smoothed_fps * (1.0 - self.smoothing) + frame_time.recip() * self.smoothing;
        }

        self.window_frames += 1;
        self.window_steps += steps;
        self.window_stalls += u32::from(stalled);
        if now.duration_since(self.window_start) < SUMMARY_WINDOW {
            return None;
        }
        let summary = TimingSummary {
            fps: self.smoothed_fps,
            steps_per_frame: self.window_steps as f32 / self.window_frames as f32,
            stalls: self.window_stalls,
        };
        self.window_start = now;
        self.window_frames = 0;
        self.window_steps = 0;
        self.window_stalls = 0;
        Some(summary)
    }

    /// Get the current FPS (smoothed)
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_always_renders() {
        assert!(FrameTiming::new(0).should_render());
    }

    #[test]
    fn summary_waits_for_window() {
        let mut timing = FrameTiming::new(0);
        assert!(timing.end_frame(3, false).is_none());
        timing.window_start -= SUMMARY_WINDOW;
        let summary = timing.end_frame(1, true).unwrap();
        assert!((summary.steps_per_frame - 2.0).abs() < 1e-6);
        assert_eq!(summary.stalls, 1);
        assert!(timing.end_frame(0, false).is_none());
    }
}
