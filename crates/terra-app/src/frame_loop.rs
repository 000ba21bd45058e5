//! Fixed-timestep frame loop.
//!
//! Simulation (clock, earth rotation) advances in fixed steps drained from
//! an accumulator; scheduling and drawing happen once per frame afterwards.
//! Frame times are supplied by the caller, which keeps headless runs
//! reproducible.

use tracing::warn;

/// Fixed simulation step in seconds (60 Hz).
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Longest frame accepted before clamping, in seconds.
pub const MAX_FRAME_TIME: f64 = 0.25;

#[derive(Debug, Default)]
pub struct FrameLoop {
    accumulator: f64,
    total_sim_time: f64,
    frame_count: u64,
    update_count: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for `frame_time` seconds and run `update_fn(FIXED_DT,
    /// total_sim_time)` for each whole step it covers. Returns the
    /// interpolation alpha left in the accumulator, in `[0, 1)`.
    pub fn advance(&mut self, frame_time: f64, mut update_fn: impl FnMut(f64, f64)) -> f64 {
        let mut frame_time = if frame_time.is_finite() {
            frame_time.max(0.0)
        } else {
            0.0
        };
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }

        self.accumulator += frame_time;
        while self.accumulator >= FIXED_DT {
            update_fn(FIXED_DT, self.total_sim_time);
            self.total_sim_time += FIXED_DT;
            self.accumulator -= FIXED_DT;
            self.update_count += 1;
        }
        self.frame_count += 1;
        self.alpha()
    }

    pub fn alpha(&self) -> f64 {
        if self.accumulator > 0.0 {
            self.accumulator / FIXED_DT
        } else {
            0.0
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Simulated seconds covered by completed steps.
    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_step() {
        let mut frame_loop = FrameLoop::new();
        let mut updates = 0u32;
        frame_loop.advance(FIXED_DT, |_, _| updates += 1);
        assert_eq!(updates, 1);
        assert!(frame_loop.accumulator.abs() < 1e-12);
    }

    #[test]
    fn test_multiple_steps_report_sim_time() {
        let mut frame_loop = FrameLoop::new();
        let mut times = Vec::new();
        frame_loop.advance(3.0 * FIXED_DT + 1e-9, |dt, t| times.push((dt, t)));
        assert_eq!(times.len(), 3);
        assert!((times[2].1 - 2.0 * FIXED_DT).abs() < 1e-12);
        assert!((frame_loop.total_sim_time() - 3.0 * FIXED_DT).abs() < 1e-12);
    }

    #[test]
    fn test_partial_step_gives_alpha() {
        let mut frame_loop = FrameLoop::new();
        let mut updates = 0u32;
        let alpha = frame_loop.advance(0.25 * FIXED_DT, |_, _| updates += 1);
        assert_eq!(updates, 0);
        assert!((alpha - 0.25).abs() < 1e-10, "alpha {alpha}");
        assert_eq!(frame_loop.frame_count(), 1);
    }

    #[test]
    fn test_long_frame_clamped() {
        let mut frame_loop = FrameLoop::new();
        let mut updates = 0u32;
        frame_loop.advance(5.0, |_, _| updates += 1);
        let max_updates = (MAX_FRAME_TIME / FIXED_DT).ceil() as u32;
        assert!(updates > 0);
        assert!(updates <= max_updates, "{updates} updates");
    }

    #[test]
    fn test_invalid_frame_time_ignored() {
        let mut frame_loop = FrameLoop::new();
        let mut updates = 0u32;
        frame_loop.advance(f64::NAN, |_, _| updates += 1);
        frame_loop.advance(-1.0, |_, _| updates += 1);
        assert_eq!(updates, 0);
        assert_eq!(frame_loop.alpha(), 0.0);
        assert_eq!(frame_loop.frame_count(), 2);
    }

    /// Uneven frame times add up to the same number of steps as their sum.
    #[test]
    fn test_steps_track_total_time() {
        let frame_times = [0.017, 0.015, 0.020, 0.016, 0.033, 0.008, 0.018];
        let mut frame_loop = FrameLoop::new();
        for &ft in &frame_times {
            frame_loop.advance(ft, |_, _| {});
        }
        let total: f64 = frame_times.iter().sum();
        assert_eq!(frame_loop.update_count(), (total / FIXED_DT).floor() as u64);
        let expected = frame_loop.update_count() as f64 * FIXED_DT;
        assert!((frame_loop.total_sim_time() - expected).abs() < 1e-10);
    }
}
