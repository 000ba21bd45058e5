//! Simulated wall clock.
//!
//! Time is kept in Unix milliseconds and advances by the real elapsed time
//! scaled by a multiplier, so a day of sun movement can be watched in
//! seconds.

use std::time::{SystemTime, UNIX_EPOCH};

use terra_config::ClockConfig;

#[derive(Debug, Clone)]
pub struct Clock {
    now_ms: f64,
    multiplier: f64,
    running: bool,
    delta_ms: f64,
}

impl Clock {
    /// A stopped clock at `start_ms`.
    pub fn new(start_ms: f64, multiplier: f64) -> Self {
        let mut clock = Self {
            now_ms: start_ms,
            multiplier: 1.0,
            running: false,
            delta_ms: 0.0,
        };
        clock.set_multiplier(multiplier);
        clock
    }

    /// A stopped clock at the configured start time, or the current time.
    pub fn from_config(config: &ClockConfig) -> Self {
        let start = config
            .start_unix_ms
            .map(|ms| ms as f64)
            .unwrap_or_else(system_now_ms);
        Self::new(start, config.multiplier)
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.delta_ms = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Negative and non-finite multipliers are ignored.
    pub fn set_multiplier(&mut self, multiplier: f64) {
        if multiplier.is_finite() && multiplier >= 0.0 {
            self.multiplier = multiplier;
        }
    }

    /// Advance by `elapsed_ms` of real time. Returns the simulated delta,
    /// zero while stopped.
    pub fn tick(&mut self, elapsed_ms: f64) -> f64 {
        self.delta_ms = if self.running && elapsed_ms.is_finite() && elapsed_ms > 0.0 {
            elapsed_ms * self.multiplier
        } else {
            0.0
        };
        self.now_ms += self.delta_ms;
        self.delta_ms
    }

    /// Simulated milliseconds added by the last [`tick`](Self::tick).
    pub fn delta_ms(&self) -> f64 {
        self.delta_ms
    }

    /// Current simulated Unix time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn set_time(&mut self, unix_ms: f64) {
        self.now_ms = unix_ms;
    }

    /// Jump back to the real current time.
    pub fn reset(&mut self) {
        self.now_ms = system_now_ms();
        self.delta_ms = 0.0;
    }
}

fn system_now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_clock_does_not_advance() {
        let mut clock = Clock::new(1_000.0, 1.0);
        assert_eq!(clock.tick(16.0), 0.0);
        assert_eq!(clock.now_ms(), 1_000.0);
    }

    #[test]
    fn test_multiplier_scales_delta() {
        let mut clock = Clock::new(0.0, 3600.0);
        clock.start();
        let dt = clock.tick(10.0);
        assert_eq!(dt, 36_000.0);
        assert_eq!(clock.delta_ms(), 36_000.0);
        assert_eq!(clock.now_ms(), 36_000.0);
    }

    #[test]
    fn test_stop_clears_delta() {
        let mut clock = Clock::new(0.0, 1.0);
        clock.start();
        clock.tick(16.0);
        clock.stop();
        assert!(!clock.is_running());
        assert_eq!(clock.delta_ms(), 0.0);
        assert_eq!(clock.now_ms(), 16.0);
    }

    #[test]
    fn test_invalid_multiplier_ignored() {
        let mut clock = Clock::new(0.0, 2.0);
        clock.set_multiplier(-1.0);
        clock.set_multiplier(f64::NAN);
        assert_eq!(clock.multiplier(), 2.0);
    }

    /// Negative frame times never run the clock backwards.
    #[test]
    fn test_negative_elapsed_ignored() {
        let mut clock = Clock::new(500.0, 1.0);
        clock.start();
        assert_eq!(clock.tick(-20.0), 0.0);
        assert_eq!(clock.now_ms(), 500.0);
    }

    #[test]
    fn test_from_config_uses_start_time() {
        let config = ClockConfig {
            start_unix_ms: Some(1_718_884_800_000),
            multiplier: 60.0,
            ..ClockConfig::default()
        };
        let clock = Clock::from_config(&config);
        assert_eq!(clock.now_ms(), 1_718_884_800_000.0);
        assert_eq!(clock.multiplier(), 60.0);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_reset_returns_to_real_time() {
        let mut clock = Clock::new(0.0, 1.0);
        clock.reset();
        // Any time after 2020-01-01.
        assert!(clock.now_ms() > 1_577_836_800_000.0);
    }
}
