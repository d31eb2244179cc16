//! Game clock for simulated time-of-day tracking
//!
//! The clock is advanced explicitly by the driver loop (`advance(dt)`),
//! never by engine timers, so cooldowns and schedule checks are
//! deterministic and testable without a live frame loop.

use serde::{Deserialize, Serialize};

/// Minutes in a simulated day
pub const MINUTES_PER_DAY: u16 = 1440;

/// Tracks elapsed simulation time and derives the minute-of-day
/// that schedules are authored against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameClock {
    /// Total simulated seconds since scene start
    elapsed_secs: f64,
    /// Simulated minutes that pass per simulated second
    minutes_per_second: f32,
    /// Minute-of-day the scene started at (e.g. 470 for 07:50)
    start_minute: u16,
}

impl GameClock {
    pub fn new(minutes_per_second: f32, start_minute: u16) -> Self {
        Self {
            elapsed_secs: 0.0,
            minutes_per_second,
            start_minute: start_minute % MINUTES_PER_DAY,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed_secs += dt as f64;
    }

    /// Monotonic simulation time in seconds, used for cooldowns and timers
    pub fn now(&self) -> f64 {
        self.elapsed_secs
    }

    /// Current minute of the simulated day, 0..1440
    pub fn minute_of_day(&self) -> u16 {
        let minutes = self.elapsed_secs * self.minutes_per_second as f64;
        ((self.start_minute as f64 + minutes) % MINUTES_PER_DAY as f64) as u16
    }

    /// HH:MM rendering for status displays
    pub fn clock_label(&self) -> String {
        let m = self.minute_of_day();
        format!("{:02}:{:02}", m / 60, m % 60)
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(1.0, 0)
    }
}
