//! Simulation configuration with documented constants
//!
//! All tunable values are collected here with explanations of their purpose
//! and how they interact with each other. Schedule tolerance and the stuck
//! threshold in particular are tuning knobs rather than hard requirements,
//! so they are parameters instead of hard-coded values.

use serde::{Deserialize, Serialize};

/// Configuration for the NPC simulation and dialogue systems
///
/// These values set the pacing of the town. Changing them affects how
/// lively NPC routines feel and how often the remote dialogue backend is
/// called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    // === SCHEDULE SYSTEM ===
    /// Window (simulated minutes) within which a schedule entry is "due"
    ///
    /// An entry at 08:00 with the default 10 triggers anywhere between
    /// 07:50 and 08:10. Wider windows tolerate slow travel; narrower ones
    /// make NPCs punctual but risk skipped entries when ticks are coarse.
    pub schedule_tolerance_min: u16,

    /// Minimum duration of a scheduled activity (simulated seconds)
    pub activity_min_secs: f32,

    /// Maximum duration of a scheduled activity (simulated seconds)
    ///
    /// Durations are rolled uniformly in [min, max] per activity so NPC
    /// instances sharing a schedule do not stay perfectly synchronized.
    pub activity_max_secs: f32,

    // === MOVEMENT SYSTEM ===
    /// Base walking speed in tiles per simulated second
    pub walk_speed: f32,

    /// Speed multiplier while running
    pub run_multiplier: f32,

    /// Side length of an actor's collision box (grid units)
    ///
    /// Slightly under a full tile (0.8) so actors can pass through
    /// one-tile gaps without corner snags.
    pub actor_box_size: f32,

    /// Distance at which a travelling NPC counts as arrived (tiles)
    pub tile_epsilon: f32,

    /// Seconds of continuous Blocked results before a travel attempt is
    /// abandoned and the NPC drops back to Idle
    pub stuck_threshold_secs: f32,

    // === DIALOGUE SYSTEM ===
    /// Minimum interval between two remote generation calls per NPC
    /// (simulated seconds)
    ///
    /// Applied on issue, regardless of success, so the call rate has a
    /// hard ceiling even when every request fails fast.
    pub cooldown_secs: f32,

    /// Seconds after which an unresolved generation request falls back to
    /// the static pool
    pub request_timeout_secs: f32,

    /// Seconds after which an inactive chat session is force-closed
    ///
    /// Guards against a dropped client event leaving an NPC stuck in
    /// Chatting forever.
    pub chat_timeout_secs: f32,

    /// Maximum lines kept in a live session transcript
    ///
    /// Older lines are dropped from the live view only; closed session
    /// records keep whatever they had at close.
    pub transcript_cap: usize,

    /// Radius (tiles) within which the player can start a conversation
    pub interaction_radius: f32,

    // === CLOCK ===
    /// Simulated minutes that pass per simulated second
    ///
    /// At 1.0 a full day takes 24 real minutes of simulation time.
    pub minutes_per_second: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            schedule_tolerance_min: 10,
            activity_min_secs: 60.0,
            activity_max_secs: 180.0,

            walk_speed: 4.0,
            run_multiplier: 1.5,
            actor_box_size: 0.8,
            tile_epsilon: 0.1,
            stuck_threshold_secs: 3.0,

            cooldown_secs: 5.0,
            request_timeout_secs: 10.0,
            chat_timeout_secs: 10.0,
            transcript_cap: 20,
            interaction_radius: 2.0,

            minutes_per_second: 1.0,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> crate::core::error::Result<()> {
        use crate::core::error::CourtError;

        if self.activity_min_secs > self.activity_max_secs {
            return Err(CourtError::ConfigError(format!(
                "activity_min_secs ({}) must be <= activity_max_secs ({})",
                self.activity_min_secs, self.activity_max_secs
            )));
        }
        if self.actor_box_size <= 0.0 || self.actor_box_size > 1.0 {
            return Err(CourtError::ConfigError(format!(
                "actor_box_size ({}) must be in (0, 1] to fit a tile",
                self.actor_box_size
            )));
        }
        if self.schedule_tolerance_min >= 720 {
            return Err(CourtError::ConfigError(format!(
                "schedule_tolerance_min ({}) must be < 720, or every entry is always due",
                self.schedule_tolerance_min
            )));
        }
        if self.walk_speed <= 0.0 || self.minutes_per_second <= 0.0 {
            return Err(CourtError::ConfigError(
                "walk_speed and minutes_per_second must be positive".into(),
            ));
        }
        if self.transcript_cap == 0 {
            return Err(CourtError::ConfigError(
                "transcript_cap must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
