//! Authored daily routines
//!
//! A schedule is a sorted list of (minute-of-day, activity, target tile)
//! entries. The table never mutates itself; the behavior machine reads it
//! every tick and decides whether an entry is due. Matching is fully
//! deterministic; only activity *durations* are randomized, elsewhere.

use crate::core::clock::MINUTES_PER_DAY;
use crate::core::error::{CourtError, Result};
use crate::core::types::GridPos;
use serde::{Deserialize, Serialize};

/// What an NPC does at a scheduled stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Working,
    Shopping,
    /// Pickup ball at the court
    Playing,
    Resting,
}

impl Activity {
    /// Key used for prompts and the static fallback pool
    pub fn label(&self) -> &'static str {
        match self {
            Activity::Working => "working",
            Activity::Shopping => "shopping",
            Activity::Playing => "playing",
            Activity::Resting => "resting",
        }
    }
}

/// One scheduled activity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Minutes after midnight, 0..1440
    pub minute_of_day: u16,
    pub activity: Activity,
    pub target: GridPos,
}

/// Ordered per-NPC schedule, read-only at runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleTable {
    entries: Vec<ScheduleEntry>,
}

/// Distance between two minutes-of-day, wrapping across midnight so a
/// 23:55 entry is due at 00:05
fn minute_distance(a: u16, b: u16) -> u16 {
    let diff = a.abs_diff(b);
    diff.min(MINUTES_PER_DAY - diff)
}

impl ScheduleTable {
    /// Build a table, sorting by time. Rejects entries past 23:59 and
    /// duplicate minutes: two activities cannot start at the same time
    /// for the same NPC.
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Result<Self> {
        for e in &entries {
            if e.minute_of_day >= MINUTES_PER_DAY {
                return Err(CourtError::InvalidSchedule(format!(
                    "minute_of_day {} out of range",
                    e.minute_of_day
                )));
            }
        }
        entries.sort_by_key(|e| e.minute_of_day);
        if entries.windows(2).any(|w| w[0].minute_of_day == w[1].minute_of_day) {
            return Err(CourtError::InvalidSchedule(
                "two entries share the same minute_of_day".into(),
            ));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry due at `minute_now`, if any.
    ///
    /// An entry is due when it lies within `tolerance_min` of the current
    /// minute and its activity differs from what the NPC is already doing.
    /// If sloppy authoring makes several entries due at once, the
    /// earliest-by-time wins. A documented tie-break, not a guess.
    pub fn next_due(
        &self,
        minute_now: u16,
        tolerance_min: u16,
        current_activity: Option<Activity>,
    ) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| minute_distance(minute_now, e.minute_of_day) <= tolerance_min)
            .find(|e| current_activity != Some(e.activity))
    }
}
