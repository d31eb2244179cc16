//! NPC data, schedules, and the per-NPC behavior machine

pub mod actor;
pub mod behavior;
pub mod schedule;

pub use actor::Actor;
pub use behavior::{BehaviorCtx, BehaviorEvent, NpcBehaviorMachine, NpcState};
pub use schedule::{Activity, ScheduleEntry, ScheduleTable};
