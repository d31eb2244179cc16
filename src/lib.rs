//! Courtside: headless NPC simulation and dialogue engine
//!
//! The simulation core of a small open-world basketball RPG, built to run
//! without any rendering engine attached. It covers three tightly coupled
//! concerns:
//!
//! - tile-grid movement and collision shared by the player and every NPC
//! - a per-NPC finite state machine driven by authored daily schedules
//! - an asynchronous dialogue pipeline that generates NPC speech through
//!   a remote language model, falling back to static lines whenever the
//!   remote call is throttled, failing, or absent
//!
//! The host loop owns time: it calls [`simulation::run_simulation_tick`]
//! once per frame and consumes the returned events. Nothing in here
//! spawns timers or blocks on the network.

pub mod core;
pub mod dialogue;
pub mod npc;
pub mod simulation;
pub mod world;

pub use crate::core::{config::SimConfig, error::CourtError, error::Result};
pub use crate::simulation::{run_simulation_tick, Scene, SimulationEvent};
