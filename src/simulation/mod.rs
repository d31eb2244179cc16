//! Scene state and the tick driver

pub mod events;
pub mod scene;
pub mod tick;

pub use events::SimulationEvent;
pub use scene::{Npc, Scene};
pub use tick::run_simulation_tick;
