//! Events surfaced to the host game each tick
//!
//! The driver loop collects behavior and dialogue notifications into one
//! stream so the UI layer (dialogue boxes, minimap, debug overlays) has a
//! single thing to consume per tick.

use crate::core::types::{ActorId, GridPos};
use crate::dialogue::orchestrator::DialogueEvent;
use crate::npc::behavior::NpcState;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum SimulationEvent {
    NpcStateChanged {
        npc: ActorId,
        name: String,
        state: NpcState,
    },
    NpcArrived {
        npc: ActorId,
        name: String,
        tile: GridPos,
    },
    /// Travel abandoned after being blocked past the stuck threshold.
    /// Recoverable; surfaced for telemetry only.
    NpcStuck {
        npc: ActorId,
        name: String,
        target: GridPos,
    },
    SessionStarted {
        session_id: Uuid,
        npc: ActorId,
    },
    LineAdded {
        npc: ActorId,
        speaker: String,
        text: String,
        fallback: bool,
    },
    SessionEnded {
        session_id: Uuid,
        npc: ActorId,
    },
}

impl From<DialogueEvent> for SimulationEvent {
    fn from(event: DialogueEvent) -> Self {
        match event {
            DialogueEvent::SessionStarted { session_id, npc } => {
                SimulationEvent::SessionStarted { session_id, npc }
            }
            DialogueEvent::LineAdded {
                npc,
                speaker,
                text,
                fallback,
            } => SimulationEvent::LineAdded {
                npc,
                speaker,
                text,
                fallback,
            },
            DialogueEvent::SessionEnded { session_id, npc } => {
                SimulationEvent::SessionEnded { session_id, npc }
            }
        }
    }
}
