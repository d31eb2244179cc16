//! NPC speech pipeline: remote generation, static fallback, transcripts

pub mod backend;
pub mod fallback;
pub mod orchestrator;
pub mod session;

pub use backend::{DialogueBackend, GenerationRequest, LlmBackend, PendingReply, ScriptedBackend};
pub use fallback::FallbackPool;
pub use orchestrator::{DialogueEvent, DialogueOrchestrator, NpcProfile};
pub use session::{DialogueHistory, DialogueSession, TranscriptLine};
