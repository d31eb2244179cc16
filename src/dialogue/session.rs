//! Conversation transcripts
//!
//! A session is the live transcript of one player/NPC conversation. The
//! live view is capped so prompts stay bounded; the durable per-NPC
//! history keeps every closed session so an NPC can be reminded of past
//! conversations.

use crate::core::types::ActorId;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One spoken line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
    /// Simulation time the line was spoken
    pub timestamp_secs: f64,
}

/// Live transcript of one conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSession {
    pub id: Uuid,
    pub npc: ActorId,
    pub started_at: f64,
    /// Simulation time of the most recent line, used for idle timeout
    pub last_activity: f64,
    lines: Vec<TranscriptLine>,
    /// Oldest lines are dropped past this while the session is live
    cap: usize,
    active: bool,
}

impl DialogueSession {
    pub fn new(npc: ActorId, now: f64, cap: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            npc,
            started_at: now,
            last_activity: now,
            lines: Vec::new(),
            cap: cap.max(1),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// Append a line. Ignored after close; the record is frozen.
    pub fn append(&mut self, speaker: impl Into<String>, text: impl Into<String>, now: f64) {
        if !self.active {
            return;
        }
        self.lines.push(TranscriptLine {
            speaker: speaker.into(),
            text: text.into(),
            timestamp_secs: now,
        });
        if self.lines.len() > self.cap {
            let overflow = self.lines.len() - self.cap;
            self.lines.drain(..overflow);
        }
        self.last_activity = now;
    }

    /// Close the session. Idempotent.
    pub fn close(&mut self) {
        self.active = false;
    }
}

/// Durable per-NPC store of closed sessions
#[derive(Debug, Default)]
pub struct DialogueHistory {
    sessions: AHashMap<ActorId, Vec<DialogueSession>>,
}

impl DialogueHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive a closed session under its NPC
    pub fn archive(&mut self, mut session: DialogueSession) {
        session.close();
        self.sessions.entry(session.npc).or_default().push(session);
    }

    pub fn sessions_for(&self, npc: ActorId) -> &[DialogueSession] {
        self.sessions.get(&npc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most recent lines across this NPC's archived sessions, oldest
    /// first. Feeds prompt context for new conversations.
    pub fn recent_lines(&self, npc: ActorId, limit: usize) -> Vec<TranscriptLine> {
        let mut lines: Vec<TranscriptLine> = self
            .sessions_for(npc)
            .iter()
            .flat_map(|s| s.lines().iter().cloned())
            .collect();
        if lines.len() > limit {
            lines.drain(..lines.len() - limit);
        }
        lines
    }

    pub fn clear(&mut self, npc: ActorId) {
        self.sessions.remove(&npc);
    }
}
