//! Dialogue orchestration
//!
//! Owns the one active conversation, the per-NPC generation bookkeeping
//! and the durable history. Every line an NPC speaks flows through here:
//! schedule-driven flavor lines, chat replies, and the static fallbacks
//! that cover throttling, errors and timeouts. Callers never see a
//! failure; the worst case is a canned line.
//!
//! Request state is explicit and polled from `advance(now)` each tick,
//! so there is no hidden asynchrony anywhere in the simulation.

use crate::core::config::SimConfig;
use crate::core::types::ActorId;
use crate::dialogue::backend::{DialogueBackend, GenerationRequest, PendingReply, ReplyPoll};
use crate::dialogue::fallback::FallbackPool;
use crate::dialogue::session::{DialogueHistory, DialogueSession, TranscriptLine};
use ahash::AHashMap;
use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

/// Character sheet the backend needs to speak as one NPC
#[derive(Debug, Clone)]
pub struct NpcProfile {
    pub name: String,
    pub role: String,
    pub personality: String,
}

/// Session-lifecycle notifications for the UI layer
#[derive(Debug, Clone)]
pub enum DialogueEvent {
    SessionStarted { session_id: Uuid, npc: ActorId },
    LineAdded {
        npc: ActorId,
        speaker: String,
        text: String,
        /// True when the line came from the static pool
        fallback: bool,
    },
    SessionEnded { session_id: Uuid, npc: ActorId },
}

/// Why a line was requested; decides where the resolved text lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestPurpose {
    /// Ambient line on entering an activity
    Flavor,
    /// Reply inside an active chat session
    SessionReply,
}

/// One outstanding generation call
struct PendingRequest {
    issued_at: f64,
    context: String,
    purpose: RequestPurpose,
    reply: PendingReply,
}

/// Per-NPC generation bookkeeping. The cooldown outlives sessions.
#[derive(Default)]
struct NpcSlot {
    cooldown_until: f64,
    pending: Option<PendingRequest>,
    last_line: Option<String>,
}

pub struct DialogueOrchestrator {
    /// None means offline; every request falls back immediately
    backend: Option<Box<dyn DialogueBackend>>,
    pool: FallbackPool,
    profiles: AHashMap<ActorId, NpcProfile>,
    slots: AHashMap<ActorId, NpcSlot>,
    session: Option<DialogueSession>,
    history: DialogueHistory,
    config: SimConfig,
}

impl DialogueOrchestrator {
    pub fn new(
        backend: Option<Box<dyn DialogueBackend>>,
        pool: FallbackPool,
        config: &SimConfig,
    ) -> Self {
        Self {
            backend,
            pool,
            profiles: AHashMap::new(),
            slots: AHashMap::new(),
            session: None,
            history: DialogueHistory::new(),
            config: config.clone(),
        }
    }

    pub fn register_npc(&mut self, id: ActorId, profile: NpcProfile) {
        self.profiles.insert(id, profile);
        self.slots.entry(id).or_default();
    }

    /// Remove an NPC on despawn. Drops any outstanding request (the
    /// in-flight call resolves into a closed channel) and closes the
    /// session if it was talking to this NPC.
    pub fn deregister_npc(&mut self, id: ActorId, now: f64) -> Vec<DialogueEvent> {
        self.profiles.remove(&id);
        self.slots.remove(&id);
        match &self.session {
            Some(s) if s.npc == id => self.end_session(now),
            _ => Vec::new(),
        }
    }

    /// Whether a generation call is outstanding for this NPC. The
    /// behavior machine reads this to leave AwaitingDialogue.
    pub fn is_pending(&self, npc: ActorId) -> bool {
        self.slots
            .get(&npc)
            .map(|slot| slot.pending.is_some())
            .unwrap_or(false)
    }

    pub fn active_session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &DialogueHistory {
        &self.history
    }

    pub fn last_line(&self, npc: ActorId) -> Option<&str> {
        self.slots
            .get(&npc)
            .and_then(|slot| slot.last_line.as_deref())
    }

    /// Open a conversation with an NPC. No-op (empty event list) if a
    /// session is already running or the NPC is unknown.
    pub fn start_session(&mut self, npc: ActorId, now: f64) -> Vec<DialogueEvent> {
        if self.session.is_some() || !self.profiles.contains_key(&npc) {
            return Vec::new();
        }
        let session = DialogueSession::new(npc, now, self.config.transcript_cap);
        let session_id = session.id;
        debug!(%npc, %session_id, "dialogue session started");
        self.session = Some(session);
        vec![DialogueEvent::SessionStarted { session_id, npc }]
    }

    /// Record the player's line and request a reply from the session NPC
    pub fn player_says<R: Rng>(
        &mut self,
        text: &str,
        now: f64,
        rng: &mut R,
    ) -> Vec<DialogueEvent> {
        let npc = match &mut self.session {
            Some(session) => {
                session.append("Player", text, now);
                session.npc
            }
            None => return Vec::new(),
        };
        let mut events = vec![DialogueEvent::LineAdded {
            npc,
            speaker: "Player".to_string(),
            text: text.to_string(),
            fallback: false,
        }];
        events.extend(self.request_line(
            npc,
            "chatting",
            text,
            RequestPurpose::SessionReply,
            now,
            rng,
        ));
        events
    }

    /// Request an ambient line for an activity context
    pub fn request_flavor_line<R: Rng>(
        &mut self,
        npc: ActorId,
        context: &str,
        now: f64,
        rng: &mut R,
    ) -> Vec<DialogueEvent> {
        let prompt = format!("(Say one short line about {context}.)");
        self.request_line(npc, context, &prompt, RequestPurpose::Flavor, now, rng)
    }

    /// Close the active session and flush it into durable history.
    /// Idempotent; the per-NPC generation cooldown is untouched.
    pub fn end_session(&mut self, _now: f64) -> Vec<DialogueEvent> {
        match self.session.take() {
            Some(session) => {
                let session_id = session.id;
                let npc = session.npc;
                debug!(%npc, %session_id, "dialogue session ended");
                self.history.archive(session);
                vec![DialogueEvent::SessionEnded { session_id, npc }]
            }
            None => Vec::new(),
        }
    }

    /// Cancel everything on scene teardown: outstanding requests are
    /// dropped and the session, if any, is closed and archived.
    pub fn teardown(&mut self, now: f64) -> Vec<DialogueEvent> {
        for slot in self.slots.values_mut() {
            slot.pending = None;
        }
        self.end_session(now)
    }

    /// Poll outstanding requests and the session idle timeout. Called
    /// once per tick by the driver loop.
    pub fn advance<R: Rng>(&mut self, now: f64, rng: &mut R) -> Vec<DialogueEvent> {
        let mut events = Vec::new();

        let ids: Vec<ActorId> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.pending.is_some())
            .map(|(id, _)| *id)
            .collect();

        for npc in ids {
            let polled = match self.slots.get_mut(&npc).and_then(|s| s.pending.as_mut()) {
                Some(pending) => {
                    let timed_out =
                        now - pending.issued_at > self.config.request_timeout_secs as f64;
                    if timed_out {
                        Some((ReplyPoll::Failed("request timed out".into()), pending.context.clone(), pending.purpose))
                    } else {
                        match pending.try_resolve() {
                            ReplyPoll::Pending => None,
                            done => Some((done, pending.context.clone(), pending.purpose)),
                        }
                    }
                }
                None => None,
            };

            if let Some((poll, context, purpose)) = polled {
                if let Some(slot) = self.slots.get_mut(&npc) {
                    slot.pending = None;
                }
                match poll {
                    ReplyPoll::Resolved(text) => {
                        events.extend(self.deliver_line(npc, text, false, purpose, now));
                    }
                    ReplyPoll::Failed(reason) => {
                        warn!(%npc, %reason, "dialogue generation failed, using fallback");
                        let line = self.pool.line_for(&context, rng).to_string();
                        events.extend(self.deliver_line(npc, line, true, purpose, now));
                    }
                    ReplyPoll::Pending => {}
                }
            }
        }

        // A dropped client event must not leave a chat open forever
        let idle_expired = self
            .session
            .as_ref()
            .map(|s| now - s.last_activity > self.config.chat_timeout_secs as f64)
            .unwrap_or(false);
        if idle_expired {
            debug!("dialogue session idle timeout");
            events.extend(self.end_session(now));
        }

        events
    }

    /// Core request path. Throttled calls (outstanding request, active
    /// cooldown, or no backend) fall back immediately and never queue.
    fn request_line<R: Rng>(
        &mut self,
        npc: ActorId,
        context: &str,
        player_message: &str,
        purpose: RequestPurpose,
        now: f64,
        rng: &mut R,
    ) -> Vec<DialogueEvent> {
        let profile = match self.profiles.get(&npc) {
            Some(p) => p.clone(),
            None => return Vec::new(),
        };
        let slot = self.slots.entry(npc).or_default();
        let throttled = slot.pending.is_some() || now < slot.cooldown_until;

        if !throttled {
            if let Some(backend) = &self.backend {
                let recent_history = self.recent_history(npc);
                let reply = backend.submit(GenerationRequest {
                    npc_name: profile.name,
                    npc_role: profile.role,
                    npc_personality: profile.personality,
                    player_message: player_message.to_string(),
                    recent_history,
                });
                let slot = self.slots.entry(npc).or_default();
                slot.pending = Some(PendingRequest {
                    issued_at: now,
                    context: context.to_string(),
                    purpose,
                    reply,
                });
                // Set on issue regardless of outcome, so the call rate
                // has a hard ceiling even when every request fails fast.
                slot.cooldown_until = now + self.config.cooldown_secs as f64;
                return Vec::new();
            }
        }

        let line = self.pool.line_for(context, rng).to_string();
        self.deliver_line(npc, line, true, purpose, now)
    }

    /// Live transcript if a session with this NPC is open, otherwise the
    /// tail of its archived history
    fn recent_history(&self, npc: ActorId) -> Vec<TranscriptLine> {
        match &self.session {
            Some(s) if s.npc == npc => s.lines().to_vec(),
            _ => self.history.recent_lines(npc, self.config.transcript_cap),
        }
    }

    fn deliver_line(
        &mut self,
        npc: ActorId,
        text: String,
        fallback: bool,
        purpose: RequestPurpose,
        now: f64,
    ) -> Vec<DialogueEvent> {
        let speaker = match self.profiles.get(&npc) {
            Some(p) => p.name.clone(),
            None => return Vec::new(),
        };
        if purpose == RequestPurpose::SessionReply {
            // Session may have closed while the request was in flight;
            // the line still surfaces as an event.
            if let Some(session) = &mut self.session {
                if session.npc == npc {
                    session.append(speaker.clone(), text.clone(), now);
                }
            }
        }
        if let Some(slot) = self.slots.get_mut(&npc) {
            slot.last_line = Some(text.clone());
        }
        vec![DialogueEvent::LineAdded {
            npc,
            speaker,
            text,
            fallback,
        }]
    }
}

impl PendingRequest {
    fn try_resolve(&mut self) -> ReplyPoll {
        self.reply.try_resolve()
    }
}
