//! Scene: owned state for one loaded map
//!
//! Everything the simulation mutates lives here, injected at construction
//! rather than reached through globals: the dialogue backend, the clock,
//! the rng. Teardown is explicit so nothing (timers, outstanding dialogue
//! requests, collision entries) leaks across map changes.

use crate::core::clock::GameClock;
use crate::core::config::SimConfig;
use crate::core::error::Result;
use crate::core::types::{ActorId, Tick, Vec2};
use crate::dialogue::backend::DialogueBackend;
use crate::dialogue::fallback::FallbackPool;
use crate::dialogue::orchestrator::{DialogueOrchestrator, NpcProfile};
use crate::dialogue::session::DialogueSession;
use crate::npc::actor::Actor;
use crate::npc::behavior::{NpcBehaviorMachine, NpcState};
use crate::npc::schedule::ScheduleTable;
use crate::simulation::events::SimulationEvent;
use crate::world::collision::{ColliderKind, CollisionIndex};
use crate::world::movement::{input_delta, try_move, MoveResult};
use crate::world::tiles::TileWorld;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// One simulated NPC: its body and its brain
pub struct Npc {
    pub actor: Actor,
    pub machine: NpcBehaviorMachine,
}

pub struct Scene {
    pub(crate) tiles: TileWorld,
    pub(crate) index: CollisionIndex,
    pub(crate) config: SimConfig,
    pub(crate) clock: GameClock,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) orchestrator: DialogueOrchestrator,
    /// Spawn order; tick evaluation walks this in order every tick
    pub(crate) npcs: Vec<Npc>,
    pub(crate) player: Option<Actor>,
    pub(crate) tick: Tick,
}

impl Scene {
    pub fn new(
        tiles: TileWorld,
        config: SimConfig,
        backend: Option<Box<dyn DialogueBackend>>,
        pool: FallbackPool,
        seed: u64,
        start_minute: u16,
    ) -> Result<Self> {
        config.validate()?;
        let clock = GameClock::new(config.minutes_per_second, start_minute);
        let orchestrator = DialogueOrchestrator::new(backend, pool, &config);
        Ok(Self {
            tiles,
            index: CollisionIndex::new(),
            clock,
            rng: ChaCha8Rng::seed_from_u64(seed),
            orchestrator,
            npcs: Vec::new(),
            player: None,
            tick: 0,
            config,
        })
    }

    /// Register a static obstacle (building footprint etc). The returned
    /// id is what the map loader uses to deregister it on unload.
    pub fn add_obstacle(&mut self, aabb: crate::core::types::Aabb, kind: ColliderKind) -> ActorId {
        let id = ActorId::new();
        self.index.register(id, aabb, kind);
        id
    }

    /// Place the player, replacing any previous player body
    pub fn spawn_player(&mut self, position: Vec2) -> ActorId {
        if let Some(old) = self.player.take() {
            self.index.deregister(old.id);
        }
        let actor = Actor::new(
            "Player",
            position,
            self.config.actor_box_size,
            self.config.walk_speed,
        );
        let id = actor.id;
        self.index
            .register(id, actor.collision_box(), ColliderKind::Player);
        self.player = Some(actor);
        id
    }

    pub fn spawn_npc(
        &mut self,
        profile: NpcProfile,
        position: Vec2,
        schedule: ScheduleTable,
    ) -> ActorId {
        let actor = Actor::new(
            profile.name.clone(),
            position,
            self.config.actor_box_size,
            self.config.walk_speed,
        );
        let id = actor.id;
        info!(npc = %profile.name, %id, "spawning NPC");
        self.index
            .register(id, actor.collision_box(), ColliderKind::Npc);
        self.orchestrator.register_npc(id, profile);
        self.npcs.push(Npc {
            actor,
            machine: NpcBehaviorMachine::new(schedule),
        });
        id
    }

    /// Remove an NPC: collision entry, dialogue bookkeeping, and any
    /// session it was in
    pub fn despawn_npc(&mut self, id: ActorId) -> Vec<SimulationEvent> {
        self.npcs.retain(|n| n.actor.id != id);
        self.index.deregister(id);
        self.orchestrator
            .deregister_npc(id, self.clock.now())
            .into_iter()
            .map(SimulationEvent::from)
            .collect()
    }

    /// Resolve one tick of held player input. Returns None when no
    /// player is spawned.
    pub fn player_move(&mut self, dx: i8, dy: i8, running: bool, dt: f32) -> Option<MoveResult> {
        let player = self.player.as_mut()?;
        let mut speed = player.speed;
        if running {
            speed *= self.config.run_multiplier;
        }
        let delta = input_delta(dx, dy, speed, dt);
        let result = try_move(
            &self.tiles,
            &mut self.index,
            player.id,
            player.collision_box(),
            delta,
        );
        if let MoveResult::Accepted(origin) = result {
            player.apply_move(origin, running);
        }
        Some(result)
    }

    /// Player pressed interact: start a conversation with the nearest
    /// chat-eligible NPC in range. No-op when nothing qualifies.
    pub fn interact(&mut self) -> Vec<SimulationEvent> {
        if self.orchestrator.active_session().is_some() {
            return Vec::new();
        }
        let player_center = match &self.player {
            Some(p) => p.collision_box().center(),
            None => return Vec::new(),
        };

        let mut nearest: Option<(usize, f32)> = None;
        for (i, npc) in self.npcs.iter().enumerate() {
            if !npc.machine.can_chat() {
                continue;
            }
            let dist = npc.actor.collision_box().center().distance(&player_center);
            if dist > self.config.interaction_radius {
                continue;
            }
            if nearest.map(|(_, d)| dist < d).unwrap_or(true) {
                nearest = Some((i, dist));
            }
        }

        let Some((i, _)) = nearest else {
            return Vec::new();
        };
        let now = self.clock.now();
        let npc = &mut self.npcs[i];
        if !npc.machine.begin_chat() {
            return Vec::new();
        }
        let mut events: Vec<SimulationEvent> = self
            .orchestrator
            .start_session(npc.actor.id, now)
            .into_iter()
            .map(SimulationEvent::from)
            .collect();
        events.push(SimulationEvent::NpcStateChanged {
            npc: npc.actor.id,
            name: npc.actor.name.clone(),
            state: npc.machine.state(),
        });
        events
    }

    /// Player speaks into the active session
    pub fn player_says(&mut self, text: &str) -> Vec<SimulationEvent> {
        let now = self.clock.now();
        self.orchestrator
            .player_says(text, now, &mut self.rng)
            .into_iter()
            .map(SimulationEvent::from)
            .collect()
    }

    /// Explicitly end the active conversation
    pub fn end_dialogue(&mut self) -> Vec<SimulationEvent> {
        let npc_id = self.orchestrator.active_session().map(|s| s.npc);
        let mut events: Vec<SimulationEvent> = self
            .orchestrator
            .end_session(self.clock.now())
            .into_iter()
            .map(SimulationEvent::from)
            .collect();
        if let Some(id) = npc_id {
            if let Some(npc) = self.npcs.iter_mut().find(|n| n.actor.id == id) {
                npc.machine.end_chat();
                events.push(SimulationEvent::NpcStateChanged {
                    npc: id,
                    name: npc.actor.name.clone(),
                    state: npc.machine.state(),
                });
            }
        }
        events
    }

    /// Scene unload: cancel outstanding dialogue requests, close the
    /// session, drop every collision entry and actor
    pub fn teardown(&mut self) -> Vec<SimulationEvent> {
        let events: Vec<SimulationEvent> = self
            .orchestrator
            .teardown(self.clock.now())
            .into_iter()
            .map(SimulationEvent::from)
            .collect();
        for npc in &self.npcs {
            self.index.deregister(npc.actor.id);
        }
        self.npcs.clear();
        if let Some(player) = self.player.take() {
            self.index.deregister(player.id);
        }
        events
    }

    // --- read-only views for UI / debug overlays ---

    pub fn npc_state(&self, id: ActorId) -> Option<NpcState> {
        self.npcs
            .iter()
            .find(|n| n.actor.id == id)
            .map(|n| n.machine.state())
    }

    pub fn npc_position(&self, id: ActorId) -> Option<Vec2> {
        self.npcs
            .iter()
            .find(|n| n.actor.id == id)
            .map(|n| n.actor.position)
    }

    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    pub fn player(&self) -> Option<&Actor> {
        self.player.as_ref()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileWorld {
        &self.tiles
    }

    pub fn collision_index(&self) -> &CollisionIndex {
        &self.index
    }

    pub fn active_session(&self) -> Option<&DialogueSession> {
        self.orchestrator.active_session()
    }

    pub fn dialogue(&self) -> &DialogueOrchestrator {
        &self.orchestrator
    }

    pub fn tick_count(&self) -> Tick {
        self.tick
    }
}
