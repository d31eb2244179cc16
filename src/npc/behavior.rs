//! Per-NPC behavior state machine
//!
//! Drives one NPC through its daily routine: schedule lookups, collision
//! checked travel, timed activity performance, and the chat override.
//! The machine owns no services; tiles, collision index, config and rng
//! arrive through the tick context, and dialogue is reached indirectly
//! through the events the machine returns. All transitions are explicit
//! and happen inside `advance`.

use crate::core::config::SimConfig;
use crate::core::types::{GridPos, Vec2};
use crate::npc::actor::Actor;
use crate::npc::schedule::{Activity, ScheduleTable};
use crate::world::collision::CollisionIndex;
use crate::world::movement::{step_toward, try_move, MoveResult};
use crate::world::tiles::TileWorld;
use rand::Rng;
use tracing::{debug, warn};

/// FSM state. Exactly one per NPC per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NpcState {
    Idle,
    MovingTo { activity: Activity, target: GridPos },
    Performing { activity: Activity },
    /// Performing, with a flavor line request still unresolved. Schedule
    /// evaluation is suspended; movement of other NPCs is unaffected.
    AwaitingDialogue { activity: Activity },
    Chatting,
}

impl NpcState {
    pub fn label(&self) -> &'static str {
        match self {
            NpcState::Idle => "idle",
            NpcState::MovingTo { .. } => "moving",
            NpcState::Performing { .. } => "performing",
            NpcState::AwaitingDialogue { .. } => "awaiting_dialogue",
            NpcState::Chatting => "chatting",
        }
    }

    /// Activity this state is engaged in, if any
    pub fn activity(&self) -> Option<Activity> {
        match self {
            NpcState::MovingTo { activity, .. }
            | NpcState::Performing { activity }
            | NpcState::AwaitingDialogue { activity } => Some(*activity),
            _ => None,
        }
    }
}

/// What happened inside one `advance` call
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorEvent {
    StateChanged { state: NpcState },
    Arrived { tile: GridPos },
    /// Travel abandoned after being blocked past the stuck threshold
    Stuck { target: GridPos },
    /// The machine wants an ambient line for a freshly started activity
    FlavorRequest { activity: Activity },
}

/// Everything one tick of behavior needs, injected by the driver
pub struct BehaviorCtx<'a, R: Rng> {
    pub tiles: &'a TileWorld,
    pub index: &'a mut CollisionIndex,
    pub config: &'a SimConfig,
    pub minute_of_day: u16,
    pub dt: f32,
    /// Whether a dialogue request is still outstanding for this NPC
    pub dialogue_pending: bool,
    pub rng: &'a mut R,
}

pub struct NpcBehaviorMachine {
    schedule: ScheduleTable,
    state: NpcState,
    /// Seconds left in the current performance; keeps running through
    /// AwaitingDialogue so a slow backend cannot stretch the activity
    performing_remaining: f32,
    /// Consecutive seconds of Blocked travel results
    blocked_secs: f32,
    /// Activity most recently begun; schedule matching uses it so a
    /// finished entry does not re-trigger within its tolerance window
    current_activity: Option<Activity>,
    /// State to restore when a chat ends
    resume_after_chat: Option<NpcState>,
}

impl NpcBehaviorMachine {
    pub fn new(schedule: ScheduleTable) -> Self {
        Self {
            schedule,
            state: NpcState::Idle,
            performing_remaining: 0.0,
            blocked_secs: 0.0,
            current_activity: None,
            resume_after_chat: None,
        }
    }

    pub fn state(&self) -> NpcState {
        self.state
    }

    pub fn schedule(&self) -> &ScheduleTable {
        &self.schedule
    }

    /// Whether a player may pull this NPC into a chat right now
    pub fn can_chat(&self) -> bool {
        matches!(
            self.state,
            NpcState::Idle | NpcState::Performing { .. } | NpcState::AwaitingDialogue { .. }
        )
    }

    /// Chat override: remembers the interrupted state and suspends all
    /// schedule-driven behavior until `end_chat`.
    pub fn begin_chat(&mut self) -> bool {
        if !self.can_chat() {
            return false;
        }
        self.resume_after_chat = Some(self.state);
        self.state = NpcState::Chatting;
        true
    }

    /// Restore whatever the chat interrupted. Safe to call when not
    /// chatting.
    pub fn end_chat(&mut self) {
        if self.state == NpcState::Chatting {
            self.state = self.resume_after_chat.take().unwrap_or(NpcState::Idle);
        }
    }

    pub fn advance<R: Rng>(&mut self, actor: &mut Actor, ctx: &mut BehaviorCtx<R>) -> Vec<BehaviorEvent> {
        let mut events = Vec::new();

        match self.state {
            NpcState::Chatting => {
                // Session end (explicit or timed out) arrives via end_chat
                actor.stop();
            }

            NpcState::AwaitingDialogue { activity } => {
                self.performing_remaining -= ctx.dt;
                if !ctx.dialogue_pending {
                    self.set_state(NpcState::Performing { activity }, &mut events);
                }
            }

            NpcState::Performing { .. } => {
                self.performing_remaining -= ctx.dt;
                if self.performing_remaining <= 0.0 {
                    actor.stop();
                    self.set_state(NpcState::Idle, &mut events);
                }
            }

            NpcState::Idle => {
                actor.stop();
                if let Some(entry) = self
                    .schedule
                    .next_due(
                        ctx.minute_of_day,
                        ctx.config.schedule_tolerance_min,
                        self.current_activity,
                    )
                    .copied()
                {
                    // Unknown or blocked-out target: skip this tick, the
                    // FSM must not halt on bad authoring
                    if !ctx.tiles.is_walkable(entry.target.x, entry.target.y) {
                        debug!(
                            npc = %actor.name,
                            target = ?entry.target,
                            "schedule entry targets unwalkable tile, skipping"
                        );
                    } else if actor.tile() == entry.target {
                        self.begin_performing(entry.activity, ctx, &mut events);
                    } else {
                        self.blocked_secs = 0.0;
                        self.set_state(
                            NpcState::MovingTo {
                                activity: entry.activity,
                                target: entry.target,
                            },
                            &mut events,
                        );
                    }
                }
            }

            NpcState::MovingTo { activity, target } => {
                self.travel(actor, activity, target, ctx, &mut events);
            }
        }

        events
    }

    /// One path-follow step toward the target tile center
    fn travel<R: Rng>(
        &mut self,
        actor: &mut Actor,
        activity: Activity,
        target: GridPos,
        ctx: &mut BehaviorCtx<R>,
        events: &mut Vec<BehaviorEvent>,
    ) {
        // Destination origin that centers the collision box on the tile
        let half = actor.box_size / 2.0;
        let destination = target.center() - Vec2::new(half, half);

        if actor.position.distance(&destination) <= ctx.config.tile_epsilon {
            actor.stop();
            events.push(BehaviorEvent::Arrived { tile: target });
            debug!(npc = %actor.name, tile = ?target, "arrived");

            // Simulated time may have moved far during travel; re-check
            // before performing a stale activity
            let redirect = self
                .schedule
                .next_due(
                    ctx.minute_of_day,
                    ctx.config.schedule_tolerance_min,
                    Some(activity),
                )
                .copied();
            match redirect {
                Some(entry) if entry.target != target => {
                    self.blocked_secs = 0.0;
                    self.set_state(
                        NpcState::MovingTo {
                            activity: entry.activity,
                            target: entry.target,
                        },
                        events,
                    );
                }
                Some(entry) => self.begin_performing(entry.activity, ctx, events),
                None => self.begin_performing(activity, ctx, events),
            }
            return;
        }

        let delta = step_toward(actor.position, destination, actor.speed, ctx.dt);
        match try_move(ctx.tiles, ctx.index, actor.id, actor.collision_box(), delta) {
            MoveResult::Accepted(origin) => {
                self.blocked_secs = 0.0;
                actor.apply_move(origin, false);
            }
            MoveResult::Blocked(reason) => {
                self.blocked_secs += ctx.dt;
                if self.blocked_secs >= ctx.config.stuck_threshold_secs {
                    warn!(
                        npc = %actor.name,
                        target = ?target,
                        ?reason,
                        "travel abandoned after {:.1}s blocked",
                        self.blocked_secs
                    );
                    self.blocked_secs = 0.0;
                    actor.stop();
                    events.push(BehaviorEvent::Stuck { target });
                    self.set_state(NpcState::Idle, events);
                }
            }
        }
    }

    /// Start performing: roll a duration so co-scheduled NPCs drift
    /// apart, and ask for a flavor line
    fn begin_performing<R: Rng>(
        &mut self,
        activity: Activity,
        ctx: &mut BehaviorCtx<R>,
        events: &mut Vec<BehaviorEvent>,
    ) {
        self.performing_remaining = ctx
            .rng
            .gen_range(ctx.config.activity_min_secs..=ctx.config.activity_max_secs);
        self.current_activity = Some(activity);
        events.push(BehaviorEvent::FlavorRequest { activity });
        self.set_state(NpcState::AwaitingDialogue { activity }, events);
    }

    fn set_state(&mut self, state: NpcState, events: &mut Vec<BehaviorEvent>) {
        if self.state != state {
            self.state = state;
            events.push(BehaviorEvent::StateChanged { state });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::schedule::ScheduleEntry;
    use crate::world::collision::ColliderKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        tiles: TileWorld,
        index: CollisionIndex,
        config: SimConfig,
        rng: ChaCha8Rng,
        actor: Actor,
        machine: NpcBehaviorMachine,
    }

    impl Fixture {
        fn new(entries: Vec<ScheduleEntry>, start: Vec2) -> Self {
            let config = SimConfig::default();
            let mut index = CollisionIndex::new();
            let actor = Actor::new("Sakuragi", start, config.actor_box_size, config.walk_speed);
            index.register(actor.id, actor.collision_box(), ColliderKind::Npc);
            Self {
                tiles: TileWorld::new(20, 20),
                index,
                config,
                rng: ChaCha8Rng::seed_from_u64(11),
                actor,
                machine: NpcBehaviorMachine::new(ScheduleTable::new(entries).unwrap()),
            }
        }

        fn tick(&mut self, minute: u16, dt: f32, pending: bool) -> Vec<BehaviorEvent> {
            let mut ctx = BehaviorCtx {
                tiles: &self.tiles,
                index: &mut self.index,
                config: &self.config,
                minute_of_day: minute,
                dt,
                dialogue_pending: pending,
                rng: &mut self.rng,
            };
            self.machine.advance(&mut self.actor, &mut ctx)
        }
    }

    fn work_entry(minute: u16, x: i32, y: i32) -> ScheduleEntry {
        ScheduleEntry {
            minute_of_day: minute,
            activity: Activity::Working,
            target: GridPos::new(x, y),
        }
    }

    fn centered_on(tile: GridPos, box_size: f32) -> Vec2 {
        let half = box_size / 2.0;
        tile.center() - Vec2::new(half, half)
    }

    #[test]
    fn test_colocated_skips_travel() {
        // Already standing on the target tile when the entry comes due
        let start = centered_on(GridPos::new(10, 5), 0.8);
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], start);

        let events = fx.tick(480, 0.1, false);
        assert!(events.contains(&BehaviorEvent::FlavorRequest {
            activity: Activity::Working
        }));
        assert!(matches!(
            fx.machine.state(),
            NpcState::AwaitingDialogue {
                activity: Activity::Working
            }
        ));

        // Flavor line resolved: drop into Performing
        fx.tick(480, 0.1, false);
        assert!(matches!(
            fx.machine.state(),
            NpcState::Performing {
                activity: Activity::Working
            }
        ));
    }

    #[test]
    fn test_travels_then_performs() {
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], Vec2::new(0.1, 0.1));

        fx.tick(480, 0.1, false);
        assert!(matches!(fx.machine.state(), NpcState::MovingTo { .. }));

        let mut arrived = false;
        for _ in 0..400 {
            let events = fx.tick(480, 0.05, false);
            if events
                .iter()
                .any(|e| matches!(e, BehaviorEvent::Arrived { .. }))
            {
                arrived = true;
                break;
            }
        }
        assert!(arrived, "NPC never reached its target");
        assert_eq!(fx.actor.tile(), GridPos::new(10, 5));
        assert!(matches!(
            fx.machine.state(),
            NpcState::AwaitingDialogue { .. }
        ));
    }

    #[test]
    fn test_performance_ends_back_to_idle() {
        let start = centered_on(GridPos::new(10, 5), 0.8);
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], start);

        fx.tick(480, 0.1, false); // AwaitingDialogue
        fx.tick(480, 0.1, false); // Performing

        // Burn through the rolled duration (at most activity_max_secs)
        for _ in 0..2000 {
            fx.tick(495, 0.1, false);
            if fx.machine.state() == NpcState::Idle {
                break;
            }
        }
        assert_eq!(fx.machine.state(), NpcState::Idle);
    }

    #[test]
    fn test_finished_entry_does_not_retrigger() {
        let start = centered_on(GridPos::new(10, 5), 0.8);
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], start);

        fx.tick(480, 0.1, false);
        fx.tick(480, 0.1, false);
        for _ in 0..2000 {
            fx.tick(482, 0.1, false);
            if fx.machine.state() == NpcState::Idle {
                break;
            }
        }
        // Still inside the tolerance window, but Working already ran
        let events = fx.tick(483, 0.1, false);
        assert!(events.is_empty());
        assert_eq!(fx.machine.state(), NpcState::Idle);
    }

    #[test]
    fn test_stuck_travel_abandoned() {
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], Vec2::new(0.1, 5.0));
        // Wall off the entire column ahead
        for y in 0..20 {
            fx.tiles.set_walkable(2, y, false);
        }

        fx.tick(480, 0.1, false);
        assert!(matches!(fx.machine.state(), NpcState::MovingTo { .. }));

        let mut stuck = false;
        // stuck_threshold_secs is 3.0; 40 ticks of 0.1s is plenty
        for _ in 0..40 {
            let events = fx.tick(480, 0.1, false);
            if events
                .iter()
                .any(|e| matches!(e, BehaviorEvent::Stuck { .. }))
            {
                stuck = true;
                break;
            }
        }
        assert!(stuck);
        assert_eq!(fx.machine.state(), NpcState::Idle);
    }

    #[test]
    fn test_unwalkable_target_skipped() {
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], Vec2::new(0.1, 0.1));
        fx.tiles.set_walkable(10, 5, false);

        let events = fx.tick(480, 0.1, false);
        assert!(events.is_empty());
        assert_eq!(fx.machine.state(), NpcState::Idle);
    }

    #[test]
    fn test_chat_suspends_and_resumes() {
        let start = centered_on(GridPos::new(10, 5), 0.8);
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], start);
        fx.tick(480, 0.1, false);
        fx.tick(480, 0.1, false);
        let before = fx.machine.state();
        assert!(matches!(before, NpcState::Performing { .. }));

        assert!(fx.machine.begin_chat());
        assert_eq!(fx.machine.state(), NpcState::Chatting);

        // Schedule evaluation is suspended while chatting
        let events = fx.tick(480, 5.0, false);
        assert!(events.is_empty());
        assert_eq!(fx.machine.state(), NpcState::Chatting);

        fx.machine.end_chat();
        assert_eq!(fx.machine.state(), before);
    }

    #[test]
    fn test_chat_refused_while_travelling() {
        let mut fx = Fixture::new(vec![work_entry(480, 10, 5)], Vec2::new(0.1, 0.1));
        fx.tick(480, 0.1, false);
        assert!(matches!(fx.machine.state(), NpcState::MovingTo { .. }));
        assert!(!fx.machine.begin_chat());
        assert!(matches!(fx.machine.state(), NpcState::MovingTo { .. }));
    }

    #[test]
    fn test_end_chat_without_chat_is_noop() {
        let mut fx = Fixture::new(vec![], Vec2::new(1.0, 1.0));
        fx.machine.end_chat();
        assert_eq!(fx.machine.state(), NpcState::Idle);
    }

    #[test]
    fn test_stale_schedule_redirect_on_arrival() {
        // Working due at 480 at (10,5); shopping due at 490 at (3,3).
        // Time jumps past the working window during travel, so arrival
        // re-checks and redirects instead of performing a stale activity.
        let entries = vec![
            work_entry(480, 10, 5),
            ScheduleEntry {
                minute_of_day: 495,
                activity: Activity::Shopping,
                target: GridPos::new(3, 3),
            },
        ];
        let mut fx = Fixture::new(entries, Vec2::new(0.1, 0.1));

        fx.tick(480, 0.1, false);
        assert!(matches!(
            fx.machine.state(),
            NpcState::MovingTo {
                activity: Activity::Working,
                ..
            }
        ));

        // Travel with the clock already moved to the shopping window
        for _ in 0..400 {
            let events = fx.tick(495, 0.05, false);
            if events
                .iter()
                .any(|e| matches!(e, BehaviorEvent::Arrived { .. }))
            {
                break;
            }
        }
        assert!(matches!(
            fx.machine.state(),
            NpcState::MovingTo {
                activity: Activity::Shopping,
                ..
            }
        ));
    }
}
