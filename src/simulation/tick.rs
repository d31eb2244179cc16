//! The driver loop's single entry point
//!
//! One call advances the whole simulation by `dt`: clock, every NPC in
//! spawn order, then the dialogue orchestrator. All mutation happens
//! synchronously in here; the only asynchrony in the system (remote
//! dialogue calls) is observed through polling, never awaited.

use crate::npc::behavior::{BehaviorCtx, BehaviorEvent};
use crate::simulation::events::SimulationEvent;
use crate::simulation::scene::Scene;

/// Advance the scene by `dt` simulated seconds and collect everything
/// that happened.
///
/// NPCs are evaluated in spawn order against the live collision index,
/// so a later NPC sees positions already moved earlier in the same tick.
/// Last-write-within-tick visibility is the guarantee, not simultaneity.
pub fn run_simulation_tick(scene: &mut Scene, dt: f32) -> Vec<SimulationEvent> {
    scene.clock.advance(dt);
    scene.tick += 1;
    let now = scene.clock.now();
    let minute = scene.clock.minute_of_day();

    let mut events = Vec::new();

    for i in 0..scene.npcs.len() {
        let Scene {
            npcs,
            tiles,
            index,
            config,
            rng,
            orchestrator,
            ..
        } = scene;
        let npc = &mut npcs[i];
        let id = npc.actor.id;
        let name = npc.actor.name.clone();

        let behavior_events = {
            let mut ctx = BehaviorCtx {
                tiles,
                index,
                config,
                minute_of_day: minute,
                dt,
                dialogue_pending: orchestrator.is_pending(id),
                rng: &mut *rng,
            };
            npc.machine.advance(&mut npc.actor, &mut ctx)
        };

        for event in behavior_events {
            match event {
                BehaviorEvent::StateChanged { state } => {
                    events.push(SimulationEvent::NpcStateChanged {
                        npc: id,
                        name: name.clone(),
                        state,
                    });
                }
                BehaviorEvent::Arrived { tile } => {
                    events.push(SimulationEvent::NpcArrived {
                        npc: id,
                        name: name.clone(),
                        tile,
                    });
                }
                BehaviorEvent::Stuck { target } => {
                    events.push(SimulationEvent::NpcStuck {
                        npc: id,
                        name: name.clone(),
                        target,
                    });
                }
                BehaviorEvent::FlavorRequest { activity } => {
                    events.extend(
                        orchestrator
                            .request_flavor_line(id, activity.label(), now, rng)
                            .into_iter()
                            .map(SimulationEvent::from),
                    );
                }
            }
        }
    }

    let dialogue_events = scene.orchestrator.advance(now, &mut scene.rng);
    for event in dialogue_events {
        let event = SimulationEvent::from(event);
        // An idle-timeout close must also release the NPC from Chatting
        if let SimulationEvent::SessionEnded { npc: id, .. } = event {
            if let Some(npc) = scene.npcs.iter_mut().find(|n| n.actor.id == id) {
                npc.machine.end_chat();
                events.push(event.clone());
                events.push(SimulationEvent::NpcStateChanged {
                    npc: id,
                    name: npc.actor.name.clone(),
                    state: npc.machine.state(),
                });
                continue;
            }
        }
        events.push(event);
    }

    events
}

impl Scene {
    /// Convenience wrapper over [`run_simulation_tick`]
    pub fn advance(&mut self, dt: f32) -> Vec<SimulationEvent> {
        run_simulation_tick(self, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimConfig;
    use crate::core::types::{GridPos, Vec2};
    use crate::dialogue::backend::ScriptedBackend;
    use crate::dialogue::fallback::FallbackPool;
    use crate::dialogue::orchestrator::NpcProfile;
    use crate::npc::behavior::NpcState;
    use crate::npc::schedule::{Activity, ScheduleEntry, ScheduleTable};
    use crate::world::tiles::TileWorld;

    fn profile(name: &str) -> NpcProfile {
        NpcProfile {
            name: name.to_string(),
            role: "player".to_string(),
            personality: "quiet".to_string(),
        }
    }

    fn schedule(minute: u16, target: GridPos) -> ScheduleTable {
        ScheduleTable::new(vec![ScheduleEntry {
            minute_of_day: minute,
            activity: Activity::Playing,
            target,
        }])
        .unwrap()
    }

    fn scene_with_backend(start_minute: u16) -> (Scene, ScriptedBackend) {
        let backend = ScriptedBackend::new();
        let scene = Scene::new(
            TileWorld::new(20, 20),
            SimConfig::default(),
            Some(Box::new(backend.clone())),
            FallbackPool::default(),
            42,
            start_minute,
        )
        .unwrap();
        (scene, backend)
    }

    #[test]
    fn test_flavor_request_flows_to_backend() {
        let (mut scene, backend) = scene_with_backend(480);
        // Spawned centered on the scheduled tile: performs immediately
        let id = scene.spawn_npc(
            profile("Rukawa"),
            Vec2::new(5.1, 5.1),
            schedule(480, GridPos::new(5, 5)),
        );

        scene.advance(0.1);
        assert!(matches!(
            scene.npc_state(id),
            Some(NpcState::AwaitingDialogue { .. })
        ));
        assert_eq!(backend.outstanding(), 1);
        assert_eq!(
            backend.last_request().unwrap().player_message,
            "(Say one short line about playing.)"
        );

        backend.resolve_next("Just warming up.");
        let events = scene.advance(0.1);
        assert!(events.iter().any(|e| matches!(
            e,
            SimulationEvent::LineAdded { text, fallback: false, .. } if text == "Just warming up."
        )));

        // Resolved request releases AwaitingDialogue on the next tick
        scene.advance(0.1);
        assert!(matches!(
            scene.npc_state(id),
            Some(NpcState::Performing { .. })
        ));
    }

    #[test]
    fn test_chat_idle_timeout_releases_npc() {
        let (mut scene, _backend) = scene_with_backend(0);
        scene.spawn_player(Vec2::new(5.0, 5.0));
        let id = scene.spawn_npc(
            profile("Rukawa"),
            Vec2::new(6.0, 5.0),
            ScheduleTable::default(),
        );

        scene.interact();
        assert_eq!(scene.npc_state(id), Some(NpcState::Chatting));

        // chat_timeout_secs is 10.0 with no activity
        let mut released = false;
        for _ in 0..120 {
            let events = scene.advance(0.1);
            if events
                .iter()
                .any(|e| matches!(e, SimulationEvent::SessionEnded { .. }))
            {
                released = true;
                break;
            }
        }
        assert!(released);
        assert_eq!(scene.npc_state(id), Some(NpcState::Idle));
        assert!(scene.active_session().is_none());
    }

    #[test]
    fn test_no_bodies_overlap_after_ticks() {
        let (mut scene, _backend) = scene_with_backend(480);
        // Several NPCs converging on the same target
        for (i, name) in ["Akagi", "Kogure", "Mitsui", "Miyagi"].iter().enumerate() {
            scene.spawn_npc(
                profile(name),
                Vec2::new(1.0 + 3.0 * i as f32, 1.0),
                schedule(480, GridPos::new(10, 10)),
            );
        }

        for _ in 0..600 {
            scene.advance(0.05);
            let entries: Vec<_> = scene.collision_index().iter().collect();
            for a in 0..entries.len() {
                for b in (a + 1)..entries.len() {
                    assert!(
                        !entries[a].aabb.intersects(&entries[b].aabb),
                        "{} overlaps {}",
                        entries[a].id,
                        entries[b].id
                    );
                }
            }
        }
    }

    #[test]
    fn test_tick_counter_and_clock_advance() {
        let (mut scene, _backend) = scene_with_backend(700);
        scene.advance(30.0);
        scene.advance(30.0);
        assert_eq!(scene.tick_count(), 2);
        // 60 simulated seconds at 1 simulated minute per second
        assert_eq!(scene.clock().minute_of_day(), 760);
    }
}
