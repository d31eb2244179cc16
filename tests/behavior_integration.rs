//! Schedule-driven NPC routines run end to end through the scene

use courtside::core::types::{GridPos, Vec2};
use courtside::dialogue::fallback::FallbackPool;
use courtside::dialogue::orchestrator::NpcProfile;
use courtside::npc::behavior::NpcState;
use courtside::npc::schedule::{Activity, ScheduleEntry, ScheduleTable};
use courtside::simulation::events::SimulationEvent;
use courtside::simulation::scene::Scene;
use courtside::world::tiles::TileWorld;
use courtside::SimConfig;

fn profile(name: &str) -> NpcProfile {
    NpcProfile {
        name: name.to_string(),
        role: "regular".to_string(),
        personality: "steady".to_string(),
    }
}

fn entry(minute: u16, activity: Activity, x: i32, y: i32) -> ScheduleEntry {
    ScheduleEntry {
        minute_of_day: minute,
        activity,
        target: GridPos::new(x, y),
    }
}

fn scene(tiles: TileWorld, start_minute: u16) -> Scene {
    Scene::new(
        tiles,
        SimConfig::default(),
        None,
        FallbackPool::default(),
        1234,
        start_minute,
    )
    .unwrap()
}

#[test]
fn colocated_npc_performs_without_travel() {
    let mut scene = scene(TileWorld::new(20, 20), 480);
    let id = scene.spawn_npc(
        profile("Akagi"),
        // Centered on the target tile already
        Vec2::new(10.1, 5.1),
        ScheduleTable::new(vec![entry(480, Activity::Working, 10, 5)]).unwrap(),
    );

    let events = scene.advance(0.1);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SimulationEvent::NpcArrived { .. })),
        "no MovingTo phase expected"
    );
    assert!(matches!(
        scene.npc_state(id),
        Some(NpcState::AwaitingDialogue {
            activity: Activity::Working
        })
    ));

    // Offline backend: the flavor line fell back instantly
    scene.advance(0.1);
    assert!(matches!(
        scene.npc_state(id),
        Some(NpcState::Performing {
            activity: Activity::Working
        })
    ));
}

#[test]
fn npc_travels_to_due_entry_and_performs() {
    let mut scene = scene(TileWorld::new(20, 20), 480);
    let id = scene.spawn_npc(
        profile("Akagi"),
        Vec2::new(0.1, 0.1),
        ScheduleTable::new(vec![entry(480, Activity::Working, 10, 5)]).unwrap(),
    );

    scene.advance(0.05);
    assert!(matches!(scene.npc_state(id), Some(NpcState::MovingTo { .. })));

    let mut arrived_at = None;
    for _ in 0..600 {
        for event in scene.advance(0.05) {
            if let SimulationEvent::NpcArrived { tile, .. } = event {
                arrived_at = Some(tile);
            }
        }
        if arrived_at.is_some() {
            break;
        }
    }
    assert_eq!(arrived_at, Some(GridPos::new(10, 5)));
    assert_eq!(scene.npc_position(id).map(GridPos::from_world), Some(GridPos::new(10, 5)));
    assert!(matches!(
        scene.npc_state(id),
        Some(NpcState::AwaitingDialogue { .. }) | Some(NpcState::Performing { .. })
    ));
}

#[test]
fn npc_follows_consecutive_schedule_entries() {
    // Working at 08:00, shopping at 08:20; one simulated minute per
    // second, so 20 minutes of clock is 20 seconds of simulation
    let mut scene = scene(TileWorld::new(20, 20), 478);
    let id = scene.spawn_npc(
        profile("Akagi"),
        Vec2::new(2.1, 2.1),
        ScheduleTable::new(vec![
            entry(480, Activity::Working, 10, 5),
            entry(500, Activity::Shopping, 3, 12),
        ])
        .unwrap(),
    );

    let mut visited = Vec::new();
    for _ in 0..3000 {
        for event in scene.advance(0.1) {
            if let SimulationEvent::NpcArrived { tile, .. } = event {
                visited.push(tile);
            }
        }
    }
    assert!(visited.contains(&GridPos::new(10, 5)), "visited: {visited:?}");
    assert!(visited.contains(&GridPos::new(3, 12)), "visited: {visited:?}");
    assert!(scene.npc_state(id).is_some());
}

#[test]
fn walled_in_npc_reports_stuck_and_recovers() {
    let mut tiles = TileWorld::new(20, 20);
    // Wall across the map between the NPC and its target
    for y in 0..20 {
        tiles.set_walkable(5, y, false);
    }
    let mut scene = scene(tiles, 480);
    let id = scene.spawn_npc(
        profile("Akagi"),
        Vec2::new(2.1, 5.1),
        ScheduleTable::new(vec![entry(480, Activity::Working, 10, 5)]).unwrap(),
    );

    let mut stuck = false;
    for _ in 0..200 {
        for event in scene.advance(0.1) {
            if matches!(event, SimulationEvent::NpcStuck { .. }) {
                stuck = true;
            }
        }
        if stuck {
            break;
        }
    }
    assert!(stuck, "stuck condition never surfaced");
    assert_eq!(scene.npc_state(id), Some(NpcState::Idle));

    // Recoverable: the machine keeps ticking and never panics
    scene.advance(0.1);
}

#[test]
fn schedule_matching_is_deterministic_across_runs() {
    let run = |seed: u64| -> Vec<String> {
        let mut scene = Scene::new(
            TileWorld::new(20, 20),
            SimConfig::default(),
            None,
            FallbackPool::default(),
            seed,
            478,
        )
        .unwrap();
        scene.spawn_npc(
            profile("Akagi"),
            Vec2::new(2.1, 2.1),
            ScheduleTable::new(vec![
                entry(480, Activity::Working, 10, 5),
                entry(500, Activity::Shopping, 3, 12),
            ])
            .unwrap(),
        );
        let mut states = Vec::new();
        for _ in 0..2000 {
            for event in scene.advance(0.1) {
                if let SimulationEvent::NpcStateChanged { state, .. } = event {
                    if matches!(state, NpcState::MovingTo { .. }) {
                        states.push(format!("{:?}", state.activity()));
                    }
                }
            }
        }
        states
    };

    // Same seed, same activity sequence; the rng only affects durations
    assert_eq!(run(7), run(7));
    // Different seeds still visit activities in schedule order
    let a = run(7);
    let b = run(8);
    assert_eq!(a.first(), b.first());
}
