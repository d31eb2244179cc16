//! Interactive console driver for the simulation
//!
//! A small REPL standing in for the game client: it owns the tokio
//! runtime, feeds wall-commands into the scene, and prints the event
//! stream a renderer would consume. Useful for poking at NPC routines
//! and the dialogue pipeline without a frontend.

use courtside::core::types::Vec2;
use courtside::dialogue::backend::LlmBackend;
use courtside::simulation::events::SimulationEvent;
use courtside::simulation::scene::Scene;
use courtside::world::loader;
use courtside::{Result, SimConfig};
use std::io::{BufRead, Write as _};
use tracing::warn;

/// Seconds of simulated time per REPL tick
const TICK_SECS: f32 = 1.0;

const DEMO_MAP: &str = r#"
[map]
width = 24
height = 18
blocked = [
    [0, 8], [1, 8], [2, 8], [3, 8],
    [20, 3], [21, 3], [20, 4], [21, 4],
]

[[buildings]]
name = "sports shop"
x = 4.0
y = 2.0
width = 3.0
height = 2.0

[[buildings]]
name = "gym"
x = 14.0
y = 12.0
width = 4.0
height = 3.0

[[npcs]]
name = "Akagi"
role = "sports shop owner"
personality = "stern, dependable, secretly proud of his regulars"
x = 8.5
y = 3.5

[[npcs.schedule]]
time = "08:00"
activity = "working"
target = [8, 3]

[[npcs.schedule]]
time = "12:00"
activity = "shopping"
target = [3, 12]

[[npcs.schedule]]
time = "17:10"
activity = "playing"
target = [12, 10]

[[npcs.schedule]]
time = "21:00"
activity = "resting"
target = [2, 2]

[[npcs]]
name = "Haruko"
role = "basketball fan"
personality = "cheerful, endlessly encouraging"
x = 3.5
y = 12.5

[[npcs.schedule]]
time = "08:00"
activity = "shopping"
target = [3, 12]

[[npcs.schedule]]
time = "17:10"
activity = "playing"
target = [13, 10]

[[npcs]]
name = "Miyagi"
role = "point guard"
personality = "quick-tempered, loyal, always up for one-on-one"
x = 12.5
y = 10.5

[[npcs.schedule]]
time = "08:00"
activity = "playing"
target = [12, 10]

[[npcs.schedule]]
time = "21:00"
activity = "resting"
target = [20, 14]
"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let runtime = tokio::runtime::Runtime::new()?;

    let backend = match LlmBackend::from_env(runtime.handle().clone()) {
        Ok(b) => Some(Box::new(b) as Box<dyn courtside::dialogue::DialogueBackend>),
        Err(e) => {
            warn!("no dialogue backend ({e}), using static lines only");
            None
        }
    };

    let bundle = loader::load_map_str(DEMO_MAP)?;
    let pool = bundle.fallback.clone().unwrap_or_default();

    // 07:55, five minutes before the morning routines come due
    let mut scene = Scene::new(
        bundle.tiles.clone(),
        SimConfig::default(),
        backend,
        pool,
        rand::random(),
        475,
    )?;
    bundle.populate(&mut scene);
    scene.spawn_player(Vec2::new(10.0, 6.0));

    println!("courtside console. commands:");
    println!("  t / tick        advance one second");
    println!("  run <n>         advance n seconds");
    println!("  s / status      clock, player, NPC states");
    println!("  move <dir>      step the player (up/down/left/right), add 'run' to sprint");
    println!("  talk            start a conversation with the nearest NPC");
    println!("  say <text>      speak into the active conversation");
    println!("  bye             end the conversation");
    println!("  quit");

    let stdin = std::io::stdin();
    loop {
        print!("[{}] > ", scene.clock().clock_label());
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));

        match cmd {
            "" => {}
            "t" | "tick" => print_events(&scene.advance(TICK_SECS)),
            "run" => {
                let n: u32 = rest.trim().parse().unwrap_or(1);
                for _ in 0..n {
                    print_events(&scene.advance(TICK_SECS));
                }
            }
            "s" | "status" => print_status(&scene),
            "move" => {
                let mut parts = rest.split_whitespace();
                let dir = parts.next().unwrap_or("");
                let running = parts.next() == Some("run");
                let (dx, dy) = match dir {
                    "up" => (0, -1),
                    "down" => (0, 1),
                    "left" => (-1, 0),
                    "right" => (1, 0),
                    _ => {
                        println!("move up|down|left|right [run]");
                        continue;
                    }
                };
                match scene.player_move(dx, dy, running, TICK_SECS) {
                    Some(result) if result.is_accepted() => {
                        if let Some(p) = scene.player() {
                            println!("player at ({:.1}, {:.1})", p.position.x, p.position.y);
                        }
                    }
                    Some(_) => println!("blocked"),
                    None => println!("no player spawned"),
                }
                print_events(&scene.advance(TICK_SECS));
            }
            "talk" => {
                let events = scene.interact();
                if events.is_empty() {
                    println!("nobody in range");
                } else {
                    print_events(&events);
                }
            }
            "say" => {
                if rest.is_empty() {
                    println!("say <text>");
                    continue;
                }
                print_events(&scene.player_says(rest));
                // Give the backend a moment to answer
                for _ in 0..3 {
                    print_events(&scene.advance(TICK_SECS));
                }
            }
            "bye" => print_events(&scene.end_dialogue()),
            "quit" | "exit" => {
                scene.teardown();
                break;
            }
            _ => println!("unknown command '{cmd}'"),
        }
    }

    Ok(())
}

fn print_events(events: &[SimulationEvent]) {
    for event in events {
        match event {
            SimulationEvent::NpcStateChanged { name, state, .. } => {
                println!("  {} -> {}", name, state.label());
            }
            SimulationEvent::NpcArrived { name, tile, .. } => {
                println!("  {} arrived at ({}, {})", name, tile.x, tile.y);
            }
            SimulationEvent::NpcStuck { name, target, .. } => {
                println!("  {} gave up reaching ({}, {})", name, target.x, target.y);
            }
            SimulationEvent::SessionStarted { .. } => {
                println!("  (conversation started)");
            }
            SimulationEvent::LineAdded {
                speaker,
                text,
                fallback,
                ..
            } => {
                let tag = if *fallback { " *" } else { "" };
                println!("  {speaker}: {text}{tag}");
            }
            SimulationEvent::SessionEnded { .. } => {
                println!("  (conversation ended)");
            }
        }
    }
}

fn print_status(scene: &Scene) {
    println!("clock: {}", scene.clock().clock_label());
    if let Some(p) = scene.player() {
        println!(
            "player: ({:.1}, {:.1}) facing {:?}",
            p.position.x, p.position.y, p.facing
        );
    }
    for npc in scene.npcs() {
        println!(
            "{:>8}: {:<18} at ({:.1}, {:.1})",
            npc.actor.name,
            npc.machine.state().label(),
            npc.actor.position.x,
            npc.actor.position.y
        );
    }
    if let Some(session) = scene.active_session() {
        println!("in conversation ({} lines)", session.lines().len());
    }
}
