//! TOML map and roster loader
//!
//! Maps, building footprints, NPC rosters and fallback lines are authored
//! data, not code. The raw file structs here are deliberately separate
//! from the runtime types; everything is validated on the way in so a
//! typo fails at load time with a path to the offending entry.

use crate::core::error::{CourtError, Result};
use crate::core::types::{Aabb, GridPos, Vec2};
use crate::dialogue::fallback::FallbackPool;
use crate::dialogue::orchestrator::NpcProfile;
use crate::npc::schedule::{Activity, ScheduleEntry, ScheduleTable};
use crate::simulation::scene::Scene;
use crate::world::collision::ColliderKind;
use crate::world::tiles::TileWorld;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
struct MapFile {
    map: MapDef,
    #[serde(default)]
    buildings: Vec<BuildingDef>,
    #[serde(default)]
    npcs: Vec<NpcDef>,
    #[serde(default)]
    fallback_lines: HashMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct MapDef {
    width: u32,
    height: u32,
    /// Non-walkable tiles as [x, y] pairs
    #[serde(default)]
    blocked: Vec<[i32; 2]>,
}

#[derive(Deserialize)]
struct BuildingDef {
    name: String,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Deserialize)]
struct NpcDef {
    name: String,
    role: String,
    personality: String,
    x: f32,
    y: f32,
    #[serde(default)]
    schedule: Vec<ScheduleDef>,
}

#[derive(Deserialize)]
struct ScheduleDef {
    /// "HH:MM", 24-hour
    time: String,
    activity: Activity,
    target: [i32; 2],
}

/// A validated building footprint
pub struct Building {
    pub name: String,
    pub aabb: Aabb,
}

/// A validated NPC ready to spawn
pub struct NpcSpawn {
    pub profile: NpcProfile,
    pub position: Vec2,
    pub schedule: ScheduleTable,
}

/// Everything one map file describes
pub struct MapBundle {
    pub tiles: TileWorld,
    pub buildings: Vec<Building>,
    pub npcs: Vec<NpcSpawn>,
    /// Present only when the file authors its own lines
    pub fallback: Option<FallbackPool>,
}

impl MapBundle {
    /// Register buildings and spawn NPCs into a scene built from this
    /// bundle's tiles
    pub fn populate(&self, scene: &mut Scene) {
        for building in &self.buildings {
            scene.add_obstacle(building.aabb, ColliderKind::Building);
        }
        for npc in &self.npcs {
            scene.spawn_npc(npc.profile.clone(), npc.position, npc.schedule.clone());
        }
    }
}

pub fn load_map_file(path: impl AsRef<Path>) -> Result<MapBundle> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading map");
    let text = std::fs::read_to_string(path)?;
    load_map_str(&text)
}

pub fn load_map_str(text: &str) -> Result<MapBundle> {
    let file: MapFile = toml::from_str(text).map_err(|e| CourtError::InvalidMap(e.to_string()))?;

    if file.map.width == 0 || file.map.height == 0 {
        return Err(CourtError::InvalidMap("map dimensions must be positive".into()));
    }
    let mut tiles = TileWorld::new(file.map.width, file.map.height);
    for [x, y] in &file.map.blocked {
        if !tiles.in_bounds(GridPos::new(*x, *y)) {
            return Err(CourtError::InvalidMap(format!(
                "blocked tile ({x}, {y}) outside {}x{} map",
                file.map.width, file.map.height
            )));
        }
        tiles.set_walkable(*x, *y, false);
    }

    let mut buildings = Vec::new();
    for b in file.buildings {
        if b.width <= 0.0 || b.height <= 0.0 {
            return Err(CourtError::InvalidMap(format!(
                "building '{}' has non-positive extent",
                b.name
            )));
        }
        let aabb = Aabb::new(b.x, b.y, b.width, b.height);
        if !tiles.contains_box(&aabb) {
            return Err(CourtError::InvalidMap(format!(
                "building '{}' extends outside the map",
                b.name
            )));
        }
        buildings.push(Building { name: b.name, aabb });
    }

    let mut npcs = Vec::new();
    for n in file.npcs {
        let position = Vec2::new(n.x, n.y);
        if !tiles.in_bounds(GridPos::from_world(position)) {
            return Err(CourtError::InvalidMap(format!(
                "NPC '{}' spawns outside the map",
                n.name
            )));
        }
        let entries = n
            .schedule
            .iter()
            .map(|s| {
                Ok(ScheduleEntry {
                    minute_of_day: parse_time(&s.time)?,
                    activity: s.activity,
                    target: GridPos::new(s.target[0], s.target[1]),
                })
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| CourtError::InvalidSchedule(format!("NPC '{}': {e}", n.name)))?;
        npcs.push(NpcSpawn {
            profile: NpcProfile {
                name: n.name,
                role: n.role,
                personality: n.personality,
            },
            position,
            schedule: ScheduleTable::new(entries)?,
        });
    }

    let fallback = if file.fallback_lines.is_empty() {
        None
    } else {
        Some(FallbackPool::new(file.fallback_lines))
    };

    Ok(MapBundle {
        tiles,
        buildings,
        npcs,
        fallback,
    })
}

/// "HH:MM" to minutes after midnight
fn parse_time(text: &str) -> Result<u16> {
    let bad = || CourtError::InvalidSchedule(format!("bad time '{text}', expected HH:MM"));
    let (h, m) = text.split_once(':').ok_or_else(bad)?;
    let hours: u16 = h.parse().map_err(|_| bad())?;
    let minutes: u16 = m.parse().map_err(|_| bad())?;
    if hours >= 24 || minutes >= 60 {
        return Err(bad());
    }
    Ok(hours * 60 + minutes)
}
