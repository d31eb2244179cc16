//! Movement resolution against tiles and registered colliders
//!
//! `try_move` is the single gate through which both the player and every
//! NPC change position: sweep the collision box along the desired delta,
//! rejecting on map bounds, then tiles, then other colliders, and move
//! the actor's own registry entry only on acceptance. The sweep checks
//! intermediate boxes so a large per-call displacement cannot pass
//! through a thin wall or another body. A blocked move is reported once
//! and not retried; sliding along walls is the caller's decision, not
//! the controller's.

use crate::core::types::{ActorId, Aabb, Vec2};
use crate::world::collision::CollisionIndex;
use crate::world::tiles::TileWorld;

/// Scale applied to each axis of a diagonal step so effective speed is
/// constant in all eight directions (1/sqrt(2))
pub const DIAGONAL_SCALE: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Why a move was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockReason {
    /// Target box leaves the map
    OutOfBounds,
    /// Target box covers a non-walkable tile
    Tile,
    /// Target box intersects another registered collider
    Collider(ActorId),
}

/// Outcome of a movement request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveResult {
    /// Move applied; new box origin
    Accepted(Vec2),
    Blocked(BlockReason),
}

impl MoveResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveResult::Accepted(_))
    }
}

/// Resolve a desired displacement for `actor_id` whose body currently
/// occupies `current`. The displacement is swept in steps no larger than
/// half the body size, and any obstruction along the way rejects the
/// whole move. On acceptance the actor's collision entry is moved in the
/// index; the caller updates its own position from the returned origin.
pub fn try_move(
    tiles: &TileWorld,
    index: &mut CollisionIndex,
    actor_id: ActorId,
    current: Aabb,
    delta: Vec2,
) -> MoveResult {
    let max_step = 0.5 * current.width.min(current.height);
    let steps = (delta.length() / max_step).ceil().max(1.0) as u32;

    for i in 1..=steps {
        let swept = current.translated(delta * (i as f32 / steps as f32));
        if !tiles.contains_box(&swept) {
            return MoveResult::Blocked(BlockReason::OutOfBounds);
        }
        if !tiles.box_walkable(&swept) {
            return MoveResult::Blocked(BlockReason::Tile);
        }
        if let Some(hit) = index.intersects_any(&swept, actor_id) {
            return MoveResult::Blocked(BlockReason::Collider(hit));
        }
    }

    let target = current.translated(delta);
    index.move_entry(actor_id, target);
    MoveResult::Accepted(target.origin())
}

/// Displacement for one tick of held directional input.
///
/// `dx`/`dy` are -1, 0 or 1 from the input layer; diagonals are scaled
/// by 1/sqrt(2) before applying speed so running a diagonal is no faster
/// than running straight.
pub fn input_delta(dx: i8, dy: i8, speed: f32, dt: f32) -> Vec2 {
    let mut x = dx as f32;
    let mut y = dy as f32;
    if dx != 0 && dy != 0 {
        x *= DIAGONAL_SCALE;
        y *= DIAGONAL_SCALE;
    }
    Vec2::new(x * speed * dt, y * speed * dt)
}

/// One path-follow step toward a target, clamped so the actor never
/// overshoots. Used by the NPC travel loop.
pub fn step_toward(current: Vec2, target: Vec2, speed: f32, dt: f32) -> Vec2 {
    let to_target = target - current;
    let dist = to_target.length();
    let max_step = speed * dt;
    if dist <= max_step {
        to_target
    } else {
        to_target.normalize() * max_step
    }
}
