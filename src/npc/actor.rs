//! Actor data record
//!
//! Plain data shared by the player and every NPC. Behavior lives in
//! `NpcBehaviorMachine`, which references an actor by id; there is no
//! engine base class to inherit from, so the simulation can run headless.

use crate::core::types::{ActorId, Aabb, AnimationState, Facing, GridPos, Vec2};
use serde::{Deserialize, Serialize};

/// A moving entity on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    /// Origin of the collision box, grid units
    pub position: Vec2,
    /// Side length of the square collision box
    pub box_size: f32,
    /// Tiles per simulated second
    pub speed: f32,
    pub facing: Facing,
    pub animation: AnimationState,
}

impl Actor {
    pub fn new(name: impl Into<String>, position: Vec2, box_size: f32, speed: f32) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
            position,
            box_size,
            speed,
            facing: Facing::Down,
            animation: AnimationState::Idle,
        }
    }

    pub fn collision_box(&self) -> Aabb {
        Aabb::new(self.position.x, self.position.y, self.box_size, self.box_size)
    }

    pub fn tile(&self) -> GridPos {
        GridPos::from_world(self.position)
    }

    /// Apply an accepted move: update position, and derive facing and
    /// animation from the delta that was actually applied.
    pub fn apply_move(&mut self, new_origin: Vec2, running: bool) {
        let delta = new_origin - self.position;
        self.position = new_origin;
        if let Some(facing) = Facing::from_delta(delta) {
            self.facing = facing;
        }
        self.animation = if delta.length() < 1e-6 {
            AnimationState::Idle
        } else if running {
            AnimationState::Running
        } else {
            AnimationState::Walking
        };
    }

    pub fn stop(&mut self) {
        self.animation = AnimationState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_move_updates_facing_and_animation() {
        let mut actor = Actor::new("Sakuragi", Vec2::new(5.0, 5.0), 0.8, 4.0);
        actor.apply_move(Vec2::new(5.4, 5.0), false);
        assert_eq!(actor.facing, Facing::Right);
        assert_eq!(actor.animation, AnimationState::Walking);

        actor.apply_move(Vec2::new(5.4, 4.5), true);
        assert_eq!(actor.facing, Facing::Up);
        assert_eq!(actor.animation, AnimationState::Running);
    }

    #[test]
    fn test_zero_move_keeps_facing() {
        let mut actor = Actor::new("Rukawa", Vec2::new(1.0, 1.0), 0.8, 4.0);
        actor.apply_move(Vec2::new(1.5, 1.0), false);
        actor.apply_move(Vec2::new(1.5, 1.0), false);
        assert_eq!(actor.facing, Facing::Right);
        assert_eq!(actor.animation, AnimationState::Idle);
    }

    #[test]
    fn test_tile_from_position() {
        let actor = Actor::new("Akagi", Vec2::new(10.6, 5.2), 0.8, 4.0);
        assert_eq!(actor.tile(), GridPos::new(10, 5));
    }
}
