//! Dynamic registry of collision boxes
//!
//! Buildings, NPC bodies and other obstacles each register one AABB here.
//! Every entry is owned by whatever subsystem registered it (the map
//! loader for static obstacles, the scene for actor bodies) and must be
//! deregistered by that same owner; entries are never removed
//! implicitly.

use crate::core::types::{ActorId, Aabb};
use ahash::AHashMap;

/// Which subsystem owns a collision entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderKind {
    Building,
    Npc,
    Player,
    Obstacle,
}

/// One registered obstacle
#[derive(Debug, Clone)]
pub struct CollisionEntry {
    pub id: ActorId,
    pub aabb: Aabb,
    pub kind: ColliderKind,
}

/// Registry of all collision boxes on the current map
#[derive(Debug, Default)]
pub struct CollisionIndex {
    entries: AHashMap<ActorId, CollisionEntry>,
}

impl CollisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a box under an id. Returns false (and leaves the existing
    /// entry untouched) if the id is already taken.
    pub fn register(&mut self, id: ActorId, aabb: Aabb, kind: ColliderKind) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, CollisionEntry { id, aabb, kind });
        true
    }

    /// Move an existing entry to a new box. Only the owner calls this,
    /// with its own id.
    pub fn move_entry(&mut self, id: ActorId, aabb: Aabb) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.aabb = aabb;
                true
            }
            None => false,
        }
    }

    pub fn deregister(&mut self, id: ActorId) -> Option<CollisionEntry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<&CollisionEntry> {
        self.entries.get(&id)
    }

    /// First registered entry intersecting the box, ignoring `exclude`
    /// (an actor never collides with its own body)
    pub fn intersects_any(&self, aabb: &Aabb, exclude: ActorId) -> Option<ActorId> {
        self.entries
            .values()
            .find(|e| e.id != exclude && e.aabb.intersects(aabb))
            .map(|e| e.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_query() {
        let mut index = CollisionIndex::new();
        let wall = ActorId::new();
        let probe = ActorId::new();
        index.register(wall, Aabb::new(2.0, 2.0, 1.0, 1.0), ColliderKind::Building);

        assert_eq!(
            index.intersects_any(&Aabb::new(2.5, 2.5, 0.8, 0.8), probe),
            Some(wall)
        );
        assert_eq!(
            index.intersects_any(&Aabb::new(5.0, 5.0, 0.8, 0.8), probe),
            None
        );
    }

    #[test]
    fn test_own_entry_excluded() {
        let mut index = CollisionIndex::new();
        let npc = ActorId::new();
        index.register(npc, Aabb::new(1.0, 1.0, 0.8, 0.8), ColliderKind::Npc);

        // Moving within its own footprint does not self-collide
        assert_eq!(
            index.intersects_any(&Aabb::new(1.1, 1.0, 0.8, 0.8), npc),
            None
        );
    }

    #[test]
    fn test_duplicate_register_rejected() {
        let mut index = CollisionIndex::new();
        let id = ActorId::new();
        assert!(index.register(id, Aabb::new(0.0, 0.0, 1.0, 1.0), ColliderKind::Npc));
        assert!(!index.register(id, Aabb::new(5.0, 5.0, 1.0, 1.0), ColliderKind::Npc));
        // Original box untouched
        assert_eq!(index.get(id).unwrap().aabb.x, 0.0);
    }

    #[test]
    fn test_move_entry() {
        let mut index = CollisionIndex::new();
        let id = ActorId::new();
        index.register(id, Aabb::new(0.0, 0.0, 0.8, 0.8), ColliderKind::Player);
        assert!(index.move_entry(id, Aabb::new(3.0, 3.0, 0.8, 0.8)));
        assert_eq!(index.get(id).unwrap().aabb.x, 3.0);

        assert!(!index.move_entry(ActorId::new(), Aabb::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_explicit_deregister() {
        let mut index = CollisionIndex::new();
        let id = ActorId::new();
        index.register(id, Aabb::new(0.0, 0.0, 1.0, 1.0), ColliderKind::Obstacle);
        assert_eq!(index.len(), 1);
        assert!(index.deregister(id).is_some());
        assert!(index.is_empty());
        assert!(index.deregister(id).is_none());
    }
}
