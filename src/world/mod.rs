//! Map geometry: tile walkability, collision registry, movement gate

pub mod collision;
pub mod loader;
pub mod movement;
pub mod tiles;

pub use collision::{ColliderKind, CollisionEntry, CollisionIndex};
pub use movement::{try_move, BlockReason, MoveResult};
pub use tiles::TileWorld;
