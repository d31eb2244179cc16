//! Static walkability grid for one loaded map
//!
//! Built once by the map loader and read-only afterwards. Movement checks
//! enumerate every tile a collision box touches, so a box overlapping the
//! map edge fails the same way as one overlapping a wall: the missing
//! tile is simply not walkable.

use crate::core::types::{Aabb, GridPos};

/// Walkability grid plus map bounds, immutable after load
#[derive(Debug, Clone)]
pub struct TileWorld {
    width: u32,
    height: u32,
    /// Row-major, `true` = walkable
    walkable: Vec<bool>,
}

impl TileWorld {
    /// All-walkable map; the loader carves out walls and water afterwards
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            walkable: vec![true; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_walkable(&mut self, x: i32, y: i32, walkable: bool) {
        if let Some(idx) = self.index(x, y) {
            self.walkable[idx] = walkable;
        }
    }

    /// Walkability of a single tile; anything outside the map is not
    /// walkable
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.index(x, y).map(|i| self.walkable[i]).unwrap_or(false)
    }

    /// True if the box lies entirely inside map bounds
    pub fn contains_box(&self, aabb: &Aabb) -> bool {
        aabb.x >= 0.0
            && aabb.y >= 0.0
            && aabb.x + aabb.width <= self.width as f32
            && aabb.y + aabb.height <= self.height as f32
    }

    /// Every tile cell the box's bounding rectangle touches, from
    /// floor(min) to floor(max) on both axes
    pub fn covered_tiles(&self, aabb: &Aabb) -> impl Iterator<Item = GridPos> {
        let x0 = aabb.x.floor() as i32;
        let y0 = aabb.y.floor() as i32;
        // Shrink the far edge a hair so a box ending exactly on a tile
        // boundary does not claim the next tile over.
        let x1 = (aabb.x + aabb.width - 1e-4).floor() as i32;
        let y1 = (aabb.y + aabb.height - 1e-4).floor() as i32;

        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| GridPos::new(x, y)))
    }

    /// True if every tile under the box is walkable
    pub fn box_walkable(&self, aabb: &Aabb) -> bool {
        self.covered_tiles(aabb)
            .all(|t| self.is_walkable(t.x, t.y))
    }

    /// True if the tile coordinate lies inside the map
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            None
        } else {
            Some((y as u32 * self.width + x as u32) as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;

    #[test]
    fn test_out_of_bounds_not_walkable() {
        let world = TileWorld::new(10, 10);
        assert!(world.is_walkable(0, 0));
        assert!(!world.is_walkable(-1, 0));
        assert!(!world.is_walkable(10, 5));
    }

    #[test]
    fn test_set_walkable() {
        let mut world = TileWorld::new(10, 10);
        world.set_walkable(3, 4, false);
        assert!(!world.is_walkable(3, 4));
        assert!(world.is_walkable(3, 5));
    }

    #[test]
    fn test_contains_box() {
        let world = TileWorld::new(10, 10);
        assert!(world.contains_box(&Aabb::new(0.0, 0.0, 0.8, 0.8)));
        assert!(world.contains_box(&Aabb::new(9.2, 9.2, 0.8, 0.8)));
        assert!(!world.contains_box(&Aabb::new(9.5, 0.0, 0.8, 0.8)));
        assert!(!world.contains_box(&Aabb::new(-0.1, 0.0, 0.8, 0.8)));
    }

    #[test]
    fn test_covered_tiles_spanning() {
        let world = TileWorld::new(10, 10);
        // A box from (1.5, 1.5) to (2.3, 2.3) touches four tiles
        let covered: Vec<_> = world
            .covered_tiles(&Aabb::new(1.5, 1.5, 0.8, 0.8))
            .collect();
        assert_eq!(covered.len(), 4);
        assert!(covered.contains(&GridPos::new(1, 1)));
        assert!(covered.contains(&GridPos::new(2, 2)));
    }

    #[test]
    fn test_covered_tiles_on_boundary() {
        let world = TileWorld::new(10, 10);
        // A box ending exactly at x=2.0 must not claim column 2
        let covered: Vec<_> = world
            .covered_tiles(&Aabb::new(1.0, 1.0, 1.0, 1.0))
            .collect();
        assert_eq!(covered, vec![GridPos::new(1, 1)]);
    }

    #[test]
    fn test_box_walkable_fails_on_wall() {
        let mut world = TileWorld::new(10, 10);
        world.set_walkable(2, 2, false);
        assert!(!world.box_walkable(&Aabb::new(1.5, 1.5, 0.8, 0.8)));
        assert!(world.box_walkable(&Aabb::new(4.0, 4.0, 0.8, 0.8)));
    }

    #[test]
    fn test_grid_pos_roundtrip() {
        let pos = GridPos::from_world(Vec2::new(3.2, 7.9));
        assert_eq!(pos, GridPos::new(3, 7));
        assert_eq!(pos.center(), Vec2::new(3.5, 7.5));
    }
}
