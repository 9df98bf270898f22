//! Small value types shared by every layer: tile positions, resource
//! stores, and terrain.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Width and height of the colony's tile grid.
pub const GRID_SIZE: i32 = 50;

/// A tile coordinate on the colony grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column, `0..GRID_SIZE`.
    pub x: i32,
    /// Row, `0..GRID_SIZE`.
    pub y: i32,
}

impl Position {
    /// Create a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance: the number of moves between two tiles when
    /// diagonal steps are allowed.
    pub const fn range_to(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Whether `other` lies within `range` tiles.
    pub const fn in_range_to(self, other: Self, range: u32) -> bool {
        self.range_to(other) <= range
    }

    /// Offset by `(dx, dy)`, or `None` on overflow.
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    /// Whether the position lies on the grid.
    pub const fn is_in_bounds(self) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < GRID_SIZE && self.y < GRID_SIZE
    }

    /// The up-to-eight adjacent tiles that lie on the grid.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        (-1_i32..=1)
            .flat_map(|dx| (-1_i32..=1).map(move |dy| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .filter_map(move |(dx, dy)| self.offset(dx, dy))
            .filter(|p| p.is_in_bounds())
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Resource held by an agent or structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    /// Units currently held.
    pub used: u32,
    /// Maximum units.
    pub capacity: u32,
}

impl Store {
    /// Create a store.
    pub const fn new(used: u32, capacity: u32) -> Self {
        Self { used, capacity }
    }

    /// Units that can still be added.
    pub const fn free(self) -> u32 {
        self.capacity.saturating_sub(self.used)
    }

    /// Whether nothing is held.
    pub const fn is_empty(self) -> bool {
        self.used == 0
    }

    /// Whether no more can be added.
    pub const fn is_full(self) -> bool {
        self.free() == 0
    }

    /// Whether `free / capacity` is strictly greater than `percent / 100`.
    ///
    /// Integer arithmetic only; a zero-capacity store never qualifies.
    pub fn free_ratio_exceeds(self, percent: u32) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let lhs = u64::from(self.free()).saturating_mul(100);
        let rhs = u64::from(self.capacity).saturating_mul(u64::from(percent));
        lhs > rhs
    }
}

/// Impassable tiles of the colony grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    /// Wall tiles.
    #[serde(default)]
    pub walls: BTreeSet<Position>,
}

impl Terrain {
    /// Terrain with the given walls.
    pub const fn new(walls: BTreeSet<Position>) -> Self {
        Self { walls }
    }

    /// Whether an agent can stand on `pos`.
    pub fn is_walkable(&self, pos: Position) -> bool {
        pos.is_in_bounds() && !self.walls.contains(&pos)
    }

    /// Number of walkable tiles adjacent to `pos`.
    pub fn open_neighbors(&self, pos: Position) -> u32 {
        let count = pos.neighbors().filter(|p| self.is_walkable(*p)).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_chebyshev() {
        let a = Position::new(10, 10);
        assert_eq!(a.range_to(Position::new(13, 11)), 3);
        assert_eq!(a.range_to(Position::new(10, 10)), 0);
        assert!(a.in_range_to(Position::new(15, 5), 5));
        assert!(!a.in_range_to(Position::new(16, 10), 5));
    }

    #[test]
    fn neighbors_clip_at_grid_edge() {
        assert_eq!(Position::new(10, 10).neighbors().count(), 8);
        assert_eq!(Position::new(0, 0).neighbors().count(), 3);
        assert_eq!(Position::new(49, 20).neighbors().count(), 5);
    }

    #[test]
    fn open_neighbors_skip_walls() {
        let mut walls = BTreeSet::new();
        walls.insert(Position::new(9, 9));
        walls.insert(Position::new(10, 9));
        walls.insert(Position::new(11, 9));
        let terrain = Terrain::new(walls);
        assert_eq!(terrain.open_neighbors(Position::new(10, 10)), 5);
    }

    #[test]
    fn free_ratio_threshold_is_strict() {
        // 30 of 100 free: exactly 30%, not above it.
        assert!(!Store::new(70, 100).free_ratio_exceeds(30));
        assert!(Store::new(69, 100).free_ratio_exceeds(30));
        assert!(!Store::new(0, 0).free_ratio_exceeds(0));
    }
}
