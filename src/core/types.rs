//! Core ids, grid coordinates and re-exports

use std::fmt;

use serde::{Deserialize, Serialize};

pub use glam::{IVec2, Vec2};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Stable id of a record (cell, interior or world) in the record layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u32);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Signed 2D grid coordinate of an exterior cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    pub x: i32,
    pub y: i32,
}

impl CellIndex {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Index shifted by `(dx, dy)`, saturating at the i32 range
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Cell containing a world-space position, for cells `cell_size` units wide
    pub fn from_world_position(pos: Vec2, cell_size: f32) -> Self {
        let cell = (pos / cell_size).floor();
        Self::new(cell.x as i32, cell.y as i32)
    }
}

impl From<IVec2> for CellIndex {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_position_to_cell() {
        assert_eq!(CellIndex::from_world_position(Vec2::new(10.0, 10.0), 16.0), CellIndex::new(0, 0));
        assert_eq!(CellIndex::from_world_position(Vec2::new(20.0, -5.0), 16.0), CellIndex::new(1, -1));
        assert_eq!(CellIndex::from_world_position(Vec2::new(-16.0, 31.9), 16.0), CellIndex::new(-1, 1));
    }

    #[test]
    fn test_offset_saturates() {
        let edge = CellIndex::new(i32::MAX, i32::MIN);
        assert_eq!(edge.offset(1, -1), edge);
        assert_eq!(CellIndex::new(2, 3).offset(-1, 4), CellIndex::new(1, 7));
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId(42).to_string(), "#42");
        assert_eq!(CellIndex::new(-3, 4).to_string(), "(-3, 4)");
    }
}
