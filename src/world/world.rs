//! Worlds and their cell grids

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::backend::SceneContext;
use super::record::{Record, WorldLayout};
use crate::core::types::{CellIndex, RecordId};
use crate::streaming::cache::Cached;

/// Inclusive rectangle of grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridBounds {
    pub min: CellIndex,
    pub max: CellIndex,
}

impl GridBounds {
    /// Bounds covering the whole i32 grid
    pub const UNBOUNDED: GridBounds = GridBounds {
        min: CellIndex { x: i32::MIN, y: i32::MIN },
        max: CellIndex { x: i32::MAX, y: i32::MAX },
    };

    pub fn new(min: CellIndex, max: CellIndex) -> Self {
        Self { min, max }
    }

    /// Smallest bounds covering every index, `None` when there are none
    pub fn enclosing(indices: impl IntoIterator<Item = CellIndex>) -> Option<Self> {
        indices.into_iter().fold(None, |acc: Option<GridBounds>, idx| {
            Some(match acc {
                None => GridBounds::new(idx, idx),
                Some(b) => GridBounds::new(
                    CellIndex::new(b.min.x.min(idx.x), b.min.y.min(idx.y)),
                    CellIndex::new(b.max.x.max(idx.x), b.max.y.max(idx.y)),
                ),
            })
        })
    }

    pub fn contains(&self, idx: CellIndex) -> bool {
        (self.min.x..=self.max.x).contains(&idx.x) && (self.min.y..=self.max.y).contains(&idx.y)
    }

    /// Overlap of two rectangles, `None` if they are disjoint
    pub fn intersect(&self, other: &GridBounds) -> Option<GridBounds> {
        let min = CellIndex::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = CellIndex::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        (min.x <= max.x && min.y <= max.y).then_some(GridBounds { min, max })
    }

    pub fn width(&self) -> u64 {
        (self.max.x as i64 - self.min.x as i64 + 1) as u64
    }

    pub fn height(&self) -> u64 {
        (self.max.y as i64 - self.min.y as i64 + 1) as u64
    }

    pub fn cell_count(&self) -> u64 {
        self.width().saturating_mul(self.height())
    }

    /// Row-major iteration over every index in the rectangle
    pub fn iter(&self) -> impl Iterator<Item = CellIndex> + '_ {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| CellIndex::new(x, y)))
    }
}

/// A loaded world: a named, bounded grid of exterior cell ids
///
/// Exterior entities point back at their world by id; the world never holds
/// them.
#[derive(Debug)]
pub struct World {
    id: RecordId,
    name: String,
    bounds: Option<GridBounds>,
    grid: HashMap<CellIndex, RecordId>,
    children: HashSet<RecordId>,
    context: SceneContext,
}

impl World {
    /// Build a world from its record and the layout the record layer filled in
    pub fn from_layout(record: &Record, layout: WorldLayout, context: SceneContext) -> Self {
        let bounds = layout.bounds();
        let (grid, children) = layout.into_parts();
        Self {
            id: record.id,
            name: record.name.clone(),
            bounds,
            grid: grid.into_iter().collect(),
            children: children.into_iter().collect(),
            context,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Populated bounds, `None` for a world with no cells
    pub fn bounds(&self) -> Option<GridBounds> {
        self.bounds
    }

    pub fn context(&self) -> SceneContext {
        self.context
    }

    /// Cell id at `index`, `None` outside the populated bounds or on a gap
    pub fn cell(&self, index: CellIndex) -> Option<RecordId> {
        if !self.bounds?.contains(index) {
            return None;
        }
        self.grid.get(&index).copied()
    }

    pub fn has_child(&self, id: RecordId) -> bool {
        self.children.contains(&id)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }
}

impl Cached for World {
    fn cache_id(&self) -> RecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::record::RecordKind;

    fn world_record(id: u32) -> Record {
        Record {
            id: RecordId(id),
            name: format!("world-{id}"),
            kind: RecordKind::World,
            world: None,
            index: None,
            bounds: None,
            objects: Vec::new(),
        }
    }

    #[test]
    fn test_enclosing_bounds() {
        let bounds = GridBounds::enclosing([
            CellIndex::new(2, -1),
            CellIndex::new(-3, 4),
            CellIndex::new(0, 0),
        ])
        .unwrap();
        assert_eq!(bounds.min, CellIndex::new(-3, -1));
        assert_eq!(bounds.max, CellIndex::new(2, 4));
        assert_eq!(bounds.cell_count(), 36);
        assert!(GridBounds::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn test_intersect() {
        let a = GridBounds::new(CellIndex::new(0, 0), CellIndex::new(4, 4));
        let b = GridBounds::new(CellIndex::new(3, -2), CellIndex::new(9, 1));
        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap, GridBounds::new(CellIndex::new(3, 0), CellIndex::new(4, 1)));

        let far = GridBounds::new(CellIndex::new(10, 10), CellIndex::new(11, 11));
        assert!(a.intersect(&far).is_none());
        assert_eq!(GridBounds::UNBOUNDED.intersect(&a), Some(a));
    }

    #[test]
    fn test_unbounded_dimensions_do_not_overflow() {
        assert_eq!(GridBounds::UNBOUNDED.width(), 1u64 << 32);
        assert_eq!(GridBounds::UNBOUNDED.cell_count(), u64::MAX);
    }

    #[test]
    fn test_iter_row_major() {
        let bounds = GridBounds::new(CellIndex::new(0, 0), CellIndex::new(1, 1));
        let cells: Vec<_> = bounds.iter().collect();
        assert_eq!(
            cells,
            vec![
                CellIndex::new(0, 0),
                CellIndex::new(1, 0),
                CellIndex::new(0, 1),
                CellIndex::new(1, 1),
            ]
        );
    }

    #[test]
    fn test_world_cell_lookup() {
        let mut layout = WorldLayout::default();
        layout.insert(CellIndex::new(0, 0), RecordId(10));
        layout.insert(CellIndex::new(2, 1), RecordId(11));

        let world = World::from_layout(&world_record(1), layout, SceneContext(1));
        assert_eq!(world.cell(CellIndex::new(0, 0)), Some(RecordId(10)));
        assert_eq!(world.cell(CellIndex::new(2, 1)), Some(RecordId(11)));
        // inside bounds but not populated
        assert_eq!(world.cell(CellIndex::new(1, 0)), None);
        assert_eq!(world.cell(CellIndex::new(5, 5)), None);
        assert!(world.has_child(RecordId(11)));
        assert_eq!(world.cell_count(), 2);
    }

    #[test]
    fn test_empty_world_has_no_bounds() {
        let world = World::from_layout(&world_record(1), WorldLayout::default(), SceneContext(1));
        assert!(world.bounds().is_none());
        assert_eq!(world.cell(CellIndex::new(0, 0)), None);
    }
}
