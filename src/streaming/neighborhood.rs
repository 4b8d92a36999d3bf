//! Grid neighborhood queries
//!
//! A neighborhood of diameter `d` around `(x, y)` spans
//! `[x - (d+1)/2 + 1, x + d/2]` on each axis (integer division), clipped to
//! the world's populated bounds. Odd diameters are centered; even diameters
//! lean toward the positive side. Diameter 0 is just the center cell.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::error::Error;
use crate::core::types::{CellIndex, RecordId, Result};
use crate::world::{GridBounds, World};

/// Unclipped rectangle of a neighborhood
pub fn neighborhood_rect(center: CellIndex, diameter: u32) -> GridBounds {
    if diameter == 0 {
        return GridBounds::new(center, center);
    }
    let d = diameter as i64;
    let span = |c: i32| {
        let c = c as i64;
        let lo = (c - (d + 1) / 2 + 1).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        let hi = (c + d / 2).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        (lo, hi)
    };
    let (min_x, max_x) = span(center.x);
    let (min_y, max_y) = span(center.y);
    GridBounds::new(CellIndex::new(min_x, min_y), CellIndex::new(max_x, max_y))
}

/// A clipped square of cells in one world
#[derive(Debug, Clone)]
pub struct Neighborhood {
    world: Arc<World>,
    center: CellIndex,
    diameter: u32,
    rect: GridBounds,
}

impl Neighborhood {
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn center(&self) -> CellIndex {
        self.center
    }

    pub fn diameter(&self) -> u32 {
        self.diameter
    }

    /// Covered rectangle, already clipped to the world bounds
    pub fn rect(&self) -> GridBounds {
        self.rect
    }

    pub fn contains(&self, index: CellIndex) -> bool {
        self.rect.contains(index)
    }

    /// Populated cells, row-major
    pub fn cells(&self) -> impl Iterator<Item = (CellIndex, RecordId)> + '_ {
        self.rect
            .iter()
            .filter_map(|idx| self.world.cell(idx).map(|id| (idx, id)))
    }

    /// Ids of every populated cell
    pub fn ids(&self) -> HashSet<RecordId> {
        self.cells().map(|(_, id)| id).collect()
    }

    /// Number of grid positions covered, populated or not
    pub fn len(&self) -> u64 {
        self.rect.cell_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Answers cell and neighborhood queries against registered worlds
#[derive(Debug, Default)]
pub struct NeighborhoodResolver {
    worlds: RwLock<HashMap<RecordId, Arc<World>>>,
}

impl NeighborhoodResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a world's grid queryable
    pub fn register(&self, world: Arc<World>) {
        log::trace!("Resolver: registered world {}", world.id());
        self.worlds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(world.id(), world);
    }

    pub fn forget(&self, id: RecordId) -> Option<Arc<World>> {
        self.worlds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn world(&self, id: RecordId) -> Option<Arc<World>> {
        self.worlds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn is_registered(&self, id: RecordId) -> bool {
        self.worlds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Exterior cell id at `index`, or `None` when out of bounds or unregistered
    pub fn get_cell(&self, world: RecordId, index: CellIndex) -> Option<RecordId> {
        self.world(world)?.cell(index)
    }

    /// Square of cells around `center`, clipped to the world's bounds
    ///
    /// # Arguments
    /// * `world` - Registered world to query
    /// * `center` - Cell the square is centered on; may lie outside the bounds
    /// * `diameter` - Side length in cells, 0 meaning just `center`
    ///
    /// # Returns
    /// The clipped neighborhood, `Error::NotFound` for an unregistered world,
    /// or `Error::EmptyNeighborhood` when nothing of the square lies in bounds
    pub fn get_neighborhood(&self, world: RecordId, center: CellIndex, diameter: u32) -> Result<Neighborhood> {
        let world = self.world(world).ok_or(Error::NotFound(world))?;
        let empty = || Error::EmptyNeighborhood {
            world: world.id(),
            center,
            diameter,
        };
        let bounds = world.bounds().ok_or_else(empty)?;
        let rect = neighborhood_rect(center, diameter)
            .intersect(&bounds)
            .ok_or_else(empty)?;
        Ok(Neighborhood {
            world,
            center,
            diameter,
            rect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{MemoryRecords, RecordSource, SceneContext, WorldLayout};

    const WORLD: RecordId = RecordId(1);

    fn bounded_world(bounds: GridBounds) -> Arc<World> {
        let mut records = MemoryRecords::new();
        records.add_world(WORLD, "test");
        records.fill_grid(WORLD, bounds, 100);
        let mut layout = WorldLayout::default();
        records.load_children(WORLD, &mut layout).unwrap();
        let record = records.load_record(WORLD).unwrap();
        Arc::new(World::from_layout(&record, layout, SceneContext(1)))
    }

    fn unbounded_world() -> Arc<World> {
        let mut records = MemoryRecords::new();
        records.add_bounded_world(WORLD, "open", GridBounds::UNBOUNDED);
        // sparse cells, the explicit bounds make every index addressable
        for (i, (x, y)) in [(4, 4), (5, 5), (6, 6), (4, 6)].into_iter().enumerate() {
            records.add_exterior(WORLD, RecordId(200 + i as u32), CellIndex::new(x, y));
        }
        let mut layout = WorldLayout::default();
        records.load_children(WORLD, &mut layout).unwrap();
        let record = records.load_record(WORLD).unwrap();
        Arc::new(World::from_layout(&record, layout, SceneContext(1)))
    }

    fn resolver_with(world: Arc<World>) -> NeighborhoodResolver {
        let resolver = NeighborhoodResolver::new();
        resolver.register(world);
        resolver
    }

    #[test]
    fn test_rect_diameter_three_is_centered() {
        let rect = neighborhood_rect(CellIndex::new(5, 5), 3);
        assert_eq!(rect, GridBounds::new(CellIndex::new(4, 4), CellIndex::new(6, 6)));
    }

    #[test]
    fn test_rect_even_diameter_leans_positive() {
        let rect = neighborhood_rect(CellIndex::new(0, 0), 4);
        assert_eq!(rect, GridBounds::new(CellIndex::new(-1, -1), CellIndex::new(2, 2)));
        assert_eq!(rect.cell_count(), 16);
    }

    #[test]
    fn test_rect_diameter_zero_and_one_are_the_center() {
        let center = CellIndex::new(-3, 8);
        assert_eq!(neighborhood_rect(center, 0), GridBounds::new(center, center));
        assert_eq!(neighborhood_rect(center, 1), GridBounds::new(center, center));
    }

    #[test]
    fn test_rect_saturates_at_grid_edge() {
        let rect = neighborhood_rect(CellIndex::new(i32::MAX, i32::MIN), 5);
        assert_eq!(rect.max.x, i32::MAX);
        assert_eq!(rect.min.y, i32::MIN);
        assert_eq!(rect.min.x, i32::MAX - 2);
        assert_eq!(rect.max.y, i32::MIN + 2);
    }

    #[test]
    fn test_unbounded_world_neighborhood() {
        let resolver = resolver_with(unbounded_world());
        let hood = resolver.get_neighborhood(WORLD, CellIndex::new(5, 5), 3).unwrap();

        assert_eq!(hood.rect(), GridBounds::new(CellIndex::new(4, 4), CellIndex::new(6, 6)));
        assert_eq!(hood.len(), 9);
        assert!(hood.contains(CellIndex::new(4, 6)));
        assert!(!hood.contains(CellIndex::new(7, 5)));
        let ids = hood.ids();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains(&RecordId(201)));
    }

    #[test]
    fn test_clipped_to_world_bounds() {
        let bounds = GridBounds::new(CellIndex::new(0, 0), CellIndex::new(9, 9));
        let resolver = resolver_with(bounded_world(bounds));

        let corner = resolver.get_neighborhood(WORLD, CellIndex::new(0, 0), 3).unwrap();
        assert_eq!(corner.rect(), GridBounds::new(CellIndex::new(0, 0), CellIndex::new(1, 1)));
        assert_eq!(corner.ids().len(), 4);

        let inner = resolver.get_neighborhood(WORLD, CellIndex::new(5, 5), 5).unwrap();
        assert_eq!(inner.ids().len(), 25);
    }

    #[test]
    fn test_center_outside_bounds_still_overlaps() {
        let bounds = GridBounds::new(CellIndex::new(0, 0), CellIndex::new(9, 9));
        let resolver = resolver_with(bounded_world(bounds));
        let hood = resolver.get_neighborhood(WORLD, CellIndex::new(-1, 5), 3).unwrap();
        assert_eq!(hood.rect(), GridBounds::new(CellIndex::new(0, 4), CellIndex::new(0, 6)));
    }

    #[test]
    fn test_disjoint_is_empty_neighborhood() {
        let bounds = GridBounds::new(CellIndex::new(0, 0), CellIndex::new(9, 9));
        let resolver = resolver_with(bounded_world(bounds));
        let err = resolver.get_neighborhood(WORLD, CellIndex::new(50, 50), 3).unwrap_err();
        assert!(matches!(err, Error::EmptyNeighborhood { diameter: 3, .. }));
    }

    #[test]
    fn test_diameter_zero_outside_bounds_is_empty() {
        let bounds = GridBounds::new(CellIndex::new(0, 0), CellIndex::new(9, 9));
        let resolver = resolver_with(bounded_world(bounds));
        assert!(resolver.get_neighborhood(WORLD, CellIndex::new(10, 0), 0).is_err());
        let single = resolver.get_neighborhood(WORLD, CellIndex::new(9, 0), 0).unwrap();
        assert_eq!(single.ids().len(), 1);
    }

    #[test]
    fn test_unknown_world() {
        let resolver = NeighborhoodResolver::new();
        assert!(matches!(
            resolver.get_neighborhood(RecordId(9), CellIndex::new(0, 0), 1),
            Err(Error::NotFound(RecordId(9)))
        ));
        assert_eq!(resolver.get_cell(RecordId(9), CellIndex::new(0, 0)), None);
    }

    #[test]
    fn test_get_cell_and_forget() {
        let bounds = GridBounds::new(CellIndex::new(0, 0), CellIndex::new(2, 2));
        let resolver = resolver_with(bounded_world(bounds));
        assert_eq!(resolver.get_cell(WORLD, CellIndex::new(0, 0)), Some(RecordId(100)));
        assert_eq!(resolver.get_cell(WORLD, CellIndex::new(1, 0)), Some(RecordId(101)));
        assert_eq!(resolver.get_cell(WORLD, CellIndex::new(3, 0)), None);

        assert!(resolver.forget(WORLD).is_some());
        assert!(!resolver.is_registered(WORLD));
    }
}
