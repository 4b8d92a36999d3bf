//! Record layer: raw cell and world records by id
//!
//! The real record layer parses the world file; this crate only consumes it
//! through `RecordSource`. `MemoryRecords` is an in-memory implementation used
//! by tests, benchmarks and the demo, optionally loaded from a JSON manifest.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::world::GridBounds;
use crate::core::error::Error;
use crate::core::types::{CellIndex, RecordId, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Interior,
    Exterior,
    World,
}

/// Raw record as supplied by the record layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub kind: RecordKind,
    /// Owning world of an exterior cell
    #[serde(default)]
    pub world: Option<RecordId>,
    /// Grid position of an exterior cell
    #[serde(default)]
    pub index: Option<CellIndex>,
    /// Explicit populated bounds of a world
    #[serde(default)]
    pub bounds: Option<GridBounds>,
    /// Placed objects that get collision when the cell is fully loaded
    #[serde(default)]
    pub objects: Vec<RecordId>,
}

/// What `RecordSource::load_children` fills in for a world
#[derive(Debug, Default, Clone)]
pub struct WorldLayout {
    grid: BTreeMap<CellIndex, RecordId>,
    children: BTreeSet<RecordId>,
    bounds: Option<GridBounds>,
}

impl WorldLayout {
    /// Place a cell in the grid; returns the id previously at `index`, if any
    pub fn insert(&mut self, index: CellIndex, id: RecordId) -> Option<RecordId> {
        self.children.insert(id);
        self.grid.insert(index, id)
    }

    /// Override the populated bounds instead of deriving them from the grid
    pub fn set_bounds(&mut self, bounds: GridBounds) {
        self.bounds = Some(bounds);
    }

    pub fn bounds(&self) -> Option<GridBounds> {
        self.bounds
            .or_else(|| GridBounds::enclosing(self.grid.keys().copied()))
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<CellIndex, RecordId>, BTreeSet<RecordId>) {
        (self.grid, self.children)
    }
}

/// Source of raw records
pub trait RecordSource: Send + Sync {
    /// Look up a record by id
    fn resolve(&self, id: RecordId) -> Option<Record>;

    /// Populate a world's grid and child id set
    fn load_children(&self, id: RecordId, layout: &mut WorldLayout) -> Result<()>;

    /// Resolve, turning a missing record into `Error::NotFound`
    fn load_record(&self, id: RecordId) -> Result<Record> {
        self.resolve(id).ok_or(Error::NotFound(id))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    records: Vec<Record>,
}

/// In-memory record source
#[derive(Debug, Default, Clone)]
pub struct MemoryRecords {
    records: BTreeMap<RecordId, Record>,
    malformed: BTreeSet<RecordId>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON manifest of the form `{ "records": [ ... ] }`
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let manifest: Manifest = serde_json::from_reader(reader)?;
        let mut records = Self::new();
        for record in manifest.records {
            records.insert(record);
        }
        Ok(records)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let records = Self::from_json(std::io::BufReader::new(file))?;
        log::info!("Loaded {} records from {}", records.len(), path.as_ref().display());
        Ok(records)
    }

    pub fn to_json(&self) -> Result<String> {
        let manifest = Manifest {
            records: self.records.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&manifest)?)
    }

    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.id, record)
    }

    pub fn add_world(&mut self, id: RecordId, name: &str) -> &mut Self {
        self.insert(Record {
            id,
            name: name.to_string(),
            kind: RecordKind::World,
            world: None,
            index: None,
            bounds: None,
            objects: Vec::new(),
        });
        self
    }

    /// Add a world with explicit populated bounds
    pub fn add_bounded_world(&mut self, id: RecordId, name: &str, bounds: GridBounds) -> &mut Self {
        self.add_world(id, name);
        if let Some(record) = self.records.get_mut(&id) {
            record.bounds = Some(bounds);
        }
        self
    }

    pub fn add_exterior(&mut self, world: RecordId, id: RecordId, index: CellIndex) -> &mut Self {
        self.insert(Record {
            id,
            name: format!("exterior {index}"),
            kind: RecordKind::Exterior,
            world: Some(world),
            index: Some(index),
            bounds: None,
            objects: Vec::new(),
        });
        self
    }

    pub fn add_interior(&mut self, id: RecordId, name: &str) -> &mut Self {
        self.insert(Record {
            id,
            name: name.to_string(),
            kind: RecordKind::Interior,
            world: None,
            index: None,
            bounds: None,
            objects: Vec::new(),
        });
        self
    }

    /// Place an object in a cell; ignored if the cell is unknown
    pub fn add_object(&mut self, cell: RecordId, object: RecordId) -> &mut Self {
        if let Some(record) = self.records.get_mut(&cell) {
            record.objects.push(object);
        }
        self
    }

    /// Add one exterior cell for every index in `bounds`, ids counting up from `first_id`
    pub fn fill_grid(&mut self, world: RecordId, bounds: GridBounds, first_id: u32) -> Vec<RecordId> {
        bounds
            .iter()
            .enumerate()
            .map(|(i, index)| {
                let id = RecordId(first_id + i as u32);
                self.add_exterior(world, id, index);
                id
            })
            .collect()
    }

    /// Make any later load of `id` fail with `Error::MalformedData`
    pub fn mark_malformed(&mut self, id: RecordId) -> &mut Self {
        self.malformed.insert(id);
        self
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        self.records.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_malformed(&self, id: RecordId) -> Result<()> {
        if self.malformed.contains(&id) {
            return Err(Error::MalformedData {
                id,
                reason: "record failed to parse".into(),
            });
        }
        Ok(())
    }
}

impl RecordSource for MemoryRecords {
    fn resolve(&self, id: RecordId) -> Option<Record> {
        self.records.get(&id).cloned()
    }

    fn load_record(&self, id: RecordId) -> Result<Record> {
        self.check_malformed(id)?;
        self.resolve(id).ok_or(Error::NotFound(id))
    }

    fn load_children(&self, id: RecordId, layout: &mut WorldLayout) -> Result<()> {
        self.check_malformed(id)?;
        let world = self.records.get(&id).ok_or(Error::NotFound(id))?;
        if world.kind != RecordKind::World {
            return Err(Error::MalformedData {
                id,
                reason: format!("expected a world record, found {:?}", world.kind),
            });
        }

        let cells = self
            .records
            .values()
            .filter(|r| r.kind == RecordKind::Exterior && r.world == Some(id));
        for cell in cells {
            let index = cell.index.ok_or_else(|| Error::MalformedData {
                id: cell.id,
                reason: "exterior cell without a grid index".into(),
            })?;
            if let Some(previous) = layout.insert(index, cell.id) {
                return Err(Error::MalformedData {
                    id: cell.id,
                    reason: format!("grid index {index} already holds {previous}"),
                });
            }
        }
        if let Some(bounds) = world.bounds {
            layout.set_bounds(bounds);
        }

        log::trace!("World {} has {} cells", id, layout.len());
        Ok(())
    }
}
