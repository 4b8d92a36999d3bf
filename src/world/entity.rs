//! Loaded cells

use std::sync::atomic::{AtomicBool, Ordering};

use super::backend::{Detail, SceneContext};
use super::record::{Record, RecordKind};
use crate::core::error::Error;
use crate::core::types::{CellIndex, RecordId, Result};
use crate::streaming::cache::Cached;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Interior,
    Exterior,
}

/// Handle to a loaded cell and the scene context backing it
///
/// Exterior entities carry their owning world's id as a back-reference; the
/// world cache uses it to find dependents when that world is evicted.
#[derive(Debug)]
pub struct Entity {
    id: RecordId,
    kind: EntityKind,
    detail: Detail,
    world: Option<RecordId>,
    index: Option<CellIndex>,
    context: SceneContext,
    visible: AtomicBool,
    retired: AtomicBool,
}

impl Entity {
    /// Build from a cell record; world records are rejected as malformed
    pub fn from_record(record: &Record, detail: Detail, context: SceneContext) -> Result<Self> {
        let kind = match record.kind {
            RecordKind::Interior => EntityKind::Interior,
            RecordKind::Exterior => EntityKind::Exterior,
            RecordKind::World => {
                return Err(Error::MalformedData {
                    id: record.id,
                    reason: "world record used as a cell".into(),
                });
            }
        };
        Ok(Self {
            id: record.id,
            kind,
            detail,
            world: record.world,
            index: record.index,
            context,
            visible: AtomicBool::new(false),
            retired: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn detail(&self) -> Detail {
        self.detail
    }

    /// Owning world, for exterior cells
    pub fn world(&self) -> Option<RecordId> {
        self.world
    }

    pub fn index(&self) -> Option<CellIndex> {
        self.index
    }

    pub fn context(&self) -> SceneContext {
        self.context
    }

    pub fn owned_by(&self, world: RecordId) -> bool {
        self.world == Some(world)
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub(crate) fn mark_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    /// Claim the right to destroy this entity's context; true only once
    pub(crate) fn retire(&self) -> bool {
        !self.retired.swap(true, Ordering::AcqRel)
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

impl Cached for Entity {
    fn cache_id(&self) -> RecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: RecordKind) -> Record {
        Record {
            id: RecordId(7),
            name: "cell".into(),
            kind,
            world: (kind == RecordKind::Exterior).then_some(RecordId(1)),
            index: (kind == RecordKind::Exterior).then_some(CellIndex::new(2, 3)),
            bounds: None,
            objects: Vec::new(),
        }
    }

    #[test]
    fn test_exterior_from_record() {
        let entity = Entity::from_record(&record(RecordKind::Exterior), Detail::Full, SceneContext(3)).unwrap();
        assert_eq!(entity.kind(), EntityKind::Exterior);
        assert!(entity.owned_by(RecordId(1)));
        assert!(!entity.owned_by(RecordId(2)));
        assert_eq!(entity.index(), Some(CellIndex::new(2, 3)));
        assert!(!entity.is_visible());
    }

    #[test]
    fn test_world_record_is_rejected() {
        let err = Entity::from_record(&record(RecordKind::World), Detail::Low, SceneContext(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedData { id: RecordId(7), .. }));
    }

    #[test]
    fn test_retire_only_once() {
        let entity = Entity::from_record(&record(RecordKind::Interior), Detail::Full, SceneContext(1)).unwrap();
        assert!(entity.retire());
        assert!(!entity.retire());
        assert!(entity.is_retired());
    }
}
