//! Worlds, cells, and the external record and backend layers

pub mod backend;
pub mod entity;
pub mod record;
pub mod world;

pub use backend::{BackendCalls, Detail, HeadlessBackend, SceneBackend, SceneContext};
pub use entity::{Entity, EntityKind};
pub use record::{MemoryRecords, Record, RecordKind, RecordSource, WorldLayout};
pub use world::{GridBounds, World};
