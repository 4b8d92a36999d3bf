//! Error types for cell streaming

use thiserror::Error;

use crate::core::types::{CellIndex, RecordId};

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// The record layer has no record for this id
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The record layer returned data that cannot be used
    #[error("malformed record {id}: {reason}")]
    MalformedData { id: RecordId, reason: String },

    /// The requested neighborhood does not intersect the world's bounds
    #[error("neighborhood of diameter {diameter} around {center} lies outside world {world}")]
    EmptyNeighborhood {
        world: RecordId,
        center: CellIndex,
        diameter: u32,
    },

    #[error("no world is active")]
    NoActiveWorld,

    #[error("job queue is closed")]
    SchedulerClosed,

    #[error("config error: {0}")]
    Config(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors with no defined recovery; a reconciliation hitting one reports failure
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::NotFound(_) | Error::EmptyNeighborhood { .. })
    }
}
