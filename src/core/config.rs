//! Streaming configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Recognized configuration options
///
/// All values are fixed once a scheduler or manager is built from them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Number of OS worker threads
    pub worker_threads: usize,
    /// Cooperative job-pulling tasks per worker thread
    pub worker_tasks_per_thread: usize,
    /// Capacity of the worker job queue
    pub worker_queue_capacity: usize,
    /// Cooperative job-pulling tasks on the presentation thread
    pub presentation_tasks: usize,
    /// Capacity of the presentation job queue
    pub presentation_queue_capacity: usize,
    /// Diameter (in cells) of the fully loaded neighborhood
    pub near_diameter: u32,
    /// Diameter (in cells) of the low-detail neighborhood, at least `near_diameter`
    pub far_diameter: u32,
    pub interior_cache_capacity: usize,
    pub exterior_cache_capacity: usize,
    pub world_cache_capacity: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            worker_tasks_per_thread: 8,
            worker_queue_capacity: 256,
            presentation_tasks: 8,
            presentation_queue_capacity: 256,
            near_diameter: 3,
            far_diameter: 7,
            interior_cache_capacity: 8,
            exterior_cache_capacity: 32,
            world_cache_capacity: 4,
        }
    }
}

impl StreamingConfig {
    /// Load a config from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        log::debug!("Loaded streaming config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Check the options are usable together
    pub fn validate(&self) -> Result<()> {
        let nonzero = [
            ("worker_threads", self.worker_threads),
            ("worker_tasks_per_thread", self.worker_tasks_per_thread),
            ("worker_queue_capacity", self.worker_queue_capacity),
            ("presentation_tasks", self.presentation_tasks),
            ("presentation_queue_capacity", self.presentation_queue_capacity),
            ("interior_cache_capacity", self.interior_cache_capacity),
            ("exterior_cache_capacity", self.exterior_cache_capacity),
            ("world_cache_capacity", self.world_cache_capacity),
        ];
        if let Some((name, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(Error::Config(format!("{name} must be at least 1")));
        }
        if self.far_diameter < self.near_diameter {
            return Err(Error::Config(format!(
                "far_diameter ({}) must not be smaller than near_diameter ({})",
                self.far_diameter, self.near_diameter
            )));
        }
        Ok(())
    }
}
