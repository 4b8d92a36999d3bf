//! Cell streaming around a moving observer

pub mod cache;
pub mod world_cache;
pub mod neighborhood;
pub mod stats;
pub mod manager;

pub use cache::{Cached, RecencyCache};
pub use world_cache::{SharedEntityCache, WorldCache, WorldEviction};
pub use neighborhood::{neighborhood_rect, Neighborhood, NeighborhoodResolver};
pub use stats::{ReconcileReport, StreamingStats};
pub use manager::{Location, StreamingManager, Tier};
