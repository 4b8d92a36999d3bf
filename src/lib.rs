//! Cellstream - tile-world cell streaming on a two-tier job scheduler

pub mod core;
pub mod jobs;
pub mod world;
pub mod streaming;
