//! World cache coupled to the exterior entity cache
//!
//! Every world pushed here carries an invalidation hook. When the world is
//! evicted, the hook pulls every exterior entity owned by that world out of
//! the exterior cache, so no cached exterior outlives its world.

use std::sync::{Arc, Mutex};

use super::cache::RecencyCache;
use crate::core::types::RecordId;
use crate::jobs::queue::lock;
use crate::world::{Entity, World};

/// Exterior cache shared between the manager and every invalidation hook
pub type SharedEntityCache = Arc<Mutex<RecencyCache<Arc<Entity>>>>;

/// Eviction hook attached to each cached world
///
/// Removed entities are parked in the orphan list rather than destroyed here;
/// destroying a context needs the presentation thread, and the hook runs under
/// the world cache lock on whatever thread pushed.
struct InvalidationAdapter {
    exterior: SharedEntityCache,
    orphans: Arc<Mutex<Vec<Arc<Entity>>>>,
}

impl InvalidationAdapter {
    fn invalidate(self, world: &World) {
        let removed = lock(&self.exterior).remove_where(|e| e.owned_by(world.id()));
        if !removed.is_empty() {
            log::debug!(
                "World {} evicted, invalidating {} cached exteriors",
                world.id(),
                removed.len()
            );
        }
        lock(&self.orphans).extend(removed);
    }
}

/// What left the cache on a push or drain
#[derive(Debug, Default)]
pub struct WorldEviction {
    /// The evicted world, if any
    pub world: Option<Arc<World>>,
    /// Exterior entities the eviction pulled out of the exterior cache
    pub orphans: Vec<Arc<Entity>>,
}

impl WorldEviction {
    pub fn is_empty(&self) -> bool {
        self.world.is_none() && self.orphans.is_empty()
    }
}

/// Recency cache of worlds whose evictions invalidate dependent exteriors
///
/// Lock order: this cache, then the exterior cache.
pub struct WorldCache {
    worlds: RecencyCache<Arc<World>>,
    exterior: SharedEntityCache,
    orphans: Arc<Mutex<Vec<Arc<Entity>>>>,
}

impl WorldCache {
    pub fn new(capacity: usize, exterior: SharedEntityCache) -> Self {
        Self {
            worlds: RecencyCache::new(capacity),
            exterior,
            orphans: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get(&self, id: RecordId) -> Option<Arc<World>> {
        self.worlds.get(id).cloned()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.worlds.contains(id)
    }

    pub fn promote(&mut self, id: RecordId) -> bool {
        self.worlds.promote(id)
    }

    /// Insert as most recent, invalidating dependents of whatever gets evicted
    pub fn push_back(&mut self, world: Arc<World>) -> WorldEviction {
        let adapter = InvalidationAdapter {
            exterior: Arc::clone(&self.exterior),
            orphans: Arc::clone(&self.orphans),
        };
        let evicted = self
            .worlds
            .push_back_with(world, move |w: &Arc<World>| adapter.invalidate(w));
        if let Some(ref w) = evicted {
            log::info!("Evicted world {} ({})", w.id(), w.name());
        }
        WorldEviction {
            world: evicted,
            orphans: self.take_orphans(),
        }
    }

    /// Evict every world, oldest first
    pub fn drain(&mut self) -> Vec<WorldEviction> {
        let worlds = self.worlds.drain();
        let mut orphans = self.take_orphans();
        let mut evictions: Vec<WorldEviction> = worlds
            .into_iter()
            .map(|world| {
                let (owned, rest) = orphans.drain(..).partition(|e| e.owned_by(world.id()));
                orphans = rest;
                WorldEviction {
                    world: Some(world),
                    orphans: owned,
                }
            })
            .collect();
        if !orphans.is_empty() {
            evictions.push(WorldEviction {
                world: None,
                orphans,
            });
        }
        evictions
    }

    fn take_orphans(&self) -> Vec<Arc<Entity>> {
        std::mem::take(&mut *lock(&self.orphans))
    }

    /// Shared exterior cache this world cache invalidates into
    pub fn exterior(&self) -> &SharedEntityCache {
        &self.exterior
    }

    /// Cached world ids from oldest to newest
    pub fn ids(&self) -> Vec<RecordId> {
        self.worlds.ids()
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.worlds.capacity()
    }
}
