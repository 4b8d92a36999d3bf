//! Bounded recency cache
//!
//! A fixed-capacity ring ordered oldest to newest. Pushing past capacity
//! evicts the oldest element; promoting moves an element to the newest slot.
//! Capacities are small (tens to low hundreds), so lookups are linear scans.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::types::RecordId;

/// Anything that can be stored in a `RecencyCache`
pub trait Cached {
    fn cache_id(&self) -> RecordId;
}

impl<T: Cached + ?Sized> Cached for Arc<T> {
    fn cache_id(&self) -> RecordId {
        (**self).cache_id()
    }
}

/// Callback run on a value just before it leaves the cache by eviction
pub type EvictHook<T> = Box<dyn FnOnce(&T) + Send>;

struct Slot<T> {
    value: T,
    on_evict: Option<EvictHook<T>>,
}

impl<T> Slot<T> {
    /// Run the hook, then hand the value back to the caller
    fn evict(self) -> T {
        if let Some(hook) = self.on_evict {
            hook(&self.value);
        }
        self.value
    }
}

/// Fixed-capacity cache with move-to-back-on-access ordering
pub struct RecencyCache<T> {
    /// Oldest first, newest last
    slots: VecDeque<Slot<T>>,
    capacity: usize,
}

impl<T: Cached> RecencyCache<T> {
    /// Create an empty cache
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of elements kept before the oldest is evicted
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.value.cache_id() == id)
    }

    /// Look up a value without changing its recency
    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.slots
            .iter()
            .find(|slot| slot.value.cache_id() == id)
            .map(|slot| &slot.value)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.position(id).is_some()
    }

    /// Append as the newest element
    ///
    /// An older value under the same id is replaced. Eviction hooks of the
    /// departing slot run before it is returned.
    ///
    /// # Arguments
    /// * `value` - Value to insert, keyed by its `cache_id`
    ///
    /// # Returns
    /// The oldest element if one was evicted to make room, or the replaced
    /// value if the id was already cached
    pub fn push_back(&mut self, value: T) -> Option<T> {
        self.insert(value, None)
    }

    /// `push_back`, registering a hook to run if this value is later evicted
    pub fn push_back_with<F>(&mut self, value: T, on_evict: F) -> Option<T>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.insert(value, Some(Box::new(on_evict)))
    }

    fn insert(&mut self, value: T, on_evict: Option<EvictHook<T>>) -> Option<T> {
        let replaced = self
            .position(value.cache_id())
            .and_then(|pos| self.slots.remove(pos))
            .map(Slot::evict);

        self.slots.push_back(Slot { value, on_evict });

        let evicted = if self.slots.len() > self.capacity {
            self.slots.pop_front().map(Slot::evict)
        } else {
            None
        };
        if let Some(ref old) = evicted {
            log::trace!("Evicted {} from recency cache", old.cache_id());
        }
        evicted.or(replaced)
    }

    /// Move an element to the most recent position; no-op if absent
    pub fn promote(&mut self, id: RecordId) -> bool {
        match self.position(id).and_then(|pos| self.slots.remove(pos)) {
            Some(slot) => {
                self.slots.push_back(slot);
                true
            }
            None => false,
        }
    }

    /// Take a value out without running its eviction hook
    pub fn remove(&mut self, id: RecordId) -> Option<T> {
        self.position(id)
            .and_then(|pos| self.slots.remove(pos))
            .map(|slot| slot.value)
    }

    /// Take out every value matching `pred`, without running eviction hooks
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.slots.len());
        for slot in self.slots.drain(..) {
            if pred(&slot.value) {
                removed.push(slot.value);
            } else {
                kept.push_back(slot);
            }
        }
        self.slots = kept;
        removed
    }

    /// Evict everything, oldest first, running eviction hooks
    pub fn drain(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.slots.len());
        while let Some(slot) = self.slots.pop_front() {
            drained.push(slot.evict());
        }
        drained
    }

    /// Values from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().map(|slot| &slot.value)
    }

    /// Ids from oldest to newest
    pub fn ids(&self) -> Vec<RecordId> {
        self.iter().map(Cached::cache_id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Cached> std::fmt::Debug for RecencyCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyCache")
            .field("ids", &self.ids())
            .field("capacity", &self.capacity)
            .finish()
    }
}
