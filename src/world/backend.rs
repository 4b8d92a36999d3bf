//! Renderer/physics backend interface
//!
//! The backend owns GPU and physics state, so every call is expected to come
//! from the presentation thread.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::ThreadId;

use crate::core::types::RecordId;
use crate::jobs::on_presentation_thread;
use crate::jobs::queue::lock;

/// Opaque handle to a scene/physics context owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneContext(pub u64);

/// Fidelity a cell is materialized at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detail {
    /// Full geometry and collision
    Full,
    /// Terrain-only, no collision
    Low,
}

/// Operations the streaming core calls on the renderer/physics backend
pub trait SceneBackend: Send + Sync {
    fn create_context(&self, owner: RecordId) -> SceneContext;
    fn destroy_context(&self, ctx: SceneContext);
    fn attach_collision(&self, ctx: SceneContext, object: RecordId);
    fn load_detail(&self, ctx: SceneContext, id: RecordId, detail: Detail);
    fn unload_detail(&self, ctx: SceneContext, id: RecordId);
    fn set_visible(&self, ctx: SceneContext, visible: bool);
}

/// Per-operation call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCalls {
    pub create_context: usize,
    pub destroy_context: usize,
    pub attach_collision: usize,
    pub load_detail: usize,
    pub unload_detail: usize,
    pub set_visible: usize,
}

impl BackendCalls {
    pub fn total(&self) -> usize {
        self.create_context
            + self.destroy_context
            + self.attach_collision
            + self.load_detail
            + self.unload_detail
            + self.set_visible
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    live: BTreeMap<SceneContext, RecordId>,
    visible: BTreeSet<SceneContext>,
    details: BTreeMap<SceneContext, Detail>,
    collisions: BTreeMap<SceneContext, usize>,
    calls: BackendCalls,
    threads: HashSet<ThreadId>,
    off_presentation: usize,
    invalid: usize,
}

/// Backend with no renderer that only tracks what it was asked to do
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_context: AtomicU64,
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, ctx: Option<SceneContext>, apply: impl FnOnce(&mut HeadlessState)) {
        let mut state = lock(&self.state);
        state.threads.insert(std::thread::current().id());
        if !on_presentation_thread() {
            state.off_presentation += 1;
        }
        if let Some(ctx) = ctx {
            if !state.live.contains_key(&ctx) {
                log::warn!("Backend call on dead context {:?}", ctx);
                state.invalid += 1;
                return;
            }
        }
        apply(&mut state);
    }

    pub fn calls(&self) -> BackendCalls {
        lock(&self.state).calls
    }

    /// Contexts created and not yet destroyed
    pub fn live_contexts(&self) -> usize {
        lock(&self.state).live.len()
    }

    pub fn is_live(&self, ctx: SceneContext) -> bool {
        lock(&self.state).live.contains_key(&ctx)
    }

    pub fn is_visible(&self, ctx: SceneContext) -> bool {
        lock(&self.state).visible.contains(&ctx)
    }

    pub fn detail(&self, ctx: SceneContext) -> Option<Detail> {
        lock(&self.state).details.get(&ctx).copied()
    }

    pub fn collision_count(&self, ctx: SceneContext) -> usize {
        lock(&self.state).collisions.get(&ctx).copied().unwrap_or(0)
    }

    /// Number of distinct threads that made backend calls
    pub fn thread_count(&self) -> usize {
        lock(&self.state).threads.len()
    }

    /// Calls made from a thread not running a presentation scheduler
    pub fn off_presentation_calls(&self) -> usize {
        lock(&self.state).off_presentation
    }

    /// Calls that named an unknown or already destroyed context
    pub fn invalid_calls(&self) -> usize {
        lock(&self.state).invalid
    }
}

impl SceneBackend for HeadlessBackend {
    fn create_context(&self, owner: RecordId) -> SceneContext {
        let ctx = SceneContext(self.next_context.fetch_add(1, Ordering::Relaxed) + 1);
        self.record(None, |state| {
            state.calls.create_context += 1;
            state.live.insert(ctx, owner);
        });
        ctx
    }

    fn destroy_context(&self, ctx: SceneContext) {
        self.record(Some(ctx), |state| {
            state.calls.destroy_context += 1;
            state.live.remove(&ctx);
            state.visible.remove(&ctx);
            state.details.remove(&ctx);
            state.collisions.remove(&ctx);
        });
    }

    fn attach_collision(&self, ctx: SceneContext, _object: RecordId) {
        self.record(Some(ctx), |state| {
            state.calls.attach_collision += 1;
            *state.collisions.entry(ctx).or_default() += 1;
        });
    }

    fn load_detail(&self, ctx: SceneContext, _id: RecordId, detail: Detail) {
        self.record(Some(ctx), |state| {
            state.calls.load_detail += 1;
            state.details.insert(ctx, detail);
        });
    }

    fn unload_detail(&self, ctx: SceneContext, _id: RecordId) {
        self.record(Some(ctx), |state| {
            state.calls.unload_detail += 1;
            state.details.remove(&ctx);
        });
    }

    fn set_visible(&self, ctx: SceneContext, visible: bool) {
        self.record(Some(ctx), |state| {
            state.calls.set_visible += 1;
            if visible {
                state.visible.insert(ctx);
            } else {
                state.visible.remove(&ctx);
            }
        });
    }
}
