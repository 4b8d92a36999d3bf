//! Streaming manager
//!
//! Keeps two resident sets for the observer's current location: near cells
//! at full detail and far cells at low detail. `reconcile` diffs both sets
//! against the neighborhoods around a new center, fans out one job per
//! difference onto the worker scheduler, and waits on a single counter.
//!
//! Record loading runs on workers. Every backend call is routed to the
//! presentation thread.
//!
//! Lock order: reconcile lock, world cache, entity caches, residency. Only the
//! reconcile lock is held across an await.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::cache::RecencyCache;
use super::neighborhood::NeighborhoodResolver;
use super::stats::{ReconcileReport, StreamingStats};
use super::world_cache::{SharedEntityCache, WorldCache, WorldEviction};
use crate::core::config::StreamingConfig;
use crate::core::error::Error;
use crate::core::types::{CellIndex, RecordId, Result, Vec2};
use crate::jobs::queue::lock;
use crate::jobs::{Counter, Job, JobFuture, Schedulers};
use crate::world::{
    Detail, Entity, EntityKind, Record, RecordKind, RecordSource, SceneBackend, World, WorldLayout,
};

/// Resident set an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Full detail, with collision
    Near,
    /// Low detail, never cached
    Far,
}

impl Tier {
    pub fn detail(self) -> Detail {
        match self {
            Tier::Near => Detail::Full,
            Tier::Far => Detail::Low,
        }
    }
}

/// Where the observer is
#[derive(Debug, Clone, Default)]
pub enum Location {
    #[default]
    Nowhere,
    /// On a world's exterior grid
    Exterior(Arc<World>),
    /// Inside an interior cell
    Interior(RecordId),
}

/// What every cell loaded for a location must be
#[derive(Debug, Clone, Copy)]
enum Expect {
    Exterior(RecordId),
    Interior,
    Nothing,
}

impl Expect {
    fn of(location: &Location) -> Self {
        match location {
            Location::Nowhere => Expect::Nothing,
            Location::Exterior(world) => Expect::Exterior(world.id()),
            Location::Interior(_) => Expect::Interior,
        }
    }

    fn kind(self) -> Option<EntityKind> {
        match self {
            Expect::Exterior(_) => Some(EntityKind::Exterior),
            Expect::Interior => Some(EntityKind::Interior),
            Expect::Nothing => None,
        }
    }

    fn check(self, record: &Record) -> Result<()> {
        let ok = match self {
            Expect::Exterior(world) => {
                record.kind == RecordKind::Exterior && record.world == Some(world)
            }
            Expect::Interior => record.kind == RecordKind::Interior,
            Expect::Nothing => false,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::MalformedData {
                id: record.id,
                reason: format!("{:?} record does not belong to {:?}", record.kind, self),
            })
        }
    }
}

#[derive(Debug, Default)]
struct Residency {
    location: Location,
    near: HashMap<RecordId, Arc<Entity>>,
    far: HashMap<RecordId, Arc<Entity>>,
    /// Ids with a load job in flight
    loading: HashSet<RecordId>,
}

impl Residency {
    fn tier(&self, tier: Tier) -> &HashMap<RecordId, Arc<Entity>> {
        match tier {
            Tier::Near => &self.near,
            Tier::Far => &self.far,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut HashMap<RecordId, Arc<Entity>> {
        match tier {
            Tier::Near => &mut self.near,
            Tier::Far => &mut self.far,
        }
    }

    /// Whether this exact entity instance is resident
    fn holds(&self, entity: &Arc<Entity>) -> bool {
        [&self.near, &self.far]
            .iter()
            .any(|set| set.get(&entity.id()).is_some_and(|e| Arc::ptr_eq(e, entity)))
    }
}

/// How a load job finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Loaded {
    /// Built from the record layer
    Fresh,
    /// Promoted from an entity cache
    FromCache,
    /// Another job was already loading this id
    ///
    /// Not reached while reconciles are serialized and far targets exclude
    /// near ones: each id gets at most one load job per fan-out. Counted as
    /// neither a hit nor a hole.
    InFlight,
}

/// How an unload job finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unloaded {
    /// Still cached, only hidden
    Demoted,
    Destroyed,
    /// Nothing was resident under that id
    Absent,
}

/// Results collected from the jobs of one fan-out
#[derive(Debug, Default)]
struct Outcome {
    report: ReconcileReport,
    fatal: Option<Error>,
}

impl Outcome {
    fn fail(&mut self, err: Error) {
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
    }

    fn record_load(&mut self, id: RecordId, result: Result<Loaded>) {
        match result {
            Ok(Loaded::FromCache) => self.report.cache_hits += 1,
            Ok(Loaded::Fresh | Loaded::InFlight) => {}
            Err(Error::NotFound(_)) => {
                log::warn!("Cell {} not found, leaving a hole", id);
                self.report.holes.push(id);
            }
            Err(err) => {
                log::error!("Loading cell {} failed: {}", id, err);
                self.fail(err);
            }
        }
    }

    fn record_unload(&mut self, id: RecordId, result: Result<Unloaded>) {
        match result {
            Ok(Unloaded::Demoted) => self.report.demoted += 1,
            Ok(Unloaded::Destroyed) => self.report.destroyed += 1,
            Ok(Unloaded::Absent) => {}
            Err(err) => {
                log::error!("Unloading cell {} failed: {}", id, err);
                self.fail(err);
            }
        }
    }
}

/// Ids in `target` that `current` lacks
fn missing(target: &HashSet<RecordId>, current: &HashMap<RecordId, Arc<Entity>>) -> Vec<RecordId> {
    target
        .iter()
        .filter(|id| !current.contains_key(id))
        .copied()
        .collect()
}

/// Ids in `current` that `target` lacks
fn stale(current: &HashMap<RecordId, Arc<Entity>>, target: &HashSet<RecordId>) -> Vec<RecordId> {
    current
        .keys()
        .filter(|id| !target.contains(id))
        .copied()
        .collect()
}

struct Shared {
    config: StreamingConfig,
    schedulers: Schedulers,
    records: Arc<dyn RecordSource>,
    backend: Arc<dyn SceneBackend>,
    resolver: NeighborhoodResolver,
    /// Held for the whole of a reconciliation or location change
    reconcile_lock: tokio::sync::Mutex<()>,
    worlds: Mutex<WorldCache>,
    exteriors: SharedEntityCache,
    interiors: Mutex<RecencyCache<Arc<Entity>>>,
    residency: Mutex<Residency>,
    stats: Mutex<StreamingStats>,
}

impl Shared {
    fn location(&self) -> Location {
        lock(&self.residency).location.clone()
    }

    fn cache_for(&self, kind: EntityKind) -> &Mutex<RecencyCache<Arc<Entity>>> {
        match kind {
            EntityKind::Exterior => &self.exteriors,
            EntityKind::Interior => &self.interiors,
        }
    }

    /// Populated cell ids around `center`; an empty neighborhood is an empty target
    fn target(&self, world: &World, center: CellIndex, diameter: u32) -> Result<HashSet<RecordId>> {
        match self.resolver.get_neighborhood(world.id(), center, diameter) {
            Ok(hood) => Ok(hood.ids()),
            Err(Error::EmptyNeighborhood { .. }) => {
                log::debug!(
                    "No cells of world {} within diameter {} of {}",
                    world.id(),
                    diameter,
                    center
                );
                Ok(HashSet::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Diff both resident sets against the targets and run the jobs closing the gap
    ///
    /// Callers hold the reconcile lock.
    async fn converge(
        self: &Arc<Self>,
        location: Location,
        near: HashSet<RecordId>,
        far: HashSet<RecordId>,
        center: Option<CellIndex>,
    ) -> Result<ReconcileReport> {
        let expect = Expect::of(&location);
        let (near_load, near_unload, far_load, far_unload) = {
            let mut residency = lock(&self.residency);
            residency.location = location;
            (
                missing(&near, &residency.near),
                stale(&residency.near, &near),
                missing(&far, &residency.far),
                stale(&residency.far, &far),
            )
        };

        let outcome = Arc::new(Mutex::new(Outcome::default()));
        {
            let mut o = lock(&outcome);
            o.report.center = center;
            o.report.near_loads = near_load.len();
            o.report.near_unloads = near_unload.len();
            o.report.far_loads = far_load.len();
            o.report.far_unloads = far_unload.len();
        }

        let mut jobs: Vec<JobFuture> = Vec::new();
        for (tier, ids) in [(Tier::Near, near_unload), (Tier::Far, far_unload)] {
            for id in ids {
                let shared = Arc::clone(self);
                let outcome = Arc::clone(&outcome);
                jobs.push(Box::pin(async move {
                    let result = shared.unload_entity(id, tier).await;
                    lock(&outcome).record_unload(id, result);
                }));
            }
        }
        for (tier, ids) in [(Tier::Near, near_load), (Tier::Far, far_load)] {
            for id in ids {
                let shared = Arc::clone(self);
                let outcome = Arc::clone(&outcome);
                jobs.push(Box::pin(async move {
                    let result = shared.load_entity(id, tier, expect, &outcome).await;
                    lock(&outcome).record_load(id, result);
                }));
            }
        }

        self.fan_out(jobs).await?;

        let Outcome { report, fatal } = std::mem::take(&mut *lock(&outcome));
        lock(&self.stats).absorb(&report);
        log::debug!(
            "Reconciled {:?}: near +{} -{}, far +{} -{}, {} cache hits, {} holes",
            center,
            report.near_loads,
            report.near_unloads,
            report.far_loads,
            report.far_unloads,
            report.cache_hits,
            report.holes.len()
        );
        match fatal {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Submit every job against one counter and wait for all of them
    async fn fan_out(&self, jobs: Vec<JobFuture>) -> Result<()> {
        let counter = Arc::new(Counter::new(jobs.len()));
        let mut submit_error = None;
        for job in jobs {
            if submit_error.is_some() {
                counter.decrement();
                continue;
            }
            let job = Job::new(job, Some(Arc::clone(&counter)));
            if let Err(err) = self.schedulers.worker.submit(job).await {
                counter.decrement();
                submit_error = Some(err);
            }
        }
        counter.wait().await;
        submit_error.map_or(Ok(()), Err)
    }

    /// Worker-side body of a load job
    async fn load_entity(
        self: Arc<Self>,
        id: RecordId,
        tier: Tier,
        expect: Expect,
        outcome: &Mutex<Outcome>,
    ) -> Result<Loaded> {
        if !lock(&self.residency).loading.insert(id) {
            log::trace!("Cell {} is already loading", id);
            return Ok(Loaded::InFlight);
        }

        if let Some(entity) = self.take_cached(id, tier, expect) {
            self.set_visible(&entity, true).await?;
            log::trace!("Cell {} promoted from cache", id);
            return Ok(Loaded::FromCache);
        }

        let built = self.build_entity(id, tier, expect).await;
        let entity = {
            let mut residency = lock(&self.residency);
            residency.loading.remove(&id);
            let entity = built?;
            residency.tier_mut(tier).insert(id, Arc::clone(&entity));
            entity
        };

        // Resident before cached, so an immediate eviction sees it as in use
        if tier == Tier::Near {
            if let Some(evicted) = self.cache_insert(entity) {
                if self.destroy_entity(evicted).await? {
                    lock(outcome).report.destroyed += 1;
                }
            }
        }
        Ok(Loaded::Fresh)
    }

    /// Promote a cached entity and make it resident under the cache lock
    ///
    /// Resident before the lock is released, so a push from a concurrent load
    /// cannot evict and destroy it while it is being shown. A retired entry
    /// counts as a miss.
    fn take_cached(&self, id: RecordId, tier: Tier, expect: Expect) -> Option<Arc<Entity>> {
        let (Tier::Near, Some(kind)) = (tier, expect.kind()) else {
            return None;
        };
        let mut cache = lock(self.cache_for(kind));
        let entity = cache.get(id).cloned()?;
        if entity.is_retired() {
            cache.remove(id);
            return None;
        }
        cache.promote(id);

        let mut residency = lock(&self.residency);
        residency.loading.remove(&id);
        residency.tier_mut(tier).insert(id, Arc::clone(&entity));
        Some(entity)
    }

    /// Build a new entity from its record
    async fn build_entity(&self, id: RecordId, tier: Tier, expect: Expect) -> Result<Arc<Entity>> {
        let record = self.records.load_record(id)?;
        expect.check(&record)?;

        let backend = Arc::clone(&self.backend);
        let detail = tier.detail();
        let entity = self
            .schedulers
            .presentation
            .call(move || -> Result<Entity> {
                let ctx = backend.create_context(record.id);
                let entity = match Entity::from_record(&record, detail, ctx) {
                    Ok(entity) => entity,
                    Err(err) => {
                        backend.destroy_context(ctx);
                        return Err(err);
                    }
                };
                backend.load_detail(ctx, record.id, detail);
                if detail == Detail::Full {
                    for object in &record.objects {
                        backend.attach_collision(ctx, *object);
                    }
                }
                backend.set_visible(ctx, true);
                entity.mark_visible(true);
                Ok(entity)
            })
            .await??;

        log::trace!("Loaded cell {} at {:?}", id, detail);
        Ok(Arc::new(entity))
    }

    /// Push into the matching cache; returns an evicted entity nobody holds
    fn cache_insert(&self, entity: Arc<Entity>) -> Option<Arc<Entity>> {
        let mut cache = lock(self.cache_for(entity.kind()));
        let evicted = cache.push_back(entity)?;
        let residency = lock(&self.residency);
        (!residency.holds(&evicted)).then_some(evicted)
    }

    /// Worker-side body of an unload job
    async fn unload_entity(&self, id: RecordId, tier: Tier) -> Result<Unloaded> {
        let kind = match lock(&self.residency).tier(tier).get(&id) {
            Some(entity) => entity.kind(),
            None => return Ok(Unloaded::Absent),
        };

        // Decided under the cache lock so a concurrent eviction cannot also claim it
        let (entity, cached) = {
            let cache = (tier == Tier::Near).then(|| lock(self.cache_for(kind)));
            let mut residency = lock(&self.residency);
            let Some(entity) = residency.tier_mut(tier).remove(&id) else {
                return Ok(Unloaded::Absent);
            };
            let cached = cache
                .as_ref()
                .and_then(|c| c.get(id))
                .is_some_and(|c| Arc::ptr_eq(c, &entity));
            (entity, cached)
        };

        if cached {
            self.set_visible(&entity, false).await?;
            log::trace!("Cell {} demoted to cache", id);
            Ok(Unloaded::Demoted)
        } else if self.destroy_entity(entity).await? {
            Ok(Unloaded::Destroyed)
        } else {
            Ok(Unloaded::Absent)
        }
    }

    async fn set_visible(&self, entity: &Arc<Entity>, visible: bool) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let entity = Arc::clone(entity);
        self.schedulers
            .presentation
            .call(move || {
                if !entity.is_retired() {
                    backend.set_visible(entity.context(), visible);
                    entity.mark_visible(visible);
                }
            })
            .await
    }

    /// Destroy an entity's context unless something already did
    async fn destroy_entity(&self, entity: Arc<Entity>) -> Result<bool> {
        if !entity.retire() {
            return Ok(false);
        }
        let id = entity.id();
        let backend = Arc::clone(&self.backend);
        self.schedulers
            .presentation
            .call(move || {
                backend.unload_detail(entity.context(), entity.id());
                backend.destroy_context(entity.context());
                entity.mark_visible(false);
            })
            .await?;
        log::trace!("Destroyed cell {}", id);
        Ok(true)
    }

    /// Cached world, or one built from the record layer and cached
    async fn acquire_world(&self, world_id: RecordId) -> Result<Arc<World>> {
        let cached = {
            let mut worlds = lock(&self.worlds);
            let world = worlds.get(world_id);
            if world.is_some() {
                worlds.promote(world_id);
            }
            world
        };
        if let Some(world) = cached {
            log::debug!("World {} promoted from cache", world_id);
            lock(&self.stats).world_cache_hits += 1;
            self.resolver.register(Arc::clone(&world));
            return Ok(world);
        }

        let records = Arc::clone(&self.records);
        let (record, layout) = self
            .schedulers
            .worker
            .call(move || -> Result<(Record, WorldLayout)> {
                let record = records.load_record(world_id)?;
                if record.kind != RecordKind::World {
                    return Err(Error::MalformedData {
                        id: world_id,
                        reason: format!("expected a world record, found {:?}", record.kind),
                    });
                }
                let mut layout = WorldLayout::default();
                records.load_children(world_id, &mut layout)?;
                Ok((record, layout))
            })
            .await??;

        let backend = Arc::clone(&self.backend);
        let context = self
            .schedulers
            .presentation
            .call(move || backend.create_context(world_id))
            .await?;
        let world = Arc::new(World::from_layout(&record, layout, context));
        log::info!(
            "Loaded world {} ({}) with {} cells",
            world.id(),
            world.name(),
            world.cell_count()
        );

        let eviction = lock(&self.worlds).push_back(Arc::clone(&world));
        self.resolver.register(Arc::clone(&world));
        lock(&self.stats).world_loads += 1;
        self.release(eviction).await?;
        Ok(world)
    }

    /// Destroy an evicted world and whichever of its orphaned exteriors are unused
    async fn release(&self, eviction: WorldEviction) -> Result<()> {
        if let Some(world) = eviction.world {
            self.resolver.forget(world.id());
            let backend = Arc::clone(&self.backend);
            let context = world.context();
            self.schedulers
                .presentation
                .call(move || backend.destroy_context(context))
                .await?;
            lock(&self.stats).worlds_evicted += 1;
        }

        let orphans = eviction.orphans.len() as u64;
        let mut destroyed = 0;
        for orphan in eviction.orphans {
            let resident = lock(&self.residency).holds(&orphan);
            if !resident && self.destroy_entity(orphan).await? {
                destroyed += 1;
            }
        }
        let mut stats = lock(&self.stats);
        stats.invalidated += orphans;
        stats.destroyed += destroyed;
        Ok(())
    }
}

/// Keeps resident entity sets in step with an observer
///
/// Cheap to clone; clones share state. Reconciliations and location changes
/// are serialized: a call made while another is in flight waits for it to
/// finish. None of the async methods may be awaited from inside a
/// presentation job.
#[derive(Clone)]
pub struct StreamingManager {
    shared: Arc<Shared>,
}

impl StreamingManager {
    pub fn new(
        config: StreamingConfig,
        schedulers: Schedulers,
        records: Arc<dyn RecordSource>,
        backend: Arc<dyn SceneBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let exteriors: SharedEntityCache =
            Arc::new(Mutex::new(RecencyCache::new(config.exterior_cache_capacity)));
        let worlds = WorldCache::new(config.world_cache_capacity, Arc::clone(&exteriors));
        let interiors = RecencyCache::new(config.interior_cache_capacity);

        log::info!(
            "Streaming manager: near diameter {}, far diameter {}, caches {}/{}/{} (world/exterior/interior)",
            config.near_diameter,
            config.far_diameter,
            config.world_cache_capacity,
            config.exterior_cache_capacity,
            config.interior_cache_capacity
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                schedulers,
                records,
                backend,
                resolver: NeighborhoodResolver::new(),
                reconcile_lock: tokio::sync::Mutex::new(()),
                worlds: Mutex::new(worlds),
                exteriors,
                interiors: Mutex::new(interiors),
                residency: Mutex::new(Residency::default()),
                stats: Mutex::new(StreamingStats::default()),
            }),
        })
    }

    /// Move the observer onto a world's exterior grid
    ///
    /// Unloads everything resident, then loads the world or promotes it from
    /// the world cache. Nothing of the new world is resident until the next
    /// `reconcile`.
    pub async fn enter_world(&self, world_id: RecordId) -> Result<Arc<World>> {
        let _guard = self.shared.reconcile_lock.lock().await;
        if let Location::Exterior(world) = self.shared.location() {
            if world.id() == world_id {
                return Ok(world);
            }
        }

        self.shared
            .converge(Location::Nowhere, HashSet::new(), HashSet::new(), None)
            .await?;
        let world = self.shared.acquire_world(world_id).await?;
        lock(&self.shared.residency).location = Location::Exterior(Arc::clone(&world));
        log::info!("Entered world {} ({})", world.id(), world.name());
        Ok(world)
    }

    /// Move the observer into an interior cell, which becomes the only resident
    pub async fn enter_interior(&self, id: RecordId) -> Result<ReconcileReport> {
        let _guard = self.shared.reconcile_lock.lock().await;
        if matches!(self.shared.location(), Location::Interior(current) if current == id) {
            return Ok(ReconcileReport::default());
        }
        let report = self
            .shared
            .converge(Location::Interior(id), HashSet::from([id]), HashSet::new(), None)
            .await?;
        log::info!("Entered interior {}", id);
        Ok(report)
    }

    /// Bring both resident sets of the active world in line with `center`
    ///
    /// Near targets the `near_diameter` neighborhood; far targets the
    /// `far_diameter` neighborhood minus the near one. Returns once every
    /// issued job has finished.
    ///
    /// # Arguments
    /// * `center` - Observer's cell on the active world's grid
    ///
    /// # Returns
    /// The jobs issued and their outcome. A missing record leaves a hole
    /// listed in the report. Malformed data fails the call after the remaining
    /// jobs finish, and `Error::NoActiveWorld` is returned outside a world.
    pub async fn reconcile(&self, center: CellIndex) -> Result<ReconcileReport> {
        let _guard = self.shared.reconcile_lock.lock().await;
        let Location::Exterior(world) = self.shared.location() else {
            return Err(Error::NoActiveWorld);
        };

        let (near, far) = self.targets_in(&world, center)?;
        self.shared
            .converge(Location::Exterior(world), near, far, Some(center))
            .await
    }

    /// `reconcile` for an observer in world units
    pub async fn reconcile_at(&self, position: Vec2, cell_size: f32) -> Result<ReconcileReport> {
        self.reconcile(CellIndex::from_world_position(position, cell_size))
            .await
    }

    fn targets_in(&self, world: &World, center: CellIndex) -> Result<(HashSet<RecordId>, HashSet<RecordId>)> {
        let config = &self.shared.config;
        let near = self.shared.target(world, center, config.near_diameter)?;
        let mut far = self.shared.target(world, center, config.far_diameter)?;
        far.retain(|id| !near.contains(id));
        Ok((near, far))
    }

    /// Near and far targets a reconcile around `center` would aim for
    pub fn targets(&self, center: CellIndex) -> Result<(BTreeSet<RecordId>, BTreeSet<RecordId>)> {
        let world = self.active_world().ok_or(Error::NoActiveWorld)?;
        let (near, far) = self.targets_in(&world, center)?;
        Ok((near.into_iter().collect(), far.into_iter().collect()))
    }

    /// Unload everything and destroy every cached entity and world
    ///
    /// Afterwards the backend holds no context created by this manager.
    pub async fn shutdown(&self) -> Result<()> {
        let _guard = self.shared.reconcile_lock.lock().await;
        let shared = &self.shared;
        shared
            .converge(Location::Nowhere, HashSet::new(), HashSet::new(), None)
            .await?;

        let evictions = lock(&shared.worlds).drain();
        for eviction in evictions {
            shared.release(eviction).await?;
        }

        let mut cached = lock(&shared.interiors).drain();
        cached.extend(lock(&shared.exteriors).drain());
        let mut destroyed = 0;
        for entity in cached {
            if shared.destroy_entity(entity).await? {
                destroyed += 1;
            }
        }
        lock(&shared.stats).destroyed += destroyed;

        log::info!("Streaming manager shut down");
        Ok(())
    }

    pub fn near_resident(&self) -> BTreeSet<RecordId> {
        lock(&self.shared.residency).near.keys().copied().collect()
    }

    pub fn far_resident(&self) -> BTreeSet<RecordId> {
        lock(&self.shared.residency).far.keys().copied().collect()
    }

    /// Resident entity under `id` and the set it is in
    pub fn resident(&self, id: RecordId) -> Option<(Tier, Arc<Entity>)> {
        let residency = lock(&self.shared.residency);
        [Tier::Near, Tier::Far]
            .into_iter()
            .find_map(|tier| residency.tier(tier).get(&id).map(|e| (tier, Arc::clone(e))))
    }

    pub fn is_loading(&self, id: RecordId) -> bool {
        lock(&self.shared.residency).loading.contains(&id)
    }

    pub fn location(&self) -> Location {
        self.shared.location()
    }

    pub fn active_world(&self) -> Option<Arc<World>> {
        match self.shared.location() {
            Location::Exterior(world) => Some(world),
            _ => None,
        }
    }

    pub fn stats(&self) -> StreamingStats {
        *lock(&self.shared.stats)
    }

    /// Cached world ids, oldest first
    pub fn cached_worlds(&self) -> Vec<RecordId> {
        lock(&self.shared.worlds).ids()
    }

    /// Cached exterior ids, oldest first
    pub fn cached_exteriors(&self) -> Vec<RecordId> {
        lock(&self.shared.exteriors).ids()
    }

    /// Cached interior ids, oldest first
    pub fn cached_interiors(&self) -> Vec<RecordId> {
        lock(&self.shared.interiors).ids()
    }

    pub fn resolver(&self) -> &NeighborhoodResolver {
        &self.shared.resolver
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.shared.config
    }
}

impl std::fmt::Debug for StreamingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingManager")
            .field("location", &self.location())
            .field("near", &self.near_resident().len())
            .field("far", &self.far_resident().len())
            .finish()
    }
}
