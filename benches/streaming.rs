use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, black_box};

use cellstream::core::{CellIndex, RecordId, StreamingConfig};
use cellstream::jobs::{PresentationScheduler, Schedulers, WorkerScheduler};
use cellstream::streaming::{Cached, NeighborhoodResolver, RecencyCache, StreamingManager};
use cellstream::world::{
    GridBounds, HeadlessBackend, MemoryRecords, RecordSource, SceneContext, World, WorldLayout,
};

const WORLD: RecordId = RecordId(1);

fn grid_records(size: i32) -> MemoryRecords {
    let mut records = MemoryRecords::new();
    records.add_world(WORLD, "bench");
    records.fill_grid(
        WORLD,
        GridBounds::new(CellIndex::new(0, 0), CellIndex::new(size - 1, size - 1)),
        1000,
    );
    records
}

fn grid_world(size: i32) -> Arc<World> {
    let records = grid_records(size);
    let mut layout = WorldLayout::default();
    records.load_children(WORLD, &mut layout).unwrap();
    let record = records.load_record(WORLD).unwrap();
    Arc::new(World::from_layout(&record, layout, SceneContext(1)))
}

fn bench_neighborhood_ids(c: &mut Criterion) {
    let resolver = NeighborhoodResolver::new();
    resolver.register(grid_world(256));

    c.bench_function("neighborhood_ids_d7", |b| {
        let mut step = 0i32;
        b.iter(|| {
            step = (step + 1) % 256;
            let hood = resolver
                .get_neighborhood(WORLD, black_box(CellIndex::new(step, 128)), 7)
                .unwrap();
            black_box(hood.ids())
        });
    });
}

fn bench_neighborhood_clipped(c: &mut Criterion) {
    let resolver = NeighborhoodResolver::new();
    resolver.register(grid_world(64));

    c.bench_function("neighborhood_clipped_corner_d15", |b| {
        b.iter(|| {
            let hood = resolver
                .get_neighborhood(WORLD, black_box(CellIndex::new(-3, -3)), 15)
                .unwrap();
            black_box(hood.ids().len())
        });
    });
}

struct Slot(u32);

impl Cached for Slot {
    fn cache_id(&self) -> RecordId {
        RecordId(self.0)
    }
}

fn bench_cache_push(c: &mut Criterion) {
    c.bench_function("recency_cache_push_64", |b| {
        let mut cache = RecencyCache::new(64);
        let mut next = 0u32;
        b.iter(|| {
            next += 1;
            black_box(cache.push_back(Slot(next)));
        });
    });
}

fn bench_cache_get_promote(c: &mut Criterion) {
    let mut cache = RecencyCache::new(128);
    for i in 0..128 {
        cache.push_back(Slot(i));
    }

    c.bench_function("recency_cache_get_promote_128", |b| {
        let mut i = 0u32;
        b.iter(|| {
            i = (i + 37) % 128;
            let id = RecordId(black_box(i));
            if cache.get(id).is_some() {
                cache.promote(id);
            }
        });
    });
}

/// Enter a world and walk `steps` cells along a row
fn walk(config: &StreamingConfig, records: MemoryRecords, steps: i32) -> u64 {
    let workers = WorkerScheduler::start(config).unwrap();
    let worker_queue = workers.queue();
    let manager_config = config.clone();

    let jobs = PresentationScheduler::start(config, move |presentation| async move {
        let schedulers = Schedulers::new(worker_queue, presentation);
        let backend = Arc::new(HeadlessBackend::new());
        let manager = StreamingManager::new(manager_config, schedulers, Arc::new(records), backend)?;
        manager.enter_world(WORLD).await?;
        for x in 0..steps {
            manager.reconcile(CellIndex::new(4 + x, 16)).await?;
        }
        manager.shutdown().await?;
        Ok::<u64, cellstream::core::Error>(manager.stats().jobs)
    })
    .unwrap()
    .unwrap();

    workers.stop();
    jobs
}

fn bench_reconcile_walk(c: &mut Criterion) {
    let config = StreamingConfig {
        worker_threads: 4,
        near_diameter: 3,
        far_diameter: 7,
        ..Default::default()
    };
    let mut group = c.benchmark_group("reconcile");
    group.sample_size(10);
    group.bench_function("walk_24_cells", |b| {
        b.iter(|| black_box(walk(&config, grid_records(32), 24)));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_neighborhood_ids,
    bench_neighborhood_clipped,
    bench_cache_push,
    bench_cache_get_promote,
    bench_reconcile_walk,
);
criterion_main!(benches);
