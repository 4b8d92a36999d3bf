//! Streaming walk demo: moves an observer across a world with a headless backend.
//!
//! Usage: cargo run --release --bin stream_walk -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>      Streaming config JSON (default: built-in defaults)
//!   --records <PATH>     Record manifest JSON (default: synthetic grid world)
//!   --world <ID>         World to walk when using --records (default: 1)
//!   --size <CELLS>       Synthetic world width and height (default: 32)
//!   --steps <N>          Observer steps (default: 200)
//!   --cell-size <UNITS>  Cell width in world units (default: 64.0)
//!   --speed <UNITS>      Distance moved per step (default: 24.0)

use std::sync::Arc;
use std::time::Instant;

use cellstream::core::{logging, CellIndex, Error, RecordId, Result, StreamingConfig, Vec2};
use cellstream::jobs::{PresentationScheduler, Schedulers, WorkerScheduler};
use cellstream::streaming::{StreamingManager, StreamingStats};
use cellstream::world::{GridBounds, HeadlessBackend, MemoryRecords};

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&args) {
        log::error!("Walk failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let config = match parse_str_arg(args, "--config") {
        Some(path) => StreamingConfig::from_json_file(path)?,
        None => StreamingConfig::default(),
    };
    let steps = parse_usize_arg(args, "--steps").unwrap_or(200);
    let cell_size = parse_f32_arg(args, "--cell-size").unwrap_or(64.0);
    let speed = parse_f32_arg(args, "--speed").unwrap_or(24.0);
    let (records, world) = match parse_str_arg(args, "--records") {
        Some(path) => (
            MemoryRecords::from_json_file(&path)?,
            RecordId(parse_u32_arg(args, "--world").unwrap_or(1)),
        ),
        None => synthetic_world(parse_u32_arg(args, "--size").unwrap_or(32)),
    };

    println!("=== Cellstream Walk ===");
    println!("World:   {} ({} records)", world, records.len());
    println!("Steps:   {} x {} units, cells {} units wide", steps, speed, cell_size);
    println!(
        "Near/far diameter: {}/{}",
        config.near_diameter, config.far_diameter
    );
    println!();

    let start = Instant::now();
    let workers = WorkerScheduler::start(&config)?;
    let worker_queue = workers.queue();
    let backend = Arc::new(HeadlessBackend::new());
    let scene = Arc::clone(&backend);
    let walk_config = config.clone();

    let outcome = PresentationScheduler::start(&config, move |presentation| async move {
        let schedulers = Schedulers::new(worker_queue, presentation);
        let manager = StreamingManager::new(walk_config, schedulers, Arc::new(records), scene)?;
        let walked = walk(&manager, world, steps, cell_size, speed).await;
        // Shut down even after a failed walk
        let shutdown = manager.shutdown().await;
        walked?;
        shutdown?;
        Ok::<StreamingStats, Error>(manager.stats())
    });
    workers.stop();
    let stats = outcome??;

    let calls = backend.calls();
    println!();
    println!("=== Done in {:.2}s ===", start.elapsed().as_secs_f32());
    println!("Reconciles:  {}", stats.reconciles);
    println!("Jobs:        {} ({} loads, {} unloads)", stats.jobs, stats.loads, stats.unloads);
    println!("Cache:       {} hits, {} demoted", stats.cache_hits, stats.demoted);
    println!("Destroyed:   {} ({} invalidated with their world)", stats.destroyed, stats.invalidated);
    println!("Holes:       {}", stats.holes);
    println!(
        "Backend:     {} calls, {} contexts created, {} still live",
        calls.total(),
        calls.create_context,
        backend.live_contexts()
    );
    Ok(())
}

/// Walk a slowly turning path from the middle of the world, clamped to its bounds
async fn walk(manager: &StreamingManager, world: RecordId, steps: usize, cell_size: f32, speed: f32) -> Result<()> {
    let world = manager.enter_world(world).await?;
    let bounds = world
        .bounds()
        .ok_or_else(|| Error::Config(format!("world {} has no cells", world.id())))?;

    let lo = Vec2::new(bounds.min.x as f32, bounds.min.y as f32) * cell_size;
    let hi = Vec2::new(bounds.max.x as f32 + 1.0, bounds.max.y as f32 + 1.0) * cell_size;
    let edge = hi - Vec2::splat(cell_size * 0.01);
    let mut position = (lo + hi) * 0.5;

    for step in 0..steps {
        let heading = step as f32 * 0.05;
        position = (position + Vec2::new(heading.cos(), heading.sin()) * speed).clamp(lo, edge);
        let report = manager.reconcile_at(position, cell_size).await?;
        if !report.is_noop() {
            log::info!(
                "step {:>4} at {}: near +{} -{}, far +{} -{}, {} from cache, {} holes",
                step,
                report.center.unwrap_or(CellIndex::new(0, 0)),
                report.near_loads,
                report.near_unloads,
                report.far_loads,
                report.far_unloads,
                report.cache_hits,
                report.holes.len()
            );
        }
    }
    Ok(())
}

/// Square grid world with collision objects on every third cell
fn synthetic_world(size: u32) -> (MemoryRecords, RecordId) {
    let world = RecordId(1);
    let last = size.max(1) as i32 - 1;
    let mut records = MemoryRecords::new();
    records.add_world(world, "synthetic");
    let cells = records.fill_grid(
        world,
        GridBounds::new(CellIndex::new(0, 0), CellIndex::new(last, last)),
        1000,
    );
    for (i, cell) in cells.iter().enumerate().filter(|(i, _)| i % 3 == 0) {
        records.add_object(*cell, RecordId(1_000_000 + i as u32));
    }
    (records, world)
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
