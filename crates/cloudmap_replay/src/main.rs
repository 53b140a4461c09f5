mod config;
mod replay;
mod report;
mod script;

use anyhow::{Context, Result};
use clap::Parser;
use cloudmap::{Dataset, Engine, EngineConfig, FilterThresholds};
use config::Config;
use glam::Vec2;
use log::info;
use replay::{Replay, Viewport};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Config::parse();

    // Engine settings: file first, then flags on top.
    let mut engine_config = load_engine_config(args.config.as_deref())?;
    if let Some(r) = args.resolution {
        engine_config.voxel_resolution = Some(r);
    }
    if let Some(mode) = args.color_mode {
        engine_config.color_mode = mode.into();
    }

    let started = Instant::now();
    let file = File::open(&args.dataset)
        .with_context(|| format!("opening dataset {}", args.dataset.display()))?;
    let dataset = Dataset::from_reader(BufReader::new(file), engine_config.half_extent)
        .with_context(|| format!("loading dataset {}", args.dataset.display()))?;
    info!(
        "Loaded {} points with cluster counts {:?} in {:.2?}",
        dataset.len(),
        dataset.cluster_counts(),
        started.elapsed()
    );

    let steps = match &args.script {
        Some(path) => script::load(path)?,
        None => Vec::new(),
    };

    let mut engine = Engine::new(engine_config);
    engine.set_filter_thresholds(FilterThresholds::new(
        args.max_nsfw,
        args.hidden_prefix.clone(),
    ));
    engine
        .load(&dataset, args.cluster_index)
        .context("selecting cluster count")?;

    let viewport = Viewport {
        size: Vec2::new(args.width, args.height),
        fov_y_radians: args.fov.to_radians(),
        near: 0.1,
        far: 20_000.0,
    };
    let mut replay = Replay::new(engine, &dataset, viewport, args.dt);

    // First frame builds the grid, batches and collision index.
    replay.frame();
    for (i, step) in steps.iter().enumerate() {
        replay
            .apply(step)
            .with_context(|| format!("script step {} ({step:?})", i + 1))?;
    }
    replay.run_frames(args.frames);

    let report = replay.report();
    info!(
        "{} batches at R={}, {} pick spheres, selected {:?}",
        report.batch_count,
        report.voxel_resolution,
        report.collision_primitives,
        replay.engine().selected_names()
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
