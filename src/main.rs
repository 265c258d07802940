use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planet_engine::config::WorldConfig;
use planet_engine::engine::{self, Engine};
use planet_engine::rng::{hash_string, normalize_numeric_seed};
use planet_engine::scheduler::SchedulerState;

#[derive(Parser, Debug)]
#[command(name = "planet-engine")]
#[command(about = "Deterministic tick-driven planetary simulation engine")]
struct Args {
    /// World seed: a number, or any string (hashed)
    #[arg(short, long)]
    seed: Option<String>,

    /// World width in meters (must be a whole number of chunks)
    #[arg(long, default_value = "20480000")]
    world_width_m: f64,

    /// World height in meters (must be a whole number of chunks)
    #[arg(long, default_value = "10240000")]
    world_height_m: f64,

    /// Cells per chunk side
    #[arg(long, default_value = "256")]
    chunk_cells: usize,

    /// Land cell size in meters
    #[arg(long, default_value = "1000")]
    cell_size_m: f64,

    /// Maximum resident chunks in the cache
    #[arg(long, default_value = "64")]
    cache_chunks: usize,

    /// Coarse calibration grid resolution
    #[arg(long, default_value = "1024")]
    coarse_res: usize,

    /// Target ocean fraction
    #[arg(long, default_value = "0.65")]
    ocean_fraction: f64,

    /// Wall-clock seconds between ticks (1-60)
    #[arg(long, default_value = "2")]
    tick_interval_s: f64,

    /// Run this many ticks headlessly (no wall clock), then exit
    #[arg(long)]
    ticks: Option<u64>,

    /// Warm this many chunks around the origin before ticking
    #[arg(long, default_value = "9")]
    warm_chunks: usize,

    /// Serve the HTTP surface
    #[arg(long)]
    serve: bool,

    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0:8151")]
    bind: SocketAddr,

    /// Static API key for non-health endpoints
    #[arg(long, default_value = "dev-key")]
    api_key: String,

    /// Write the scheduler state to this JSON file on exit
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Restore the scheduler state from this JSON file
    #[arg(long)]
    snapshot_in: Option<PathBuf>,
}

fn resolve_seed(arg: Option<&str>) -> u32 {
    match arg {
        None => rand::random::<u32>().max(1),
        Some(text) => match text.parse::<f64>() {
            Ok(n) => normalize_numeric_seed(n).unwrap_or_else(|err| {
                error!(%err, "invalid numeric seed");
                std::process::exit(2);
            }),
            Err(_) => hash_string(text),
        },
    }
}

fn read_snapshot(path: &PathBuf) -> SchedulerState {
    let text = std::fs::read_to_string(path).unwrap_or_else(|err| {
        error!(%err, path = %path.display(), "cannot read snapshot");
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|err| {
        error!(%err, "snapshot is not a valid scheduler state");
        std::process::exit(1);
    })
}

fn write_snapshot(path: &PathBuf, state: &SchedulerState) {
    let json = serde_json::to_string_pretty(state).expect("state serializes");
    if let Err(err) = std::fs::write(path, json) {
        error!(%err, path = %path.display(), "cannot write snapshot");
    } else {
        info!(path = %path.display(), "scheduler snapshot written");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planet_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let seed = resolve_seed(args.seed.as_deref());

    let mut config = WorldConfig {
        world_width_m: args.world_width_m,
        world_height_m: args.world_height_m,
        cell_size_m: args.cell_size_m,
        chunk_cells: args.chunk_cells,
        max_resident_chunks: args.cache_chunks,
        ..WorldConfig::default()
    };
    config.terrain.coarse_sample_res = args.coarse_res;
    config.terrain.target_ocean_fraction = args.ocean_fraction;
    config.scheduler.real_interval_s = args.tick_interval_s;

    let world = match engine::init_world(config, seed) {
        Ok(world) => world,
        Err(err) => {
            error!(%err, "world init failed");
            std::process::exit(1);
        }
    };

    // Warm a block of chunks around the origin so the cadenced hydrology
    // pass has residents to work on.
    if args.warm_chunks > 0 {
        let side = (args.warm_chunks as f64).sqrt().ceil() as i64;
        let mut world = world.lock().expect("world lock");
        let mut warmed = 0;
        'warm: for cy in 0..side {
            for cx in 0..side {
                world.cache().get_chunk(cx, cy);
                warmed += 1;
                if warmed >= args.warm_chunks {
                    break 'warm;
                }
            }
        }
        info!(warmed, "chunks warmed");
    }

    let restore = args.snapshot_in.as_ref().map(read_snapshot);

    if let Some(ticks) = args.ticks {
        // Headless: own the engine directly and step without the wall clock.
        let engine = match Engine::new(world, restore) {
            Ok(engine) => engine,
            Err(err) => {
                error!(%err, "engine build failed");
                std::process::exit(1);
            }
        };
        engine.tick_now(ticks);
        let status = engine.status();
        info!(
            steps = status.step_number,
            game_time = %status.game_time,
            "headless run complete"
        );
        if let Some(path) = &args.snapshot_out {
            let state = engine.scheduler().lock().expect("scheduler lock").state();
            write_snapshot(path, &state);
        }
        return;
    }

    if let Err(err) = engine::start_engine(restore) {
        error!(%err, "engine start failed");
        std::process::exit(1);
    }

    if args.serve {
        if let Err(err) = planet_engine::server::serve(args.bind, args.api_key).await {
            error!(%err, "http surface failed");
        }
    } else {
        tokio::signal::ctrl_c().await.ok();
        info!("shutting down");
    }

    if let Some(path) = &args.snapshot_out {
        match engine::engine_scheduler_state() {
            Ok(state) => write_snapshot(path, &state),
            Err(err) => error!(%err, "no scheduler state to snapshot"),
        }
    }

    engine::stop_engine().ok();
}
