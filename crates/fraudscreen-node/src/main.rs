//! # fraudscreen-node
//!
//! Demo screening node. Seeds in-memory collaborators with synthetic data,
//! warms the entity caches from recent history and runs a bounded number
//! of screening cycles.
//!
//! Environment:
//!
//! | Variable                  | Meaning                                    |
//! |---------------------------|--------------------------------------------|
//! | `RUST_LOG`                | tracing filter, default `info`             |
//! | `FRAUDSCREEN_LOG_JSON`    | `1` for JSON log lines                     |
//! | `FRAUDSCREEN_CONFIG`      | path to a JSON `DetectorConfig`            |
//! | `FRAUDSCREEN_MAX_CYCLES`  | cycles to run before exiting, default 10   |

mod seed;

use std::{env, process::ExitCode, sync::Arc};

use chrono::Utc;
use fraudscreen_pipeline::{
    Collaborators, Detector, Scheduler, SchedulerStats, memory::RecordingSink,
};
use fraudscreen_types::{DetectorConfig, FraudError, Result, SystemClock, constants};
use tracing_subscriber::EnvFilter;

use crate::seed::SeedPlan;

const DEFAULT_MAX_CYCLES: u64 = 10;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("FRAUDSCREEN_LOG_JSON").is_ok_and(|v| v == "1");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn load_config() -> Result<DetectorConfig> {
    match env::var("FRAUDSCREEN_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "Loading configuration");
            DetectorConfig::from_file(path)
        }
        Err(_) => Ok(DetectorConfig::default()),
    }
}

fn max_cycles() -> Result<u64> {
    match env::var("FRAUDSCREEN_MAX_CYCLES") {
        Ok(raw) => raw.parse().map_err(|e| {
            FraudError::Configuration(format!("FRAUDSCREEN_MAX_CYCLES={raw}: {e}"))
        }),
        Err(_) => Ok(DEFAULT_MAX_CYCLES),
    }
}

fn run() -> Result<SchedulerStats> {
    let config = load_config()?;
    let cycles = max_cycles()?;

    let world = seed::generate(SeedPlan::default(), Utc::now())?;
    tracing::info!(
        identities = world.identities.len(),
        devices = world.devices.len(),
        history = world.store.len(),
        pending = world.queue.len(),
        "Seeded in-memory collaborators"
    );

    let identities = Arc::new(world.identities);
    let accounts = Arc::new(world.accounts);
    let devices = Arc::new(world.devices);
    let store = Arc::new(world.store);
    let queue = Arc::new(world.queue);

    let detector = Arc::new(Detector::new(
        config,
        Collaborators {
            identities: identities.clone(),
            accounts: accounts.clone(),
            devices: devices.clone(),
            store: store.clone(),
            source: queue.clone(),
            sink: Arc::new(RecordingSink::new()),
            clock: Arc::new(SystemClock),
        },
    )?);

    let handle = Scheduler::from_config(detector.config())
        .with_max_cycles(cycles)
        .spawn(Arc::clone(&detector))?;
    let stats = handle.join()?;

    for (kind, calls) in [
        ("identity", identities.calls()),
        ("account", accounts.calls()),
        ("device", devices.calls()),
    ] {
        tracing::info!(
            kind,
            batch_calls = calls.many.len(),
            single_calls = calls.one,
            "Remote calls"
        );
    }
    let r = detector.resolvers();
    tracing::info!(
        identity_hit_ratio = r.identities.cache_stats().hit_ratio(),
        account_hit_ratio = r.accounts.cache_stats().hit_ratio(),
        device_hit_ratio = r.devices.cache_stats().hit_ratio(),
        persisted = store.len(),
        still_pending = queue.len(),
        "Cache summary"
    );
    Ok(stats)
}

fn main() -> ExitCode {
    init_logging();
    tracing::info!(
        engine = constants::ENGINE_NAME,
        version = constants::VERSION,
        "Starting fraudscreen node"
    );

    match run() {
        Ok(stats) => {
            tracing::info!(
                cycles = stats.cycles,
                completed = stats.completed,
                idle = stats.idle,
                failed = stats.failed,
                classified = stats.classified,
                "Node finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Node failed");
            ExitCode::FAILURE
        }
    }
}
