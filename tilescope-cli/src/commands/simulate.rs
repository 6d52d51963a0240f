//! Simulate command - drive the overlay engines against a world fixture.
//!
//! Each simulation step pans the camera, lets the scheduler run a cycle and
//! prints the outcome. A JSON diagnostics snapshot from the last cycle is
//! printed at the end.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use tilescope::config::{EngineConfig, EngineSettings};
use tilescope::engine::{CycleOutcome, DirectEngine, OverlayEngine, ScanEngine};
use tilescope::host::RegionEvent;
use tilescope::render::MemorySurfaceFactory;
use tilescope::scanner::{DiscoveredEntity, ScanDiagnostics};
use tilescope::scheduler::OverlayScheduler;

use crate::error::CliError;
use crate::world::World;

/// Frame period for the event-driven engine.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Which engine to run.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum EngineKind {
    /// Budgeted ring scan, timer driven
    Scan,
    /// Recorded entities, event driven
    Direct,
    /// Both engines, one after the other
    Both,
}

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// World fixture (JSON)
    pub fixture: PathBuf,

    /// Number of cycles to run
    #[arg(short = 'n', long, default_value_t = 5)]
    pub cycles: u32,

    /// Engine to run
    #[arg(short, long, value_enum, default_value_t = EngineKind::Scan)]
    pub engine: EngineKind,

    /// Minimum score for scanned entities
    #[arg(short, long, default_value_t = 1.0)]
    pub threshold: f64,

    /// Override the polling interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Override the per-cycle tile query budget
    #[arg(long)]
    pub budget: Option<u32>,
}

/// Final report printed after a run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    engine: &'static str,
    markers: usize,
    diagnostics: &'a ScanDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    discovered: Option<&'a [DiscoveredEntity]>,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs, mut config: EngineConfig) -> Result<(), CliError> {
    if let Some(ms) = args.interval_ms {
        config.scheduler.poll_interval_ms = ms.max(1);
    }
    if let Some(budget) = args.budget {
        config.scanner.query_budget = budget;
    }
    let world = World::load(&args.fixture)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async {
        if matches!(args.engine, EngineKind::Scan | EngineKind::Both) {
            run_scan(&world, &config, &args).await?;
        }
        if matches!(args.engine, EngineKind::Direct | EngineKind::Both) {
            run_direct(&world, &config, args.cycles).await?;
        }
        Ok::<(), CliError>(())
    })
}

async fn run_scan(
    world: &World,
    config: &EngineConfig,
    args: &SimulateArgs,
) -> Result<(), CliError> {
    let engine = ScanEngine::new(
        world.map(),
        Box::new(world.geometry()),
        Box::new(world.scores()),
        Box::new(MemorySurfaceFactory::new()),
        config,
    );
    let mut scheduler = OverlayScheduler::polling(engine, &config.scheduler);
    info!(
        budget = config.scanner.query_budget,
        threshold = args.threshold,
        "Starting scan simulation"
    );

    let mut ticker = interval(config.scheduler.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut completed = 0;
    let mut started = false;
    while completed < args.cycles {
        let now = tokio::select! {
            at = ticker.tick() => at.into_std(),
            _ = tokio::signal::ctrl_c() => {
                info!(completed, "Interrupted");
                break;
            }
        };
        if !started {
            scheduler.start(now);
            scheduler.apply_settings(EngineSettings::new(true, args.threshold), now);
            started = true;
        }
        if let Some(outcome) = scheduler.tick(now) {
            completed += 1;
            print_outcome("scan", completed, outcome, scheduler.diagnostics());
            world.advance();
        }
    }

    let report = Report {
        engine: "scan",
        markers: scheduler.engine().marker_count(),
        diagnostics: scheduler.diagnostics(),
        discovered: Some(scheduler.engine().discovered()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    scheduler.stop();
    Ok(())
}

async fn run_direct(world: &World, config: &EngineConfig, cycles: u32) -> Result<(), CliError> {
    let engine = DirectEngine::new(
        world.map(),
        world.recorded(),
        Box::new(MemorySurfaceFactory::new()),
        config,
    );
    let mut scheduler =
        OverlayScheduler::event_driven(engine, Box::new(world.bus()), &config.scheduler);
    info!("Starting direct simulation");

    let mut frames = interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut completed = 0;
    let mut started = false;
    while completed < cycles {
        let now = tokio::select! {
            at = frames.tick() => at.into_std(),
            _ = tokio::signal::ctrl_c() => {
                info!(completed, "Interrupted");
                break;
            }
        };
        if !started {
            scheduler.start(now);
            started = true;
        }
        if let Some(outcome) = scheduler.on_animation_frame(now) {
            completed += 1;
            print_outcome("direct", completed, outcome, scheduler.diagnostics());
            world.advance();
            scheduler.on_region_event(RegionEvent::CameraMoved);
        }
    }

    let report = Report {
        engine: "direct",
        markers: scheduler.engine().marker_count(),
        diagnostics: scheduler.diagnostics(),
        discovered: None,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    scheduler.stop();
    Ok(())
}

fn print_outcome(engine: &str, step: u32, outcome: CycleOutcome, diag: &ScanDiagnostics) {
    let summary = match outcome {
        CycleOutcome::Rendered { markers } => format!(
            "{} markers ({} queries, {} scanned)",
            markers, diag.queries_issued, diag.scanned
        ),
        CycleOutcome::Skipped(reason) => format!("skipped: {}", reason),
        CycleOutcome::Cleared => "cleared".to_string(),
        CycleOutcome::Failed => format!(
            "failed: {}",
            diag.last_error.as_deref().unwrap_or("unknown error")
        ),
    };
    println!("[{}] cycle {}: {}", engine, step, summary);
}
