//! Tilescope - budgeted spatial discovery for live map overlays
//!
//! This library finds interesting entities near a host application's current
//! viewport, projects them to screen space, and keeps a marker overlay in
//! sync. The host is reached only through the traits in [`host`], so any map
//! view that can answer point queries and world→screen projections can be
//! annotated.
//!
//! Two engines are provided:
//!
//! - [`engine::ScanEngine`] walks outward from the viewport center in square
//!   rings, querying the host one tile at a time under a fixed budget.
//! - [`engine::DirectEngine`] projects a caller-supplied list of recorded
//!   entities every cycle.
//!
//! [`scheduler::OverlayScheduler`] decides when a cycle runs.

pub mod config;
pub mod coord;
pub mod engine;
pub mod geometry;
pub mod host;
pub mod logging;
pub mod projector;
pub mod render;
pub mod resolver;
pub mod scanner;
pub mod scheduler;
pub mod viewport;

pub use config::{EngineConfig, EngineSettings};
pub use engine::{CycleOutcome, DirectEngine, OverlayEngine, ScanEngine};
pub use host::{HostError, HostResult};
pub use scanner::ScanDiagnostics;
pub use scheduler::{OverlayScheduler, SchedulerState};
