//! Overlay engines: one complete cycle from bounds to markers.
//!
//! ```text
//!  view state ─► grid cell ─► normalizer ─┬─► bounds ─► ring scan ─► project ─► render
//!                                          │                        (ScanEngine)
//!                                          └─► recorded list ─────► project ─► render
//!                                                                   (DirectEngine)
//! ```
//!
//! A cycle never panics or propagates an error to its caller. Outcomes:
//!
//! | Situation                              | Overlay        | Outcome             |
//! |----------------------------------------|----------------|---------------------|
//! | Host busy, grid or bounds unavailable  | unchanged      | `Skipped`           |
//! | Host reports "not applicable"          | cleared        | `Cleared`           |
//! | Host accessor error at cycle level     | unchanged      | `Failed`            |
//! | Success                                | rebuilt        | `Rendered`          |
//!
//! Failures are recorded in [`ScanDiagnostics::last_error`] and the next
//! cycle retries unconditionally.

mod direct;
mod scan;

pub use direct::DirectEngine;
pub use scan::ScanEngine;

use std::fmt;
use std::ops::ControlFlow;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::coord::{CoordinateNormalizer, MagnitudeHeuristic, NormalizeError};
use crate::host::{HostError, ProjectionHost, ViewState, ViewportHost};
use crate::render::MarkerRenderer;
use crate::scanner::ScanDiagnostics;
use crate::viewport::BoundsError;

/// A host offering both viewport and projection accessors.
pub trait MapHost: ViewportHost + ProjectionHost {}

impl<T: ViewportHost + ProjectionHost> MapHost for T {}

/// Errors that abort a cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Bounds(#[from] BoundsError),
}

/// Why a cycle did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    HostBusy,
    GridUnavailable,
    BoundsUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::HostBusy => "host busy",
            SkipReason::GridUnavailable => "grid cell unavailable",
            SkipReason::BoundsUnavailable => "viewport bounds unavailable",
        };
        f.write_str(reason)
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Overlay rebuilt with this many markers.
    Rendered { markers: usize },
    /// Nothing happened; overlay untouched.
    Skipped(SkipReason),
    /// Host said the overlay does not apply; overlay cleared.
    Cleared,
    /// Cycle aborted on an error; overlay untouched.
    Failed,
}

impl CycleOutcome {
    /// Markers drawn, if the cycle rendered.
    pub fn markers(&self) -> Option<usize> {
        match self {
            CycleOutcome::Rendered { markers } => Some(*markers),
            _ => None,
        }
    }
}

/// An engine a scheduler can drive.
pub trait OverlayEngine {
    /// Run one complete cycle.
    fn run_cycle(&mut self) -> CycleOutcome;

    /// Remove every marker.
    fn clear(&mut self);

    /// Snapshot from the most recent cycle.
    fn diagnostics(&self) -> &ScanDiagnostics;

    /// Markers currently drawn.
    fn marker_count(&self) -> usize;

    /// React to a settings change. Engines that ignore settings keep the default.
    fn apply_settings(&mut self, _settings: &EngineSettings) {}
}

/// Common cycle preamble: view state, then grid cell and normalizer.
pub(crate) fn prepare<H: ViewportHost + ?Sized>(
    host: &H,
    classifier: MagnitudeHeuristic,
    renderer: &mut MarkerRenderer,
) -> Result<ControlFlow<CycleOutcome, CoordinateNormalizer>, CycleError> {
    match host.view_state() {
        ViewState::Ready => {}
        ViewState::Busy => {
            return Ok(ControlFlow::Break(CycleOutcome::Skipped(SkipReason::HostBusy)))
        }
        ViewState::NotApplicable => {
            renderer.clear();
            return Ok(ControlFlow::Break(CycleOutcome::Cleared));
        }
    }

    let world = host.world_bounds()?;
    let normalizer = match host.grid_cell_size()? {
        Some(cell) => CoordinateNormalizer::with_classifier(cell, world, classifier),
        None => Err(NormalizeError::GridCellUnavailable),
    };
    match normalizer {
        Ok(normalizer) => Ok(ControlFlow::Continue(normalizer)),
        Err(e) => {
            debug!(error = %e, "Cannot normalize coordinates");
            Ok(ControlFlow::Break(CycleOutcome::Skipped(
                SkipReason::GridUnavailable,
            )))
        }
    }
}

/// Fold a cycle result into an outcome, recording failures.
pub(crate) fn settle(
    engine: &'static str,
    result: Result<CycleOutcome, CycleError>,
    diag: &mut ScanDiagnostics,
) -> CycleOutcome {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(engine, cycle = diag.cycle, error = %e, "Overlay cycle failed");
            diag.last_error = Some(e.to_string());
            CycleOutcome::Failed
        }
    };
    match outcome {
        CycleOutcome::Rendered { markers } => debug!(
            engine,
            cycle = diag.cycle,
            markers,
            queries = diag.queries_issued,
            scanned = diag.scanned,
            "Overlay cycle complete"
        ),
        CycleOutcome::Skipped(reason) => {
            diag.trace(format!("skipped: {}", reason));
            debug!(engine, cycle = diag.cycle, %reason, "Overlay cycle skipped");
        }
        CycleOutcome::Cleared => {
            diag.trace("cleared: not applicable");
            debug!(engine, cycle = diag.cycle, "Overlay cleared, view not applicable");
        }
        CycleOutcome::Failed => {}
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_markers() {
        assert_eq!(CycleOutcome::Rendered { markers: 3 }.markers(), Some(3));
        assert_eq!(CycleOutcome::Cleared.markers(), None);
    }

    #[test]
    fn test_settle_records_error() {
        let mut diag = ScanDiagnostics::for_cycle(4);
        let err = CycleError::from(HostError::call_failed("getVisibleOrigin", "boom"));
        let outcome = settle("test", Err(err), &mut diag);
        assert_eq!(outcome, CycleOutcome::Failed);
        assert!(diag.last_error.unwrap().contains("getVisibleOrigin"));
    }

    #[test]
    fn test_settle_traces_skip() {
        let mut diag = ScanDiagnostics::for_cycle(1);
        let outcome = settle(
            "test",
            Ok(CycleOutcome::Skipped(SkipReason::BoundsUnavailable)),
            &mut diag,
        );
        assert_eq!(outcome, CycleOutcome::Skipped(SkipReason::BoundsUnavailable));
        assert_eq!(diag.debug_trace, vec!["skipped: viewport bounds unavailable"]);
    }
}
