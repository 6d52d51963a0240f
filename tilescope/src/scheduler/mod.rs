//! Update cadence for an overlay engine.
//!
//! ```text
//!                 settings: enabled && threshold > 0
//!        ┌──────────────────────────────────────────────┐
//!        │                                              ▼
//!     ┌──────┐   disabled / threshold <= 0 / stop  ┌─────────┐
//!     │ Idle │ ◄────────────────────────────────── │ Polling │  (budgeted scan)
//!     └──────┘                                     └─────────┘
//!        │  ▲
//!  start │  │ stop
//!        ▼  │
//!   ┌─────────────┐
//!   │ EventDriven │  (direct projection; rebinds on region change)
//!   └─────────────┘
//! ```
//!
//! The scheduler owns no timers. The embedding application calls
//! [`OverlayScheduler::tick`] from its timer and
//! [`OverlayScheduler::on_animation_frame`] from its frame callback, passing
//! the current time. A cycle runs to completion inside those calls, so two
//! cycles can never overlap.

mod binding;

pub use binding::RegionBinding;

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::{EngineSettings, SchedulerConfig};
use crate::engine::{CycleOutcome, OverlayEngine};
use crate::host::{RegionEvent, RegionEventBus, RegionId};
use crate::scanner::ScanDiagnostics;

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    EventDriven,
}

enum Cadence {
    /// Timer-driven, gated by settings.
    Poll,
    /// Event-driven with a fallback frame poll.
    Events(RegionBinding),
}

/// Drives an engine on a timer or on host events.
pub struct OverlayScheduler<E> {
    engine: E,
    cadence: Cadence,
    state: SchedulerState,
    started: bool,
    settings: EngineSettings,
    poll_interval: Duration,
    fallback_frame: Duration,
    next_tick: Option<Instant>,
    frame_requested: bool,
    last_cycle_at: Option<Instant>,
}

impl<E: OverlayEngine> OverlayScheduler<E> {
    /// A timer-driven scheduler for the budgeted scan engine.
    pub fn polling(engine: E, config: &SchedulerConfig) -> Self {
        Self::with_cadence(engine, Cadence::Poll, config)
    }

    /// An event-driven scheduler for the direct-projection engine.
    pub fn event_driven(engine: E, bus: Box<dyn RegionEventBus>, config: &SchedulerConfig) -> Self {
        Self::with_cadence(engine, Cadence::Events(RegionBinding::new(bus)), config)
    }

    fn with_cadence(engine: E, cadence: Cadence, config: &SchedulerConfig) -> Self {
        Self {
            engine,
            cadence,
            state: SchedulerState::Idle,
            started: false,
            settings: EngineSettings::default(),
            poll_interval: config.poll_interval(),
            fallback_frame: config.fallback_frame(),
            next_tick: None,
            frame_requested: false,
            last_cycle_at: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Snapshot from the engine's most recent cycle.
    pub fn diagnostics(&self) -> &ScanDiagnostics {
        self.engine.diagnostics()
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// When the next polling cycle is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Region currently subscribed to (event-driven only).
    pub fn bound_region(&self) -> Option<RegionId> {
        match &self.cadence {
            Cadence::Events(binding) => binding.current_target(),
            Cadence::Poll => None,
        }
    }

    /// Begin scheduling.
    ///
    /// A polling scheduler enters `Polling` only if the current settings
    /// allow it. An event-driven scheduler enters `EventDriven`
    /// unconditionally and requests a first frame.
    pub fn start(&mut self, now: Instant) {
        self.started = true;
        match self.cadence {
            Cadence::Poll => self.evaluate_settings(now),
            Cadence::Events(_) => {
                self.transition(SchedulerState::EventDriven);
                self.rebind();
                self.frame_requested = true;
            }
        }
    }

    /// Stop scheduling, detach from host events and clear the overlay.
    pub fn stop(&mut self) {
        self.started = false;
        self.next_tick = None;
        self.frame_requested = false;
        self.last_cycle_at = None;
        if let Cadence::Events(binding) = &mut self.cadence {
            binding.detach();
        }
        self.engine.clear();
        self.transition(SchedulerState::Idle);
    }

    /// Take new settings from the host's settings store.
    pub fn apply_settings(&mut self, settings: EngineSettings, now: Instant) {
        debug!(
            enabled = settings.enabled,
            threshold = settings.score_threshold,
            "Settings changed"
        );
        self.settings = settings;
        self.engine.apply_settings(&settings);
        if self.started && matches!(self.cadence, Cadence::Poll) {
            self.evaluate_settings(now);
        }
    }

    /// Timer callback. Runs a cycle if one is due.
    ///
    /// A late tick runs one cycle and schedules the next one a full
    /// interval after `now`; missed ticks are not replayed.
    pub fn tick(&mut self, now: Instant) -> Option<CycleOutcome> {
        if self.state != SchedulerState::Polling {
            return None;
        }
        let due = self.next_tick?;
        if now < due {
            return None;
        }
        let outcome = self.engine.run_cycle();
        self.next_tick = Some(now + self.poll_interval);
        self.last_cycle_at = Some(now);
        Some(outcome)
    }

    /// Host notification for the bound region. Coalesced until the next frame.
    pub fn on_region_event(&mut self, event: RegionEvent) {
        if self.state != SchedulerState::EventDriven {
            return;
        }
        trace!(?event, "Region event");
        self.frame_requested = true;
    }

    /// Animation-frame callback.
    ///
    /// Rebinds if the displayed region changed, then runs at most one cycle:
    /// when an event arrived since the last cycle, or when no cycle ran for
    /// the fallback interval.
    pub fn on_animation_frame(&mut self, now: Instant) -> Option<CycleOutcome> {
        if self.state != SchedulerState::EventDriven {
            return None;
        }
        if self.rebind() {
            self.frame_requested = true;
        }
        let stale = self
            .last_cycle_at
            .map_or(true, |at| now.saturating_duration_since(at) >= self.fallback_frame);
        if !self.frame_requested && !stale {
            return None;
        }
        self.frame_requested = false;
        self.last_cycle_at = Some(now);
        Some(self.engine.run_cycle())
    }

    fn evaluate_settings(&mut self, now: Instant) {
        if self.settings.allows_scanning() {
            if self.state == SchedulerState::Idle {
                self.transition(SchedulerState::Polling);
                self.next_tick = Some(now);
            }
        } else {
            self.next_tick = None;
            if self.state != SchedulerState::Idle {
                self.engine.clear();
                self.transition(SchedulerState::Idle);
            }
        }
    }

    /// Follow the displayed region. Returns `true` if a new binding was made.
    fn rebind(&mut self) -> bool {
        let Cadence::Events(binding) = &mut self.cadence else {
            return false;
        };
        let region = match binding.displayed_region() {
            Ok(Some(region)) => region,
            Ok(None) => {
                // View torn down; stop listening to the old region.
                binding.detach();
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Cannot read displayed region");
                return false;
            }
        };
        match binding.attach(region) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(%region, error = %e, "Region subscription failed");
                false
            }
        }
    }

    fn transition(&mut self, to: SchedulerState) {
        if self.state != to {
            info!(from = ?self.state, to = ?to, "Overlay scheduler state changed");
            self.state = to;
        }
    }
}

impl<E> std::fmt::Debug for OverlayScheduler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayScheduler")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("next_tick", &self.next_tick)
            .finish_non_exhaustive()
    }
}
