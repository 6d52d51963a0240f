//! Integration tests for the overlay cycle.
//!
//! These tests drive the public API end to end:
//! - scheduler → scan engine → ring scan → projection → marker surface
//! - scheduler → direct engine with region event rebinding
//! - settings gating and failure handling at the cycle boundary
//!
//! Run with: `cargo test --test overlay_cycle_integration`

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use tilescope::config::{EngineConfig, EngineSettings};
use tilescope::engine::{CycleOutcome, DirectEngine, OverlayEngine, ScanEngine, SkipReason};
use tilescope::geometry::{CellSize, PixelRect, ScreenBounds, ScreenPoint, WorldBounds};
use tilescope::host::{
    EntityRecord, HostError, HostResult, ProjectionHost, RecordedEntity, RegionEvent,
    RegionEventBus, RegionId, SubscriptionToken, ViewState, ViewportHost, WorldOracle,
};
use tilescope::render::MemorySurfaceFactory;
use tilescope::scheduler::{OverlayScheduler, SchedulerState};

// ============================================================================
// Scripted Host
// ============================================================================

/// A 20×20 tile map (10 px tiles) fully visible, with an identity projection.
struct ScriptedMap {
    state: ViewState,
    visible: Option<PixelRect>,
    world: Option<WorldBounds>,
    fail_bounds_call: bool,
}

impl Default for ScriptedMap {
    fn default() -> Self {
        Self {
            state: ViewState::Ready,
            visible: Some(PixelRect::new(0.0, 0.0, 200.0, 200.0)),
            world: Some(WorldBounds::new(0.0, 20.0, 0.0, 20.0)),
            fail_bounds_call: false,
        }
    }
}

impl ViewportHost for ScriptedMap {
    fn view_state(&self) -> ViewState {
        self.state
    }

    fn visible_rect(&self) -> HostResult<Option<PixelRect>> {
        if self.fail_bounds_call {
            return Err(HostError::call_failed("getVisibleRect", "view destroyed"));
        }
        Ok(self.visible)
    }

    fn camera(&self) -> HostResult<Option<Box<dyn EntityRecord>>> {
        Ok(None)
    }

    fn world_bounds(&self) -> HostResult<Option<WorldBounds>> {
        Ok(self.world)
    }

    fn grid_cell_size(&self) -> HostResult<Option<CellSize>> {
        Ok(Some(CellSize::new(10.0, 10.0)))
    }
}

impl ProjectionHost for ScriptedMap {
    fn entity_screen_rect(&self, _entity: &dyn EntityRecord) -> HostResult<Option<PixelRect>> {
        Ok(None)
    }

    fn visible_origin(&self) -> HostResult<Option<ScreenPoint>> {
        Ok(Some(ScreenPoint::new(0.0, 0.0)))
    }

    fn screen_bounds(&self) -> HostResult<Option<ScreenBounds>> {
        Ok(Some(ScreenBounds::new(200.0, 200.0)))
    }

    fn world_to_screen_x(&self, px: f64) -> HostResult<Option<f64>> {
        Ok(Some(px))
    }

    fn world_to_screen_y(&self, py: f64) -> HostResult<Option<f64>> {
        Ok(Some(py))
    }
}

/// Point-query oracle that counts every query it answers.
struct CountingTiles {
    tiles: HashMap<(i64, i64), Value>,
    queries: Rc<Cell<u32>>,
}

impl WorldOracle for CountingTiles {
    fn query_point(&self, x: i64, y: i64) -> HostResult<Option<Box<dyn EntityRecord>>> {
        self.queries.set(self.queries.get() + 1);
        Ok(self
            .tiles
            .get(&(x, y))
            .cloned()
            .map(|v| Box::new(v) as Box<dyn EntityRecord>))
    }
}

#[derive(Default)]
struct BusState {
    region: Option<RegionId>,
    subscribed: Vec<RegionId>,
    unsubscribed: Vec<SubscriptionToken>,
}

struct SharedBus(Rc<RefCell<BusState>>);

impl RegionEventBus for SharedBus {
    fn current_region(&self) -> HostResult<Option<RegionId>> {
        Ok(self.0.borrow().region)
    }

    fn subscribe(&mut self, region: RegionId) -> HostResult<SubscriptionToken> {
        self.0.borrow_mut().subscribed.push(region);
        Ok(SubscriptionToken(100 + region.0))
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) {
        self.0.borrow_mut().unsubscribed.push(token);
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn world_tiles() -> HashMap<(i64, i64), Value> {
    let mut tiles = HashMap::new();
    // A large entity covering four tiles reports the same id everywhere.
    for (x, y) in [(9, 9), (10, 9), (9, 10), (10, 10)] {
        tiles.insert(
            (x, y),
            json!({"id": "citadel", "x": 9, "y": 9, "score": 900, "level": 4, "typeId": 1}),
        );
    }
    tiles.insert((3, 15), json!({"id": "outpost", "x": 3, "y": 15, "score": 120}));
    tiles.insert((16, 2), json!({"id": "hamlet", "x": 16, "y": 2, "score": 40}));
    tiles
}

struct ScanFixture {
    scheduler: OverlayScheduler<ScanEngine<ScriptedMap>>,
    surfaces: MemorySurfaceFactory,
    queries: Rc<Cell<u32>>,
}

fn scan_fixture() -> ScanFixture {
    let queries = Rc::new(Cell::new(0));
    let surfaces = MemorySurfaceFactory::new();
    let config = EngineConfig::default();
    let engine = ScanEngine::new(
        ScriptedMap::default(),
        Box::new(CountingTiles {
            tiles: world_tiles(),
            queries: Rc::clone(&queries),
        }),
        Box::new(CountingTiles {
            tiles: HashMap::new(),
            queries: Rc::new(Cell::new(0)),
        }),
        Box::new(surfaces.clone()),
        &config,
    );
    ScanFixture {
        scheduler: OverlayScheduler::polling(engine, &config.scheduler),
        surfaces,
        queries,
    }
}

fn interval() -> Duration {
    EngineConfig::default().scheduler.poll_interval()
}

// ============================================================================
// Scan Engine Cycles
// ============================================================================

#[test]
fn test_repeated_cycles_are_idempotent() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler
        .apply_settings(EngineSettings::new(true, 100.0), t0);
    assert_eq!(fx.scheduler.state(), SchedulerState::Polling);

    let first = fx.scheduler.tick(t0).expect("first tick runs");
    let first_keys = fx.surfaces.log().keys();
    let first_found = fx.scheduler.engine().discovered().to_vec();

    let second = fx.scheduler.tick(t0 + interval()).expect("second tick runs");
    assert_eq!(first, CycleOutcome::Rendered { markers: 2 });
    assert_eq!(first, second);
    assert_eq!(first_keys, fx.surfaces.log().keys());
    assert_eq!(first_found, fx.scheduler.engine().discovered());

    // Duplicated hits on the large entity are counted but drawn once.
    let diag = fx.scheduler.diagnostics();
    assert_eq!(diag.cycle, 2);
    assert_eq!(diag.duplicates, 3);
    assert_eq!(diag.queries_issued, 400);
    assert!(!diag.budget_exhausted);
}

#[test]
fn test_ring_order_puts_nearest_first() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 10.0), t0);
    fx.scheduler.tick(t0);

    let keys: Vec<String> = fx
        .scheduler
        .engine()
        .discovered()
        .iter()
        .map(|e| e.identity_key.clone())
        .collect();
    assert_eq!(keys, vec!["citadel", "outpost", "hamlet"]);
}

#[test]
fn test_disabled_settings_idle_without_queries() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 100.0), t0);
    fx.scheduler.tick(t0);
    assert_eq!(fx.scheduler.engine().marker_count(), 2);
    let before = fx.queries.get();

    fx.scheduler
        .apply_settings(EngineSettings::new(false, 100.0), t0 + interval());
    for step in 1..5 {
        assert!(fx.scheduler.tick(t0 + interval() * step).is_none());
    }

    assert_eq!(fx.scheduler.state(), SchedulerState::Idle);
    assert_eq!(fx.queries.get(), before);
    assert_eq!(fx.scheduler.engine().marker_count(), 0);
}

#[test]
fn test_zero_threshold_is_idle() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 0.0), t0);
    assert_eq!(fx.scheduler.state(), SchedulerState::Idle);
    assert!(fx.scheduler.tick(t0).is_none());
    assert_eq!(fx.queries.get(), 0);
}

#[test]
fn test_not_applicable_clears_overlay() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 100.0), t0);
    fx.scheduler.tick(t0);

    fx.scheduler.engine_mut().host_mut().state = ViewState::NotApplicable;
    let outcome = fx.scheduler.tick(t0 + interval());
    assert_eq!(outcome, Some(CycleOutcome::Cleared));
    assert_eq!(fx.scheduler.engine().marker_count(), 0);
}

#[test]
fn test_bounds_unavailable_keeps_overlay() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 100.0), t0);
    fx.scheduler.tick(t0);
    let queries = fx.queries.get();

    let host = fx.scheduler.engine_mut().host_mut();
    host.visible = None;
    host.world = None;
    let outcome = fx.scheduler.tick(t0 + interval());

    assert_eq!(
        outcome,
        Some(CycleOutcome::Skipped(SkipReason::BoundsUnavailable))
    );
    assert_eq!(fx.scheduler.engine().marker_count(), 2);
    assert_eq!(fx.queries.get(), queries);
}

#[test]
fn test_world_bounds_fallback() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.engine_mut().host_mut().visible = None;
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 100.0), t0);
    fx.scheduler.tick(t0);

    assert_eq!(
        fx.scheduler.diagnostics().bounds_source,
        Some("world-bounds")
    );
    assert_eq!(fx.scheduler.engine().marker_count(), 2);
}

#[test]
fn test_host_error_recorded_and_retried() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 100.0), t0);
    fx.scheduler.tick(t0);

    fx.scheduler.engine_mut().host_mut().fail_bounds_call = true;
    assert_eq!(
        fx.scheduler.tick(t0 + interval()),
        Some(CycleOutcome::Failed)
    );
    let error = fx.scheduler.diagnostics().last_error.clone();
    assert!(error.unwrap_or_default().contains("getVisibleRect"));
    assert_eq!(fx.scheduler.engine().marker_count(), 2);

    fx.scheduler.engine_mut().host_mut().fail_bounds_call = false;
    assert_eq!(
        fx.scheduler.tick(t0 + interval() * 2),
        Some(CycleOutcome::Rendered { markers: 2 })
    );
}

#[test]
fn test_diagnostics_serialize_for_status_panel() {
    let t0 = Instant::now();
    let mut fx = scan_fixture();
    fx.scheduler.start(t0);
    fx.scheduler.apply_settings(EngineSettings::new(true, 100.0), t0);
    fx.scheduler.tick(t0);

    let value = serde_json::to_value(fx.scheduler.diagnostics()).unwrap();
    assert_eq!(value["queriesIssued"], json!(400));
    assert_eq!(value["boundsSource"], json!("visible-rect"));
    assert_eq!(value["maxScoreSeen"], json!(900.0));
}

// ============================================================================
// Direct Engine With Region Events
// ============================================================================

fn direct_fixture() -> (
    OverlayScheduler<DirectEngine<ScriptedMap, Vec<RecordedEntity>>>,
    Rc<RefCell<BusState>>,
) {
    let bus = Rc::new(RefCell::new(BusState {
        region: Some(RegionId(7)),
        ..Default::default()
    }));
    let config = EngineConfig::default();
    let engine = DirectEngine::new(
        ScriptedMap::default(),
        vec![
            RecordedEntity::new("camp", 4.0, 4.0),
            RecordedEntity::new("offscreen", 300.0, 4.0),
        ],
        Box::new(MemorySurfaceFactory::new()),
        &config,
    );
    let scheduler = OverlayScheduler::event_driven(
        engine,
        Box::new(SharedBus(Rc::clone(&bus))),
        &config.scheduler,
    );
    (scheduler, bus)
}

#[test]
fn test_region_change_detaches_once_and_attaches_once() {
    let t0 = Instant::now();
    let frame = Duration::from_millis(16);
    let (mut scheduler, bus) = direct_fixture();
    scheduler.start(t0);
    assert_eq!(
        scheduler.on_animation_frame(t0),
        Some(CycleOutcome::Rendered { markers: 1 })
    );

    bus.borrow_mut().region = Some(RegionId(8));
    scheduler.on_region_event(RegionEvent::CameraMoved);
    scheduler.on_animation_frame(t0 + frame);
    scheduler.on_animation_frame(t0 + frame * 2);
    scheduler.on_animation_frame(t0 + frame * 3);

    let state = bus.borrow();
    assert_eq!(state.subscribed, vec![RegionId(7), RegionId(8)]);
    assert_eq!(state.unsubscribed, vec![SubscriptionToken(107)]);
}

#[test]
fn test_recorded_set_change_redraws_on_next_frame() {
    let t0 = Instant::now();
    let (mut scheduler, _bus) = direct_fixture();
    scheduler.start(t0);
    scheduler.on_animation_frame(t0);

    scheduler
        .engine_mut()
        .source_mut()
        .push(RecordedEntity::new("depot", 8.0, 8.0));
    scheduler.on_region_event(RegionEvent::RecordedSetChanged);
    assert_eq!(
        scheduler.on_animation_frame(t0 + Duration::from_millis(16)),
        Some(CycleOutcome::Rendered { markers: 2 })
    );
}

#[test]
fn test_stop_clears_and_unbinds() {
    let t0 = Instant::now();
    let (mut scheduler, bus) = direct_fixture();
    scheduler.start(t0);
    scheduler.on_animation_frame(t0);
    scheduler.stop();

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.engine().marker_count(), 0);
    assert_eq!(bus.borrow().unsubscribed.len(), 1);
}
