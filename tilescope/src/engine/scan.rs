//! Budgeted scan engine.

use std::ops::ControlFlow;

use tracing::{info, trace};

use super::{prepare, settle, CycleError, CycleOutcome, MapHost, OverlayEngine, SkipReason};
use crate::config::{EngineConfig, EngineSettings};
use crate::coord::MagnitudeHeuristic;
use crate::host::WorldOracle;
use crate::projector::ScreenProjector;
use crate::render::{MarkerRenderer, MarkerSpec, SurfaceFactory};
use crate::scanner::{DiscoveredEntity, QueryBudget, RingScanner, ScanContext, ScanDiagnostics};
use crate::viewport::{BoundsError, ViewportBoundsResolver};

/// Discovers entities with a budgeted ring scan and marks them.
pub struct ScanEngine<H> {
    host: H,
    geometry: Box<dyn WorldOracle>,
    scores: Box<dyn WorldOracle>,
    classifier: MagnitudeHeuristic,
    bounds: ViewportBoundsResolver,
    scanner: RingScanner,
    projector: ScreenProjector,
    renderer: MarkerRenderer,
    budget: QueryBudget,
    score_threshold: f64,
    cycle: u64,
    diagnostics: ScanDiagnostics,
    discovered: Vec<DiscoveredEntity>,
}

impl<H: MapHost> ScanEngine<H> {
    /// Create an engine over `host`, querying `geometry` for tiles and
    /// `scores` for rankings.
    pub fn new(
        host: H,
        geometry: Box<dyn WorldOracle>,
        scores: Box<dyn WorldOracle>,
        surfaces: Box<dyn SurfaceFactory>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            host,
            geometry,
            scores,
            classifier: config.units.classifier(),
            bounds: ViewportBoundsResolver::new(config.scanner.camera_radius_tiles),
            scanner: RingScanner::default(),
            projector: ScreenProjector::new(config.projection.screen_tolerance_px),
            renderer: MarkerRenderer::new(surfaces, config.markers.style()),
            budget: QueryBudget::new(config.scanner.query_budget),
            score_threshold: 0.0,
            cycle: 0,
            diagnostics: ScanDiagnostics::default(),
            discovered: Vec::new(),
        }
    }

    /// Replace the ring scanner (e.g. to use a custom entity schema).
    pub fn with_scanner(mut self, scanner: RingScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Replace the bounds resolver.
    pub fn with_bounds_resolver(mut self, bounds: ViewportBoundsResolver) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn score_threshold(&self) -> f64 {
        self.score_threshold
    }

    pub fn set_score_threshold(&mut self, threshold: f64) {
        self.score_threshold = threshold;
    }

    /// Entities accepted by the most recent cycle that reached the scan.
    pub fn discovered(&self) -> &[DiscoveredEntity] {
        &self.discovered
    }

    fn try_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let normalizer = match prepare(&self.host, self.classifier, &mut self.renderer)? {
            ControlFlow::Continue(normalizer) => normalizer,
            ControlFlow::Break(outcome) => return Ok(outcome),
        };

        let resolved = match self.bounds.resolve(&self.host, &normalizer) {
            Ok(resolved) => resolved,
            Err(BoundsError::Unavailable) => {
                return Ok(CycleOutcome::Skipped(SkipReason::BoundsUnavailable))
            }
            Err(e) => return Err(e.into()),
        };
        self.diagnostics.bounds_source = Some(resolved.source.as_str());
        let Some(tiles) = resolved.viewport.tile_rect() else {
            return Ok(CycleOutcome::Skipped(SkipReason::BoundsUnavailable));
        };
        trace!(source = resolved.source.as_str(), ?tiles, "Resolved viewport");

        self.budget.reset();
        let ctx = ScanContext {
            viewport: resolved.viewport,
            tiles,
            normalizer: &normalizer,
            geometry: self.geometry.as_ref(),
            scores: self.scores.as_ref(),
            score_threshold: self.score_threshold,
        };
        let outcome = self.scanner.scan(&ctx, &mut self.budget, &mut self.diagnostics);

        let frame = self.projector.frame(&self.host)?;
        let mut specs = Vec::with_capacity(outcome.entities.len());
        for discovery in &outcome.entities {
            let entity = &discovery.entity;
            let projection = match self.projector.project_entity(
                &self.host,
                &normalizer,
                &frame,
                entity,
                discovery.record.as_ref(),
            ) {
                Ok(projection) => projection,
                Err(e) => {
                    self.diagnostics.projection_errors += 1;
                    self.diagnostics
                        .trace(format!("projection failed for {}: {}", entity.identity_key, e));
                    continue;
                }
            };
            if !projection.from_entity_rect {
                self.diagnostics.rect_missing += 1;
            }
            let mut spec = MarkerSpec::new(entity.identity_key.clone(), projection.position)
                .with_level(entity.level)
                .with_type_id(entity.type_id);
            if let Some(score) = entity.score {
                spec = spec.with_label(format!("{:.0}", score));
            }
            specs.push(spec);
        }

        let markers = self.renderer.render(specs);
        self.diagnostics.drawn = markers as u32;
        self.discovered = outcome.entities.into_iter().map(|d| d.entity).collect();
        Ok(CycleOutcome::Rendered { markers })
    }
}

impl<H: MapHost> OverlayEngine for ScanEngine<H> {
    fn run_cycle(&mut self) -> CycleOutcome {
        self.cycle += 1;
        self.diagnostics = ScanDiagnostics::for_cycle(self.cycle);
        let result = self.try_cycle();
        settle("scan", result, &mut self.diagnostics)
    }

    fn clear(&mut self) {
        self.renderer.clear();
    }

    fn diagnostics(&self) -> &ScanDiagnostics {
        &self.diagnostics
    }

    fn marker_count(&self) -> usize {
        self.renderer.marker_count()
    }

    fn apply_settings(&mut self, settings: &EngineSettings) {
        if settings.score_threshold != self.score_threshold {
            info!(
                from = self.score_threshold,
                to = settings.score_threshold,
                "Score threshold changed"
            );
        }
        self.score_threshold = settings.score_threshold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CellSize, PixelRect, ScreenBounds, ScreenPoint, WorldBounds};
    use crate::host::{
        EntityRecord, HostError, HostResult, ProjectionHost, ViewState, ViewportHost,
    };
    use crate::render::MemorySurfaceFactory;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    struct FakeMap {
        state: ViewState,
        rect: Option<PixelRect>,
        cell: Option<CellSize>,
        fail_origin: bool,
        fail_rect: bool,
    }

    impl Default for FakeMap {
        fn default() -> Self {
            Self {
                state: ViewState::Ready,
                rect: Some(PixelRect::new(0.0, 0.0, 100.0, 100.0)),
                cell: Some(CellSize::new(10.0, 10.0)),
                fail_origin: false,
                fail_rect: false,
            }
        }
    }

    impl ViewportHost for FakeMap {
        fn view_state(&self) -> ViewState {
            self.state
        }

        fn visible_rect(&self) -> HostResult<Option<PixelRect>> {
            Ok(self.rect)
        }

        fn camera(&self) -> HostResult<Option<Box<dyn EntityRecord>>> {
            Ok(None)
        }

        fn world_bounds(&self) -> HostResult<Option<WorldBounds>> {
            Ok(None)
        }

        fn grid_cell_size(&self) -> HostResult<Option<CellSize>> {
            Ok(self.cell)
        }
    }

    impl ProjectionHost for FakeMap {
        fn entity_screen_rect(&self, _entity: &dyn EntityRecord) -> HostResult<Option<PixelRect>> {
            if self.fail_rect {
                return Err(HostError::call_failed("getEntityScreenRect", "gone"));
            }
            Ok(None)
        }

        fn visible_origin(&self) -> HostResult<Option<ScreenPoint>> {
            if self.fail_origin {
                return Err(HostError::call_failed("getVisibleOrigin", "detached"));
            }
            Ok(None)
        }

        fn screen_bounds(&self) -> HostResult<Option<ScreenBounds>> {
            Ok(Some(ScreenBounds::new(100.0, 100.0)))
        }

        fn world_to_screen_x(&self, px: f64) -> HostResult<Option<f64>> {
            Ok(Some(px))
        }

        fn world_to_screen_y(&self, py: f64) -> HostResult<Option<f64>> {
            Ok(Some(py))
        }
    }

    struct Tiles(HashMap<(i64, i64), Value>);

    impl WorldOracle for Tiles {
        fn query_point(&self, x: i64, y: i64) -> HostResult<Option<Box<dyn EntityRecord>>> {
            Ok(self
                .0
                .get(&(x, y))
                .cloned()
                .map(|v| Box::new(v) as Box<dyn EntityRecord>))
        }
    }

    fn engine(map: FakeMap) -> (ScanEngine<FakeMap>, MemorySurfaceFactory) {
        let mut tiles = HashMap::new();
        tiles.insert((2, 2), json!({"id": "keep", "x": 2, "y": 2, "score": 300, "level": 2}));
        tiles.insert((7, 7), json!({"id": "fort", "x": 7, "y": 7, "score": 50}));
        let surfaces = MemorySurfaceFactory::new();
        let mut engine = ScanEngine::new(
            map,
            Box::new(Tiles(tiles)),
            Box::new(Tiles(HashMap::new())),
            Box::new(surfaces.clone()),
            &EngineConfig::default(),
        );
        engine.set_score_threshold(100.0);
        (engine, surfaces)
    }

    #[test]
    fn test_cycle_renders_accepted_entities() {
        let (mut engine, surfaces) = engine(FakeMap::default());
        assert_eq!(engine.run_cycle(), CycleOutcome::Rendered { markers: 1 });

        let log = surfaces.log();
        let marker = &log.markers()[0];
        assert_eq!(marker.key, "keep");
        assert_eq!(marker.position, ScreenPoint::new(25.0, 25.0));
        assert_eq!(marker.label.as_deref(), Some("300"));

        let diag = engine.diagnostics();
        assert_eq!(diag.cycle, 1);
        assert_eq!(diag.queries_issued, 100);
        assert_eq!(diag.scanned, 2);
        assert_eq!(diag.drawn, 1);
        assert_eq!(diag.rect_missing, 1);
        assert_eq!(diag.bounds_source, Some("visible-rect"));
    }

    #[test]
    fn test_consecutive_cycles_are_identical() {
        let (mut engine, _surfaces) = engine(FakeMap::default());
        let first = engine.run_cycle();
        let first_found = engine.discovered().to_vec();
        let second = engine.run_cycle();
        assert_eq!(first, second);
        assert_eq!(first_found, engine.discovered());
        assert_eq!(engine.diagnostics().cycle, 2);
    }

    #[test]
    fn test_busy_host_keeps_markers() {
        let (mut engine, _surfaces) = engine(FakeMap::default());
        engine.run_cycle();
        engine.host_mut().state = ViewState::Busy;
        assert_eq!(engine.run_cycle(), CycleOutcome::Skipped(SkipReason::HostBusy));
        assert_eq!(engine.marker_count(), 1);
        assert_eq!(engine.diagnostics().queries_issued, 0);
    }

    #[test]
    fn test_not_applicable_clears_markers() {
        let (mut engine, _surfaces) = engine(FakeMap::default());
        engine.run_cycle();
        engine.host_mut().state = ViewState::NotApplicable;
        assert_eq!(engine.run_cycle(), CycleOutcome::Cleared);
        assert_eq!(engine.marker_count(), 0);
    }

    #[test]
    fn test_missing_grid_skips() {
        let (mut engine, _surfaces) = engine(FakeMap {
            cell: Some(CellSize::new(0.0, 10.0)),
            ..Default::default()
        });
        assert_eq!(
            engine.run_cycle(),
            CycleOutcome::Skipped(SkipReason::GridUnavailable)
        );
    }

    #[test]
    fn test_host_error_recorded_and_overlay_kept() {
        let (mut engine, _surfaces) = engine(FakeMap::default());
        engine.run_cycle();
        engine.host_mut().fail_origin = true;
        assert_eq!(engine.run_cycle(), CycleOutcome::Failed);
        assert!(engine
            .diagnostics()
            .last_error
            .as_deref()
            .unwrap()
            .contains("getVisibleOrigin"));
        assert_eq!(engine.marker_count(), 1);

        engine.host_mut().fail_origin = false;
        assert_eq!(engine.run_cycle(), CycleOutcome::Rendered { markers: 1 });
        assert!(engine.diagnostics().last_error.is_none());
    }

    #[test]
    fn test_threshold_from_settings() {
        let (mut engine, _surfaces) = engine(FakeMap::default());
        engine.apply_settings(&EngineSettings::new(true, 50.0));
        assert_eq!(engine.run_cycle(), CycleOutcome::Rendered { markers: 2 });
    }

    #[test]
    fn test_small_budget_limits_queries() {
        let mut config = EngineConfig::default();
        config.scanner.query_budget = 9;
        let mut engine = ScanEngine::new(
            FakeMap::default(),
            Box::new(Tiles(HashMap::new())),
            Box::new(Tiles(HashMap::new())),
            Box::new(MemorySurfaceFactory::new()),
            &config,
        );
        engine.run_cycle();
        assert_eq!(engine.diagnostics().queries_issued, 9);
        assert!(engine.diagnostics().budget_exhausted);
    }

    #[test]
    fn test_projection_failure_is_counted_and_entity_dropped() {
        let (mut engine, _surfaces) = engine(FakeMap {
            fail_rect: true,
            ..Default::default()
        });
        assert_eq!(engine.run_cycle(), CycleOutcome::Rendered { markers: 0 });
        let diag = engine.diagnostics();
        assert_eq!(diag.projection_errors, 1);
        assert_eq!(diag.drawn, 0);
        assert!(diag.debug_trace[0].contains("keep"));
        assert!(diag.last_error.is_none());

        engine.host_mut().fail_rect = false;
        assert_eq!(engine.run_cycle(), CycleOutcome::Rendered { markers: 1 });
        assert_eq!(engine.diagnostics().projection_errors, 0);
    }

    #[test]
    fn test_viewport_beyond_tile_range_skips() {
        let (mut engine, _surfaces) = engine(FakeMap {
            rect: Some(PixelRect::new(5.0e19, 0.0, 4.0e19, 100.0)),
            ..Default::default()
        });
        assert_eq!(
            engine.run_cycle(),
            CycleOutcome::Skipped(SkipReason::BoundsUnavailable)
        );
        assert_eq!(engine.diagnostics().queries_issued, 0);
    }
}
