//! Direct-projection engine for recorded entities.
//!
//! No scanning: every cycle projects the full recorded list through the
//! host's world→screen functions and draws the ones that land on screen.

use std::ops::ControlFlow;

use super::{prepare, settle, CycleError, CycleOutcome, MapHost, OverlayEngine};
use crate::config::EngineConfig;
use crate::coord::MagnitudeHeuristic;
use crate::host::RecordedSource;
use crate::projector::ScreenProjector;
use crate::render::{MarkerRenderer, MarkerSpec, SurfaceFactory};
use crate::scanner::ScanDiagnostics;

/// Projects a caller-supplied list of recorded entities every cycle.
pub struct DirectEngine<H, R> {
    host: H,
    source: R,
    classifier: MagnitudeHeuristic,
    projector: ScreenProjector,
    renderer: MarkerRenderer,
    cycle: u64,
    diagnostics: ScanDiagnostics,
}

impl<H: MapHost, R: RecordedSource> DirectEngine<H, R> {
    pub fn new(
        host: H,
        source: R,
        surfaces: Box<dyn SurfaceFactory>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            host,
            source,
            classifier: config.units.classifier(),
            projector: ScreenProjector::new(config.projection.screen_tolerance_px),
            renderer: MarkerRenderer::new(surfaces, config.markers.style()),
            cycle: 0,
            diagnostics: ScanDiagnostics::default(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    fn try_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let normalizer = match prepare(&self.host, self.classifier, &mut self.renderer)? {
            ControlFlow::Continue(normalizer) => normalizer,
            ControlFlow::Break(outcome) => return Ok(outcome),
        };
        let frame = self.projector.frame(&self.host)?;

        let recorded = self.source.recorded_entities();
        let diag = &mut self.diagnostics;
        let mut specs = Vec::with_capacity(recorded.len());
        for entity in recorded {
            diag.scanned += 1;
            if !(entity.x.is_finite() && entity.y.is_finite()) {
                continue;
            }
            diag.has_position += 1;

            let Some(position) =
                self.projector.project_recorded(&self.host, &normalizer, &frame, &entity)?
            else {
                continue;
            };
            diag.visible += 1;
            // Typed entities use the palette; untyped ones stand out.
            specs.push(
                MarkerSpec::new(entity.id.clone(), position)
                    .with_level(entity.poi_level.map(f64::from))
                    .with_type_id(entity.poi_type_id.map(f64::from))
                    .with_alert(entity.poi_type_id.is_none())
                    .with_label(entity.id),
            );
        }

        let markers = self.renderer.render(specs);
        diag.drawn = markers as u32;
        Ok(CycleOutcome::Rendered { markers })
    }
}

impl<H: MapHost, R: RecordedSource> OverlayEngine for DirectEngine<H, R> {
    fn run_cycle(&mut self) -> CycleOutcome {
        self.cycle += 1;
        self.diagnostics = ScanDiagnostics::for_cycle(self.cycle);
        let result = self.try_cycle();
        settle("direct", result, &mut self.diagnostics)
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SkipReason;
    use crate::geometry::{CellSize, PixelRect, ScreenBounds, ScreenPoint, WorldBounds};
    use crate::host::{
        EntityRecord, HostError, HostResult, ProjectionHost, RecordedEntity, ViewState,
        ViewportHost,
    };
    use crate::render::{MemorySurfaceFactory, ALERT_COLOR, TYPE_PALETTE};

    struct PannedMap {
        state: ViewState,
        pan: (f64, f64),
        fail_projection: bool,
    }

    impl Default for PannedMap {
        fn default() -> Self {
            Self {
                state: ViewState::Ready,
                pan: (0.0, 0.0),
                fail_projection: false,
            }
        }
    }

    impl ViewportHost for PannedMap {
        fn view_state(&self) -> ViewState {
            self.state
        }

        fn visible_rect(&self) -> HostResult<Option<PixelRect>> {
            Ok(None)
        }

        fn camera(&self) -> HostResult<Option<Box<dyn EntityRecord>>> {
            Ok(None)
        }

        fn world_bounds(&self) -> HostResult<Option<WorldBounds>> {
            Ok(None)
        }

        fn grid_cell_size(&self) -> HostResult<Option<CellSize>> {
            Ok(Some(CellSize::new(10.0, 10.0)))
        }
    }

    impl ProjectionHost for PannedMap {
        fn entity_screen_rect(&self, _entity: &dyn EntityRecord) -> HostResult<Option<PixelRect>> {
            Ok(None)
        }

        fn visible_origin(&self) -> HostResult<Option<ScreenPoint>> {
            Ok(None)
        }

        fn screen_bounds(&self) -> HostResult<Option<ScreenBounds>> {
            Ok(Some(ScreenBounds::new(400.0, 300.0)))
        }

        fn world_to_screen_x(&self, px: f64) -> HostResult<Option<f64>> {
            if self.fail_projection {
                return Err(HostError::call_failed("worldToScreenX", "no camera"));
            }
            Ok(Some(px - self.pan.0))
        }

        fn world_to_screen_y(&self, py: f64) -> HostResult<Option<f64>> {
            Ok(Some(py - self.pan.1))
        }
    }

    fn recorded() -> Vec<RecordedEntity> {
        let mut typed = RecordedEntity::new("depot", 10.0, 10.0);
        typed.poi_type_id = Some(3);
        typed.poi_level = Some(2);
        vec![
            RecordedEntity::new("rally", 5.0, 5.0),
            typed,
            RecordedEntity::new("far", 500.0, 5.0),
        ]
    }

    type TestEngine = DirectEngine<PannedMap, Vec<RecordedEntity>>;

    fn engine(map: PannedMap) -> (TestEngine, MemorySurfaceFactory) {
        let surfaces = MemorySurfaceFactory::new();
        let engine = DirectEngine::new(
            map,
            recorded(),
            Box::new(surfaces.clone()),
            &EngineConfig::default(),
        );
        (engine, surfaces)
    }

    #[test]
    fn test_draws_only_on_screen_entities() {
        let (mut engine, surfaces) = engine(PannedMap::default());
        assert_eq!(engine.run_cycle(), CycleOutcome::Rendered { markers: 2 });

        let diag = engine.diagnostics();
        assert_eq!(diag.scanned, 3);
        assert_eq!(diag.visible, 2);
        assert_eq!(diag.drawn, 2);

        let log = surfaces.log();
        assert_eq!(log.keys(), vec!["rally".to_string(), "depot".to_string()]);
        assert_eq!(log.markers()[0].position, ScreenPoint::new(50.0, 50.0));
        assert_eq!(log.markers()[0].color, ALERT_COLOR);
        assert_eq!(log.markers()[1].color, TYPE_PALETTE[3]);
    }

    #[test]
    fn test_camera_pan_moves_markers() {
        let (mut engine, surfaces) = engine(PannedMap::default());
        engine.run_cycle();
        engine.host_mut().pan = (40.0, 0.0);
        engine.run_cycle();
        assert_eq!(surfaces.log().markers()[0].position, ScreenPoint::new(10.0, 50.0));
    }

    #[test]
    fn test_recorded_list_changes_are_picked_up() {
        let (mut engine, _surfaces) = engine(PannedMap::default());
        engine.run_cycle();
        engine.source_mut().clear();
        assert_eq!(engine.run_cycle(), CycleOutcome::Rendered { markers: 0 });
    }

    #[test]
    fn test_projection_failure_keeps_overlay() {
        let (mut engine, _surfaces) = engine(PannedMap::default());
        engine.run_cycle();
        engine.host_mut().fail_projection = true;
        assert_eq!(engine.run_cycle(), CycleOutcome::Failed);
        assert_eq!(engine.marker_count(), 2);
        assert!(engine.diagnostics().last_error.is_some());
    }

    #[test]
    fn test_busy_skips() {
        let (mut engine, _surfaces) = engine(PannedMap {
            state: ViewState::Busy,
            ..Default::default()
        });
        assert_eq!(engine.run_cycle(), CycleOutcome::Skipped(SkipReason::HostBusy));
        assert_eq!(engine.marker_count(), 0);
    }
}
