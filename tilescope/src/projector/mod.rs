//! Screen-space placement of discovered and recorded entities.
//!
//! Two placement paths exist:
//!
//! - **Scanned entities** ask the host for an entity-specific screen
//!   rectangle first and fall back to a generic tile→screen transform. Two
//!   candidate positions are derived, the raw one and one shifted by the
//!   visible origin, and [`reconcile`] picks between them.
//! - **Recorded entities** use the host's per-axis world→screen functions and
//!   are only drawn when both coordinates land on screen.

use tracing::trace;

use crate::coord::{CoordinateNormalizer, UnitClassifier};
use crate::geometry::{Axis, ScreenBounds, ScreenPoint};
use crate::host::{EntityRecord, HostResult, ProjectionHost, RecordedEntity};
use crate::scanner::DiscoveredEntity;

/// Default padding around the screen bounds when judging a candidate, in pixels.
pub const DEFAULT_SCREEN_TOLERANCE_PX: f64 = 48.0;

/// Which candidate a projection settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionBasis {
    /// Shifted by the host's visible origin.
    OriginAdjusted,
    /// As reported, without origin adjustment.
    Raw,
}

/// Screen placement of one scanned entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub position: ScreenPoint,
    pub basis: ProjectionBasis,
    /// False when the host had no rectangle for the entity.
    pub from_entity_rect: bool,
}

/// Per-cycle screen state, read once before projecting any entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenFrame {
    pub origin: Option<ScreenPoint>,
    pub bounds: Option<ScreenBounds>,
}

/// Pick between the raw and origin-adjusted candidates.
///
/// The origin-adjusted candidate wins when it is in bounds; otherwise the raw
/// one is used, whether or not it is in bounds. Unknown bounds accept any
/// finite point.
pub fn reconcile(
    raw: ScreenPoint,
    adjusted: Option<ScreenPoint>,
    bounds: Option<ScreenBounds>,
    tolerance: f64,
) -> (ScreenPoint, ProjectionBasis) {
    let in_bounds = |p: ScreenPoint| match bounds {
        Some(b) => b.contains(p, tolerance),
        None => p.is_finite(),
    };
    match adjusted {
        Some(adjusted) if in_bounds(adjusted) => (adjusted, ProjectionBasis::OriginAdjusted),
        _ => (raw, ProjectionBasis::Raw),
    }
}

/// Converts entity positions into screen coordinates.
#[derive(Debug, Clone, Copy)]
pub struct ScreenProjector {
    tolerance: f64,
}

impl Default for ScreenProjector {
    fn default() -> Self {
        Self::new(DEFAULT_SCREEN_TOLERANCE_PX)
    }
}

impl ScreenProjector {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Read the visible origin and screen bounds for this cycle.
    pub fn frame(&self, host: &dyn ProjectionHost) -> HostResult<ScreenFrame> {
        Ok(ScreenFrame {
            origin: host.visible_origin()?,
            bounds: host.screen_bounds()?,
        })
    }

    /// Place a scanned entity.
    pub fn project_entity<C: UnitClassifier>(
        &self,
        host: &dyn ProjectionHost,
        normalizer: &CoordinateNormalizer<C>,
        frame: &ScreenFrame,
        entity: &DiscoveredEntity,
        record: &dyn EntityRecord,
    ) -> HostResult<Projection> {
        let rect = host.entity_screen_rect(record)?.filter(|r| r.is_usable());
        let from_entity_rect = rect.is_some();
        let raw = match rect {
            Some(rect) => rect.center(),
            None => self.tile_to_screen(host, normalizer, entity.tile_x, entity.tile_y)?,
        };

        let adjusted = frame.origin.map(|origin| raw.offset_by(origin));
        let (position, basis) = reconcile(raw, adjusted, frame.bounds, self.tolerance);
        if !from_entity_rect {
            trace!(key = %entity.identity_key, ?position, "Projected without entity rect");
        }
        Ok(Projection {
            position,
            basis,
            from_entity_rect,
        })
    }

    /// Place a recorded entity, or `None` if it is off screen.
    pub fn project_recorded<C: UnitClassifier>(
        &self,
        host: &dyn ProjectionHost,
        normalizer: &CoordinateNormalizer<C>,
        frame: &ScreenFrame,
        entity: &RecordedEntity,
    ) -> HostResult<Option<ScreenPoint>> {
        let Some(bounds) = frame.bounds else {
            return Ok(None);
        };
        let px = normalizer.to_pixel(entity.x, Axis::X);
        let py = normalizer.to_pixel(entity.y, Axis::Y);
        let (Some(sx), Some(sy)) = (host.world_to_screen_x(px)?, host.world_to_screen_y(py)?)
        else {
            return Ok(None);
        };
        let point = ScreenPoint::new(sx, sy);
        Ok(bounds.contains(point, 0.0).then_some(point))
    }

    /// Generic transform from the center of a tile to the screen.
    fn tile_to_screen<C: UnitClassifier>(
        &self,
        host: &dyn ProjectionHost,
        normalizer: &CoordinateNormalizer<C>,
        tile_x: f64,
        tile_y: f64,
    ) -> HostResult<ScreenPoint> {
        let px = normalizer.tile_to_pixel(tile_x.floor() + 0.5, Axis::X);
        let py = normalizer.tile_to_pixel(tile_y.floor() + 0.5, Axis::Y);
        let sx = host.world_to_screen_x(px)?.unwrap_or(px);
        let sy = host.world_to_screen_y(py)?.unwrap_or(py);
        Ok(ScreenPoint::new(sx, sy))
    }
}
