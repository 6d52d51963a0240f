//! Visible-bounds resolution.
//!
//! The host does not reliably expose what is on screen, so the viewport is
//! derived through a fallback chain, most accurate first:
//!
//! ```text
//! 1. visible rect (pixels)  ──► ÷ cell ──────────────────────────┐
//! 2. camera center          ──► normalize ──► ± radius window ───┼──► Viewport
//! 3. world bounds (tiles)   ─────────────────────────────────────┘
//! ```
//!
//! A level is used only if it produces finite bounds with positive area;
//! otherwise the next level is tried. When all three fail the cycle is
//! skipped.

use thiserror::Error;
use tracing::trace;

use crate::coord::{CoordinateNormalizer, UnitClassifier};
use crate::geometry::{Axis, Viewport};
use crate::host::{HostError, ViewportHost};
use crate::resolver::CameraSchema;

/// Default half-width of the camera window, in tiles.
pub const DEFAULT_CAMERA_RADIUS_TILES: f64 = 70.0;

/// Which fallback level produced the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsSource {
    VisibleRect,
    CameraWindow,
    WorldBounds,
}

impl BoundsSource {
    /// Short name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundsSource::VisibleRect => "visible-rect",
            BoundsSource::CameraWindow => "camera-window",
            BoundsSource::WorldBounds => "world-bounds",
        }
    }
}

/// A resolved viewport and where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBounds {
    pub viewport: Viewport,
    pub source: BoundsSource,
}

/// Errors from bounds resolution.
#[derive(Debug, Error)]
pub enum BoundsError {
    /// No fallback level produced usable bounds.
    #[error("Viewport bounds unavailable")]
    Unavailable,

    /// A host accessor failed.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Resolves the tile-space viewport for a cycle.
#[derive(Debug, Clone)]
pub struct ViewportBoundsResolver {
    camera_radius: f64,
    camera: CameraSchema,
}

impl Default for ViewportBoundsResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CAMERA_RADIUS_TILES)
    }
}

impl ViewportBoundsResolver {
    /// Create a resolver with the given camera window radius in tiles.
    pub fn new(camera_radius: f64) -> Self {
        Self {
            camera_radius,
            camera: CameraSchema::default(),
        }
    }

    /// Replace the camera accessor schema.
    pub fn with_camera_schema(mut self, camera: CameraSchema) -> Self {
        self.camera = camera;
        self
    }

    /// Resolve the viewport through the fallback chain.
    ///
    /// # Errors
    ///
    /// [`BoundsError::Unavailable`] when no level yields usable bounds;
    /// [`BoundsError::Host`] when an accessor raises.
    pub fn resolve<C: UnitClassifier>(
        &self,
        host: &dyn ViewportHost,
        normalizer: &CoordinateNormalizer<C>,
    ) -> Result<ResolvedBounds, BoundsError> {
        if let Some(viewport) = self.from_visible_rect(host, normalizer)? {
            return Ok(ResolvedBounds {
                viewport,
                source: BoundsSource::VisibleRect,
            });
        }
        if let Some(viewport) = self.from_camera(host, normalizer)? {
            return Ok(ResolvedBounds {
                viewport,
                source: BoundsSource::CameraWindow,
            });
        }
        if let Some(viewport) = self.from_world(host)? {
            return Ok(ResolvedBounds {
                viewport,
                source: BoundsSource::WorldBounds,
            });
        }
        Err(BoundsError::Unavailable)
    }

    fn from_visible_rect<C: UnitClassifier>(
        &self,
        host: &dyn ViewportHost,
        normalizer: &CoordinateNormalizer<C>,
    ) -> Result<Option<Viewport>, HostError> {
        let Some(rect) = host.visible_rect()? else {
            return Ok(None);
        };
        let viewport = Viewport::new(
            normalizer.pixel_to_tile(rect.x, Axis::X),
            normalizer.pixel_to_tile(rect.x + rect.width, Axis::X),
            normalizer.pixel_to_tile(rect.y, Axis::Y),
            normalizer.pixel_to_tile(rect.y + rect.height, Axis::Y),
        );
        Ok(usable(viewport, BoundsSource::VisibleRect))
    }

    fn from_camera<C: UnitClassifier>(
        &self,
        host: &dyn ViewportHost,
        normalizer: &CoordinateNormalizer<C>,
    ) -> Result<Option<Viewport>, HostError> {
        let Some(camera) = host.camera()? else {
            return Ok(None);
        };
        let (Some(cx), Some(cy)) = (
            self.camera.x.resolve(camera.as_ref()).value(),
            self.camera.y.resolve(camera.as_ref()).value(),
        ) else {
            trace!("Camera present but center unresolvable");
            return Ok(None);
        };
        let (cx, cy) = normalizer.point_to_tile(cx, cy);
        let r = self.camera_radius;
        let viewport = Viewport::new(
            normalizer.clamp_tile(cx - r, Axis::X),
            normalizer.clamp_tile(cx + r, Axis::X),
            normalizer.clamp_tile(cy - r, Axis::Y),
            normalizer.clamp_tile(cy + r, Axis::Y),
        );
        Ok(usable(viewport, BoundsSource::CameraWindow))
    }

    fn from_world(&self, host: &dyn ViewportHost) -> Result<Option<Viewport>, HostError> {
        let Some(world) = host.world_bounds()? else {
            return Ok(None);
        };
        let viewport = Viewport::new(world.min_x, world.max_x, world.min_y, world.max_y);
        Ok(usable(viewport, BoundsSource::WorldBounds))
    }
}

fn usable(viewport: Viewport, source: BoundsSource) -> Option<Viewport> {
    if viewport.is_usable() {
        Some(viewport)
    } else {
        trace!(source = source.as_str(), ?viewport, "Rejected degenerate bounds");
        None
    }
}
