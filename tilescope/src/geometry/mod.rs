//! Geometry primitives shared by every overlay component.
//!
//! Three coordinate spaces meet in this crate:
//!
//! ```text
//! tile-space   ──(× cell size)──►  world pixel-space  ──(host transform)──►  screen-space
//!   Viewport, TileRect                 PixelRect                              ScreenPoint
//! ```
//!
//! Tile-space is the coarse grid the world oracle is queried in. World
//! pixel-space is the fine rendering unit the host reports most geometry in.
//! Screen-space is what markers are positioned in.

use serde::Serialize;

/// One of the two planar axes.
///
/// Normalization depends on the axis because grid cells and worlds need not
/// be square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Size of one grid cell in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f64,
    pub height: f64,
}

impl CellSize {
    /// Create a new cell size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Cell dimension along the given axis.
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }

    /// Whether both dimensions are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Absolute world extent as reported by the host, in tile units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl WorldBounds {
    /// Create new world bounds.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Upper world dimension along an axis, if it is usable for clamping.
    pub fn extent(&self, axis: Axis) -> Option<f64> {
        let max = match axis {
            Axis::X => self.max_x,
            Axis::Y => self.max_y,
        };
        (max.is_finite() && max > 0.0).then_some(max)
    }
}

/// An axis-aligned rectangle given as origin plus size.
///
/// Used both for world pixel rectangles reported by the host and for the
/// fallback rectangle derived from a tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// Create a new rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether all components are finite and the size is positive.
    pub fn is_usable(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// A point in screen (or world pixel) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Subtract another point component-wise.
    pub fn offset_by(&self, origin: ScreenPoint) -> Self {
        Self::new(self.x - origin.x, self.y - origin.y)
    }

    /// Whether both components are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The on-screen drawing area, anchored at `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub width: f64,
    pub height: f64,
}

impl ScreenBounds {
    /// Create new screen bounds.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether a point lies within the bounds grown by `tolerance` on every side.
    pub fn contains(&self, point: ScreenPoint, tolerance: f64) -> bool {
        point.is_finite()
            && point.x >= -tolerance
            && point.x <= self.width + tolerance
            && point.y >= -tolerance
            && point.y <= self.height + tolerance
    }
}

/// Largest tile coordinate magnitude a viewport may reach (2^52).
///
/// Every integer up to this value is exact in `f64`, and sums of two
/// coordinates stay far inside `i64`.
pub const MAX_TILE_COORD: f64 = 4_503_599_627_370_496.0;

/// The visible area in tile units, as a half-open continuous range
/// `[min, max)` per axis.
///
/// Derived fresh every cycle and never stored beyond it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Viewport {
    /// Create a new viewport.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Width in tiles.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in tiles.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// A viewport is usable only when every bound is finite and both sides
    /// have positive length.
    pub fn is_usable(&self) -> bool {
        [self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.width() > 0.0
            && self.height() > 0.0
    }

    /// Whether a tile coordinate lies inside the viewport.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// The integer tiles touched by this viewport.
    ///
    /// Returns `None` for degenerate viewports and for bounds beyond
    /// [`MAX_TILE_COORD`].
    pub fn tile_rect(&self) -> Option<TileRect> {
        if !self.is_usable() {
            return None;
        }
        let lo_x = self.min_x.floor();
        let lo_y = self.min_y.floor();
        let hi_x = self.max_x.ceil();
        let hi_y = self.max_y.ceil();
        if [lo_x, lo_y, hi_x, hi_y]
            .iter()
            .any(|v| v.abs() > MAX_TILE_COORD)
        {
            return None;
        }
        let min_x = lo_x as i64;
        let min_y = lo_y as i64;
        let max_x = (hi_x as i64 - 1).max(min_x);
        let max_y = (hi_y as i64 - 1).max(min_y);
        Some(TileRect {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }
}

/// Inclusive integer tile rectangle walked by the ring scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

impl TileRect {
    /// Create a new inclusive rectangle.
    pub fn new(min_x: i64, max_x: i64, min_y: i64, max_y: i64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Whether the tile lies inside the rectangle.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }

    /// Number of tiles covered.
    ///
    /// Saturates at `u64::MAX`.
    pub fn tile_count(&self) -> u64 {
        let span = |lo: i64, hi: i64| (hi as i128 - lo as i128 + 1).max(0) as u128;
        let count = span(self.min_x, self.max_x).saturating_mul(span(self.min_y, self.max_y));
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    /// Center tile, clamped into the rectangle.
    pub fn center(&self) -> (i64, i64) {
        let mid = |lo: i64, hi: i64| {
            let m = (lo as i128 + hi as i128).div_euclid(2) as i64;
            m.min(hi).max(lo)
        };
        (mid(self.min_x, self.max_x), mid(self.min_y, self.max_y))
    }

    /// Largest Chebyshev distance from `center` to any edge of the rectangle.
    ///
    /// Saturates at `i64::MAX`.
    pub fn max_radius_from(&self, center: (i64, i64)) -> i64 {
        let (cx, cy) = (center.0 as i128, center.1 as i128);
        let radius = (cx - self.min_x as i128)
            .max(self.max_x as i128 - cx)
            .max(cy - self.min_y as i128)
            .max(self.max_y as i128 - cy)
            .max(0);
        i64::try_from(radius).unwrap_or(i64::MAX)
    }
}
