//! Coordinate unit normalization.
//!
//! The host reports coordinates in either tile units or world pixel units and
//! never says which. [`CoordinateNormalizer`] decides per value using a
//! [`UnitClassifier`] and converts between the two spaces using the grid cell
//! size.
//!
//! # Conversion
//!
//! ```text
//! tile  ──(× cell)──►  pixel
//! pixel ──(÷ cell)──►  tile   (then clamped to [0, world] when the world size is known)
//! ```
//!
//! Normalization refuses to run without a valid grid cell: defaulting it
//! would silently scan the wrong area, so callers skip the cycle instead.

mod unit;

pub use unit::{
    CoordUnit, MagnitudeHeuristic, UnitClassifier, DEFAULT_PIXEL_MAGNITUDE_THRESHOLD,
    DEFAULT_PIXEL_SLACK,
};

use thiserror::Error;

use crate::geometry::{Axis, CellSize, WorldBounds};

/// Errors raised while building a normalizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    /// The grid cell size is missing, non-finite or not positive.
    #[error("Invalid grid cell size {width}×{height}")]
    InvalidGridCell { width: f64, height: f64 },

    /// The host did not report a grid cell size at all.
    #[error("Grid cell size unavailable")]
    GridCellUnavailable,
}

/// Converts values between tile-space and pixel-space for one cycle.
///
/// Built fresh each cycle from the host's current grid cell and world size.
#[derive(Debug, Clone)]
pub struct CoordinateNormalizer<C = MagnitudeHeuristic> {
    cell: CellSize,
    world: Option<WorldBounds>,
    classifier: C,
}

impl CoordinateNormalizer<MagnitudeHeuristic> {
    /// Create a normalizer using the default magnitude heuristic.
    pub fn new(cell: CellSize, world: Option<WorldBounds>) -> Result<Self, NormalizeError> {
        Self::with_classifier(cell, world, MagnitudeHeuristic::default())
    }
}

impl<C: UnitClassifier> CoordinateNormalizer<C> {
    /// Create a normalizer with an explicit unit classifier.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::InvalidGridCell`] when either cell dimension
    /// is non-finite or not strictly positive.
    pub fn with_classifier(
        cell: CellSize,
        world: Option<WorldBounds>,
        classifier: C,
    ) -> Result<Self, NormalizeError> {
        if !cell.is_valid() {
            return Err(NormalizeError::InvalidGridCell {
                width: cell.width,
                height: cell.height,
            });
        }
        Ok(Self {
            cell,
            world,
            classifier,
        })
    }

    /// The grid cell this normalizer converts with.
    pub fn cell(&self) -> CellSize {
        self.cell
    }

    /// Known world dimension along an axis, in tiles.
    pub fn world_extent(&self, axis: Axis) -> Option<f64> {
        self.world.and_then(|w| w.extent(axis))
    }

    /// Decide which unit a raw value is expressed in.
    pub fn classify(&self, value: f64, axis: Axis) -> CoordUnit {
        self.classifier.classify(value, self.world_extent(axis))
    }

    /// Normalize a value of unknown unit to tile-space.
    pub fn to_tile(&self, value: f64, axis: Axis) -> f64 {
        match self.classify(value, axis) {
            CoordUnit::Pixel => self.pixel_to_tile(value, axis),
            CoordUnit::Tile => self.clamp_tile(value, axis),
        }
    }

    /// Normalize a value of unknown unit to pixel-space.
    pub fn to_pixel(&self, value: f64, axis: Axis) -> f64 {
        match self.classify(value, axis) {
            CoordUnit::Pixel => value,
            CoordUnit::Tile => value * self.cell.along(axis),
        }
    }

    /// Convert a value known to be in pixels to tile-space.
    pub fn pixel_to_tile(&self, value: f64, axis: Axis) -> f64 {
        self.clamp_tile(value / self.cell.along(axis), axis)
    }

    /// Convert a value known to be in tiles to pixel-space.
    pub fn tile_to_pixel(&self, value: f64, axis: Axis) -> f64 {
        value * self.cell.along(axis)
    }

    /// Normalize a point of unknown unit to tile-space.
    pub fn point_to_tile(&self, x: f64, y: f64) -> (f64, f64) {
        (self.to_tile(x, Axis::X), self.to_tile(y, Axis::Y))
    }

    /// Clamp a tile value to `[0, world]` when the world size is known.
    pub fn clamp_tile(&self, value: f64, axis: Axis) -> f64 {
        match self.world_extent(axis) {
            Some(extent) => value.clamp(0.0, extent),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer_with_world(width: f64, height: f64) -> CoordinateNormalizer {
        CoordinateNormalizer::new(
            CellSize::new(10.0, 10.0),
            Some(WorldBounds::new(0.0, width, 0.0, height)),
        )
        .unwrap()
    }

    #[test]
    fn test_pixel_value_over_world_is_divided_and_clamped() {
        let normalizer = normalizer_with_world(1000.0, 1000.0);
        assert_eq!(normalizer.classify(12000.0, Axis::X), CoordUnit::Pixel);
        // 12000 / 10 = 1200, clamped to the 1000-tile world
        assert_eq!(normalizer.to_tile(12000.0, Axis::X), 1000.0);
    }

    #[test]
    fn test_small_value_is_tile_space_and_unchanged() {
        let normalizer = normalizer_with_world(1000.0, 1000.0);
        assert_eq!(normalizer.classify(42.0, Axis::X), CoordUnit::Tile);
        assert_eq!(normalizer.to_tile(42.0, Axis::X), 42.0);
    }

    #[test]
    fn test_value_within_slack_stays_tile_space() {
        let normalizer = normalizer_with_world(1000.0, 1000.0);
        assert_eq!(normalizer.classify(1050.0, Axis::X), CoordUnit::Tile);
        assert_eq!(normalizer.classify(1050.5, Axis::X), CoordUnit::Pixel);
    }

    #[test]
    fn test_pixel_value_inside_world_is_not_clamped() {
        let normalizer = normalizer_with_world(1000.0, 1000.0);
        assert_eq!(normalizer.to_tile(5000.0, Axis::Y), 500.0);
    }

    #[test]
    fn test_unknown_world_uses_absolute_threshold() {
        let normalizer = CoordinateNormalizer::new(CellSize::new(16.0, 8.0), None).unwrap();
        assert_eq!(normalizer.to_tile(4800.0, Axis::X), 4800.0);
        assert_eq!(normalizer.to_tile(8000.0, Axis::X), 500.0);
        assert_eq!(normalizer.to_tile(8000.0, Axis::Y), 1000.0);
    }

    #[test]
    fn test_to_pixel_multiplies_tile_values() {
        let normalizer = CoordinateNormalizer::new(CellSize::new(16.0, 8.0), None).unwrap();
        assert_eq!(normalizer.to_pixel(10.0, Axis::X), 160.0);
        assert_eq!(normalizer.to_pixel(10.0, Axis::Y), 80.0);
        assert_eq!(normalizer.to_pixel(9000.0, Axis::X), 9000.0);
    }

    #[test]
    fn test_invalid_grid_cell_is_rejected() {
        for (w, h) in [(0.0, 10.0), (10.0, -2.0), (f64::NAN, 10.0), (10.0, f64::INFINITY)] {
            let result = CoordinateNormalizer::new(CellSize::new(w, h), None);
            assert!(
                matches!(result, Err(NormalizeError::InvalidGridCell { .. })),
                "cell {}×{} should be rejected",
                w,
                h
            );
        }
    }

    #[test]
    fn test_negative_tile_values_clamp_to_zero() {
        let normalizer = normalizer_with_world(100.0, 100.0);
        assert_eq!(normalizer.to_tile(-12.0, Axis::X), 0.0);
    }

    #[test]
    fn test_custom_classifier_is_used() {
        struct AlwaysPixel;
        impl UnitClassifier for AlwaysPixel {
            fn classify(&self, _value: f64, _world_extent: Option<f64>) -> CoordUnit {
                CoordUnit::Pixel
            }
        }

        let normalizer =
            CoordinateNormalizer::with_classifier(CellSize::new(4.0, 4.0), None, AlwaysPixel)
                .unwrap();
        assert_eq!(normalizer.to_tile(42.0, Axis::X), 10.5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_tile_result_within_known_world(
                value in -1.0e6f64..1.0e6,
                world in 1.0f64..5000.0,
                cell in 0.5f64..64.0,
            ) {
                let normalizer = CoordinateNormalizer::new(
                    CellSize::new(cell, cell),
                    Some(WorldBounds::new(0.0, world, 0.0, world)),
                ).unwrap();
                let tile = normalizer.to_tile(value, Axis::X);
                prop_assert!((0.0..=world).contains(&tile));
            }

            #[test]
            fn prop_tile_pixel_roundtrip_without_world(
                tile in 0.0f64..300.0,
                cell in 1.0f64..16.0,
            ) {
                let normalizer = CoordinateNormalizer::new(CellSize::new(cell, cell), None).unwrap();
                let pixel = normalizer.tile_to_pixel(tile, Axis::X);
                let back = normalizer.pixel_to_tile(pixel, Axis::X);
                prop_assert!((back - tile).abs() < 1e-9);
            }
        }
    }
}
