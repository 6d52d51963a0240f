//! Unit classification for ambiguous coordinate values.

/// Slack above the known world dimension before a value counts as pixels.
pub const DEFAULT_PIXEL_SLACK: f64 = 50.0;

/// Magnitude above which a value counts as pixels when the world size is unknown.
pub const DEFAULT_PIXEL_MAGNITUDE_THRESHOLD: f64 = 5000.0;

/// Unit a raw coordinate value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordUnit {
    /// Grid cell units.
    Tile,
    /// World pixel units.
    Pixel,
}

/// Decides which unit an untagged value is in.
///
/// Kept behind a trait so a host that starts tagging its units can replace
/// the magnitude guess without touching any caller.
pub trait UnitClassifier {
    /// Classify `value`, given the world dimension along the same axis in
    /// tiles when the host reports one.
    fn classify(&self, value: f64, world_extent: Option<f64>) -> CoordUnit;
}

/// Magnitude-based classification.
///
/// A value is pixel-space when it exceeds the known world dimension by more
/// than `slack`, or, with no known world dimension, when its magnitude
/// exceeds `magnitude_threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeHeuristic {
    pub slack: f64,
    pub magnitude_threshold: f64,
}

impl MagnitudeHeuristic {
    /// Create a heuristic with explicit thresholds.
    pub fn new(slack: f64, magnitude_threshold: f64) -> Self {
        Self {
            slack,
            magnitude_threshold,
        }
    }
}

impl Default for MagnitudeHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_PIXEL_SLACK, DEFAULT_PIXEL_MAGNITUDE_THRESHOLD)
    }
}

impl UnitClassifier for MagnitudeHeuristic {
    fn classify(&self, value: f64, world_extent: Option<f64>) -> CoordUnit {
        let is_pixel = match world_extent {
            Some(extent) => value > extent + self.slack,
            None => value.abs() > self.magnitude_threshold,
        };
        if is_pixel {
            CoordUnit::Pixel
        } else {
            CoordUnit::Tile
        }
    }
}
