//! Marker colors and sizes.

use std::fmt;

use serde::{Serialize, Serializer};

use super::{Marker, MarkerSpec};

/// Default marker diameter for level 1 (or unknown level), in pixels.
pub const DEFAULT_BASE_SIZE_PX: f64 = 10.0;

/// Diameter added per level above 1, in pixels.
pub const DEFAULT_LEVEL_STEP_PX: f64 = 2.0;

/// Largest marker diameter, in pixels.
pub const DEFAULT_MAX_SIZE_PX: f64 = 28.0;

/// Color for recorded (user-authored) entities.
pub const ALERT_COLOR: Rgba = Rgba::new(0xff, 0x3b, 0x30, 0xe6);

/// Color for entities without a type id.
pub const NEUTRAL_COLOR: Rgba = Rgba::new(0xd0, 0xd4, 0xdc, 0xcc);

/// Colors indexed by `type_id % len`.
pub const TYPE_PALETTE: [Rgba; 8] = [
    Rgba::new(0x4c, 0xaf, 0x50, 0xcc),
    Rgba::new(0x21, 0x96, 0xf3, 0xcc),
    Rgba::new(0xff, 0xc1, 0x07, 0xcc),
    Rgba::new(0x9c, 0x27, 0xb0, 0xcc),
    Rgba::new(0x00, 0xbc, 0xd4, 0xcc),
    Rgba::new(0xff, 0x57, 0x22, 0xcc),
    Rgba::new(0x8b, 0xc3, 0x4a, 0xcc),
    Rgba::new(0xe9, 0x1e, 0x63, 0xcc),
];

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, 0xff)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Format as `#rrggbbaa`.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Turns entity attributes into marker size and color.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub base_size: f64,
    pub level_step: f64,
    pub max_size: f64,
    pub alert_color: Rgba,
    pub palette: Vec<Rgba>,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            base_size: DEFAULT_BASE_SIZE_PX,
            level_step: DEFAULT_LEVEL_STEP_PX,
            max_size: DEFAULT_MAX_SIZE_PX,
            alert_color: ALERT_COLOR,
            palette: TYPE_PALETTE.to_vec(),
        }
    }
}

impl MarkerStyle {
    /// Diameter for an entity of the given level.
    pub fn size_for(&self, level: Option<f64>) -> f64 {
        let steps = level
            .filter(|l| l.is_finite())
            .map_or(0.0, |l| (l.floor() - 1.0).max(0.0));
        (self.base_size + steps * self.level_step).min(self.max_size)
    }

    /// Palette color for a type id.
    pub fn color_for(&self, type_id: Option<f64>) -> Rgba {
        match type_id.filter(|t| t.is_finite() && *t >= 0.0) {
            Some(t) if !self.palette.is_empty() => {
                self.palette[(t as usize) % self.palette.len()]
            }
            _ => NEUTRAL_COLOR,
        }
    }

    /// Build the marker for a spec.
    pub fn marker(&self, spec: MarkerSpec) -> Marker {
        let color = if spec.alert {
            self.alert_color
        } else {
            self.color_for(spec.type_id)
        };
        Marker {
            size: self.size_for(spec.level),
            color,
            key: spec.key,
            position: spec.position,
            label: spec.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_format() {
        assert_eq!(Rgba::new(255, 0, 16, 128).to_hex(), "#ff001080");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgba::parse_hex("#ff001080"), Some(Rgba::new(255, 0, 16, 128)));
        assert_eq!(Rgba::parse_hex("#00ff00"), Some(Rgba::new(0, 255, 0, 255)));
        assert_eq!(Rgba::parse_hex("00ff00"), None);
        assert_eq!(Rgba::parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_size_scales_with_level_and_caps() {
        let style = MarkerStyle::default();
        assert_eq!(style.size_for(None), DEFAULT_BASE_SIZE_PX);
        assert_eq!(style.size_for(Some(1.0)), DEFAULT_BASE_SIZE_PX);
        assert_eq!(style.size_for(Some(3.0)), 14.0);
        assert_eq!(style.size_for(Some(50.0)), DEFAULT_MAX_SIZE_PX);
    }

    #[test]
    fn test_palette_wraps() {
        let style = MarkerStyle::default();
        assert_eq!(style.color_for(Some(9.0)), TYPE_PALETTE[1]);
        assert_eq!(style.color_for(Some(0.0)), TYPE_PALETTE[0]);
        assert_eq!(style.color_for(None), NEUTRAL_COLOR);
        assert_eq!(style.color_for(Some(-1.0)), NEUTRAL_COLOR);
    }

    #[test]
    fn test_color_serializes_as_hex() {
        let json = serde_json::to_value(ALERT_COLOR).unwrap();
        assert_eq!(json, "#ff3b30e6");
    }
}
