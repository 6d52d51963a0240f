//! Marker rendering onto an overlay surface.
//!
//! Each engine owns one [`MarkerRenderer`]. The surface behind it is created
//! on first draw and reused afterwards. A render pass always clears the
//! surface and appends every marker again; there is no diffing.

mod memory;
mod style;

pub use memory::{MemorySurface, MemorySurfaceFactory, SurfaceLog};
pub use style::{
    MarkerStyle, Rgba, ALERT_COLOR, DEFAULT_BASE_SIZE_PX, DEFAULT_LEVEL_STEP_PX,
    DEFAULT_MAX_SIZE_PX, NEUTRAL_COLOR, TYPE_PALETTE,
};

use serde::Serialize;
use tracing::debug;

use crate::geometry::ScreenPoint;

/// A drawn marker. Markers carry no input handlers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub key: String,
    pub position: ScreenPoint,
    pub size: f64,
    pub color: Rgba,
    pub label: Option<String>,
}

/// What the caller knows about an entity to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub key: String,
    pub position: ScreenPoint,
    pub level: Option<f64>,
    pub type_id: Option<f64>,
    /// Draw with the alert color instead of the type palette.
    pub alert: bool,
    pub label: Option<String>,
}

impl MarkerSpec {
    pub fn new(key: impl Into<String>, position: ScreenPoint) -> Self {
        Self {
            key: key.into(),
            position,
            level: None,
            type_id: None,
            alert: false,
            label: None,
        }
    }

    pub fn with_level(mut self, level: Option<f64>) -> Self {
        self.level = level;
        self
    }

    pub fn with_type_id(mut self, type_id: Option<f64>) -> Self {
        self.type_id = type_id;
        self
    }

    pub fn with_alert(mut self, alert: bool) -> Self {
        self.alert = alert;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A host drawing layer that holds markers.
pub trait OverlaySurface {
    /// Remove every marker.
    fn clear(&mut self);

    /// Add one marker on top of the existing ones.
    fn append(&mut self, marker: Marker);

    /// Number of markers currently on the surface.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates overlay surfaces on demand.
pub trait SurfaceFactory {
    fn create(&mut self) -> Box<dyn OverlaySurface>;
}

/// Clears and rebuilds an overlay surface each cycle.
pub struct MarkerRenderer {
    factory: Box<dyn SurfaceFactory>,
    surface: Option<Box<dyn OverlaySurface>>,
    style: MarkerStyle,
}

impl MarkerRenderer {
    /// Create a renderer. No surface exists until the first render.
    pub fn new(factory: Box<dyn SurfaceFactory>, style: MarkerStyle) -> Self {
        Self {
            factory,
            surface: None,
            style,
        }
    }

    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    /// Replace the whole surface content with `specs`. Returns markers drawn.
    pub fn render<I>(&mut self, specs: I) -> usize
    where
        I: IntoIterator<Item = MarkerSpec>,
    {
        let factory = &mut self.factory;
        let surface = self.surface.get_or_insert_with(|| {
            debug!("Creating overlay surface");
            factory.create()
        });
        surface.clear();
        let mut drawn = 0;
        for spec in specs {
            surface.append(self.style.marker(spec));
            drawn += 1;
        }
        drawn
    }

    /// Remove all markers. Does not create a surface if none exists yet.
    pub fn clear(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
        }
    }

    /// Markers currently on the surface.
    pub fn marker_count(&self) -> usize {
        self.surface.as_ref().map_or(0, |s| s.len())
    }

    /// Whether the surface has been created.
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }
}

impl std::fmt::Debug for MarkerRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerRenderer")
            .field("has_surface", &self.has_surface())
            .field("markers", &self.marker_count())
            .field("style", &self.style)
            .finish()
    }
}
