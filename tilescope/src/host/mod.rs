//! Contracts the host application fulfils.
//!
//! The host owns the world view; this crate only ever sees it through the
//! traits below. Every accessor is synchronous and may fail or return
//! nothing, because the host's object graph changes shape between releases.
//!
//! # Collaborators
//!
//! - [`WorldOracle`] - point query "what occupies this tile". Two instances
//!   are used in practice: one for geometry/identity, one for scores.
//! - [`ViewportHost`] - visible rectangle, camera, world bounds, grid cell.
//! - [`ProjectionHost`] - entity screen rectangles and world→screen transforms.
//! - [`RegionEventBus`] - subscription to camera/zoom/sector events of the
//!   currently displayed region.
//! - [`RecordedSource`] - user-authored points of interest.
//!
//! Records returned by the oracle are opaque [`EntityRecord`]s; see
//! [`crate::resolver`] for how typed fields are pulled out of them.

mod json;
mod record;

pub use record::EntityRecord;

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{CellSize, PixelRect, ScreenBounds, ScreenPoint, WorldBounds};

/// A failure reported by a host accessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The accessor exists but raised while being called.
    #[error("Host call '{call}' failed: {message}")]
    CallFailed { call: String, message: String },

    /// The host returned a value of an unexpected shape.
    #[error("Host returned malformed data from '{call}': {message}")]
    Malformed { call: String, message: String },

    /// Subscribing to region events was refused.
    #[error("Subscription to region {region} refused: {message}")]
    SubscriptionRefused { region: RegionId, message: String },
}

impl HostError {
    /// Convenience constructor for [`HostError::CallFailed`].
    pub fn call_failed(call: impl Into<String>, message: impl Into<String>) -> Self {
        HostError::CallFailed {
            call: call.into(),
            message: message.into(),
        }
    }
}

/// Result type for host accessors.
pub type HostResult<T> = Result<T, HostError>;

/// Whether the host view is currently in a state the overlay applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    /// The map view is showing and can be queried.
    #[default]
    Ready,
    /// Transiently busy (loading, transitioning). Skip without touching the overlay.
    Busy,
    /// The overlay does not apply (map view closed, wrong mode). Clear it.
    NotApplicable,
}

/// The host's point-query primitive.
pub trait WorldOracle {
    /// Return the entity occupying the given tile, if any.
    fn query_point(&self, tile_x: i64, tile_y: i64) -> HostResult<Option<Box<dyn EntityRecord>>>;
}

/// Viewport and world geometry accessors.
pub trait ViewportHost {
    /// Whether the view is in a state the overlay applies to.
    fn view_state(&self) -> ViewState {
        ViewState::Ready
    }

    /// Authoritative visible rectangle in world pixels.
    fn visible_rect(&self) -> HostResult<Option<PixelRect>>;

    /// The camera object, resolved with the camera schema.
    fn camera(&self) -> HostResult<Option<Box<dyn EntityRecord>>>;

    /// Absolute world bounds in tiles.
    fn world_bounds(&self) -> HostResult<Option<WorldBounds>>;

    /// Size of one grid cell in world pixels.
    fn grid_cell_size(&self) -> HostResult<Option<CellSize>>;
}

/// Projection accessors used to place markers on screen.
pub trait ProjectionHost {
    /// Screen rectangle the host draws this entity in, if it knows one.
    fn entity_screen_rect(&self, entity: &dyn EntityRecord) -> HostResult<Option<PixelRect>>;

    /// Offset of the visible area's origin.
    fn visible_origin(&self) -> HostResult<Option<ScreenPoint>>;

    /// Current drawing area.
    fn screen_bounds(&self) -> HostResult<Option<ScreenBounds>>;

    /// Project a world pixel x coordinate to screen.
    fn world_to_screen_x(&self, px: f64) -> HostResult<Option<f64>>;

    /// Project a world pixel y coordinate to screen.
    fn world_to_screen_y(&self, py: f64) -> HostResult<Option<f64>>;
}

/// Identity of a displayed region (camera/view instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u64);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Token returned by a successful subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);

/// Notifications delivered for the subscribed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionEvent {
    CameraMoved,
    Zoomed,
    SectorUpdated,
    RecordedSetChanged,
}

/// Attach/detach point for region event handlers.
pub trait RegionEventBus {
    /// The region currently on display.
    fn current_region(&self) -> HostResult<Option<RegionId>>;

    /// Attach handlers for camera move, zoom, sector update and
    /// recorded-set change to `region`.
    fn subscribe(&mut self, region: RegionId) -> HostResult<SubscriptionToken>;

    /// Detach a previous subscription.
    fn unsubscribe(&mut self, token: SubscriptionToken);
}

/// A user-authored point of interest, supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEntity {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub poi_level: Option<u32>,
    #[serde(default)]
    pub poi_type_id: Option<u32>,
}

impl RecordedEntity {
    /// A recorded entity with no level or type.
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            poi_level: None,
            poi_type_id: None,
        }
    }
}

/// Source of recorded entities, read every direct-projection cycle.
pub trait RecordedSource {
    fn recorded_entities(&self) -> Vec<RecordedEntity>;
}

impl RecordedSource for Vec<RecordedEntity> {
    fn recorded_entities(&self) -> Vec<RecordedEntity> {
        self.clone()
    }
}
