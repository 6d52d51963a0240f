//! Simulated map host backed by a JSON world fixture.
//!
//! A fixture describes a tile grid, a screen, a camera that pans by a fixed
//! step each simulation step, and the entities on the map:
//!
//! ```json
//! {
//!   "cell": { "width": 16, "height": 16 },
//!   "world": { "width": 400, "height": 400 },
//!   "screen": { "width": 1280, "height": 720 },
//!   "camera": { "x": 0, "y": 0 },
//!   "pan": { "dx": 32, "dy": 0 },
//!   "entities": [ { "id": "keep", "x": 12, "y": 9, "w": 2, "h": 2, "score": 850 } ],
//!   "scores": [ { "x": 40, "y": 22, "score": 300 } ],
//!   "recorded": [ { "id": "rally", "x": 30, "y": 18 } ]
//! }
//! ```
//!
//! Entity records are handed to the engine as raw JSON objects. `w` and `h`
//! (tiles, default 1) set the area an entity covers for point queries.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use tilescope::geometry::{CellSize, PixelRect, ScreenBounds, ScreenPoint, WorldBounds};
use tilescope::host::{
    EntityRecord, HostResult, ProjectionHost, RecordedEntity, RecordedSource, RegionEventBus,
    RegionId, SubscriptionToken, ViewportHost, WorldOracle,
};

use crate::error::CliError;

/// The only region a simulated world displays.
pub const SIM_REGION: RegionId = RegionId(1);

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pan {
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreEntry {
    pub x: i64,
    pub y: i64,
    pub score: f64,
}

/// A world fixture as read from disk.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldFixture {
    pub cell: Size,
    pub world: Size,
    pub screen: Size,
    #[serde(default)]
    pub camera: Point,
    #[serde(default)]
    pub pan: Pan,
    #[serde(default)]
    pub entities: Vec<Value>,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub recorded: Vec<RecordedEntity>,
}

struct Shared {
    fixture: WorldFixture,
    /// Tile → index into `fixture.entities`.
    coverage: HashMap<(i64, i64), usize>,
    scores: HashMap<(i64, i64), f64>,
    /// Top-left of the view, in world pixels.
    camera: Cell<(f64, f64)>,
}

/// A loaded world. Cheap to clone; every handle sees the same camera.
#[derive(Clone)]
pub struct World {
    shared: Rc<Shared>,
}

impl World {
    /// Read and index a fixture file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Fixture {
            path: path.to_path_buf(),
            source,
        })?;
        let world = Self::from_json(&text)?;
        info!(
            path = %path.display(),
            entities = world.shared.fixture.entities.len(),
            recorded = world.shared.fixture.recorded.len(),
            "Loaded world fixture"
        );
        Ok(world)
    }

    pub fn from_json(text: &str) -> Result<Self, CliError> {
        let fixture: WorldFixture = serde_json::from_str(text)?;
        Ok(Self::new(fixture))
    }

    pub fn new(fixture: WorldFixture) -> Self {
        let mut coverage = HashMap::new();
        for (index, entity) in fixture.entities.iter().enumerate() {
            let (Some(x), Some(y)) = (number(entity, "x"), number(entity, "y")) else {
                debug!(index, "Skipping fixture entity without a position");
                continue;
            };
            let w = number(entity, "w").unwrap_or(1.0).max(1.0) as i64;
            let h = number(entity, "h").unwrap_or(1.0).max(1.0) as i64;
            let (x0, y0) = (x.floor() as i64, y.floor() as i64);
            for tx in x0..x0 + w {
                for ty in y0..y0 + h {
                    coverage.entry((tx, ty)).or_insert(index);
                }
            }
        }
        let scores = fixture
            .scores
            .iter()
            .map(|entry| ((entry.x, entry.y), entry.score))
            .collect();
        let camera = Cell::new((fixture.camera.x, fixture.camera.y));
        Self {
            shared: Rc::new(Shared {
                fixture,
                coverage,
                scores,
                camera,
            }),
        }
    }

    /// Move the camera one pan step.
    pub fn advance(&self) {
        let (x, y) = self.shared.camera.get();
        let pan = self.shared.fixture.pan;
        self.shared.camera.set((x + pan.dx, y + pan.dy));
    }

    pub fn camera(&self) -> (f64, f64) {
        self.shared.camera.get()
    }

    pub fn map(&self) -> SimMap {
        SimMap(self.clone())
    }

    pub fn geometry(&self) -> SimTiles {
        SimTiles(self.clone())
    }

    pub fn scores(&self) -> SimScores {
        SimScores(self.clone())
    }

    pub fn recorded(&self) -> SimRecorded {
        SimRecorded(self.clone())
    }

    pub fn bus(&self) -> SimBus {
        SimBus { next_token: 1 }
    }

    fn fixture(&self) -> &WorldFixture {
        &self.shared.fixture
    }
}

fn number(record: &Value, name: &str) -> Option<f64> {
    record.get(name).and_then(Value::as_f64)
}

/// Viewport and projection accessors.
pub struct SimMap(World);

impl ViewportHost for SimMap {
    fn visible_rect(&self) -> HostResult<Option<PixelRect>> {
        let (x, y) = self.0.camera();
        let screen = self.0.fixture().screen;
        Ok(Some(PixelRect::new(x, y, screen.width, screen.height)))
    }

    fn camera(&self) -> HostResult<Option<Box<dyn EntityRecord>>> {
        let (x, y) = self.0.camera();
        let screen = self.0.fixture().screen;
        let center = json!({
            "centerX": x + screen.width / 2.0,
            "centerY": y + screen.height / 2.0,
        });
        Ok(Some(Box::new(center)))
    }

    fn world_bounds(&self) -> HostResult<Option<WorldBounds>> {
        let world = self.0.fixture().world;
        Ok(Some(WorldBounds::new(0.0, world.width, 0.0, world.height)))
    }

    fn grid_cell_size(&self) -> HostResult<Option<CellSize>> {
        let cell = self.0.fixture().cell;
        Ok(Some(CellSize::new(cell.width, cell.height)))
    }
}

impl ProjectionHost for SimMap {
    fn entity_screen_rect(&self, entity: &dyn EntityRecord) -> HostResult<Option<PixelRect>> {
        let field = |name: &str| entity.property(name).and_then(|v| v.as_f64());
        let (Some(x), Some(y), Some(w), Some(h)) = (field("x"), field("y"), field("w"), field("h"))
        else {
            return Ok(None);
        };
        let cell = self.0.fixture().cell;
        let (cx, cy) = self.0.camera();
        Ok(Some(PixelRect::new(
            x * cell.width - cx,
            y * cell.height - cy,
            w * cell.width,
            h * cell.height,
        )))
    }

    fn visible_origin(&self) -> HostResult<Option<ScreenPoint>> {
        Ok(None)
    }

    fn screen_bounds(&self) -> HostResult<Option<ScreenBounds>> {
        let screen = self.0.fixture().screen;
        Ok(Some(ScreenBounds::new(screen.width, screen.height)))
    }

    fn world_to_screen_x(&self, px: f64) -> HostResult<Option<f64>> {
        Ok(Some(px - self.0.camera().0))
    }

    fn world_to_screen_y(&self, py: f64) -> HostResult<Option<f64>> {
        Ok(Some(py - self.0.camera().1))
    }
}

/// Geometry point-queries.
pub struct SimTiles(World);

impl WorldOracle for SimTiles {
    fn query_point(&self, tile_x: i64, tile_y: i64) -> HostResult<Option<Box<dyn EntityRecord>>> {
        let shared = &self.0.shared;
        Ok(shared
            .coverage
            .get(&(tile_x, tile_y))
            .and_then(|&index| shared.fixture.entities.get(index))
            .map(|entity| Box::new(entity.clone()) as Box<dyn EntityRecord>))
    }
}

/// Score-backend point-queries.
pub struct SimScores(World);

impl WorldOracle for SimScores {
    fn query_point(&self, tile_x: i64, tile_y: i64) -> HostResult<Option<Box<dyn EntityRecord>>> {
        Ok(self
            .0
            .shared
            .scores
            .get(&(tile_x, tile_y))
            .map(|score| Box::new(json!({ "ScorePoints": score })) as Box<dyn EntityRecord>))
    }
}

/// The fixture's recorded entity list.
pub struct SimRecorded(World);

impl RecordedSource for SimRecorded {
    fn recorded_entities(&self) -> Vec<RecordedEntity> {
        self.0.fixture().recorded.clone()
    }
}

/// Region events for a single-region world.
pub struct SimBus {
    next_token: u64,
}

impl RegionEventBus for SimBus {
    fn current_region(&self) -> HostResult<Option<RegionId>> {
        Ok(Some(SIM_REGION))
    }

    fn subscribe(&mut self, region: RegionId) -> HostResult<SubscriptionToken> {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        debug!(%region, token = token.0, "Simulated subscription");
        Ok(token)
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) {
        debug!(token = token.0, "Simulated unsubscription");
    }
}
