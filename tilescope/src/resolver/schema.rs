//! Default accessor rankings for entity and camera records.
//!
//! Rankings put call-style accessors first (the most recent host releases
//! expose methods), then keyed getters, then plain properties, then nested
//! containers.

use super::accessor::{nested_product, Accessor};
use super::{FieldSpec, ZeroPolicy};

const POSITION_CONTAINERS: &[&str] = &["position", "pos", "coords", "location"];
const CAMERA_CONTAINERS: &[&str] = &["center", "camera", "position", "pos"];
const DATA_CONTAINERS: &[&str] = &["stats", "data", "info", "attributes"];

/// Field specs for entities returned by the world oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    pub identity: Vec<Accessor>,
    pub x: FieldSpec,
    pub y: FieldSpec,
    pub score: FieldSpec,
    pub level: FieldSpec,
    pub type_id: FieldSpec,
}

impl Default for EntitySchema {
    fn default() -> Self {
        Self {
            identity: vec![
                Accessor::call("getId"),
                Accessor::call("getUid"),
                Accessor::property("id"),
                Accessor::property("uid"),
                Accessor::property("entityId"),
                Accessor::property("objectId"),
            ],
            x: axis_spec("x", &["getX", "getTileX", "getPosX"], &["x", "tileX", "X", "posX"]),
            y: axis_spec("y", &["getY", "getTileY", "getPosY"], &["y", "tileY", "Y", "posY"]),
            score: data_spec(
                "score",
                ZeroPolicy::PositiveOnly,
                &["getScore", "getPoints", "getScorePoints"],
                &[("get", "ScorePoints"), ("get", "Score"), ("get", "Points")],
                &["score", "points", "ScorePoints", "scorePoints"],
            ),
            level: data_spec(
                "level",
                ZeroPolicy::PositiveOnly,
                &["getLevel", "getLvl"],
                &[("get", "Level")],
                &["level", "poiLevel", "lvl"],
            ),
            type_id: data_spec(
                "type_id",
                ZeroPolicy::Accept,
                &["getTypeId", "getType"],
                &[("get", "TypeId")],
                &["typeId", "poiTypeId", "type"],
            ),
        }
    }
}

/// Field specs for the host camera object.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSchema {
    pub x: FieldSpec,
    pub y: FieldSpec,
}

impl Default for CameraSchema {
    fn default() -> Self {
        let mut x = axis_spec("camera_x", &["getCenterX", "getCameraX"], &["centerX", "cx"]);
        let mut y = axis_spec("camera_y", &["getCenterY", "getCameraY"], &["centerY", "cy"]);
        for accessor in nested_product(CAMERA_CONTAINERS, &["x"]) {
            x.prefer_nested(accessor);
        }
        for accessor in nested_product(CAMERA_CONTAINERS, &["y"]) {
            y.prefer_nested(accessor);
        }
        Self { x, y }
    }
}

impl FieldSpec {
    /// Insert a nested accessor right after the call-style accessors.
    fn prefer_nested(&mut self, accessor: Accessor) {
        let at = self
            .accessors
            .iter()
            .position(|a| !matches!(a, Accessor::Call(_)))
            .unwrap_or(self.accessors.len());
        let at = self.accessors[at..]
            .iter()
            .position(|a| !matches!(a, Accessor::Nested { .. }))
            .map_or(self.accessors.len(), |offset| at + offset);
        self.accessors.insert(at, accessor);
    }
}

fn axis_spec(name: &'static str, methods: &[&str], props: &[&str]) -> FieldSpec {
    let mut accessors: Vec<Accessor> = methods.iter().map(|m| Accessor::call(m)).collect();
    accessors.extend(props.iter().map(|p| Accessor::property(p)));
    let axis_fields: Vec<&str> = props.iter().take(2).copied().collect();
    accessors.extend(nested_product(POSITION_CONTAINERS, &axis_fields));
    FieldSpec::new(name, accessors, ZeroPolicy::Accept)
}

fn data_spec(
    name: &'static str,
    zero: ZeroPolicy,
    methods: &[&str],
    keyed: &[(&str, &str)],
    props: &[&str],
) -> FieldSpec {
    let mut accessors: Vec<Accessor> = methods.iter().map(|m| Accessor::call(m)).collect();
    accessors.extend(keyed.iter().map(|(m, k)| Accessor::keyed(m, k)));
    accessors.extend(props.iter().map(|p| Accessor::property(p)));
    accessors.extend(nested_product(DATA_CONTAINERS, props));
    FieldSpec::new(name, accessors, zero)
}
