//! Typed field extraction from opaque entity records.
//!
//! Each field is described by a [`FieldSpec`]: an ordered list of
//! [`Accessor`]s tried in sequence, first finite number wins. The lists are
//! data, not branching code, so supporting a new host schema variant means
//! adding an accessor, never editing control flow.
//!
//! # Zero handling
//!
//! ```text
//! score:    getScore() -> 0   → treated as absent, keep going
//!           get("ScorePoints") -> 150  → found
//! position: x -> 0            → found (0,0 is a real coordinate)
//! ```
//!
//! Zero scores are a common artifact of fields the host has not wired up,
//! so [`ZeroPolicy::PositiveOnly`] skips them while positions use
//! [`ZeroPolicy::Accept`].

mod accessor;
mod schema;

pub use accessor::{coerce_number, Accessor};
pub use schema::{CameraSchema, EntitySchema};

use crate::host::EntityRecord;

/// How a resolved zero is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPolicy {
    /// Zero is a valid value.
    Accept,
    /// Only values `> 0` count; zero means "not wired up".
    PositiveOnly,
}

/// Outcome of resolving one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldLookup {
    /// A usable value was found.
    Found(f64),
    /// Only zeros were found under [`ZeroPolicy::PositiveOnly`].
    Zero,
    /// No accessor produced a finite number.
    Missing,
}

impl FieldLookup {
    /// The found value, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            FieldLookup::Found(v) => Some(*v),
            FieldLookup::Zero | FieldLookup::Missing => None,
        }
    }
}

/// Ranked accessor chain for one named field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: &'static str,
    accessors: Vec<Accessor>,
    zero: ZeroPolicy,
}

impl FieldSpec {
    /// Create a field spec.
    pub fn new(name: &'static str, accessors: Vec<Accessor>, zero: ZeroPolicy) -> Self {
        Self {
            name,
            accessors,
            zero,
        }
    }

    /// Field name, for logging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The ranked accessors.
    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    /// Append an accessor at the lowest rank.
    pub fn push(&mut self, accessor: Accessor) {
        self.accessors.push(accessor);
    }

    /// Insert an accessor at the highest rank.
    pub fn prefer(&mut self, accessor: Accessor) {
        self.accessors.insert(0, accessor);
    }

    /// Try every accessor in rank order.
    pub fn resolve(&self, record: &dyn EntityRecord) -> FieldLookup {
        let mut saw_zero = false;
        for accessor in &self.accessors {
            let Some(value) = accessor.read(record) else {
                continue;
            };
            if self.zero == ZeroPolicy::PositiveOnly && value <= 0.0 {
                saw_zero |= value == 0.0;
                continue;
            }
            return FieldLookup::Found(value);
        }
        if saw_zero {
            FieldLookup::Zero
        } else {
            FieldLookup::Missing
        }
    }
}

/// Resolves typed entity fields using an [`EntitySchema`].
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    schema: EntitySchema,
}

impl EntityResolver {
    /// Create a resolver for the given schema.
    pub fn new(schema: EntitySchema) -> Self {
        Self { schema }
    }

    /// The schema in use.
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Oracle-provided identity, if the record carries one.
    ///
    /// Numeric ids are rendered without a fractional part; blank strings
    /// count as absent.
    pub fn identity(&self, record: &dyn EntityRecord) -> Option<String> {
        self.schema.identity.iter().find_map(|accessor| {
            let raw = accessor.read_raw(record)?;
            match raw {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .map(|i| i.to_string())
                    .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.to_string())),
                _ => None,
            }
        })
    }

    /// Position as reported by the record, in unknown units.
    pub fn position(&self, record: &dyn EntityRecord) -> Option<(f64, f64)> {
        let x = self.schema.x.resolve(record).value()?;
        let y = self.schema.y.resolve(record).value()?;
        Some((x, y))
    }

    /// Score, distinguishing "only zeros" from "nothing at all".
    pub fn score(&self, record: &dyn EntityRecord) -> FieldLookup {
        self.schema.score.resolve(record)
    }

    /// Level, if any.
    pub fn level(&self, record: &dyn EntityRecord) -> Option<f64> {
        self.schema.level.resolve(record).value()
    }

    /// Type id, if any.
    pub fn type_id(&self, record: &dyn EntityRecord) -> Option<f64> {
        self.schema.type_id.resolve(record).value()
    }
}
