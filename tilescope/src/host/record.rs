//! The opaque entity record trait.

use serde_json::Value;

/// An entity object as returned by the host, of unknown and shifting shape.
///
/// The four access styles mirror how host objects expose data across
/// releases: zero-argument methods (`getScore()`), keyed getters
/// (`get("ScorePoints")`), plain properties (`score`) and nested sub-objects
/// (`stats.score`). Implementors return `None` for anything they lack.
pub trait EntityRecord {
    /// Invoke a zero-argument accessor method.
    fn call(&self, _method: &str) -> Option<Value> {
        None
    }

    /// Invoke a keyed getter such as `get("ScorePoints")`.
    fn call_keyed(&self, _method: &str, _key: &str) -> Option<Value> {
        None
    }

    /// Read a plain property.
    fn property(&self, name: &str) -> Option<Value>;

    /// Descend into a nested sub-record.
    fn child(&self, _name: &str) -> Option<&dyn EntityRecord> {
        None
    }
}

impl<T: EntityRecord + ?Sized> EntityRecord for Box<T> {
    fn call(&self, method: &str) -> Option<Value> {
        (**self).call(method)
    }

    fn call_keyed(&self, method: &str, key: &str) -> Option<Value> {
        (**self).call_keyed(method, key)
    }

    fn property(&self, name: &str) -> Option<Value> {
        (**self).property(name)
    }

    fn child(&self, name: &str) -> Option<&dyn EntityRecord> {
        (**self).child(name)
    }
}
