//! Single accessor strategies.

use serde_json::Value;

use crate::host::EntityRecord;

/// One way of reading a value out of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// Zero-argument method, e.g. `getScore()`.
    Call(String),
    /// Keyed getter, e.g. `get("ScorePoints")`.
    CallKeyed { method: String, key: String },
    /// Plain property, e.g. `score`.
    Property(String),
    /// An accessor applied to a nested sub-record, e.g. `stats.score`.
    Nested {
        container: String,
        inner: Box<Accessor>,
    },
}

impl Accessor {
    /// Shorthand for [`Accessor::Call`].
    pub fn call(method: &str) -> Self {
        Accessor::Call(method.to_string())
    }

    /// Shorthand for [`Accessor::CallKeyed`].
    pub fn keyed(method: &str, key: &str) -> Self {
        Accessor::CallKeyed {
            method: method.to_string(),
            key: key.to_string(),
        }
    }

    /// Shorthand for [`Accessor::Property`].
    pub fn property(name: &str) -> Self {
        Accessor::Property(name.to_string())
    }

    /// Shorthand for [`Accessor::Nested`].
    pub fn nested(container: &str, inner: Accessor) -> Self {
        Accessor::Nested {
            container: container.to_string(),
            inner: Box::new(inner),
        }
    }

    /// Read the raw value without numeric coercion.
    pub fn read_raw(&self, record: &dyn EntityRecord) -> Option<Value> {
        match self {
            Accessor::Call(method) => record.call(method),
            Accessor::CallKeyed { method, key } => record.call_keyed(method, key),
            Accessor::Property(name) => record.property(name),
            Accessor::Nested { container, inner } => inner.read_raw(record.child(container)?),
        }
    }

    /// Read a finite number.
    pub fn read(&self, record: &dyn EntityRecord) -> Option<f64> {
        self.read_raw(record).as_ref().and_then(coerce_number)
    }
}

impl std::fmt::Display for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Accessor::Call(method) => write!(f, "{}()", method),
            Accessor::CallKeyed { method, key } => write!(f, "{}(\"{}\")", method, key),
            Accessor::Property(name) => write!(f, "{}", name),
            Accessor::Nested { container, inner } => write!(f, "{}.{}", container, inner),
        }
    }
}

/// Coerce a loosely-typed value to a finite number.
///
/// Numbers pass through, numeric strings are parsed. Everything else,
/// including non-finite results, yields `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Build nested accessors for every container × field pair, container-major.
pub(crate) fn nested_product(containers: &[&str], fields: &[&str]) -> Vec<Accessor> {
    containers
        .iter()
        .flat_map(|c| {
            fields
                .iter()
                .map(move |f| Accessor::nested(c, Accessor::property(f)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(3)), Some(3.0));
        assert_eq!(coerce_number(&json!(-2.5)), Some(-2.5));
        assert_eq!(coerce_number(&json!(" 17 ")), Some(17.0));
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&json!(null)), None);
    }

    #[test]
    fn test_nested_read() {
        let record = json!({"data": {"info": {"level": 6}}});
        let accessor = Accessor::nested("data", Accessor::nested("info", Accessor::property("level")));
        assert_eq!(accessor.read(&record), Some(6.0));
        assert_eq!(accessor.to_string(), "data.info.level");
    }

    #[test]
    fn test_nested_product_order() {
        let accessors = nested_product(&["a", "b"], &["x", "y"]);
        let names: Vec<String> = accessors.iter().map(|a| a.to_string()).collect();
        assert_eq!(names, vec!["a.x", "a.y", "b.x", "b.y"]);
    }

    #[test]
    fn test_display_call_styles() {
        assert_eq!(Accessor::call("getScore").to_string(), "getScore()");
        assert_eq!(Accessor::keyed("get", "ScorePoints").to_string(), "get(\"ScorePoints\")");
    }
}
