//! Plain JSON objects as entity records.
//!
//! Hosts that hand over data-only objects (no methods) map directly onto
//! [`serde_json::Value`]: properties are object members and nested records
//! are member objects.

use serde_json::Value;

use super::EntityRecord;

impl EntityRecord for Value {
    fn property(&self, name: &str) -> Option<Value> {
        match self.get(name)? {
            Value::Null => None,
            v => Some(v.clone()),
        }
    }

    fn child(&self, name: &str) -> Option<&dyn EntityRecord> {
        self.get(name)
            .filter(|v| v.is_object())
            .map(|v| v as &dyn EntityRecord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_lookup() {
        let record = json!({"x": 4, "name": "camp"});
        assert_eq!(record.property("x"), Some(json!(4)));
        assert_eq!(record.property("missing"), None);
    }

    #[test]
    fn test_null_property_is_absent() {
        let record = json!({"score": null});
        assert_eq!(record.property("score"), None);
    }

    #[test]
    fn test_child_only_for_objects() {
        let record = json!({"stats": {"score": 9}, "tags": [1, 2]});
        let stats = record.child("stats").unwrap();
        assert_eq!(stats.property("score"), Some(json!(9)));
        assert!(record.child("tags").is_none());
        assert!(record.child("nope").is_none());
    }

    #[test]
    fn test_json_has_no_methods() {
        let record = json!({"getScore": 5});
        assert!(record.call("getScore").is_none());
        assert!(record.call_keyed("get", "getScore").is_none());
    }
}
