use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A runtime-typed scalar/list/mapping value.
///
/// Menus deliver heterogeneous argument mappings, and the wire protocol
/// carries arbitrary payloads; both are represented with this tagged
/// dynamic value rather than a Rust-level generic, per the "runtime-typed
/// argument maps" design note: each recipe parses the fields it cares
/// about out of a `Value::Map`, while the raw value is kept around for
/// paramhash computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Insertion-order mapping. Order is irrelevant for equality/hashing
    /// purposes once canonicalized, see [`Value::canonicalize`].
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Recursively sort every map's entries by key. This is the
    /// canonicalization rule a paramhash is computed over: permuting key
    /// order in the input must not change the resulting hash.
    pub fn canonicalize(&self) -> Value {
        match self {
            Value::Map(entries) => {
                let mut sorted: Vec<(String, Value)> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.canonicalize()))
                    .collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                Value::Map(sorted)
            }
            Value::List(items) => Value::List(items.iter().map(Value::canonicalize).collect()),
            other => other.clone(),
        }
    }

    pub fn map(entries: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convert to a [`serde_json::Value`]; used as the bridge to
    /// deserialize a payload into a recipe's own strongly-typed shape
    /// (`start_and_consume_attrs`, spec §4.6).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Uint(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::Array(b.iter().map(|byte| serde_json::Value::from(*byte)).collect()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => {
                serde_json::Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }

    /// Deserialize into a recipe-defined shape via the JSON bridge.
    pub fn into_typed<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Uint(i)
    }
}

/// Total order over [`Value`] used only to sort map keys/compare
/// canonicalized values in tests; not meant to express a sensible
/// ordering of heterogeneous scalars beyond "stable and deterministic".
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) => 2,
                Value::Uint(_) => 3,
                Value::Float(_) => 4,
                Value::Str(_) => 5,
                Value::Bytes(_) => 6,
                Value::List(_) => 7,
                Value::Map(_) => 8,
            }
        }
        Some(rank(self).cmp(&rank(other)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_sorts_nested_maps() {
        let v = Value::map([
            ("b", Value::from("2")),
            ("a", Value::map([("z", Value::from(1i64)), ("y", Value::from(2i64))])),
        ]);
        let c = v.canonicalize();
        let Value::Map(top) = c else { panic!() };
        assert_eq!(top[0].0, "a");
        assert_eq!(top[1].0, "b");
        let Value::Map(nested) = &top[0].1 else { panic!() };
        assert_eq!(nested[0].0, "y");
        assert_eq!(nested[1].0, "z");
    }

    #[test]
    fn permuted_key_order_canonicalizes_identically() {
        let a = Value::map([("a", Value::from(1i64)), ("b", Value::from(2i64))]);
        let b = Value::map([("b", Value::from(2i64)), ("a", Value::from(1i64))]);
        assert_eq!(a.canonicalize(), b.canonicalize());
    }

    #[test]
    fn get_looks_up_map_entry() {
        let v = Value::map([("name", Value::from("sous-1"))]);
        assert_eq!(v.get("name").and_then(Value::as_str), Some("sous-1"));
        assert!(v.get("missing").is_none());
    }

    #[test]
    fn into_typed_bridges_through_json() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Stat {
            size: u64,
            path: String,
        }
        let v = Value::map([("size", Value::from(42u64)), ("path", Value::from("/etc/motd"))]);
        let stat: Stat = v.into_typed().unwrap();
        assert_eq!(stat, Stat { size: 42, path: "/etc/motd".into() });
    }
}
