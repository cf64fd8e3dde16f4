//! The `OrderedValue` tree shared by the MessagePack and JSON codecs.
//!
//! Both decoders produce an `OrderedValue` and both encoders consume one. Maps are
//! stored as `Vec<(String, OrderedValue)>` so insertion order survives every
//! transformation without depending on a hash table's iteration order.
//!
//! Raw byte strings have no JSON representation, so the JSON side writes them as the
//! *binary sentinel* `{"$binary": "<lowercase hex>"}` and the JSON parser turns that
//! exact shape back into [`OrderedValue::Bytes`].

use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use thiserror::Error;

/// Reserved key of the binary sentinel object.
pub const BINARY_SENTINEL_KEY: &str = "$binary";

/// Maps up to this size are checked for duplicates by linear scan.
const LINEAR_SCAN_LIMIT: usize = 16;

/// MessagePack width used when a float is written to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 4-byte IEEE-754 (`float 32`).
    Single,
    /// 8-byte IEEE-754 (`float 64`).
    #[default]
    Double,
}

/// A decoded document. Mirrors JSON, plus raw bytes and a float width tag.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderedValue {
    Null,
    Bool(bool),
    /// Wide enough for both `i64` and `u64` wire integers.
    Integer(i128),
    Float(f64, Precision),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<OrderedValue>),
    /// Key-value pairs in insertion order, keys unique.
    Map(OrderedMap),
}

impl OrderedValue {
    /// Short name of the variant, used in log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderedValue::Null => "null",
            OrderedValue::Bool(_) => "bool",
            OrderedValue::Integer(_) => "integer",
            OrderedValue::Float(..) => "float",
            OrderedValue::String(_) => "string",
            OrderedValue::Bytes(_) => "bytes",
            OrderedValue::Array(_) => "array",
            OrderedValue::Map(_) => "map",
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap> {
        match self {
            OrderedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OrderedValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for OrderedValue {
    fn from(b: bool) -> Self {
        OrderedValue::Bool(b)
    }
}

impl From<i64> for OrderedValue {
    fn from(n: i64) -> Self {
        OrderedValue::Integer(n.into())
    }
}

impl From<u64> for OrderedValue {
    fn from(n: u64) -> Self {
        OrderedValue::Integer(n.into())
    }
}

impl From<f64> for OrderedValue {
    fn from(f: f64) -> Self {
        OrderedValue::Float(f, Precision::Double)
    }
}

impl From<&str> for OrderedValue {
    fn from(s: &str) -> Self {
        OrderedValue::String(s.to_string())
    }
}

impl From<String> for OrderedValue {
    fn from(s: String) -> Self {
        OrderedValue::String(s)
    }
}

impl From<OrderedMap> for OrderedValue {
    fn from(map: OrderedMap) -> Self {
        OrderedValue::Map(map)
    }
}

/// A second occurrence of `key`, found at pair `index`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("duplicate key {key:?}")]
pub struct DuplicateKey {
    pub key: String,
    pub index: usize,
}

/// Insertion-ordered map with unique string keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedMap {
    pairs: Vec<(String, OrderedValue)>,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(capacity),
        }
    }

    /// Build a map from fully collected pairs, rejecting the first repeated key.
    pub fn try_from_pairs(pairs: Vec<(String, OrderedValue)>) -> Result<Self, DuplicateKey> {
        if pairs.len() <= LINEAR_SCAN_LIMIT {
            for (index, (key, _)) in pairs.iter().enumerate() {
                if pairs[..index].iter().any(|(k, _)| k == key) {
                    return Err(DuplicateKey {
                        key: key.clone(),
                        index,
                    });
                }
            }
        } else {
            let mut seen = HashSet::with_capacity(pairs.len());
            for (index, (key, _)) in pairs.iter().enumerate() {
                if !seen.insert(key.as_str()) {
                    return Err(DuplicateKey {
                        key: key.clone(),
                        index,
                    });
                }
            }
        }
        Ok(Self { pairs })
    }

    /// Append a pair. Existing keys are never overwritten.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<OrderedValue>,
    ) -> Result<(), DuplicateKey> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(DuplicateKey {
                key,
                index: self.pairs.len(),
            });
        }
        self.pairs.push((key, value.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&OrderedValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OrderedValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn into_pairs(self) -> Vec<(String, OrderedValue)> {
        self.pairs
    }

    /// The hex payload, if this map is exactly `{"$binary": <string>}`.
    ///
    /// Any other shape, including extra keys next to `$binary` or a non-string
    /// payload, is an ordinary map.
    pub fn as_binary_sentinel(&self) -> Option<&str> {
        match self.pairs.as_slice() {
            [(key, OrderedValue::String(hex))] if key == BINARY_SENTINEL_KEY => Some(hex),
            _ => None,
        }
    }
}

/// JSON view of the tree. `Bytes` becomes the binary sentinel; single-precision
/// floats are written with the shortest digits that round-trip through `f32`.
impl Serialize for OrderedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OrderedValue::Null => serializer.serialize_unit(),
            OrderedValue::Bool(b) => serializer.serialize_bool(*b),
            OrderedValue::Integer(n) => {
                if let Ok(n) = i64::try_from(*n) {
                    serializer.serialize_i64(n)
                } else if let Ok(n) = u64::try_from(*n) {
                    serializer.serialize_u64(n)
                } else {
                    serializer.serialize_i128(*n)
                }
            }
            OrderedValue::Float(f, _) if !f.is_finite() => Err(S::Error::custom(format!(
                "float {f} has no JSON representation"
            ))),
            OrderedValue::Float(f, Precision::Single) => serializer.serialize_f32(*f as f32),
            OrderedValue::Float(f, Precision::Double) => serializer.serialize_f64(*f),
            OrderedValue::String(s) => serializer.serialize_str(s),
            OrderedValue::Bytes(bytes) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(BINARY_SENTINEL_KEY, &hex::encode(bytes))?;
                map.end()
            }
            OrderedValue::Array(items) => serializer.collect_seq(items),
            OrderedValue::Map(map) => map.serialize(serializer),
        }
    }
}

/// Fails for a map in the sentinel shape, whose text would parse back as `Bytes`.
impl Serialize for OrderedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.as_binary_sentinel().is_some() {
            return Err(S::Error::custom(
                "map has the reserved {\"$binary\": <string>} shape",
            ));
        }
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
