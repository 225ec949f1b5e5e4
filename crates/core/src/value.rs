//! Canonical in-memory representation of tenant documents.
//!
//! Every document field holds a [`Value`]. Instants are always
//! [`Value::Timestamp`]; the legacy encodings found in older backups are
//! folded into it by the backup normalizer before a document is stored.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tag carried by the serialized form of a canonical timestamp.
pub const TIMESTAMP_TAG: &str = "timestamp";

/// A document body: field name to value, ordered by field name.
pub type Document = BTreeMap<String, Value>;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// A canonical instant.
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    Map(Document),
}

impl Value {
    /// Build a floating point number. Non-finite input yields [`Value::Null`].
    #[must_use]
    pub fn float(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }

    /// Build an integer number.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Number(value.into())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Document> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// Render an instant in the canonical artifact form,
/// `YYYY-MM-DDTHH:mm:ss.sssZ`.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Recognize the tagged timestamp object `{"type": "timestamp", "value": "<iso>"}`.
///
/// Returns the raw `value` string, empty when it is missing or not a string,
/// or `None` when the object does not carry the timestamp tag.
#[must_use]
pub fn tagged_timestamp(object: &serde_json::Map<String, serde_json::Value>) -> Option<&str> {
    if object.get("type").and_then(serde_json::Value::as_str) != Some(TIMESTAMP_TAG) {
        return None;
    }
    Some(
        object
            .get("value")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default(),
    )
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Self::Map(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// Structural conversion from JSON.
///
/// Only the tagged timestamp form is recognized as an instant; legacy
/// encodings stay as plain maps, strings and numbers.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(object) => {
                if let Some(ts) = tagged_timestamp(&object)
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                {
                    return Self::Timestamp(ts.with_timezone(&Utc));
                }
                Self::Map(
                    object
                        .into_iter()
                        .map(|(k, v)| (k, Self::from(v)))
                        .collect(),
                )
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Timestamp(ts) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", TIMESTAMP_TAG)?;
                map.serialize_entry("value", &format_timestamp(ts))?;
                map.end()
            }
            Self::List(items) => items.serialize(serializer),
            Self::Map(doc) => doc.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}
