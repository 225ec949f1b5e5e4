//! Conversion between stored documents and their artifact encoding.
//!
//! Export goes through [`encode_document`], which is total. Import goes
//! through [`decode_document`], which folds every legacy timestamp encoding
//! into [`Value::Timestamp`] and coerces hand-typed numeric fields. Decoding
//! never fails: a date-like value that cannot be read becomes `null`.

pub mod coerce;
pub mod timestamp;

use serde_json::{Map as JsonMap, Value as JsonValue};

use optivault_core::{Document, TIMESTAMP_TAG, Value, format_timestamp};

use self::timestamp::{TimestampEncoding, classify, parse_generic};

const POWER_INVENTORY: &str = "powerInventory";
const POWER_LIMITS: &str = "powerLimits";

/// Whether a field name conventionally holds a moment in time.
///
/// Matches names containing `date` or `time` in any case, and camel-case
/// names ending in `At` such as `createdAt` or `dispatchedAt`.
#[must_use]
pub fn is_date_field(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("date")
        || lower.contains("time")
        || name == "createdAt"
        || name == "updatedAt"
        || (name.len() > 2 && name.ends_with("At"))
}

/// Render a value in its artifact encoding.
///
/// Timestamps become `{"type": "timestamp", "value": "<iso>"}`; everything
/// else maps onto the matching JSON shape.
#[must_use]
pub fn to_serializable(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => JsonValue::Number(n.clone()),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Timestamp(ts) => {
            let mut tagged = JsonMap::with_capacity(2);
            tagged.insert("type".into(), JsonValue::String(TIMESTAMP_TAG.into()));
            tagged.insert("value".into(), JsonValue::String(format_timestamp(ts)));
            JsonValue::Object(tagged)
        }
        Value::List(items) => JsonValue::Array(items.iter().map(to_serializable).collect()),
        Value::Map(doc) => JsonValue::Object(encode_document(doc)),
    }
}

/// Render a whole document in its artifact encoding.
#[must_use]
pub fn encode_document(doc: &Document) -> JsonMap<String, JsonValue> {
    doc.iter()
        .map(|(field, value)| (field.clone(), to_serializable(value)))
        .collect()
}

/// Decode one artifact value found under the field `hint`.
///
/// Returns `None` when the value is recognizably a timestamp, or sits in a
/// date-named field, but cannot be read as an instant. Nested maps and
/// lists are recursed; their unreadable members are already `null`.
#[must_use]
pub fn from_serializable(value: &JsonValue, hint: Option<&str>) -> Option<Value> {
    let date_field = hint.is_some_and(is_date_field);
    let encoding = classify(value);

    match encoding {
        TimestampEncoding::Tagged(_) | TimestampEncoding::SecondsNanos { .. } => {
            return encoding.decode().map(Value::Timestamp);
        }
        TimestampEncoding::IsoString(raw) => {
            return match encoding.decode() {
                Some(ts) => Some(Value::Timestamp(ts)),
                None if date_field => None,
                None => Some(Value::String(raw.to_owned())),
            };
        }
        TimestampEncoding::EpochMillis(_) if date_field => {
            return encoding.decode().map(Value::Timestamp);
        }
        TimestampEncoding::EpochMillis(_) | TimestampEncoding::Unrecognized => {}
    }

    match value {
        JsonValue::String(_) | JsonValue::Number(_) if date_field => {
            parse_generic(value).map(Value::Timestamp)
        }
        JsonValue::Null => Some(Value::Null),
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => Some(Value::Number(n.clone())),
        JsonValue::String(s) => Some(Value::String(s.clone())),
        JsonValue::Array(items) => Some(Value::List(
            items
                .iter()
                .map(|item| from_serializable(item, hint).unwrap_or_default())
                .collect(),
        )),
        JsonValue::Object(object) => Some(Value::Map(decode_document(object))),
    }
}

/// Decode one field and apply the numeric coercion its name calls for.
#[must_use]
pub fn decode_field(field: &str, value: &JsonValue) -> Option<Value> {
    let decoded = from_serializable(value, Some(field))?;
    Some(match field {
        POWER_INVENTORY => coerce::power_inventory(decoded),
        POWER_LIMITS => coerce::power_limits(decoded),
        _ => coerce::conventional(field, decoded),
    })
}

/// Decode an artifact document body. Unreadable fields become `null`.
#[must_use]
pub fn decode_document(body: &JsonMap<String, JsonValue>) -> Document {
    body.iter()
        .map(|(field, value)| (field.clone(), decode_field(field, value).unwrap_or_default()))
        .collect()
}
