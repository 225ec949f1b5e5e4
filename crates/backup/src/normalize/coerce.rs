//! Numeric coercion for hand-typed fields.
//!
//! Lens powers, prices and quantities are entered by hand and frequently
//! arrive as strings. Conventional fields are coerced when possible and left
//! alone otherwise; the `powerInventory` and `powerLimits` shapes are forced
//! to their declared types with `0` as the fallback.

use optivault_core::{Document, Value};

/// Fields coerced to floating point wherever they appear.
pub const FLOAT_FIELDS: &[&str] = &[
    "maxSph",
    "maxCyl",
    "sph",
    "cyl",
    "add",
    "purchasePrice",
    "salePrice",
];

/// Fields coerced to integers wherever they appear.
pub const INT_FIELDS: &[&str] = &["qty", "axis", "totalQuantity"];

const POWER_LIMIT_FLOATS: &[&str] = &["minSph", "maxSph", "minCyl", "maxCyl", "addition"];
const POWER_LIMIT_INTS: &[&str] = &["axis"];
const POWER_ENTRY_FLOATS: &[&str] = &["sph", "cyl"];
const POWER_ENTRY_INTS: &[&str] = &["quantity"];

/// Read a value as a float. Accepts numbers and numeric strings.
#[must_use]
pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Read a value as an integer, truncating fractional input.
#[must_use]
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    if !f.is_finite() || f.abs() >= 9.0e18 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(f.trunc() as i64)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Apply the conventional coercion for `field`, if it has one.
///
/// Empty values and values that do not parse are returned unchanged.
#[must_use]
pub fn conventional(field: &str, value: Value) -> Value {
    if is_empty(&value) {
        return value;
    }
    if FLOAT_FIELDS.contains(&field) {
        return to_float(&value).map_or(value, Value::float);
    }
    if INT_FIELDS.contains(&field) {
        return to_int(&value).map_or(value, Value::int);
    }
    value
}

fn force_fields(doc: &mut Document, floats: &[&str], ints: &[&str]) {
    for &field in floats {
        let coerced = doc.get(field).and_then(to_float).unwrap_or(0.0);
        doc.insert(field.to_owned(), Value::float(coerced));
    }
    for &field in ints {
        let coerced = doc.get(field).and_then(to_int).unwrap_or(0);
        doc.insert(field.to_owned(), Value::int(coerced));
    }
}

/// Force `{minSph, maxSph, minCyl, maxCyl, addition, axis}` to numbers.
///
/// Anything other than a map is returned unchanged.
#[must_use]
pub fn power_limits(value: Value) -> Value {
    match value {
        Value::Map(mut limits) => {
            force_fields(&mut limits, POWER_LIMIT_FLOATS, POWER_LIMIT_INTS);
            Value::Map(limits)
        }
        other => other,
    }
}

/// Force every `{sph, cyl, quantity}` entry of a power inventory to numbers.
///
/// Entries that are not maps are kept as they are.
#[must_use]
pub fn power_inventory(value: Value) -> Value {
    match value {
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(key, entry)| {
                    let entry = match entry {
                        Value::Map(mut fields) => {
                            force_fields(&mut fields, POWER_ENTRY_FLOATS, POWER_ENTRY_INTS);
                            Value::Map(fields)
                        }
                        other => other,
                    };
                    (key, entry)
                })
                .collect(),
        ),
        other => other,
    }
}
