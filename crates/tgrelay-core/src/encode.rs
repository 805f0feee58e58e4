//! Recursive JSON encoder for handler results.
//!
//! Rules per variant:
//! - `Timestamp` → RFC 3339 string (`2024-01-02T03:04:05+00:00`)
//! - `Bytes` → array of integers 0..=255
//! - `Record` → object with `"_"` (type name) first, then fields in order;
//!   a field itself named `"_"` is dropped
//! - `Map` / `List` → object / array, order preserved, members recursive
//! - primitives pass through; non-finite floats become `"NaN"`,
//!   `"Infinity"` or `"-Infinity"` since JSON has no literal for them

use serde_json::{Map, Number, Value as Json};

use crate::value::{Encode, Fields, Value};

/// Key under which a record's type name is emitted.
pub const RECORD_TYPE_KEY: &str = "_";

/// Encode a [`Value`] tree into JSON.
pub fn encode(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::Float(f) => encode_float(*f),
        Value::String(s) => Json::String(s.clone()),
        Value::Timestamp(ts) => Json::String(ts.to_rfc3339()),
        Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Value::List(items) => Json::Array(items.iter().map(encode).collect()),
        Value::Map(fields) => Json::Object(encode_fields(Map::new(), fields)),
        Value::Record(record) => {
            let mut map = Map::new();
            let _ = map.insert(
                RECORD_TYPE_KEY.to_owned(),
                Json::String(record.type_name().to_owned()),
            );
            for (key, value) in record.fields().iter() {
                if key == RECORD_TYPE_KEY {
                    continue;
                }
                let _ = map.insert(key.to_owned(), encode(value));
            }
            Json::Object(map)
        }
    }
}

/// Encode anything implementing [`Encode`] straight to JSON.
pub fn to_json<T: Encode + ?Sized>(value: &T) -> Json {
    encode(&value.to_value())
}

fn encode_fields(mut map: Map<String, Json>, fields: &Fields) -> Map<String, Json> {
    for (key, value) in fields.iter() {
        let _ = map.insert(key.to_owned(), encode(value));
    }
    map
}

fn encode_float(f: f64) -> Json {
    if let Some(n) = Number::from_f64(f) {
        return Json::Number(n);
    }
    let text = if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    };
    Json::String(text.to_owned())
}
