//! Value coercion
//!
//! Converts untyped runtime values between the canonical data types.
//! Conversions are total over the canonical types plus the common native
//! primitive representations: a value either converts or the caller gets a
//! typed error naming the value and the target type. A null/absent input
//! coerces to the target type's zero value (numeric→0, bool→false,
//! string→"", array/object→null) without error.
//!
//! The only conversion that intentionally drops information is float→int,
//! which truncates toward zero.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::DataType;

fn coercion_error(value: &Value, target: DataType) -> Error {
    Error::Coercion {
        value: value.to_string(),
        target,
    }
}

/// Coerce to a string.
///
/// Arrays and objects serialize to their JSON text.
pub fn to_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(_) | Value::Object(_) => Ok(value.to_string()),
    }
}

/// Coerce to a signed integer. Floats truncate toward zero.
pub fn to_int(value: &Value) -> Result<i64> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                Ok(f.trunc() as i64)
            } else {
                Err(coercion_error(value, DataType::Int))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(i)
            } else if let Ok(f) = s.parse::<f64>() {
                Ok(f.trunc() as i64)
            } else {
                Err(coercion_error(value, DataType::Int))
            }
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(coercion_error(value, DataType::Int)),
    }
}

/// Coerce to a 32-bit signed integer, range-checked.
pub fn to_int32(value: &Value) -> Result<i32> {
    let wide = to_int(value).map_err(|_| coercion_error(value, DataType::Int32))?;
    i32::try_from(wide).map_err(|_| coercion_error(value, DataType::Int32))
}

/// Coerce to a 64-bit signed integer.
pub fn to_int64(value: &Value) -> Result<i64> {
    to_int(value).map_err(|_| coercion_error(value, DataType::Int64))
}

/// Coerce to a 64-bit float.
pub fn to_float64(value: &Value) -> Result<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| coercion_error(value, DataType::Float64)),
        Value::String(s) => {
            let parsed = s.trim().parse::<f64>();
            match parsed {
                Ok(f) if f.is_finite() => Ok(f),
                _ => Err(coercion_error(value, DataType::Float64)),
            }
        }
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Err(coercion_error(value, DataType::Float64)),
    }
}

/// Coerce to a 32-bit float, range-checked.
pub fn to_float32(value: &Value) -> Result<f32> {
    let wide = to_float64(value).map_err(|_| coercion_error(value, DataType::Float32))?;
    let narrow = wide as f32;
    if narrow.is_finite() {
        Ok(narrow)
    } else {
        Err(coercion_error(value, DataType::Float32))
    }
}

/// Coerce to a boolean.
///
/// Any nonzero numeric is true; strings use the standard boolean grammar
/// (`true/false/t/f/1/0`, case-insensitive; empty is false); null is false.
pub fn to_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i != 0)
            } else if let Some(f) = n.as_f64() {
                Ok(f != 0.0)
            } else {
                Err(coercion_error(value, DataType::Bool))
            }
        }
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "" | "false" | "f" | "0" => Ok(false),
            "true" | "t" | "1" => Ok(true),
            _ => Err(coercion_error(value, DataType::Bool)),
        },
        _ => Err(coercion_error(value, DataType::Bool)),
    }
}

/// Coerce to raw bytes.
///
/// Strings yield their UTF-8 encoding; arrays must contain integers in
/// `0..=255`; null yields an empty buffer.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s.clone().into_bytes()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| coercion_error(value, DataType::Bytes))
            })
            .collect(),
        _ => Err(coercion_error(value, DataType::Bytes)),
    }
}

/// Coerce to a date/time instant.
///
/// Accepts RFC 3339 strings, bare `YYYY-MM-DD` dates,
/// `YYYY-MM-DD HH:MM:SS` timestamps, and integer Unix seconds.
/// Null is the Unix epoch (the type's zero value).
pub fn to_datetime(value: &Value) -> Result<DateTime<FixedOffset>> {
    match value {
        Value::Null => Ok(DateTime::UNIX_EPOCH.fixed_offset()),
        Value::String(s) => parse_datetime(s.trim()).ok_or_else(|| coercion_error(value, DataType::DateTime)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| coercion_error(value, DataType::DateTime)),
        _ => Err(coercion_error(value, DataType::DateTime)),
    }
}

/// Try the supported datetime string formats, most specific first.
///
/// Returns `None` for strings that are not datetimes; comparison uses
/// this to decide between chronological and lexicographic ordering.
pub fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = date.and_hms_opt(0, 0, 0)?;
        return Some(dt.and_utc().fixed_offset());
    }
    None
}

/// Coerce to a keyed object.
///
/// Accepts objects (maps with string values widen to maps with any
/// values by construction) and JSON-object strings; null stays null-like
/// by yielding `None`.
pub fn to_object(value: &Value) -> Result<Option<Map<String, Value>>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map.clone())),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            _ => Err(coercion_error(value, DataType::Object)),
        },
        _ => Err(coercion_error(value, DataType::Object)),
    }
}

/// Coerce to an array value.
///
/// A non-array scalar becomes a single-element array; a string is tried
/// as a JSON array first, else wrapped as one element; null stays null.
pub fn to_array(value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(_) => Ok(value.clone()),
        Value::String(s) => {
            if let Ok(parsed @ Value::Array(_)) = serde_json::from_str::<Value>(s) {
                Ok(parsed)
            } else {
                Ok(Value::Array(vec![value.clone()]))
            }
        }
        _ => Ok(Value::Array(vec![value.clone()])),
    }
}

/// Coerce to a string→string parameter map.
///
/// Accepts an existing keyed map, a JSON-object string, or a
/// comma-separated `k=v` list. Each malformed pair is an error.
pub fn to_params(value: &Value) -> Result<HashMap<String, String>> {
    match value {
        Value::Null => Ok(HashMap::new()),
        Value::Object(map) => {
            let mut params = HashMap::with_capacity(map.len());
            for (key, val) in map {
                params.insert(key.clone(), to_string(val)?);
            }
            Ok(params)
        }
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with('{') {
                let parsed: Value = serde_json::from_str(s)
                    .map_err(|_| coercion_error(value, DataType::Params))?;
                return to_params(&parsed);
            }
            let mut params = HashMap::new();
            for pair in s.split(',').filter(|p| !p.trim().is_empty()) {
                let (key, val) = pair
                    .split_once('=')
                    .ok_or_else(|| coercion_error(value, DataType::Params))?;
                params.insert(key.trim().to_string(), val.trim().to_string());
            }
            Ok(params)
        }
        _ => Err(coercion_error(value, DataType::Params)),
    }
}

/// Coerce to a connection configuration handle.
///
/// A connection is an opaque keyed configuration bag; only object-shaped
/// values (or JSON-object strings) qualify.
pub fn to_connection(value: &Value) -> Result<Option<Map<String, Value>>> {
    to_object(value).map_err(|_| coercion_error(value, DataType::Connection))
}

/// Identity coercion.
pub fn to_any(value: &Value) -> Value {
    value.clone()
}

/// Generic dispatcher: coerce `value` to `target`, yielding the
/// normalized JSON representation of the result.
pub fn to_type(value: &Value, target: DataType) -> Result<Value> {
    match target {
        DataType::Any => Ok(value.clone()),
        DataType::String => Ok(Value::String(to_string(value)?)),
        DataType::Int | DataType::Int64 => Ok(Value::from(to_int64(value)?)),
        DataType::Int32 => Ok(Value::from(i64::from(to_int32(value)?))),
        DataType::Float32 => Ok(Value::from(f64::from(to_float32(value)?))),
        DataType::Float64 => Ok(Value::from(to_float64(value)?)),
        DataType::Bool => Ok(Value::Bool(to_bool(value)?)),
        DataType::Bytes => Ok(Value::Array(
            to_bytes(value)?
                .into_iter()
                .map(|b| Value::from(u64::from(b)))
                .collect(),
        )),
        // The JSON value model has no native instant; normalize to RFC 3339.
        DataType::DateTime => Ok(Value::String(to_datetime(value)?.to_rfc3339())),
        DataType::Object | DataType::Map => {
            Ok(to_object(value)?.map_or(Value::Null, Value::Object))
        }
        DataType::Array => to_array(value),
        DataType::Params => {
            let params = to_params(value)?;
            let mut map = Map::with_capacity(params.len());
            for (key, val) in params {
                map.insert(key, Value::String(val));
            }
            Ok(Value::Object(map))
        }
        DataType::Connection => Ok(to_connection(value)?.map_or(Value::Null, Value::Object)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(null), "")]
    #[case(json!("hello"), "hello")]
    #[case(json!(5), "5")]
    #[case(json!(2.5), "2.5")]
    #[case(json!(true), "true")]
    #[case(json!([1, 2]), "[1,2]")]
    fn test_to_string(#[case] input: Value, #[case] expected: &str) {
        assert_eq!(to_string(&input).unwrap(), expected);
    }

    #[rstest]
    #[case(json!(null), 0)]
    #[case(json!(7), 7)]
    #[case(json!(2.9), 2)] // truncates, does not round
    #[case(json!(-2.9), -2)]
    #[case(json!("42"), 42)]
    #[case(json!("3.7"), 3)]
    #[case(json!(true), 1)]
    #[case(json!(false), 0)]
    fn test_to_int(#[case] input: Value, #[case] expected: i64) {
        assert_eq!(to_int(&input).unwrap(), expected);
    }

    #[test]
    fn test_to_int_rejects_malformed_string() {
        let err = to_int(&json!("abc")).unwrap_err();
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("int"));
    }

    #[test]
    fn test_to_int32_range_checked() {
        assert_eq!(to_int32(&json!(1024)).unwrap(), 1024);
        assert!(to_int32(&json!(i64::from(i32::MAX) + 1)).is_err());
    }

    #[rstest]
    #[case(json!(null), 0.0)]
    #[case(json!(3), 3.0)]
    #[case(json!(2.5), 2.5)]
    #[case(json!("1.25"), 1.25)]
    #[case(json!(true), 1.0)]
    fn test_to_float64(#[case] input: Value, #[case] expected: f64) {
        assert_eq!(to_float64(&input).unwrap(), expected);
    }

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!(0), false)]
    #[case(json!(1), true)]
    #[case(json!(-3), true)]
    #[case(json!(0.0), false)]
    #[case(json!(""), false)]
    #[case(json!("true"), true)]
    #[case(json!("FALSE"), false)]
    #[case(json!("t"), true)]
    #[case(json!("0"), false)]
    fn test_to_bool(#[case] input: Value, #[case] expected: bool) {
        assert_eq!(to_bool(&input).unwrap(), expected);
    }

    #[test]
    fn test_to_bool_rejects_garbage() {
        assert!(to_bool(&json!("yes please")).is_err());
        assert!(to_bool(&json!([1])).is_err());
    }

    #[test]
    fn test_to_array_wraps_scalars() {
        assert_eq!(to_array(&json!(5)).unwrap(), json!([5]));
        assert_eq!(to_array(&json!("x")).unwrap(), json!(["x"]));
    }

    #[test]
    fn test_to_array_nil_stays_nil() {
        assert_eq!(to_array(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_to_array_parses_json_array_string() {
        assert_eq!(to_array(&json!("[1,2,3]")).unwrap(), json!([1, 2, 3]));
        // not a JSON array: wrapped instead
        assert_eq!(to_array(&json!("[oops")).unwrap(), json!(["[oops"]));
    }

    #[test]
    fn test_to_array_passes_arrays_through() {
        assert_eq!(to_array(&json!([1, "a"])).unwrap(), json!([1, "a"]));
    }

    #[test]
    fn test_to_object_accepts_maps_and_json_strings() {
        let obj = to_object(&json!({"a": "1"})).unwrap().unwrap();
        assert_eq!(obj.get("a"), Some(&json!("1")));

        let parsed = to_object(&json!("{\"b\": 2}")).unwrap().unwrap();
        assert_eq!(parsed.get("b"), Some(&json!(2)));

        assert!(to_object(&json!(5)).is_err());
        assert!(to_object(&json!("not json")).is_err());
    }

    #[test]
    fn test_to_params_from_kv_string() {
        let params = to_params(&json!("a=1, b=hello")).unwrap();
        assert_eq!(params.get("a"), Some(&"1".to_string()));
        assert_eq!(params.get("b"), Some(&"hello".to_string()));
    }

    #[test]
    fn test_to_params_malformed_pair_errors() {
        assert!(to_params(&json!("a=1, borked")).is_err());
    }

    #[test]
    fn test_to_params_from_object_and_json() {
        let params = to_params(&json!({"k": 7})).unwrap();
        assert_eq!(params.get("k"), Some(&"7".to_string()));

        let params = to_params(&json!("{\"x\": \"y\"}")).unwrap();
        assert_eq!(params.get("x"), Some(&"y".to_string()));
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(to_bytes(&json!("ab")).unwrap(), vec![97, 98]);
        assert_eq!(to_bytes(&json!([104, 105])).unwrap(), vec![104, 105]);
        assert_eq!(to_bytes(&Value::Null).unwrap(), Vec::<u8>::new());
        assert!(to_bytes(&json!([300])).is_err());
    }

    #[test]
    fn test_to_datetime_formats() {
        let rfc = to_datetime(&json!("2021-03-01T10:00:00Z")).unwrap();
        assert_eq!(rfc.timestamp(), 1614592800);

        let date_only = to_datetime(&json!("2021-03-01")).unwrap();
        assert_eq!(date_only.timestamp(), 1614556800);

        let epoch_secs = to_datetime(&json!(1614592800)).unwrap();
        assert_eq!(epoch_secs, rfc);

        assert_eq!(to_datetime(&Value::Null).unwrap().timestamp(), 0);
        assert!(to_datetime(&json!("next tuesday")).is_err());
    }

    #[rstest]
    #[case(DataType::Int, json!(2.9))]
    #[case(DataType::Int32, json!("12"))]
    #[case(DataType::Int64, json!(true))]
    #[case(DataType::Float32, json!("1.5"))]
    #[case(DataType::Float64, json!(3))]
    fn test_to_type_numeric_idempotent(#[case] target: DataType, #[case] input: Value) {
        let once = to_type(&input, target).unwrap();
        let twice = to_type(&once, target).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_to_type_zero_values() {
        assert_eq!(to_type(&Value::Null, DataType::Int).unwrap(), json!(0));
        assert_eq!(to_type(&Value::Null, DataType::Bool).unwrap(), json!(false));
        assert_eq!(to_type(&Value::Null, DataType::String).unwrap(), json!(""));
        assert_eq!(to_type(&Value::Null, DataType::Array).unwrap(), Value::Null);
        assert_eq!(to_type(&Value::Null, DataType::Object).unwrap(), Value::Null);
    }

    #[test]
    fn test_to_type_datetime_normalizes() {
        let normalized = to_type(&json!("2021-03-01T10:00:00+00:00"), DataType::DateTime).unwrap();
        assert_eq!(normalized, json!("2021-03-01T10:00:00+00:00"));
    }

    #[test]
    fn test_to_connection_requires_object_shape() {
        assert!(to_connection(&json!({"uri": "postgres://x"})).unwrap().is_some());
        let err = to_connection(&json!(5)).unwrap_err();
        assert!(err.to_string().contains("connection"));
    }
}
