//! Value codec
//!
//! The backend stores strings. Values whose serialized form is a plain
//! string are stored raw, everything else as JSON. Decoding mirrors
//! that: parse as JSON first, and when that fails treat the raw string
//! itself as the value, so legacy and hand-edited entries stay
//! readable. JSON null decodes to "no value", keeping a stored `0`,
//! `false`, or `""` distinguishable from absence.

use serde::Serialize;
use serde_json::Value;

/// Serialize `value` for the backend.
///
/// Returns `None` when the value has no JSON representation; callers
/// skip the write and let the in-memory value run ahead of the backend.
pub fn encode<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => Some(s),
        Ok(v) => serde_json::to_string(&v).ok(),
        Err(_) => None,
    }
}

/// Parse a raw backend string into a structural value.
pub fn decode(raw: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => None,
        Ok(v) => Some(v),
        Err(_) => Some(Value::String(raw.to_string())),
    }
}

/// Serialized shape of a value, used for structural comparison.
pub fn canonical<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_plain_strings_pass_through_unquoted() {
        assert_eq!(encode(&"hello world").as_deref(), Some("hello world"));
        assert_eq!(encode(&String::from("x")).as_deref(), Some("x"));
    }

    #[test]
    fn test_structured_values_encode_as_json() {
        assert_eq!(encode(&42u32).as_deref(), Some("42"));
        assert_eq!(encode(&false).as_deref(), Some("false"));
        assert_eq!(encode(&vec![1, 2, 3]).as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_unrepresentable_value_encodes_to_none() {
        // Tuple keys have no JSON representation
        let mut cells = HashMap::new();
        cells.insert((1u8, 2u8), 9u8);
        assert_eq!(encode(&cells), None);
    }

    #[test]
    fn test_non_finite_floats_encode_as_null() {
        // Same as the platform serializer: NaN and infinity become null,
        // which reads back as "no value"
        assert_eq!(encode(&f64::NAN).as_deref(), Some("null"));
        assert_eq!(decode("null"), None);
    }

    #[test]
    fn test_decode_parses_json() {
        assert_eq!(decode("42"), Some(json!(42)));
        assert_eq!(decode("false"), Some(json!(false)));
        assert_eq!(decode(r#"{"zoom":125}"#), Some(json!({"zoom": 125})));
    }

    #[test]
    fn test_decode_falls_back_to_raw_string() {
        assert_eq!(decode("not{json"), Some(json!("not{json")));
        assert_eq!(decode("hello world"), Some(json!("hello world")));
    }

    #[test]
    fn test_decode_null_is_absent() {
        assert_eq!(decode("null"), None);
    }

    #[test]
    fn test_round_trip_json_values() {
        let mut prefs = HashMap::new();
        prefs.insert("theme".to_string(), json!("dark"));
        prefs.insert("zoom".to_string(), json!(125));

        for value in [json!(0), json!(false), json!([1, "two", null]), json!(prefs)] {
            let encoded = encode(&value).unwrap();
            assert_eq!(decode(&encoded), Some(value));
        }
    }

    #[test]
    fn test_round_trip_plain_strings() {
        for s in ["hello", "with spaces and {braces}", "émoji ✓"] {
            let encoded = encode(&s).unwrap();
            assert_eq!(decode(&encoded), Some(json!(s)));
        }
    }

    #[test]
    fn test_decoded_maps_compare_regardless_of_key_order() {
        let a = decode(r#"{"theme":"dark","zoom":125}"#);
        let b = decode(r#"{"zoom":125,"theme":"dark"}"#);
        assert_eq!(a, b);
    }
}
