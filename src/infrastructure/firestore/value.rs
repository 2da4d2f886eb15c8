//! Conversion between Firestore REST typed values and plain JSON

use crate::error::{NotePageError, Result};
use crate::infrastructure::store::Fields;
use serde_json::{json, Map, Number, Value};

/// Decode a Firestore `fields` object into plain JSON fields.
///
/// Timestamps, references and bytes become strings; geo points become
/// `{latitude, longitude}` objects.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Fields> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
        .collect()
}

pub fn decode_value(value: &Value) -> Result<Value> {
    let Some(object) = value.as_object() else {
        return Err(NotePageError::Value(format!("expected typed value, got {}", value)));
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Err(NotePageError::Value("empty typed value".to_string()));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(inner.clone()),
        "integerValue" => decode_integer(inner),
        "doubleValue" => Ok(decode_double(inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        })),
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values.iter().map(decode_value).collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = match inner.get("fields").and_then(Value::as_object) {
                Some(fields) => decode_fields(fields)?,
                None => Fields::new(),
            };
            Ok(Value::Object(fields))
        }
        other => Err(NotePageError::Value(format!("unknown value type '{}'", other))),
    }
}

/// integerValue travels as a decimal string (int64 does not fit in a JSON double)
fn decode_integer(inner: &Value) -> Result<Value> {
    match inner {
        Value::Number(_) => Ok(inner.clone()),
        Value::String(s) => s
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|e| NotePageError::Value(format!("bad integerValue '{}': {}", s, e))),
        _ => Err(NotePageError::Value(format!("bad integerValue {}", inner))),
    }
}

/// NaN and the infinities have no JSON number form; they decode to null
fn decode_double(inner: &Value) -> Value {
    match inner {
        Value::Number(_) => inner.clone(),
        _ => Value::Null,
    }
}

/// Encode plain JSON fields as a Firestore `fields` object
pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(name, value)| (name.clone(), encode_value(value)))
            .collect(),
    )
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => encode_number(n),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

fn encode_number(n: &Number) -> Value {
    match n.as_i64() {
        Some(i) => json!({ "integerValue": i.to_string() }),
        None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_page_document_fields() {
        let raw = json!({
            "name": { "stringValue": "Shopping" },
            "content": { "stringValue": "- milk" },
            "createdAt": { "timestampValue": "2024-03-01T10:15:30.123456Z" },
            "noteBookId": { "nullValue": null },
        });

        let fields = decode_fields(raw.as_object().unwrap()).unwrap();

        assert_eq!(fields["name"], json!("Shopping"));
        assert_eq!(fields["content"], json!("- milk"));
        assert_eq!(fields["createdAt"], json!("2024-03-01T10:15:30.123456Z"));
        assert_eq!(fields["noteBookId"], Value::Null);
    }

    #[test]
    fn test_decode_nested_values() {
        let raw = json!({
            "mapValue": { "fields": {
                "count": { "integerValue": "9007199254740993" },
                "ratio": { "doubleValue": 0.5 },
                "tags": { "arrayValue": { "values": [
                    { "stringValue": "a" },
                    { "booleanValue": true }
                ]}},
                "empty": { "arrayValue": {} },
                "where": { "geoPointValue": { "latitude": 1.5, "longitude": -2.0 } }
            }}
        });

        let decoded = decode_value(&raw).unwrap();

        assert_eq!(decoded["count"], json!(9007199254740993i64));
        assert_eq!(decoded["ratio"], json!(0.5));
        assert_eq!(decoded["tags"], json!(["a", true]));
        assert_eq!(decoded["empty"], json!([]));
        assert_eq!(decoded["where"], json!({ "latitude": 1.5, "longitude": -2.0 }));
    }

    #[test]
    fn test_decode_non_finite_double_is_null() {
        assert_eq!(decode_value(&json!({ "doubleValue": "NaN" })).unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(matches!(
            decode_value(&json!({ "vectorValue": {} })),
            Err(NotePageError::Value(_))
        ));
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[test]
    fn test_encode_values() {
        assert_eq!(encode_value(&json!("A")), json!({ "stringValue": "A" }));
        assert_eq!(encode_value(&json!(42)), json!({ "integerValue": "42" }));
        assert_eq!(encode_value(&json!(1.25)), json!({ "doubleValue": 1.25 }));
        assert_eq!(encode_value(&Value::Null), json!({ "nullValue": null }));
        assert_eq!(
            encode_value(&json!({ "k": [false] })),
            json!({ "mapValue": { "fields": {
                "k": { "arrayValue": { "values": [{ "booleanValue": false }] } }
            }}})
        );
    }
}
