//! Portable encoding of field values
//!
//! Values are converted to a JSON shape that survives a byte-stream round
//! trip. Scalars pass through unchanged; the rich types become tagged objects
//! keyed by [`TYPE_TAG`]:
//!
//! | value      | portable shape                                          |
//! |------------|---------------------------------------------------------|
//! | timestamp  | `{"__type__":"timestamp","seconds":..,"nanoseconds":..}` |
//! | geo point  | `{"__type__":"geopoint","latitude":..,"longitude":..}`   |
//! | reference  | `{"__type__":"reference","path":".."}`                  |
//! | array      | `{"__type__":"array","values":[..]}`                    |
//! | NaN / ±inf | `{"__type__":"double","value":"NaN"}`                   |
//! | map        | plain object, each entry encoded                        |
//!
//! A nested map that itself holds a [`TYPE_TAG`] key is wrapped as
//! `{"__type__":"map","value":{..}}` so its entries are never read as a tag.
//! An object whose tag is not recognized decodes as a plain map, so entries
//! written by a newer encoder stay readable.

use crate::constants::{
    TAG_ARRAY, TAG_DOUBLE, TAG_GEO_POINT, TAG_MAP, TAG_REFERENCE, TAG_TIMESTAMP, TYPE_TAG,
};
use crate::errors::{Error, Result};
use crate::types::{DocumentRef, Fields, GeoPoint, Timestamp, Value};
use serde_json::{json, Map, Number, Value as Json};

/// Turns a persisted reference path back into a live handle
pub trait ReferenceResolver {
    fn resolve(&self, path: &str) -> Option<DocumentRef>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(&str) -> Option<DocumentRef>,
{
    fn resolve(&self, path: &str) -> Option<DocumentRef> {
        self(path)
    }
}

/// Resolver that rebuilds references straight from their path
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl ReferenceResolver for PathResolver {
    fn resolve(&self, path: &str) -> Option<DocumentRef> {
        DocumentRef::new(path).ok()
    }
}

/// Encode a single value
pub fn encode(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Double(d) => match Number::from_f64(*d) {
            Some(n) => Json::Number(n),
            None => json!({ TYPE_TAG: TAG_DOUBLE, "value": non_finite_name(*d) }),
        },
        Value::String(s) => Json::String(s.clone()),
        Value::Timestamp(ts) => json!({
            TYPE_TAG: TAG_TIMESTAMP,
            "seconds": ts.seconds,
            "nanoseconds": ts.nanoseconds,
        }),
        Value::GeoPoint(point) => json!({
            TYPE_TAG: TAG_GEO_POINT,
            "latitude": point.latitude,
            "longitude": point.longitude,
        }),
        Value::Reference(reference) => json!({
            TYPE_TAG: TAG_REFERENCE,
            "path": reference.path(),
        }),
        Value::Array(values) => json!({
            TYPE_TAG: TAG_ARRAY,
            "values": values.iter().map(encode).collect::<Vec<_>>(),
        }),
        Value::Map(fields) if fields.contains_key(TYPE_TAG) => json!({
            TYPE_TAG: TAG_MAP,
            "value": encode_fields(fields),
        }),
        Value::Map(fields) => encode_fields(fields),
    }
}

/// Encode a document's field map as a plain object
///
/// The top level is never tagged, so its keys are unrestricted.
pub fn encode_fields(fields: &Fields) -> Json {
    Json::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode(v)))
            .collect::<Map<_, _>>(),
    )
}

/// Decode a single value
pub fn decode(portable: &Json, resolver: &dyn ReferenceResolver) -> Result<Value> {
    match portable {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Integer(i)),
            None => n
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| Error::codec(format!("unrepresentable number: {n}"))),
        },
        Json::String(s) => Ok(Value::String(s.clone())),
        // Untagged arrays are accepted for entries written without the array tag
        Json::Array(items) => items
            .iter()
            .map(|item| decode(item, resolver))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Json::Object(object) => decode_object(object, resolver),
    }
}

/// Decode a document's field map; the top level must be an object
pub fn decode_fields(portable: &Json, resolver: &dyn ReferenceResolver) -> Result<Fields> {
    match portable {
        Json::Object(object) => decode_map(object, resolver),
        other => Err(Error::codec(format!(
            "expected an object of fields, found {}",
            json_kind(other)
        ))),
    }
}

fn decode_object(object: &Map<String, Json>, resolver: &dyn ReferenceResolver) -> Result<Value> {
    let tag = match object.get(TYPE_TAG).and_then(Json::as_str) {
        Some(tag) => tag,
        None => return decode_map(object, resolver).map(Value::Map),
    };

    match tag {
        TAG_TIMESTAMP => {
            let seconds = required(object, tag, "seconds")?
                .as_i64()
                .ok_or_else(|| malformed(tag, "seconds must be an integer"))?;
            let nanoseconds = required(object, tag, "nanoseconds")?
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| malformed(tag, "nanoseconds must be a 32-bit unsigned integer"))?;
            Timestamp::new(seconds, nanoseconds).map(Value::Timestamp)
        }
        TAG_GEO_POINT => {
            let latitude = required(object, tag, "latitude")?
                .as_f64()
                .ok_or_else(|| malformed(tag, "latitude must be a number"))?;
            let longitude = required(object, tag, "longitude")?
                .as_f64()
                .ok_or_else(|| malformed(tag, "longitude must be a number"))?;
            GeoPoint::new(latitude, longitude).map(Value::GeoPoint)
        }
        TAG_REFERENCE => {
            let path = required(object, tag, "path")?
                .as_str()
                .ok_or_else(|| malformed(tag, "path must be a string"))?;
            resolver
                .resolve(path)
                .map(Value::Reference)
                .ok_or_else(|| Error::codec(format!("unresolvable reference '{path}'")))
        }
        TAG_ARRAY => {
            let values = required(object, tag, "values")?
                .as_array()
                .ok_or_else(|| malformed(tag, "values must be an array"))?;
            values
                .iter()
                .map(|item| decode(item, resolver))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        TAG_MAP => {
            let entries = required(object, tag, "value")?
                .as_object()
                .ok_or_else(|| malformed(tag, "value must be an object"))?;
            decode_map(entries, resolver).map(Value::Map)
        }
        TAG_DOUBLE => {
            let name = required(object, tag, "value")?
                .as_str()
                .ok_or_else(|| malformed(tag, "value must be a string"))?;
            parse_non_finite(name)
                .map(Value::Double)
                .ok_or_else(|| malformed(tag, "value must be NaN, Infinity or -Infinity"))
        }
        _ => decode_map(object, resolver).map(Value::Map),
    }
}

fn decode_map(object: &Map<String, Json>, resolver: &dyn ReferenceResolver) -> Result<Fields> {
    object
        .iter()
        .map(|(k, v)| decode(v, resolver).map(|value| (k.clone(), value)))
        .collect()
}

fn required<'a>(object: &'a Map<String, Json>, tag: &str, field: &str) -> Result<&'a Json> {
    object
        .get(field)
        .ok_or_else(|| malformed(tag, &format!("missing '{field}'")))
}

fn malformed(tag: &str, message: &str) -> Error {
    Error::codec(format!("malformed {tag} value: {message}"))
}

fn non_finite_name(d: f64) -> &'static str {
    if d.is_nan() {
        "NaN"
    } else if d.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

fn parse_non_finite(name: &str) -> Option<f64> {
    match name {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn round_trip(value: &Value) -> Value {
        let bytes = serde_json::to_vec(&encode(value)).unwrap();
        let portable: Json = serde_json::from_slice(&bytes).unwrap();
        decode(&portable, &PathResolver).unwrap()
    }

    #[test]
    fn test_tagged_shapes() {
        let ts = Value::Timestamp(Timestamp::new(1_700_000_000, 42).unwrap());
        assert_eq!(
            encode(&ts),
            json!({"__type__": "timestamp", "seconds": 1_700_000_000i64, "nanoseconds": 42})
        );

        let reference = Value::Reference(DocumentRef::new("users/alice").unwrap());
        assert_eq!(
            encode(&reference),
            json!({"__type__": "reference", "path": "users/alice"})
        );

        let list = Value::from(vec![1, 2]);
        assert_eq!(
            encode(&list),
            json!({"__type__": "array", "values": [1, 2]})
        );
    }

    #[test]
    fn test_each_kind_round_trips() {
        let mut nested = Fields::new();
        nested.insert("inner".to_string(), Value::from(vec![Value::Null, Value::Bool(true)]));

        let values = vec![
            Value::Null,
            Value::Bool(false),
            Value::Integer(-7),
            Value::Double(1.0),
            Value::Double(f64::INFINITY),
            Value::String("hello".to_string()),
            Value::Timestamp(Timestamp::new(-5, 999).unwrap()),
            Value::GeoPoint(GeoPoint::new(-33.86, 151.2).unwrap()),
            Value::Reference(DocumentRef::new("a/b/c/d").unwrap()),
            Value::from(vec![Value::from(vec![1]), Value::Map(nested.clone())]),
            Value::Map(nested),
        ];
        for value in values {
            assert_eq!(round_trip(&value), value, "round trip of {}", value.kind());
        }
    }

    #[test]
    fn test_nan_round_trips_as_nan() {
        match round_trip(&Value::Double(f64::NAN)) {
            Value::Double(d) => assert!(d.is_nan()),
            other => panic!("expected double, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_decodes_as_map() {
        let portable = json!({"__type__": "vector", "dims": 3});
        let value = decode(&portable, &PathResolver).unwrap();
        let map = value.as_map().expect("plain map");
        assert_eq!(map.get("__type__"), Some(&Value::from("vector")));
        assert_eq!(map.get("dims"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_map_holding_type_key_round_trips() {
        for tag in ["array", "timestamp", "map", "vector"] {
            let mut fields = Fields::new();
            fields.insert("__type__".to_string(), Value::from(tag));
            fields.insert("values".to_string(), Value::from(vec![1, 2]));
            let value = Value::Map(fields);
            assert_eq!(round_trip(&value), value, "map tagged {tag}");
        }

        let mut fields = Fields::new();
        fields.insert("__type__".to_string(), Value::from("timestamp"));
        assert_eq!(
            encode(&Value::Map(fields)),
            json!({"__type__": "map", "value": {"__type__": "timestamp"}})
        );
    }

    #[test]
    fn test_document_fields_may_use_type_key() {
        let mut fields = Fields::new();
        fields.insert("__type__".to_string(), Value::from("array"));
        let decoded = decode_fields(&encode_fields(&fields), &PathResolver).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn test_malformed_known_tag_is_an_error() {
        let portable = json!({"__type__": "timestamp", "seconds": "soon"});
        assert!(decode(&portable, &PathResolver).is_err());
    }

    #[test]
    fn test_custom_resolver() {
        let portable = json!({"__type__": "reference", "path": "users/alice"});
        let rejecting = |_: &str| -> Option<DocumentRef> { None };
        assert!(decode(&portable, &rejecting).is_err());

        let rooted = |path: &str| DocumentRef::new(format!("tenants/t1/{path}")).ok();
        assert_eq!(
            decode(&portable, &rooted).unwrap(),
            Value::Reference(DocumentRef::new("tenants/t1/users/alice").unwrap())
        );
    }

    #[test]
    fn test_decode_fields_requires_object() {
        assert!(decode_fields(&json!([1, 2]), &PathResolver).is_err());
        let fields = decode_fields(&json!({"a": 1}), &PathResolver).unwrap();
        assert_eq!(fields.get("a"), Some(&Value::Integer(1)));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            prop::num::f64::NORMAL.prop_map(Value::Double),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
            (any::<i64>(), 0u32..1_000_000_000)
                .prop_map(|(s, n)| Value::Timestamp(Timestamp::new(s, n).unwrap())),
            (-90.0f64..=90.0, -180.0f64..=180.0)
                .prop_map(|(lat, lng)| Value::GeoPoint(GeoPoint::new(lat, lng).unwrap())),
            "[a-z]{1,8}/[a-z0-9]{1,8}"
                .prop_map(|p| Value::Reference(DocumentRef::new(p).unwrap())),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}|__type__", inner, 0..6)
                    .prop_map(Value::Map),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_round_trip_law(value in arb_value()) {
            prop_assert_eq!(round_trip(&value), value);
        }
    }
}
