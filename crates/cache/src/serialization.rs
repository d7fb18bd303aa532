//! Byte-level encoding of persisted entries
//!
//! A document entry is the portable encoding of its field map: one JSON
//! object. A query entry is a JSON array of `{id, path, data}` records in
//! result order, where `data` is `null` for a document that does not exist.

use crate::entry::{CachedDocument, CachedQueryResult};
use crate::errors::{CacheError, RecoveryHint, Result, SerializationOp};
use crate::keys::CacheKey;
use coldstore_core::codec::{self, ReferenceResolver};
use coldstore_core::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

#[derive(Debug, Serialize, Deserialize)]
struct QueryRecord {
    id: String,
    path: String,
    data: Json,
}

/// Encode a document's fields
pub fn encode_document(key: &CacheKey, fields: &Fields) -> Result<Vec<u8>> {
    serde_json::to_vec(&codec::encode_fields(fields)).map_err(|e| encode_error(key, e))
}

/// Decode a document entry back into its fields
pub fn decode_document(
    key: &CacheKey,
    bytes: &[u8],
    resolver: &dyn ReferenceResolver,
) -> Result<Fields> {
    let portable: Json = serde_json::from_slice(bytes).map_err(|e| decode_error(key, e))?;
    codec::decode_fields(&portable, resolver).map_err(|e| decode_error(key, e))
}

/// Encode a query result as a list of records
pub fn encode_query(key: &CacheKey, result: &CachedQueryResult) -> Result<Vec<u8>> {
    let records: Vec<QueryRecord> = result
        .iter()
        .map(|doc| QueryRecord {
            id: doc.id().to_string(),
            path: doc.reference().path().to_string(),
            data: doc.data().map(codec::encode_fields).unwrap_or(Json::Null),
        })
        .collect();
    serde_json::to_vec(&records).map_err(|e| encode_error(key, e))
}

/// Decode a query entry, rebuilding each document's reference through `resolver`
pub fn decode_query(
    key: &CacheKey,
    bytes: &[u8],
    resolver: &dyn ReferenceResolver,
) -> Result<CachedQueryResult> {
    let records: Vec<QueryRecord> =
        serde_json::from_slice(bytes).map_err(|e| decode_error(key, e))?;

    let mut documents = Vec::with_capacity(records.len());
    for record in records {
        let reference = resolver
            .resolve(&record.path)
            .ok_or_else(|| corruption(key, format!("unresolvable document path '{}'", record.path)))?;
        if reference.id() != record.id {
            return Err(corruption(
                key,
                format!("record id '{}' does not match path '{}'", record.id, record.path),
            ));
        }
        let document = match record.data {
            Json::Null => CachedDocument::missing(reference),
            data => {
                let fields =
                    codec::decode_fields(&data, resolver).map_err(|e| decode_error(key, e))?;
                CachedDocument::existing(reference, fields)
            }
        };
        documents.push(document);
    }
    Ok(CachedQueryResult::new(documents))
}

fn encode_error(key: &CacheKey, source: impl std::error::Error + Send + Sync + 'static) -> CacheError {
    CacheError::Serialization {
        key: key.to_string(),
        operation: SerializationOp::Encode,
        source: Box::new(source),
        recovery_hint: RecoveryHint::Manual {
            instructions: "Check that the value is serializable".to_string(),
        },
    }
}

fn decode_error(key: &CacheKey, source: impl std::error::Error + Send + Sync + 'static) -> CacheError {
    CacheError::Serialization {
        key: key.to_string(),
        operation: SerializationOp::Decode,
        source: Box::new(source),
        recovery_hint: RecoveryHint::ClearAndRetry,
    }
}

fn corruption(key: &CacheKey, reason: String) -> CacheError {
    CacheError::Corruption {
        key: key.to_string(),
        reason,
        recovery_hint: RecoveryHint::ClearAndRetry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldstore_core::{DocumentRef, GeoPoint, PathResolver, Query, Value};

    fn sample_fields() -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from("Tokyo"));
        fields.insert(
            "location".to_string(),
            Value::GeoPoint(GeoPoint::new(35.68, 139.69).unwrap()),
        );
        fields.insert(
            "country".to_string(),
            Value::Reference(DocumentRef::new("countries/jp").unwrap()),
        );
        fields
    }

    #[test]
    fn test_document_entry_is_single_object() {
        let key = CacheKey::for_document(&DocumentRef::new("cities/tokyo").unwrap());
        let bytes = encode_document(&key, &sample_fields()).unwrap();
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert!(json.is_object());
        assert_eq!(
            decode_document(&key, &bytes, &PathResolver).unwrap(),
            sample_fields()
        );
    }

    #[test]
    fn test_query_entry_is_record_array() {
        let key = CacheKey::for_query(&Query::collection("cities").unwrap()).unwrap();
        let result = CachedQueryResult::new(vec![
            CachedDocument::existing(DocumentRef::new("cities/tokyo").unwrap(), sample_fields()),
            CachedDocument::missing(DocumentRef::new("cities/atlantis").unwrap()),
        ]);
        let bytes = encode_query(&key, &result).unwrap();

        let json: Json = serde_json::from_slice(&bytes).unwrap();
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "tokyo");
        assert_eq!(records[0]["path"], "cities/tokyo");
        assert!(records[1]["data"].is_null());

        assert_eq!(decode_query(&key, &bytes, &PathResolver).unwrap(), result);
    }

    #[test]
    fn test_truncated_entry_is_decode_error() {
        let key = CacheKey::for_document(&DocumentRef::new("cities/tokyo").unwrap());
        let bytes = encode_document(&key, &sample_fields()).unwrap();
        let err = decode_document(&key, &bytes[..bytes.len() / 2], &PathResolver).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_mismatched_record_id_is_corruption() {
        let key = CacheKey::for_query(&Query::collection("cities").unwrap()).unwrap();
        let bytes = br#"[{"id":"paris","path":"cities/tokyo","data":null}]"#;
        let err = decode_query(&key, bytes, &PathResolver).unwrap_err();
        assert!(matches!(err, CacheError::Corruption { .. }));
    }
}
