//! Cache key derivation
//!
//! Document keys are the document's full path. Query keys are the base
//! collection path followed by `#` and the first 16 hex characters of the
//! SHA-256 of the query's canonical description, so equivalent queries share
//! a key and the collection stays readable in listings.
//!
//! Keys map to file names through an injective sanitization: path separators
//! become `_`, while literal `_`, `%` and `\` are percent-escaped first. The
//! mapping can therefore be inverted, which eviction relies on to find the
//! memory entry that belongs to a deleted file. A key whose sanitized form is
//! longer than [`MAX_ENTRY_STEM_LEN`] is stored under `%H<sha-256 of the key>`
//! instead, a stem sanitization never produces.

use crate::errors::Result;
use coldstore_core::constants::{HASHED_STEM_PREFIX, MAX_ENTRY_STEM_LEN};
use coldstore_core::{DocumentRef, Query};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};

const QUERY_HASH_LEN: usize = 16;

/// What kind of entity a key identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Document,
    Query,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Document => f.write_str("document"),
            EntityKind::Query => f.write_str("query"),
        }
    }
}

/// Stable string identifying one document or one query's parameter set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_document(reference: &DocumentRef) -> Self {
        Self(reference.path().to_string())
    }

    pub fn for_query(query: &Query) -> Result<Self> {
        let canonical = query.canonical_json()?;
        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        Ok(Self(format!(
            "{}#{}",
            query.collection_path(),
            &digest[..QUERY_HASH_LEN]
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem for this key
    pub fn sanitized(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            match c {
                '%' => out.push_str("%25"),
                '_' => out.push_str("%5F"),
                '\\' => out.push_str("%5C"),
                '/' => out.push('_'),
                other => out.push(other),
            }
        }
        out
    }

    /// File stem for this key, at most [`MAX_ENTRY_STEM_LEN`] bytes
    pub fn file_stem(&self) -> String {
        let sanitized = self.sanitized();
        if sanitized.len() <= MAX_ENTRY_STEM_LEN {
            return sanitized;
        }
        format!(
            "{HASHED_STEM_PREFIX}{}",
            hex::encode(Sha256::digest(self.0.as_bytes()))
        )
    }

    /// Recover a key from a file stem produced by [`CacheKey::sanitized`]
    pub fn from_sanitized(stem: &str) -> Option<Self> {
        let mut out = String::with_capacity(stem.len());
        let mut chars = stem.chars();
        while let Some(c) = chars.next() {
            match c {
                '_' => out.push('/'),
                '%' => {
                    let escape: String = chars.by_ref().take(2).collect();
                    match escape.as_str() {
                        "25" => out.push('%'),
                        "5F" => out.push('_'),
                        "5C" => out.push('\\'),
                        _ => return None,
                    }
                }
                other => out.push(other),
            }
        }
        (!out.is_empty()).then_some(Self(out))
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
