//! Document handles

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Handle back to a single document in the remote database.
///
/// A reference is identified by its full slash-separated path
/// (`collection/doc/subcollection/doc`). Paths are validated on construction
/// so every handle in circulation is usable as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentRef(String);

impl DocumentRef {
    /// Create a new reference, validating the path
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self(path))
    }

    /// Full path of the document
    pub fn path(&self) -> &str {
        &self.0
    }

    /// Last path segment
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Path of the collection holding this document, if any
    pub fn parent_path(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// Reference to a child document under `collection/id`
    pub fn child(&self, collection: &str, id: &str) -> Result<Self> {
        Self::new(format!("{}/{collection}/{id}", self.0))
    }

    /// Convert to String
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Validate a slash-separated database path
pub(crate) fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "path cannot be empty"));
    }
    if path.split('/').any(str::is_empty) {
        return Err(Error::invalid_path(
            path,
            "path cannot contain empty segments or leading/trailing slashes",
        ));
    }
    if path.chars().any(char::is_control) {
        return Err(Error::invalid_path(path, "path cannot contain control characters"));
    }
    Ok(())
}

impl Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentRef {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for DocumentRef {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<DocumentRef> for String {
    fn from(reference: DocumentRef) -> Self {
        reference.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_and_parent() {
        let doc = DocumentRef::new("users/alice/posts/p1").unwrap();
        assert_eq!(doc.id(), "p1");
        assert_eq!(doc.parent_path(), Some("users/alice/posts"));

        let root = DocumentRef::new("settings").unwrap();
        assert_eq!(root.id(), "settings");
        assert_eq!(root.parent_path(), None);
    }

    #[test]
    fn test_rejects_malformed_paths() {
        assert!(DocumentRef::new("").is_err());
        assert!(DocumentRef::new("/users/alice").is_err());
        assert!(DocumentRef::new("users//alice").is_err());
        assert!(DocumentRef::new("users/alice/").is_err());
        assert!(DocumentRef::new("users/\nalice").is_err());
    }

    #[test]
    fn test_child() {
        let doc = DocumentRef::new("users/alice").unwrap();
        let child = doc.child("posts", "p1").unwrap();
        assert_eq!(child.path(), "users/alice/posts/p1");
    }

    #[test]
    fn test_serde_validates() {
        let doc: DocumentRef = serde_json::from_str("\"x/1\"").unwrap();
        assert_eq!(doc.path(), "x/1");
        assert!(serde_json::from_str::<DocumentRef>("\"x//1\"").is_err());
    }
}
