//! Error conversion utilities

use super::types::{CacheError, RecoveryHint, SerializationOp};
use std::path::PathBuf;

/// Convert serde_json errors to cache errors
impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            key: String::new(),
            operation: SerializationOp::Decode,
            source: Box::new(error),
            recovery_hint: RecoveryHint::ClearAndRetry,
        }
    }
}

/// Convert core errors to cache errors
impl From<coldstore_core::Error> for CacheError {
    fn from(error: coldstore_core::Error) -> Self {
        use coldstore_core::Error as Core;

        match error {
            Core::InvalidPath { path, message } => Self::InvalidKey {
                key: path,
                reason: message,
                recovery_hint: RecoveryHint::Manual {
                    instructions: "Use a non-empty slash-separated path".to_string(),
                },
            },
            Core::InvalidQuery {
                collection,
                message,
            } => Self::InvalidKey {
                key: collection,
                reason: message,
                recovery_hint: RecoveryHint::Manual {
                    instructions: "Fix the query's filters or limits".to_string(),
                },
            },
            Core::Codec { message } => Self::Serialization {
                key: String::new(),
                operation: SerializationOp::Decode,
                source: message.into(),
                recovery_hint: RecoveryHint::ClearAndRetry,
            },
            Core::Json { source, .. } => source.into(),
            remote @ (Core::Remote { .. } | Core::Subscription { .. }) => Self::Remote {
                operation: "remote call",
                source: remote,
                recovery_hint: RecoveryHint::CheckNetwork,
            },
        }
    }
}

impl CacheError {
    /// Wrap a remote failure for a named operation
    pub(crate) fn remote(operation: &'static str, source: coldstore_core::Error) -> Self {
        Self::Remote {
            operation,
            source,
            recovery_hint: RecoveryHint::CheckNetwork,
        }
    }

    /// I/O error with the path and operation it happened on
    pub(crate) fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        let path = path.into();
        let recovery_hint = match source.kind() {
            std::io::ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions { path: path.clone() },
            _ => RecoveryHint::CheckDiskSpace,
        };
        Self::Io {
            path,
            operation,
            source,
            recovery_hint,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_becomes_invalid_key() {
        let err: CacheError = coldstore_core::Error::invalid_path("a//b", "empty segment").into();
        assert!(matches!(err, CacheError::InvalidKey { ref key, .. } if key == "a//b"));
    }

    #[test]
    fn test_remote_keeps_source() {
        let err: CacheError = coldstore_core::Error::remote("fetch query", "denied").into();
        assert!(err.is_remote());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_permission_hint_carries_path() {
        let err = CacheError::io(
            "/cache/x.json",
            "write cache entry",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert_eq!(
            err.recovery_hint(),
            &RecoveryHint::CheckPermissions {
                path: PathBuf::from("/cache/x.json")
            }
        );
    }
}
