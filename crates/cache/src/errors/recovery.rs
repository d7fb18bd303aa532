//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::Io { recovery_hint, .. }
            | Self::Serialization { recovery_hint, .. }
            | Self::Corruption { recovery_hint, .. }
            | Self::InvalidKey { recovery_hint, .. }
            | Self::Remote { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. } => recovery_hint,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::CheckNetwork)
    }

    /// Check if this error indicates data corruption
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
            || matches!(
                self,
                Self::Serialization {
                    operation: super::types::SerializationOp::Decode,
                    ..
                }
            )
    }

    /// Check if this error originated at the remote database
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SerializationOp;
    use std::path::PathBuf;

    #[test]
    fn test_classification() {
        let remote = CacheError::Remote {
            operation: "fetch document",
            source: coldstore_core::Error::remote("fetch document", "offline"),
            recovery_hint: RecoveryHint::CheckNetwork,
        };
        assert!(remote.is_transient());
        assert!(remote.is_remote());
        assert!(!remote.is_corruption());

        let corrupt = CacheError::Corruption {
            key: "users/alice".to_string(),
            reason: "truncated".to_string(),
            recovery_hint: RecoveryHint::ClearAndRetry,
        };
        assert!(corrupt.is_corruption());
        assert!(!corrupt.is_transient());

        let decode = CacheError::Serialization {
            key: "users/alice".to_string(),
            operation: SerializationOp::Decode,
            source: "bad".into(),
            recovery_hint: RecoveryHint::ClearAndRetry,
        };
        assert!(decode.is_corruption());

        let io = CacheError::Io {
            path: PathBuf::from("/tmp/x"),
            operation: "write cache entry",
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            recovery_hint: RecoveryHint::CheckDiskSpace,
        };
        assert_eq!(io.recovery_hint(), &RecoveryHint::CheckDiskSpace);
    }
}
