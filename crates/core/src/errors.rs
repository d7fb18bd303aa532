/// Result type alias for coldstore core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by the value model, codec and remote boundary
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A document or collection path failed validation
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// A query description is not usable
    #[error("invalid query on '{collection}': {message}")]
    InvalidQuery { collection: String, message: String },

    /// Portable encoding could not be produced or read back
    #[error("codec error: {message}")]
    Codec { message: String },

    /// The remote database rejected or failed an operation
    #[error("remote {operation} failed: {message}")]
    Remote {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A live subscription could not be opened or broke down
    #[error("subscription on '{target}' failed: {message}")]
    Subscription { target: String, message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl Error {
    /// Create an invalid path error
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid query error
    #[must_use]
    pub fn invalid_query(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidQuery {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create a codec error
    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Error::Codec {
            message: message.into(),
        }
    }

    /// Create a remote failure without an underlying source
    #[must_use]
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Remote {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a remote failure wrapping the client's own error
    #[must_use]
    pub fn remote_with_source(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Remote {
            operation: operation.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a subscription error
    #[must_use]
    pub fn subscription(target: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Subscription {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the remote side rather than local data
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. } | Error::Subscription { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = Error::remote("fetch document", "permission denied");
        assert_eq!(
            err.to_string(),
            "remote fetch document failed: permission denied"
        );
        assert!(err.is_remote());
    }

    #[test]
    fn test_remote_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::remote_with_source("fetch query", "connection lost", io);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_json_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Json { .. }));
        assert!(!err.is_remote());
    }
}
