//! Error types for postql.

use thiserror::Error;

/// The main error type for building and compiling post queries.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested method or shortcut does not exist.
    #[error("Unsupported operation: '{0}'")]
    Unsupported(String),

    /// Illegal input that cannot be silently corrected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation exists but has no implementation.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// The formatter or a setting could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The post store failed to answer a query.
    #[error("Store error: {0}")]
    Store(String),

    /// Failed to parse a filter expression.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for postql operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unexpected character"
        );
    }

    #[test]
    fn test_unsupported_display() {
        let err = Error::Unsupported("fooBar".to_string());
        assert_eq!(err.to_string(), "Unsupported operation: 'fooBar'");
    }
}
