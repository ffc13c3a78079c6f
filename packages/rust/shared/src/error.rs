//! Error types for standardsriver.
//!
//! Library crates use [`StandardsRiverError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Identifier decoding has its own [`IdError`] because it is the one place
//! where data problems must reach the caller instead of being skipped.

use std::path::PathBuf;

use crate::types::ObjectIdError;

/// Top-level error type for all standardsriver operations.
#[derive(Debug, thiserror::Error)]
pub enum StandardsRiverError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Reference collection could not be read or parsed.
    #[error("reference source error: {message}")]
    Source { message: String },

    /// Document input could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Identifier could not be decoded.
    #[error(transparent)]
    Identifier(#[from] IdError),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StandardsRiverError>;

impl StandardsRiverError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a reference source error from any displayable message.
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// An identifier input that cannot be turned into a base id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The text does not hold a valid 24-char hex object id.
    #[error("invalid identifier {input:?}: {source}")]
    MalformedObjectId {
        input: String,
        source: ObjectIdError,
    },

    /// A composite identifier lacks a required field.
    #[error("invalid identifier: composite id is missing field {field:?}")]
    MissingField { field: String },

    /// A composite identifier field holds an unexpected JSON type.
    #[error("invalid identifier: field {field:?} must be {expected}, found {found}")]
    WrongFieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The value matches none of the accepted identifier shapes.
    #[error("invalid identifier: cannot decode a {found} as an id")]
    Unsupported { found: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = StandardsRiverError::config("unknown field `colection`");
        assert_eq!(err.to_string(), "config error: unknown field `colection`");

        let err = StandardsRiverError::reference("line 3 is not JSON");
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn identifier_errors_pass_through() {
        let err: StandardsRiverError = IdError::MissingField { field: "_id".into() }.into();
        assert_eq!(
            err.to_string(),
            "invalid identifier: composite id is missing field \"_id\""
        );
    }

    #[test]
    fn malformed_object_id_names_input() {
        let err = IdError::MalformedObjectId {
            input: "xyz".into(),
            source: ObjectIdError::InvalidLength { len: 3 },
        };
        let msg = err.to_string();
        assert!(msg.contains("\"xyz\""));
        assert!(msg.contains("24"));
    }
}
