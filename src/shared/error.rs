//! Errors raised without touching the backend
//!
//! Parsing a stored content tree, splicing a mention into it, reading a
//! visibility or route from text: all of these fail with [`SharedError`].
//! [`ClientError`](crate::client::ClientError) wraps it unchanged.
//!
//! ```rust
//! use doccollab::shared::{ContentNode, SharedError};
//!
//! let mut body = ContentNode::from_plain_text("Hi @al");
//! let err = body.insert_mention(4..4, "u-1", "alice").unwrap_err();
//! assert!(matches!(err, SharedError::ContentError { .. }));
//! ```
use thiserror::Error;

/// Data model errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Content tree edit error
    #[error("Content error: {message}")]
    ContentError {
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new content error
    pub fn content(message: impl Into<String>) -> Self {
        Self::ContentError {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
