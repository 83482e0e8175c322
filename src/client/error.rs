//! Client Error Types
//!
//! Every backend call in the client returns `ClientError`. The variants follow
//! how the failure should be handled by the caller:
//!
//! - `AuthError` - shown to the user verbatim; the attempted action is aborted
//! - `StoreError` - connectivity or constraint failure; retryable
//! - `PermissionError` - denied by a row-level policy
//! - `NotFoundError` - the referenced row does not exist
//! - `NotAuthenticated` - the operation needs a session and there is none
//!
//! # Backend Error Bodies
//!
//! PostgREST answers failures with `{"code", "message", "details", "hint"}` and
//! GoTrue with `{"error_description"}`, `{"msg"}` or `{"message"}`.
//! [`ClientError::from_response`] and [`ClientError::from_auth_response`] turn
//! those into variants.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::shared::{ConfigError, SharedError};

/// PostgREST code for "JSON object requested, multiple (or no) rows returned"
const PGRST_NO_ROWS: &str = "PGRST116";
/// Postgres `insufficient_privilege`, raised by row-level policies
const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Invalid credentials, duplicate email, expired session
    #[error("{message}")]
    AuthError { message: String },

    /// Connectivity or constraint failure on a table operation
    #[error("Store error: {message}")]
    StoreError { message: String },

    /// Access denied by a row-level policy
    #[error("Permission denied: {message}")]
    PermissionError { message: String },

    /// Referenced row is absent
    #[error("Not found: {message}")]
    NotFoundError { message: String },

    #[error("Not signed in")]
    NotAuthenticated,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shared(#[from] SharedError),
}

#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ClientError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::PermissionError {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFoundError {
            message: message.into(),
        }
    }

    /// Whether trying the same call again later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreError { .. })
    }

    /// Map a failed PostgREST response
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = match (&parsed.message, &parsed.details) {
            (Some(message), Some(details)) if !details.is_empty() => {
                format!("{message} ({details})")
            }
            (Some(message), _) => message.clone(),
            (None, _) if body.trim().is_empty() => status.to_string(),
            (None, _) => body.trim().to_string(),
        };

        match parsed.code.as_deref() {
            Some(PG_INSUFFICIENT_PRIVILEGE) => return Self::permission(message),
            Some(PGRST_NO_ROWS) => return Self::not_found(message),
            _ => {}
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::permission(message),
            StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => Self::not_found(message),
            _ => Self::store(message),
        }
    }

    /// Map a failed GoTrue response; the provider's message is kept verbatim
    pub fn from_auth_response(status: StatusCode, body: &str) -> Self {
        let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .error_description
            .or(parsed.msg)
            .or(parsed.message)
            .or(parsed.error)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body.trim().to_string()
                }
            });

        if status.is_server_error() {
            Self::store(message)
        } else {
            Self::auth(message)
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Shared(SharedError::serialization(err.to_string()))
        } else {
            Self::store(format!("Network error: {}", err))
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Shared(err.into())
    }
}
