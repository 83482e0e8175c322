//! Authentication session types
//!
//! Mirrors the GoTrue token response: an access token, a refresh token and the
//! authenticated user with the metadata supplied at sign-up.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile fields stored by the auth provider at sign-up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// A signed-in session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds as issued
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp at which the access token expires
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// Expiry instant, derived from `expires_at` or `issued_at + expires_in`
    pub fn expiry(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(issued_at + chrono::Duration::seconds(secs)),
            (None, None) => None,
        }
    }

    /// Fill in `expires_at` so the session can be checked after a restart
    pub fn stamped(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expiry(issued_at).map(|at| at.timestamp());
        }
        self
    }

    /// True when the token expires within `margin` of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        match self.expires_at.and_then(|at| Utc.timestamp_opt(at, 0).single()) {
            Some(expiry) => expiry <= now + margin,
            None => false,
        }
    }
}

/// Sign-up form fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub full_name: Option<String>,
}
