//! User profile rows and mention candidates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::session::AuthUser;

/// A row of `users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Upsert payload written to `users` whenever someone signs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpsert {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpsert {
    /// Profile for an authenticated user.
    ///
    /// The username comes from sign-up metadata, falling back to the local part
    /// of the email. Users without an email get no profile.
    pub fn from_auth_user(user: &AuthUser) -> Option<Self> {
        let email = user.email.clone()?;
        let username = user
            .user_metadata
            .username
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Some(Self {
            id: user.id,
            email,
            username,
            full_name: user.user_metadata.full_name.clone(),
            avatar_url: user.user_metadata.avatar_url.clone(),
        })
    }
}

/// The `id, username, full_name` projection used by the mention popup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionCandidate {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
}

impl MentionCandidate {
    /// Case-insensitive substring match on username or full name.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.username.to_lowercase().contains(needle)
            || self
                .full_name
                .as_ref()
                .is_some_and(|name| name.to_lowercase().contains(needle))
    }
}
