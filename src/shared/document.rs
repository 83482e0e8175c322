//! Document, version and share rows
//!
//! Field names follow the `documents`, `document_versions` and
//! `document_shares` tables so rows deserialize straight from PostgREST.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::content::EMPTY_DOCUMENT;
use crate::shared::error::SharedError;

/// Title given to documents the user has not named yet
pub const UNTITLED: &str = "Untitled Document";

/// Who can read a document without a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn toggled(self) -> Self {
        match self {
            Self::Public => Self::Private,
            Self::Private => Self::Public,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(SharedError::validation(
                "visibility",
                format!("expected public or private, got {other}"),
            )),
        }
    }
}

/// Author columns embedded through `users:author_id(username, full_name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub username: String,
    pub full_name: Option<String>,
}

impl AuthorSummary {
    /// Full name when set, otherwise the username
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }
}

/// A row of `documents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    /// Serialized content tree
    pub content: String,
    pub author_id: Uuid,
    pub visibility: Visibility,
    pub last_modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Present when the query embedded the author
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
}

impl Document {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

/// Insert payload for `documents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub visibility: Visibility,
}

impl NewDocument {
    /// An untitled, empty, private document
    pub fn blank(author_id: Uuid) -> Self {
        Self {
            title: UNTITLED.to_string(),
            content: EMPTY_DOCUMENT.to_string(),
            author_id,
            visibility: Visibility::Private,
        }
    }

    /// Private copy of `source` owned by `author_id`
    pub fn copy_of(source: &Document, author_id: Uuid) -> Self {
        Self {
            title: format!("{} (Copy)", source.title),
            content: source.content.clone(),
            author_id,
            visibility: Visibility::Private,
        }
    }
}

/// Partial update for `documents`; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl DocumentPatch {
    /// Title and body change, stamped with `at`
    pub fn edit(title: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            visibility: None,
            last_modified_at: Some(at),
        }
    }

    pub fn visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.visibility.is_none()
            && self.last_modified_at.is_none()
    }

    /// Whether this patch has to be paired with a version snapshot
    pub fn touches_body(&self) -> bool {
        self.title.is_some() || self.content.is_some()
    }
}

/// A row of `document_versions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `document_versions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVersion {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
}

/// A row of `document_shares`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentShare {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub can_edit: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `document_shares`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShare {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub can_edit: bool,
}
