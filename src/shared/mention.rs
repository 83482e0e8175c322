//! Mention notification rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of `mentions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: Uuid,
    pub document_id: Uuid,
    pub mentioned_user_id: Uuid,
    pub mentioning_user_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `mentions`; `is_read` defaults to false server-side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMention {
    pub document_id: Uuid,
    pub mentioned_user_id: Uuid,
    pub mentioning_user_id: Uuid,
}
