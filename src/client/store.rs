//! Backend contracts
//!
//! The components talk to the backend only through these traits. The
//! Supabase-backed implementations live in [`crate::client::supabase`] and
//! [`crate::client::auth`]; tests substitute in-memory ones.

use async_trait::async_trait;
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::shared::{
    Document, DocumentPatch, DocumentShare, DocumentVersion, MentionCandidate, NewDocument,
    NewMention, NewShare, NewVersion, ProfileUpsert, Session, SignUpRequest, AuthUser, Visibility,
};

/// Document persistence and search
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a document and return the stored row
    async fn create_document(&self, document: &NewDocument) -> Result<Document, ClientError>;

    async fn get_document(&self, id: Uuid) -> Result<Document, ClientError>;

    /// Fails with `NotFoundError` if `id` is absent and `PermissionError` if
    /// the caller may not edit it
    async fn update_document(&self, id: Uuid, patch: &DocumentPatch) -> Result<(), ClientError>;

    /// Fails with `PermissionError` unless the caller owns the document
    async fn delete_document(&self, id: Uuid) -> Result<(), ClientError>;

    async fn append_version(&self, version: &NewVersion) -> Result<(), ClientError>;

    /// Version history, newest first
    async fn list_versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, ClientError>;

    /// Owned and shared documents, most recently modified first
    async fn list_accessible_documents(&self, user_id: Uuid) -> Result<Vec<Document>, ClientError>;

    /// Full-text search over owned, public and shared documents, most recently
    /// modified first
    async fn search_documents(
        &self,
        user_id: Uuid,
        query: &str,
    ) -> Result<Vec<Document>, ClientError>;

    /// Whether `user_id` holds a share on `document_id`
    async fn has_share(&self, document_id: Uuid, user_id: Uuid) -> Result<bool, ClientError>;

    async fn share_document(&self, share: &NewShare) -> Result<DocumentShare, ClientError>;

    async fn create_mention(&self, mention: &NewMention) -> Result<(), ClientError>;

    async fn set_visibility(&self, id: Uuid, visibility: Visibility) -> Result<(), ClientError> {
        self.update_document(id, &DocumentPatch::visibility(visibility))
            .await
    }
}

/// The `users` table
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn upsert_profile(&self, profile: &ProfileUpsert) -> Result<(), ClientError>;

    /// Up to `limit` users in table order, for the mention popup
    async fn list_mention_candidates(
        &self,
        limit: usize,
    ) -> Result<Vec<MentionCandidate>, ClientError>;
}

/// The authentication provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns a session when the provider signs the user in straight away, or
    /// `None` when the email has to be confirmed first
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, ClientError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ClientError>;

    async fn reset_password(&self, email: &str) -> Result<(), ClientError>;

    /// The user behind an access token; fails if the token is no longer valid
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ClientError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ClientError>;
}
