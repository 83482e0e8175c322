//! Supabase-backed repository
//!
//! Row-level policies filter rows silently: an update or delete the caller is
//! not allowed to perform matches zero rows instead of failing. Those cases are
//! told apart with a follow-up lookup, see [`SupabaseStore::classify_missing`].

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::client::rest::{in_filter, to_tsquery, BackendClient, TableQuery};
use crate::client::store::{DocumentRepository, UserDirectory};
use crate::shared::{
    Document, DocumentPatch, DocumentShare, DocumentVersion, MentionCandidate, NewDocument,
    NewMention, NewShare, NewVersion, ProfileUpsert, Visibility,
};

const DOCUMENTS: &str = "documents";
const VERSIONS: &str = "document_versions";
const SHARES: &str = "document_shares";
const MENTIONS: &str = "mentions";
const USERS: &str = "users";

/// Documents with the author's name embedded
const DOCUMENT_WITH_AUTHOR: &str = "*,users:author_id(username,full_name)";
/// tsvector column maintained by the database over title and content
const SEARCH_COLUMN: &str = "search_text";

#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SharedDocumentRow {
    document_id: Uuid,
}

/// Repository over the PostgREST tables
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    backend: BackendClient,
}

impl SupabaseStore {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Explain why a write by id matched nothing: the row is still visible to
    /// the caller (so a policy refused the write) or it does not exist
    async fn classify_missing(&self, id: Uuid, action: &str) -> ClientError {
        let lookup = TableQuery::new(DOCUMENTS).select("id").eq("id", id).limit(1);
        match self.backend.select::<IdRow>(&lookup).await {
            Ok(rows) if !rows.is_empty() => {
                ClientError::permission(format!("not allowed to {action} document {id}"))
            }
            Ok(_) => ClientError::not_found(format!("document {id}")),
            Err(err) => err,
        }
    }

    async fn shared_document_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>, ClientError> {
        let query = TableQuery::new(SHARES)
            .select("document_id")
            .eq("user_id", user_id);
        let rows: Vec<SharedDocumentRow> = self.backend.select(&query).await?;
        Ok(rows.into_iter().map(|row| row.document_id).collect())
    }
}

#[async_trait]
impl DocumentRepository for SupabaseStore {
    async fn create_document(&self, document: &NewDocument) -> Result<Document, ClientError> {
        let rows: Vec<Document> = self.backend.insert(DOCUMENTS, document).await?;
        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::store("insert returned no document"))?;
        info!(document_id = %created.id, author_id = %created.author_id, "document created");
        Ok(created)
    }

    async fn get_document(&self, id: Uuid) -> Result<Document, ClientError> {
        let query = TableQuery::new(DOCUMENTS)
            .select(DOCUMENT_WITH_AUTHOR)
            .eq("id", id)
            .limit(1);
        self.backend
            .select::<Document>(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::not_found(format!("document {id}")))
    }

    async fn update_document(&self, id: Uuid, patch: &DocumentPatch) -> Result<(), ClientError> {
        let query = TableQuery::new(DOCUMENTS).eq("id", id).select("id");
        let changed: Vec<IdRow> = self.backend.update(&query, patch).await?;
        if changed.is_empty() {
            return Err(self.classify_missing(id, "edit").await);
        }
        debug!(document_id = %id, "document updated");
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), ClientError> {
        let query = TableQuery::new(DOCUMENTS).eq("id", id).select("id");
        let removed: Vec<IdRow> = self.backend.delete(&query).await?;
        if removed.is_empty() {
            return Err(self.classify_missing(id, "delete").await);
        }
        info!(document_id = %id, "document deleted");
        Ok(())
    }

    async fn append_version(&self, version: &NewVersion) -> Result<(), ClientError> {
        self.backend.insert_minimal(VERSIONS, version).await
    }

    async fn list_versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, ClientError> {
        let query = TableQuery::new(VERSIONS)
            .select("*")
            .eq("document_id", document_id)
            .order_desc("created_at");
        self.backend.select(&query).await
    }

    async fn list_accessible_documents(&self, user_id: Uuid) -> Result<Vec<Document>, ClientError> {
        let shared = self.shared_document_ids(user_id).await?;

        let query = TableQuery::new(DOCUMENTS).select(DOCUMENT_WITH_AUTHOR);
        let query = if shared.is_empty() {
            query.eq("author_id", user_id)
        } else {
            query.or(&[format!("author_id.eq.{user_id}"), in_filter("id", &shared)])
        };

        self.backend
            .select(&query.order_desc("last_modified_at"))
            .await
    }

    async fn search_documents(
        &self,
        user_id: Uuid,
        query: &str,
    ) -> Result<Vec<Document>, ClientError> {
        let Some(tsquery) = to_tsquery(query) else {
            return Ok(Vec::new());
        };

        let request = TableQuery::new(DOCUMENTS)
            .select(DOCUMENT_WITH_AUTHOR)
            .fts(SEARCH_COLUMN, &tsquery)
            .order_desc("last_modified_at");
        let hits: Vec<Document> = self.backend.select(&request).await?;

        let shared = self.shared_document_ids(user_id).await?;
        let accessible = hits
            .into_iter()
            .filter(|doc| {
                doc.author_id == user_id
                    || doc.visibility == Visibility::Public
                    || shared.contains(&doc.id)
            })
            .collect::<Vec<_>>();

        debug!(%user_id, query, results = accessible.len(), "search finished");
        Ok(accessible)
    }

    async fn has_share(&self, document_id: Uuid, user_id: Uuid) -> Result<bool, ClientError> {
        let query = TableQuery::new(SHARES)
            .select("id")
            .eq("document_id", document_id)
            .eq("user_id", user_id)
            .limit(1);
        let rows: Vec<IdRow> = self.backend.select(&query).await?;
        Ok(!rows.is_empty())
    }

    async fn share_document(&self, share: &NewShare) -> Result<DocumentShare, ClientError> {
        let rows: Vec<DocumentShare> = self.backend.insert(SHARES, share).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::store("insert returned no share"))
    }

    async fn create_mention(&self, mention: &NewMention) -> Result<(), ClientError> {
        self.backend.insert_minimal(MENTIONS, mention).await
    }
}

#[async_trait]
impl UserDirectory for SupabaseStore {
    async fn upsert_profile(&self, profile: &ProfileUpsert) -> Result<(), ClientError> {
        self.backend.upsert(USERS, profile).await
    }

    async fn list_mention_candidates(
        &self,
        limit: usize,
    ) -> Result<Vec<MentionCandidate>, ClientError> {
        let query = TableQuery::new(USERS)
            .select("id,username,full_name")
            .limit(limit);
        self.backend.select(&query).await
    }
}
