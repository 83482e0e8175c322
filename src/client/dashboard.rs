//! # Document List and Search
//!
//! View models for the dashboard and the search results page.
//!
//! ## Features
//!
//! - **Local filtering**: search box and ownership filter applied to the fetched list
//! - **Optimistic delete**: the card disappears at once and is put back at its
//!   old position if the backend refuses
//! - **Duplicate**: private "(Copy)" of a document, followed by a refresh
//! - **Cards**: preview, author name and a relative "updated ... ago" label
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn demo(repo: std::sync::Arc<dyn doccollab::client::DocumentRepository>, me: uuid::Uuid) -> Result<(), doccollab::client::ClientError> {
//! use doccollab::client::{Dashboard, OwnershipFilter};
//!
//! let mut dashboard = Dashboard::new(repo, me, 150);
//! dashboard.refresh().await?;
//! dashboard.set_filter(OwnershipFilter::Mine);
//! for card in dashboard.cards(chrono::Utc::now()) {
//!     println!("{} - {}", card.title, card.updated_label);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::client::store::DocumentRepository;
use crate::shared::{preview, Document, NewDocument, Route, SharedError, Visibility};

/// Which documents the dashboard shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipFilter {
    #[default]
    All,
    /// Authored by the viewer
    Mine,
    /// Authored by someone else
    Shared,
}

impl OwnershipFilter {
    pub fn admits(self, document: &Document, viewer: Uuid) -> bool {
        match self {
            Self::All => true,
            Self::Mine => document.is_owned_by(viewer),
            Self::Shared => !document.is_owned_by(viewer),
        }
    }
}

impl fmt::Display for OwnershipFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Mine => "mine",
            Self::Shared => "shared",
        })
    }
}

impl FromStr for OwnershipFilter {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "mine" | "my" => Ok(Self::Mine),
            "shared" => Ok(Self::Shared),
            other => Err(SharedError::validation(
                "filter",
                format!("unknown filter '{other}', expected all, mine or shared"),
            )),
        }
    }
}

/// Case-insensitive substring match over title or raw content
pub fn matches_search(document: &Document, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    document.title.to_lowercase().contains(&needle)
        || document.content.to_lowercase().contains(&needle)
}

/// What a document card displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCard {
    pub id: Uuid,
    pub title: String,
    pub preview: String,
    pub visibility: Visibility,
    /// Full name, else username; empty when the author was not embedded
    pub author_name: String,
    pub updated_label: String,
    /// Only the author is offered delete
    pub can_delete: bool,
    pub route: Route,
}

impl DocumentCard {
    pub fn new(document: &Document, viewer: Uuid, now: DateTime<Utc>, preview_chars: usize) -> Self {
        Self {
            id: document.id,
            title: document.title.clone(),
            preview: preview(&document.content, preview_chars),
            visibility: document.visibility,
            author_name: document
                .author
                .as_ref()
                .map(|author| author.display_name().to_string())
                .unwrap_or_default(),
            updated_label: format!(
                "Updated {} ago",
                relative_age(document.last_modified_at, now)
            ),
            can_delete: document.is_owned_by(viewer),
            route: Route::editor(document.id),
        }
    }
}

/// Humanized distance between `then` and `now`, e.g. "about 3 hours"
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let minutes = (seconds as f64 / 60.0).round() as i64;

    match minutes {
        _ if seconds < 30 => "less than a minute".to_string(),
        0..=1 => "1 minute".to_string(),
        2..=44 => format!("{minutes} minutes"),
        45..=89 => "about 1 hour".to_string(),
        90..=1439 => format!("about {} hours", (minutes as f64 / 60.0).round() as i64),
        1440..=2519 => "1 day".to_string(),
        2520..=43199 => format!("{} days", (minutes as f64 / 1440.0).round() as i64),
        43200..=86399 => {
            let months = (minutes as f64 / 43200.0).round() as i64;
            format!("about {months} month{}", plural(months))
        }
        86400..=525599 => format!("{} months", (minutes as f64 / 43200.0).round() as i64),
        _ => {
            let years = minutes / 525_600;
            format!("about {years} year{}", plural(years))
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// The viewer's accessible documents with local search and filtering
pub struct Dashboard {
    repo: Arc<dyn DocumentRepository>,
    viewer: Uuid,
    preview_chars: usize,
    documents: Vec<Document>,
    search: String,
    filter: OwnershipFilter,
}

impl Dashboard {
    pub fn new(repo: Arc<dyn DocumentRepository>, viewer: Uuid, preview_chars: usize) -> Self {
        Self {
            repo,
            viewer,
            preview_chars,
            documents: Vec::new(),
            search: String::new(),
            filter: OwnershipFilter::All,
        }
    }

    /// Fetch owned and shared documents, newest first
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.documents = self.repo.list_accessible_documents(self.viewer).await?;
        debug!(user_id = %self.viewer, count = self.documents.len(), "documents loaded");
        Ok(())
    }

    /// Everything fetched, before filtering
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn set_filter(&mut self, filter: OwnershipFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> OwnershipFilter {
        self.filter
    }

    /// Documents passing the search box and the ownership filter
    pub fn visible(&self) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|doc| matches_search(doc, &self.search))
            .filter(|doc| self.filter.admits(doc, self.viewer))
            .collect()
    }

    pub fn cards(&self, now: DateTime<Utc>) -> Vec<DocumentCard> {
        self.visible()
            .into_iter()
            .map(|doc| DocumentCard::new(doc, self.viewer, now, self.preview_chars))
            .collect()
    }

    /// Remove the document locally, then on the backend; rolls back on failure
    pub async fn delete(&mut self, id: Uuid) -> Result<(), ClientError> {
        let index = self
            .documents
            .iter()
            .position(|doc| doc.id == id)
            .ok_or_else(|| ClientError::not_found(format!("document {id}")))?;
        let removed = self.documents.remove(index);

        match self.repo.delete_document(id).await {
            Ok(()) => {
                info!(document_id = %id, "document deleted");
                Ok(())
            }
            Err(err) => {
                warn!(document_id = %id, error = %err, "delete failed, restoring document");
                let index = index.min(self.documents.len());
                self.documents.insert(index, removed);
                Err(err)
            }
        }
    }

    /// Private copy titled "<title> (Copy)", then a refresh
    pub async fn duplicate(&mut self, id: Uuid) -> Result<Document, ClientError> {
        let source = self
            .documents
            .iter()
            .find(|doc| doc.id == id)
            .ok_or_else(|| ClientError::not_found(format!("document {id}")))?;

        let copy = self
            .repo
            .create_document(&NewDocument::copy_of(source, self.viewer))
            .await?;
        info!(source_id = %id, document_id = %copy.id, "document duplicated");

        self.refresh().await?;
        Ok(copy)
    }
}

/// The search results page
pub struct SearchResults {
    repo: Arc<dyn DocumentRepository>,
    viewer: Uuid,
    preview_chars: usize,
    query: String,
    results: Vec<Document>,
}

impl SearchResults {
    pub fn new(repo: Arc<dyn DocumentRepository>, viewer: Uuid, preview_chars: usize) -> Self {
        Self {
            repo,
            viewer,
            preview_chars,
            query: String::new(),
            results: Vec::new(),
        }
    }

    /// Run a search. A blank query clears the results without a backend call.
    pub async fn search(&mut self, query: &str) -> Result<&[Document], ClientError> {
        self.query = query.trim().to_string();
        if self.query.is_empty() {
            self.results.clear();
            return Ok(&self.results);
        }

        self.results = self.repo.search_documents(self.viewer, &self.query).await?;
        debug!(query = %self.query, results = self.results.len(), "search results");
        Ok(&self.results)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Document] {
        &self.results
    }

    pub fn route(&self) -> Route {
        Route::Search {
            query: self.query.clone(),
        }
    }

    pub fn cards(&self, now: DateTime<Utc>) -> Vec<DocumentCard> {
        self.results
            .iter()
            .map(|doc| DocumentCard::new(doc, self.viewer, now, self.preview_chars))
            .collect()
    }
}
