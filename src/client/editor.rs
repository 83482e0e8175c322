//! Editor session
//!
//! One open document: its autosave task, its mention resolver and the content
//! tree being edited. Opening checks access first; a user who may not see the
//! document, or a document that fails to load, is sent back to the dashboard
//! with a notice.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::autosave::{AutosaveController, AutosaveSnapshot, SaveTracker};
use crate::client::config::Config;
use crate::client::error::ClientError;
use crate::client::mention::{
    MentionResolver, MentionSelection, PopupEvent, PopupKey, PopupOutcome, PopupState,
};
use crate::client::store::{DocumentRepository, UserDirectory};
use crate::shared::document::UNTITLED;
use crate::shared::{ContentNode, ContentStats, Document, DocumentTarget, Route, SharedError, Visibility};

pub const NO_ACCESS_NOTICE: &str = "You do not have permission to access this document";
pub const LOAD_FAILED_NOTICE: &str = "Failed to load document";

/// Tunables the editor takes from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorSettings {
    pub autosave_delay: Duration,
    pub roster_limit: usize,
    pub suggestion_limit: usize,
}

impl From<&Config> for EditorSettings {
    fn from(config: &Config) -> Self {
        Self {
            autosave_delay: config.autosave_delay(),
            roster_limit: config.roster_limit(),
            suggestion_limit: config.suggestion_limit(),
        }
    }
}

/// Result of opening an editor route
pub enum EditorOpen {
    Ready(Box<EditorSession>),
    Redirect { to: Route, notice: String },
}

impl EditorOpen {
    fn redirect(notice: &str) -> Self {
        Self::Redirect {
            to: Route::Dashboard,
            notice: notice.to_string(),
        }
    }
}

pub struct EditorSession {
    repo: Arc<dyn DocumentRepository>,
    user_id: Uuid,
    author_id: Uuid,
    visibility: Visibility,
    title: String,
    content: ContentNode,
    autosave: AutosaveController,
    mentions: MentionResolver,
    pending_mentions: Vec<JoinHandle<()>>,
}

impl EditorSession {
    /// Open `/editor/new` or `/editor/<id>` for `user_id`
    pub async fn open(
        repo: Arc<dyn DocumentRepository>,
        directory: Arc<dyn UserDirectory>,
        settings: EditorSettings,
        user_id: Uuid,
        target: DocumentTarget,
    ) -> EditorOpen {
        let loaded = match target {
            DocumentTarget::New => None,
            DocumentTarget::Existing(id) => match load_with_access(repo.as_ref(), id, user_id).await {
                Ok(Some(document)) => Some(document),
                Ok(None) => {
                    warn!(document_id = %id, %user_id, "access to document denied");
                    return EditorOpen::redirect(NO_ACCESS_NOTICE);
                }
                Err(err) => {
                    warn!(document_id = %id, error = %err, "error fetching document");
                    return EditorOpen::redirect(LOAD_FAILED_NOTICE);
                }
            },
        };

        let (tracker, content, author_id, visibility) = match loaded {
            Some(document) => {
                let content = ContentNode::parse(&document.content)
                    .unwrap_or_else(|_| ContentNode::from_plain_text(&document.content));
                let tracker = SaveTracker::new(Some(document.id), document.title, document.content);
                (tracker, content, document.author_id, document.visibility)
            }
            None => {
                let content = ContentNode::empty_document();
                let tracker = SaveTracker::new(None, UNTITLED, content.to_json_string());
                (tracker, content, user_id, Visibility::Private)
            }
        };

        let mut mentions = MentionResolver::new(
            directory,
            Arc::clone(&repo),
            user_id,
            tracker.document_id(),
            settings.roster_limit,
            settings.suggestion_limit,
        );
        if let Err(err) = mentions.load_roster().await {
            warn!(error = %err, "error fetching users for mentions");
        }

        info!(document_id = ?tracker.document_id(), %user_id, "editor opened");
        let title = tracker.title().to_string();
        let autosave =
            AutosaveController::spawn(Arc::clone(&repo), user_id, tracker, settings.autosave_delay);

        EditorOpen::Ready(Box::new(Self {
            repo,
            user_id,
            author_id,
            visibility,
            title,
            content,
            autosave,
            mentions,
            pending_mentions: Vec::new(),
        }))
    }

    pub fn document_id(&self) -> Option<Uuid> {
        self.autosave.snapshot().document_id
    }

    /// `/editor/new` until the first save, `/editor/<id>` after
    pub fn route(&self) -> Route {
        self.autosave.snapshot().route()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &ContentNode {
        &self.content
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_author(&self) -> bool {
        self.author_id == self.user_id
    }

    pub fn snapshot(&self) -> AutosaveSnapshot {
        self.autosave.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveSnapshot> {
        self.autosave.subscribe()
    }

    pub fn status_label(&self) -> Option<String> {
        self.autosave.snapshot().status_label()
    }

    /// Character and word counts of the plain text
    pub fn stats(&self) -> ContentStats {
        ContentStats::of(&self.content.plain_text())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.autosave.set_title(self.title.clone());
    }

    pub fn set_content(&mut self, content: ContentNode) {
        self.autosave.set_content(content.to_json_string());
        self.content = content;
    }

    pub fn popup(&self) -> &PopupState {
        self.mentions.popup()
    }

    /// Feed the mention popup. A committed selection is inserted right away.
    ///
    /// Enter on a range the content cannot take fails and leaves the popup open.
    pub fn mention_event(&mut self, event: PopupEvent) -> Result<PopupOutcome, ClientError> {
        if event == PopupEvent::Key(PopupKey::Enter) && self.mentions.popup().selected().is_some() {
            self.check_mention_range()?;
        }
        let outcome = self.mentions.handle(event);
        if let PopupOutcome::Commit(selection) = &outcome {
            self.insert_mention(selection)?;
        }
        Ok(outcome)
    }

    /// Pointer selection of the candidate at `index`
    pub fn pick_mention(&mut self, index: usize) -> Result<Option<MentionSelection>, ClientError> {
        if matches!(self.mentions.popup(), PopupState::Open { candidates, .. } if index < candidates.len()) {
            self.check_mention_range()?;
        }
        let Some(selection) = self.mentions.pick(index) else {
            return Ok(None);
        };
        self.insert_mention(&selection)?;
        Ok(Some(selection))
    }

    fn check_mention_range(&self) -> Result<(), ClientError> {
        if let PopupState::Open { range, .. } = self.mentions.popup() {
            if !self.content.accepts_mention_at(range) {
                return Err(SharedError::content(format!(
                    "mention range {}..{} does not fall inside one block of text",
                    range.start, range.end
                ))
                .into());
            }
        }
        Ok(())
    }

    fn insert_mention(&mut self, selection: &MentionSelection) -> Result<(), ClientError> {
        self.mentions.set_document_id(self.document_id());
        let mut content = self.content.clone();
        if let Some(task) = self.mentions.commit(selection, &mut content)? {
            self.pending_mentions.retain(|task| !task.is_finished());
            self.pending_mentions.push(task);
        }
        self.set_content(content);
        Ok(())
    }

    /// Flip between private and public. Author only, and only once saved.
    pub async fn toggle_visibility(&mut self) -> Result<Visibility, ClientError> {
        if !self.is_author() {
            return Err(ClientError::permission(
                "only the author can change a document's visibility",
            ));
        }
        let id = self.document_id().ok_or_else(|| {
            SharedError::validation("visibility", "save the document before sharing it")
        })?;

        let next = self.visibility.toggled();
        self.repo.set_visibility(id, next).await?;
        self.visibility = next;
        info!(document_id = %id, visibility = %next, "document visibility changed");
        Ok(next)
    }

    /// Save pending edits now
    pub async fn flush(&mut self) -> Result<(), ClientError> {
        let result = self.autosave.flush().await;
        self.settle_mentions().await;
        result
    }

    /// Leave the editor. A pending save timer is dropped; a save already in
    /// flight completes.
    pub async fn close(mut self) -> AutosaveSnapshot {
        self.settle_mentions().await;
        let snapshot = self.autosave.close().await;
        debug!(document_id = ?snapshot.document_id, "editor closed");
        snapshot
    }

    async fn settle_mentions(&mut self) {
        for result in join_all(self.pending_mentions.drain(..)).await {
            if let Err(err) = result {
                warn!(error = %err, "mention task ended abnormally");
            }
        }
    }
}

/// The document if `user_id` may open it: author, public, or shared with them
async fn load_with_access(
    repo: &dyn DocumentRepository,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Document>, ClientError> {
    let document = repo.get_document(id).await?;
    if document.is_owned_by(user_id) || document.visibility == Visibility::Public {
        return Ok(Some(document));
    }
    if repo.has_share(id, user_id).await? {
        return Ok(Some(document));
    }
    Ok(None)
}
