//! # Autosave
//!
//! Debounced persistence for one open document.
//!
//! ```text
//!            edit                 quiet period               ok, no edits meanwhile
//!   Clean ─────────▶ Dirty ───────────────────▶ Saving ─────────────────────────▶ Clean
//!                    ▲  │ edit: restart timer      │
//!                    │  └──────┘                   │ failed, or edited meanwhile
//!                    └─────────────────────────────┘ (timer re-armed)
//! ```
//!
//! [`SaveTracker`] is the state machine on its own. [`AutosaveController`] runs
//! it in a tokio task that owns the debounce timer and the repository calls:
//!
//! - at most one save is in flight; edits arriving meanwhile are recorded and
//!   re-arm the timer once the save completes
//! - the first save of a new document creates the row and adopts its id, later
//!   saves update it by id
//! - every successful document write is followed by one version snapshot; a
//!   failed snapshot is logged and does not fail the save
//! - a failed save goes back to Dirty with the edits intact; retryable failures
//!   re-arm the timer, others wait for the next edit
//! - dropping or closing the controller cancels a pending timer but never an
//!   in-flight save

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::client::store::DocumentRepository;
use crate::shared::{DocumentPatch, DocumentTarget, NewDocument, NewVersion, Route, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Clean,
    Dirty,
    Saving,
}

/// What one save writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// `None` takes the create path
    pub document_id: Option<Uuid>,
    pub title: String,
    pub content: String,
}

/// Observable state of an autosave controller
#[derive(Debug, Clone, PartialEq)]
pub struct AutosaveSnapshot {
    pub status: SaveStatus,
    pub document_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<ClientError>,
}

impl AutosaveSnapshot {
    /// The editor route addressing this document
    pub fn route(&self) -> Route {
        Route::Editor(DocumentTarget::from(self.document_id))
    }

    /// Status line for the editor toolbar
    pub fn status_label(&self) -> Option<String> {
        match (self.status, &self.last_error, self.last_saved_at) {
            (SaveStatus::Saving, _, _) => Some("Saving...".to_string()),
            (SaveStatus::Dirty, Some(err), _) => Some(format!("Failed to save document: {err}")),
            (_, _, Some(at)) => Some(format!(
                "Saved {}",
                at.with_timezone(&Local).format("%H:%M:%S")
            )),
            (SaveStatus::Dirty, None, None) => Some("Unsaved changes".to_string()),
            (SaveStatus::Clean, _, None) => None,
        }
    }
}

/// The autosave state machine without any timers or I/O
#[derive(Debug, Clone)]
pub struct SaveTracker {
    status: SaveStatus,
    document_id: Option<Uuid>,
    title: String,
    content: String,
    edited_during_save: bool,
    last_saved_at: Option<DateTime<Utc>>,
    last_error: Option<ClientError>,
}

impl SaveTracker {
    /// A clean tracker for content as loaded (or the defaults of a new document)
    pub fn new(document_id: Option<Uuid>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Clean,
            document_id,
            title: title.into(),
            content: content.into(),
            edited_during_save: false,
            last_saved_at: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn document_id(&self) -> Option<Uuid> {
        self.document_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns whether the title actually changed
    pub fn set_title(&mut self, title: String) -> bool {
        if self.title == title {
            return false;
        }
        self.title = title;
        self.mark_edited();
        true
    }

    /// Returns whether the content actually changed
    pub fn set_content(&mut self, content: String) -> bool {
        if self.content == content {
            return false;
        }
        self.content = content;
        self.mark_edited();
        true
    }

    fn mark_edited(&mut self) {
        match self.status {
            SaveStatus::Clean | SaveStatus::Dirty => self.status = SaveStatus::Dirty,
            SaveStatus::Saving => self.edited_during_save = true,
        }
    }

    /// `Dirty → Saving`. Returns what to write, or `None` if nothing is due.
    pub fn begin_save(&mut self) -> Option<SaveRequest> {
        if self.status != SaveStatus::Dirty {
            return None;
        }
        self.status = SaveStatus::Saving;
        self.edited_during_save = false;
        Some(SaveRequest {
            document_id: self.document_id,
            title: self.title.clone(),
            content: self.content.clone(),
        })
    }

    /// Leave `Saving` with the outcome of the write; returns the new status
    pub fn finish_save(&mut self, outcome: Result<Uuid, ClientError>, at: DateTime<Utc>) -> SaveStatus {
        if self.status != SaveStatus::Saving {
            return self.status;
        }
        self.status = match outcome {
            Ok(id) => {
                self.document_id = Some(id);
                self.last_saved_at = Some(at);
                self.last_error = None;
                if self.edited_during_save {
                    SaveStatus::Dirty
                } else {
                    SaveStatus::Clean
                }
            }
            Err(err) => {
                self.last_error = Some(err);
                SaveStatus::Dirty
            }
        };
        self.edited_during_save = false;
        self.status
    }

    pub fn snapshot(&self) -> AutosaveSnapshot {
        AutosaveSnapshot {
            status: self.status,
            document_id: self.document_id,
            title: self.title.clone(),
            content: self.content.clone(),
            last_saved_at: self.last_saved_at,
            last_error: self.last_error.clone(),
        }
    }
}

enum Command {
    SetTitle(String),
    SetContent(String),
    Flush(oneshot::Sender<Result<(), ClientError>>),
    Close(oneshot::Sender<()>),
}

/// Handle to the autosave task of one document
pub struct AutosaveController {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<AutosaveSnapshot>,
    task: JoinHandle<()>,
}

impl AutosaveController {
    /// Start the autosave task. Must be called inside a tokio runtime.
    pub fn spawn(
        repo: Arc<dyn DocumentRepository>,
        author_id: Uuid,
        tracker: SaveTracker,
        delay: Duration,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(tracker.snapshot());

        let task = AutosaveTask {
            repo,
            author_id,
            delay,
            tracker,
            commands: receiver,
            snapshots: snapshot_tx,
            deadline: None,
            flush_waiters: Vec::new(),
            closing: None,
            disconnected: false,
        };
        let task = tokio::spawn(task.run());

        Self {
            commands,
            snapshots,
            task,
        }
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.send(Command::SetTitle(title.into()));
    }

    /// Replace the serialized content
    pub fn set_content(&self, content: impl Into<String>) {
        self.send(Command::SetContent(content.into()));
    }

    pub fn snapshot(&self) -> AutosaveSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveSnapshot> {
        self.snapshots.clone()
    }

    /// Save now if there are unsaved edits, waiting for the result
    pub async fn flush(&self) -> Result<(), ClientError> {
        let (reply, result) = oneshot::channel();
        self.send(Command::Flush(reply));
        result
            .await
            .unwrap_or_else(|_| Err(ClientError::store("autosave task stopped")))
    }

    /// Cancel any pending timer, let an in-flight save finish, then stop
    pub async fn close(self) -> AutosaveSnapshot {
        let (reply, done) = oneshot::channel();
        self.send(Command::Close(reply));
        let _ = done.await;
        if let Err(err) = self.task.await {
            warn!(error = %err, "autosave task ended abnormally");
        }
        self.snapshots.borrow().clone()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("autosave task already stopped");
        }
    }
}

struct AutosaveTask {
    repo: Arc<dyn DocumentRepository>,
    author_id: Uuid,
    delay: Duration,
    tracker: SaveTracker,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<AutosaveSnapshot>,
    deadline: Option<Instant>,
    flush_waiters: Vec<oneshot::Sender<Result<(), ClientError>>>,
    closing: Option<oneshot::Sender<()>>,
    disconnected: bool,
}

impl AutosaveTask {
    async fn run(mut self) {
        loop {
            if self.closing.is_some() || self.disconnected {
                break;
            }

            if !self.flush_waiters.is_empty() {
                let waiters = std::mem::take(&mut self.flush_waiters);
                let result = self.save_now().await;
                for waiter in waiters {
                    let _ = waiter.send(result.clone());
                }
                continue;
            }

            let command = match self.deadline {
                Some(deadline) => tokio::select! {
                    command = self.commands.recv() => command,
                    () = tokio::time::sleep_until(deadline) => {
                        self.deadline = None;
                        let _ = self.save_now().await;
                        continue;
                    }
                },
                None => self.commands.recv().await,
            };

            match command {
                Some(command) => self.apply(command),
                None => self.disconnected = true,
            }
        }

        if self.deadline.take().is_some() {
            debug!(document_id = ?self.tracker.document_id(), "pending autosave cancelled");
        }
        for waiter in self.flush_waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
        if let Some(reply) = self.closing.take() {
            let _ = reply.send(());
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetTitle(title) => {
                if self.tracker.set_title(title) {
                    self.on_edit();
                }
            }
            Command::SetContent(content) => {
                if self.tracker.set_content(content) {
                    self.on_edit();
                }
            }
            Command::Flush(reply) => self.flush_waiters.push(reply),
            Command::Close(reply) => self.closing = Some(reply),
        }
    }

    fn on_edit(&mut self) {
        // While saving, the timer is re-armed when the save completes
        if self.tracker.status() == SaveStatus::Dirty {
            self.deadline = Some(Instant::now() + self.delay);
        }
        self.publish();
    }

    async fn save_now(&mut self) -> Result<(), ClientError> {
        let Some(request) = self.tracker.begin_save() else {
            return Ok(());
        };
        self.deadline = None;
        self.publish();

        let save = persist(Arc::clone(&self.repo), self.author_id, request);
        tokio::pin!(save);

        let outcome = loop {
            tokio::select! {
                outcome = &mut save => break outcome,
                command = self.commands.recv(), if !self.disconnected => match command {
                    Some(command) => self.apply(command),
                    None => self.disconnected = true,
                },
            }
        };

        let result = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
        let status = self.tracker.finish_save(outcome, Utc::now());

        if status == SaveStatus::Dirty {
            let rearm = match &result {
                Ok(()) => true,
                Err(err) => err.is_retryable(),
            };
            if rearm {
                self.deadline = Some(Instant::now() + self.delay);
            }
        }
        if let Err(err) = &result {
            warn!(document_id = ?self.tracker.document_id(), error = %err, "error saving document");
        }

        self.publish();
        result
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.tracker.snapshot());
    }
}

/// Write the document (create or update) and then its version snapshot
async fn persist(
    repo: Arc<dyn DocumentRepository>,
    author_id: Uuid,
    request: SaveRequest,
) -> Result<Uuid, ClientError> {
    let SaveRequest {
        document_id,
        title,
        content,
    } = request;

    let document_id = match document_id {
        None => {
            let created = repo
                .create_document(&NewDocument {
                    title: title.clone(),
                    content: content.clone(),
                    author_id,
                    visibility: Visibility::Private,
                })
                .await?;
            info!(document_id = %created.id, "new document saved");
            created.id
        }
        Some(id) => {
            let patch = DocumentPatch::edit(title.clone(), content.clone(), Utc::now());
            repo.update_document(id, &patch).await?;
            debug!(document_id = %id, "document saved");
            id
        }
    };

    let version = NewVersion {
        document_id,
        user_id: author_id,
        title,
        content,
    };
    if let Err(err) = repo.append_version(&version).await {
        warn!(%document_id, error = %err, "error saving version");
    }

    Ok(document_id)
}
