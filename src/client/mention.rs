//! Mention Resolver
//!
//! Typing `@` in the editor opens a suggestion popup over a roster of users
//! fetched once per editing session. Picking a candidate replaces the typed
//! `@query` with an inline mention node and records a mention row for the
//! mentioned user. Recording is fire-and-forget: a failure is logged and never
//! undoes the insertion.

use std::ops::Range;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::client::store::{DocumentRepository, UserDirectory};
use crate::shared::{ContentNode, MentionCandidate, NewMention};

/// Cached candidates for one editing session
#[derive(Debug, Clone, Default)]
pub struct MentionRoster {
    candidates: Vec<MentionCandidate>,
    cap: usize,
}

impl MentionRoster {
    /// `cap` bounds the number of suggestions returned by [`filter`](Self::filter)
    pub fn new(candidates: Vec<MentionCandidate>, cap: usize) -> Self {
        Self { candidates, cap }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates whose username or full name contains `query`, ignoring case.
    /// Roster order is kept; there is no ranking.
    pub fn filter(&self, query: &str) -> Vec<MentionCandidate> {
        let needle = query.to_lowercase();
        self.candidates
            .iter()
            .filter(|candidate| candidate.matches(&needle))
            .take(self.cap)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKey {
    Up,
    Down,
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    /// The text after `@` changed; `range` covers `@query` in plain-text chars
    QueryChanged { query: String, range: Range<usize> },
    Key(PopupKey),
    Blur,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PopupState {
    #[default]
    Closed,
    Open {
        query: String,
        range: Range<usize>,
        candidates: Vec<MentionCandidate>,
        selected: usize,
    },
}

impl PopupState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn selected(&self) -> Option<&MentionCandidate> {
        match self {
            Self::Open {
                candidates,
                selected,
                ..
            } => candidates.get(*selected),
            Self::Closed => None,
        }
    }
}

/// A candidate picked for the text at `range`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionSelection {
    pub candidate: MentionCandidate,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOutcome {
    /// Not handled; the editor should process the key itself
    Ignored,
    Consumed,
    Commit(MentionSelection),
}

/// The suggestion popup, independent of any rendering
#[derive(Debug, Clone, Default)]
pub struct MentionPopup {
    state: PopupState,
}

impl MentionPopup {
    pub fn state(&self) -> &PopupState {
        &self.state
    }

    pub fn handle(&mut self, event: PopupEvent, roster: &MentionRoster) -> PopupOutcome {
        match event {
            PopupEvent::QueryChanged { query, range } => {
                let candidates = roster.filter(&query);
                self.state = PopupState::Open {
                    query,
                    range,
                    candidates,
                    selected: 0,
                };
                PopupOutcome::Consumed
            }
            PopupEvent::Blur => {
                self.state = PopupState::Closed;
                PopupOutcome::Ignored
            }
            PopupEvent::Key(key) => self.on_key(key),
        }
    }

    fn on_key(&mut self, key: PopupKey) -> PopupOutcome {
        let PopupState::Open {
            candidates,
            selected,
            ..
        } = &mut self.state
        else {
            return PopupOutcome::Ignored;
        };

        match key {
            PopupKey::Up => {
                if !candidates.is_empty() {
                    *selected = (*selected + candidates.len() - 1) % candidates.len();
                }
                PopupOutcome::Consumed
            }
            PopupKey::Down => {
                if !candidates.is_empty() {
                    *selected = (*selected + 1) % candidates.len();
                }
                PopupOutcome::Consumed
            }
            PopupKey::Enter => match self.select(None) {
                Some(selection) => PopupOutcome::Commit(selection),
                None => PopupOutcome::Consumed,
            },
            PopupKey::Escape => {
                self.state = PopupState::Closed;
                PopupOutcome::Consumed
            }
            PopupKey::Other => PopupOutcome::Ignored,
        }
    }

    /// Pick the candidate at `index` (pointer) or the highlighted one, closing
    /// the popup. `None` if there is nothing to pick.
    pub fn select(&mut self, index: Option<usize>) -> Option<MentionSelection> {
        let PopupState::Open {
            candidates,
            selected,
            range,
            ..
        } = &self.state
        else {
            return None;
        };
        let candidate = candidates.get(index.unwrap_or(*selected))?.clone();
        let range = range.clone();
        self.state = PopupState::Closed;
        Some(MentionSelection { candidate, range })
    }
}

/// Roster, popup and mention persistence for one editing session
pub struct MentionResolver {
    directory: Arc<dyn UserDirectory>,
    repo: Arc<dyn DocumentRepository>,
    current_user: Uuid,
    document_id: Option<Uuid>,
    roster_limit: usize,
    roster: MentionRoster,
    popup: MentionPopup,
}

impl MentionResolver {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        repo: Arc<dyn DocumentRepository>,
        current_user: Uuid,
        document_id: Option<Uuid>,
        roster_limit: usize,
        suggestion_limit: usize,
    ) -> Self {
        Self {
            directory,
            repo,
            current_user,
            document_id,
            roster_limit,
            roster: MentionRoster::new(Vec::new(), suggestion_limit),
            popup: MentionPopup::default(),
        }
    }

    /// Fetch the roster. Called once when the editor opens.
    pub async fn load_roster(&mut self) -> Result<usize, ClientError> {
        let candidates = self
            .directory
            .list_mention_candidates(self.roster_limit)
            .await?;
        debug!(count = candidates.len(), "mention roster loaded");
        self.roster = MentionRoster::new(candidates, self.roster.cap);
        Ok(self.roster.len())
    }

    pub fn roster(&self) -> &MentionRoster {
        &self.roster
    }

    pub fn popup(&self) -> &PopupState {
        self.popup.state()
    }

    pub fn document_id(&self) -> Option<Uuid> {
        self.document_id
    }

    /// Follow the id the document gets on its first save
    pub fn set_document_id(&mut self, id: Option<Uuid>) {
        self.document_id = id;
    }

    pub fn handle(&mut self, event: PopupEvent) -> PopupOutcome {
        self.popup.handle(event, &self.roster)
    }

    /// Pointer selection of the candidate at `index`
    pub fn pick(&mut self, index: usize) -> Option<MentionSelection> {
        self.popup.select(Some(index))
    }

    /// Insert the mention into `content` and record it in the background.
    ///
    /// Returns the recording task, or `None` when the document has no id yet
    /// and recording is skipped.
    pub fn commit(
        &self,
        selection: &MentionSelection,
        content: &mut ContentNode,
    ) -> Result<Option<JoinHandle<()>>, ClientError> {
        let candidate = &selection.candidate;
        content.insert_mention(
            selection.range.clone(),
            candidate.id.to_string(),
            candidate.username.clone(),
        )?;

        let Some(document_id) = self.document_id else {
            debug!(mentioned_user_id = %candidate.id, "document not saved yet, mention not recorded");
            return Ok(None);
        };

        let mention = NewMention {
            document_id,
            mentioned_user_id: candidate.id,
            mentioning_user_id: self.current_user,
        };
        let repo = Arc::clone(&self.repo);
        Ok(Some(tokio::spawn(async move {
            match repo.create_mention(&mention).await {
                Ok(()) => info!(
                    %document_id,
                    mentioned_user_id = %mention.mentioned_user_id,
                    "mention recorded"
                ),
                Err(err) => warn!(%document_id, error = %err, "error creating mention"),
            }
        })))
    }
}
