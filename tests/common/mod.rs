//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - An in-memory backend with row-level rules and failure injection
//! - wiremock helpers for the HTTP clients
//! - Fixtures for editor sessions

#![allow(dead_code)]


use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use doccollab::client::{EditorOpen, EditorSession, EditorSettings};
use doccollab::shared::DocumentTarget;

// Re-export commonly used utilities
pub use memory::{MemoryBackend, Op};
pub use mock_server::*;

pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

pub fn settings() -> EditorSettings {
    EditorSettings {
        autosave_delay: AUTOSAVE_DELAY,
        roster_limit: 50,
        suggestion_limit: 10,
    }
}

/// A backend with one signed-in user acting on it
pub struct Fixture {
    pub backend: Arc<MemoryBackend>,
    pub me: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let me = backend.add_user("me", Some("Maria Example"));
        backend.act_as(me);
        Self { backend, me }
    }

    /// Open an editor and expect it to be ready
    pub async fn open(&self, target: DocumentTarget) -> Box<EditorSession> {
        match EditorSession::open(
            self.backend.clone(),
            self.backend.clone(),
            settings(),
            self.me,
            target,
        )
        .await
        {
            EditorOpen::Ready(editor) => editor,
            EditorOpen::Redirect { notice, .. } => panic!("editor redirected: {notice}"),
        }
    }
}

/// Let timers up to `ms` milliseconds from now fire (time is paused in these tests)
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
