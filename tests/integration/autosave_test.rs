//! Autosave timing and failure handling
//!
//! Time is paused, so sleeping advances the clock as soon as every task is idle.

use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use doccollab::client::{AutosaveController, ClientError, SaveStatus, SaveTracker};
use doccollab::shared::{ContentNode, DocumentTarget, Route, Visibility};

use crate::common::{advance, Fixture, Op, AUTOSAVE_DELAY};

fn existing(fixture: &Fixture) -> (uuid::Uuid, AutosaveController) {
    let id = fixture
        .backend
        .seed_document(fixture.me, "Draft", "{}", Visibility::Private);
    let controller = AutosaveController::spawn(
        fixture.backend.clone(),
        fixture.me,
        SaveTracker::new(Some(id), "Draft", "{}"),
        AUTOSAVE_DELAY,
    );
    (id, controller)
}

#[tokio::test(start_paused = true)]
async fn test_edits_within_window_coalesce_into_one_save() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);

    for (i, title) in ["D", "Dr", "Dra", "Draf", "Draft 2"].iter().enumerate() {
        autosave.set_title(*title);
        if i < 4 {
            advance(500).await;
        }
    }

    advance(1900).await;
    assert_eq!(fixture.backend.calls(Op::Update), 0);
    assert_eq!(autosave.snapshot().status, SaveStatus::Dirty);

    advance(200).await;
    assert_eq!(fixture.backend.calls(Op::Update), 1);
    assert_eq!(autosave.snapshot().status, SaveStatus::Clean);
    assert_eq!(fixture.backend.document(id).unwrap().title, "Draft 2");

    advance(10_000).await;
    assert_eq!(fixture.backend.calls(Op::Update), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_save_appends_matching_version() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);

    autosave.set_content("first");
    advance(2100).await;
    autosave.set_content("second");
    autosave.set_title("Renamed");
    advance(2100).await;

    let versions = fixture.backend.versions(id);
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].content, "first");
    assert_eq!(versions[0].title, "Draft");
    assert_eq!(versions[1].content, "second");
    assert_eq!(versions[1].title, "Renamed");
    assert!(versions.iter().all(|v| v.user_id == fixture.me));

    let document = fixture.backend.document(id).unwrap();
    assert_eq!(document.content, versions[1].content);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_stays_dirty_and_retries() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);
    fixture.backend.fail(Op::Update, ClientError::store("connection reset"));

    autosave.set_title("Latest title");
    autosave.set_content("latest body");
    advance(2100).await;

    let snapshot = autosave.snapshot();
    assert_eq!(snapshot.status, SaveStatus::Dirty);
    assert_eq!(snapshot.title, "Latest title");
    assert_eq!(snapshot.content, "latest body");
    assert_matches!(snapshot.last_error, Some(ClientError::StoreError { .. }));
    assert!(fixture.backend.versions(id).is_empty());

    fixture.backend.recover(Op::Update);
    advance(2100).await;

    let snapshot = autosave.snapshot();
    assert_eq!(snapshot.status, SaveStatus::Clean);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(fixture.backend.calls(Op::Update), 2);
    assert_eq!(fixture.backend.document(id).unwrap().content, "latest body");
}

#[tokio::test(start_paused = true)]
async fn test_permission_failure_waits_for_next_edit() {
    let fixture = Fixture::new();
    let owner = fixture.backend.add_user("owner", None);
    let id = fixture
        .backend
        .seed_document(owner, "Theirs", "{}", Visibility::Public);
    let autosave = AutosaveController::spawn(
        fixture.backend.clone(),
        fixture.me,
        SaveTracker::new(Some(id), "Theirs", "{}"),
        AUTOSAVE_DELAY,
    );

    autosave.set_title("Mine now");
    advance(10_000).await;

    assert_eq!(fixture.backend.calls(Op::Update), 1);
    let snapshot = autosave.snapshot();
    assert_eq!(snapshot.status, SaveStatus::Dirty);
    assert_matches!(snapshot.last_error, Some(ClientError::PermissionError { .. }));
    assert_eq!(fixture.backend.document(id).unwrap().title, "Theirs");
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_save_rearms_timer() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);
    fixture.backend.set_latency(Op::Update, Duration::from_secs(1));

    autosave.set_title("A");
    advance(2100).await;
    assert_eq!(autosave.snapshot().status, SaveStatus::Saving);

    autosave.set_title("AB");
    assert_eq!(fixture.backend.calls(Op::Update), 1);

    // The first save completes at 3.0s and does not start a second one straight away
    advance(1400).await;
    assert_eq!(fixture.backend.calls(Op::Update), 1);
    assert_eq!(autosave.snapshot().status, SaveStatus::Dirty);
    assert_eq!(fixture.backend.document(id).unwrap().title, "A");

    advance(3000).await;
    assert_eq!(fixture.backend.calls(Op::Update), 2);
    assert_eq!(autosave.snapshot().status, SaveStatus::Clean);
    assert_eq!(fixture.backend.document(id).unwrap().title, "AB");
    assert_eq!(fixture.backend.versions(id).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_version_failure_does_not_fail_save() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);
    fixture
        .backend
        .fail(Op::AppendVersion, ClientError::store("versions table unavailable"));

    autosave.set_content("kept");
    advance(2100).await;

    let snapshot = autosave.snapshot();
    assert_eq!(snapshot.status, SaveStatus::Clean);
    assert_eq!(snapshot.last_error, None);
    assert!(snapshot.last_saved_at.is_some());
    assert_eq!(fixture.backend.document(id).unwrap().content, "kept");
    assert!(fixture.backend.versions(id).is_empty());

    advance(10_000).await;
    assert_eq!(fixture.backend.calls(Op::AppendVersion), 1);
}

#[tokio::test(start_paused = true)]
async fn test_flush_saves_immediately() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);

    autosave.set_content("now");
    autosave.flush().await.unwrap();
    assert_eq!(fixture.backend.calls(Op::Update), 1);
    assert_eq!(fixture.backend.document(id).unwrap().content, "now");

    advance(5000).await;
    assert_eq!(fixture.backend.calls(Op::Update), 1);

    // Nothing to do when clean
    autosave.flush().await.unwrap();
    assert_eq!(fixture.backend.calls(Op::Update), 1);
}

#[tokio::test(start_paused = true)]
async fn test_flush_reports_failure() {
    let fixture = Fixture::new();
    let (_, autosave) = existing(&fixture);
    fixture.backend.fail(Op::Update, ClientError::store("offline"));

    autosave.set_content("pending");
    assert_eq!(autosave.flush().await, Err(ClientError::store("offline")));
    assert_eq!(autosave.snapshot().status, SaveStatus::Dirty);
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_timer() {
    let fixture = Fixture::new();
    let (_, autosave) = existing(&fixture);

    autosave.set_title("never saved");
    advance(500).await;
    let snapshot = autosave.close().await;

    assert_eq!(snapshot.status, SaveStatus::Dirty);
    advance(5000).await;
    assert_eq!(fixture.backend.calls(Op::Update), 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_waits_for_inflight_save() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);
    fixture.backend.set_latency(Op::Update, Duration::from_secs(1));

    autosave.set_title("in flight");
    advance(2100).await;
    assert_eq!(autosave.snapshot().status, SaveStatus::Saving);

    let snapshot = autosave.close().await;
    assert_eq!(snapshot.status, SaveStatus::Clean);
    assert_eq!(fixture.backend.document(id).unwrap().title, "in flight");
    assert_eq!(fixture.backend.versions(id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_controller_still_finishes_inflight_save() {
    let fixture = Fixture::new();
    let (id, autosave) = existing(&fixture);
    fixture.backend.set_latency(Op::Update, Duration::from_secs(1));

    autosave.set_title("fire and forget");
    advance(2100).await;
    drop(autosave);

    advance(2000).await;
    assert_eq!(fixture.backend.document(id).unwrap().title, "fire and forget");
}

#[tokio::test(start_paused = true)]
async fn test_new_document_is_created_then_updated() {
    let fixture = Fixture::new();
    let mut editor = fixture.open(DocumentTarget::New).await;
    assert_eq!(editor.route(), Route::Editor(DocumentTarget::New));

    editor.set_title("Notes");
    editor.set_content(ContentNode::from_plain_text("Buy milk"));
    advance(2100).await;

    let id = editor.document_id().expect("id adopted after first save");
    assert_eq!(editor.route(), Route::editor(id));

    let document = fixture.backend.document(id).unwrap();
    assert_eq!(document.title, "Notes");
    assert_eq!(document.visibility, Visibility::Private);
    assert_eq!(document.author_id, fixture.me);

    let versions = fixture.backend.versions(id);
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].title, "Notes");
    assert_eq!(versions[0].content, document.content);

    editor.set_title("Notes v2");
    advance(2100).await;
    assert_eq!(fixture.backend.calls(Op::Create), 1);
    assert_eq!(fixture.backend.calls(Op::Update), 1);
    assert_eq!(fixture.backend.documents().len(), 1);
    assert_eq!(editor.status_label().map(|l| l.starts_with("Saved ")), Some(true));

}
