//! Dashboard listing, optimistic delete and duplicate; search results

use assert_matches::assert_matches;
use chrono::Utc;
use pretty_assertions::assert_eq;

use doccollab::client::{ClientError, Dashboard, OwnershipFilter, SearchResults};
use doccollab::shared::{ContentNode, Visibility};

use crate::common::{Fixture, Op};

fn body(text: &str) -> String {
    ContentNode::from_plain_text(text).to_json_string()
}

struct Library {
    fixture: Fixture,
    mine: uuid::Uuid,
    shared: uuid::Uuid,
    newest: uuid::Uuid,
}

/// Two documents of mine and one shared with me, plus a stranger's private one
fn library() -> Library {
    let fixture = Fixture::new();
    let bob = fixture.backend.add_user("bob", Some("Bob Builder"));
    let carol = fixture.backend.add_user("carol", None);

    let mine = fixture
        .backend
        .seed_document(fixture.me, "Roadmap", &body("quarterly goals"), Visibility::Private);
    let shared = fixture
        .backend
        .seed_document(bob, "Bob's plan", &body("shared budget"), Visibility::Private);
    fixture.backend.seed_share(shared, fixture.me, false);
    fixture
        .backend
        .seed_document(carol, "Carol's secret", &body("budget"), Visibility::Private);
    let newest = fixture
        .backend
        .seed_document(fixture.me, "Meeting notes", &body("budget review"), Visibility::Public);

    Library {
        fixture,
        mine,
        shared,
        newest,
    }
}

#[tokio::test]
async fn test_lists_owned_and_shared_newest_first() {
    let lib = library();
    let mut dashboard = Dashboard::new(lib.fixture.backend.clone(), lib.fixture.me, 150);
    dashboard.refresh().await.unwrap();

    let ids = dashboard.documents().iter().map(|d| d.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![lib.newest, lib.shared, lib.mine]);

    let cards = dashboard.cards(Utc::now());
    assert_eq!(cards[1].author_name, "Bob Builder");
    assert!(!cards[1].can_delete);
    assert!(cards[0].can_delete);
    assert_eq!(cards[2].preview, "quarterly goals");
}

#[tokio::test]
async fn test_local_filters() {
    let lib = library();
    let mut dashboard = Dashboard::new(lib.fixture.backend.clone(), lib.fixture.me, 150);
    dashboard.refresh().await.unwrap();

    dashboard.set_filter(OwnershipFilter::Mine);
    let titles = dashboard.visible().iter().map(|d| d.title.clone()).collect::<Vec<_>>();
    assert_eq!(titles, vec!["Meeting notes", "Roadmap"]);

    dashboard.set_filter(OwnershipFilter::Shared);
    assert_eq!(dashboard.visible().len(), 1);
    assert_eq!(dashboard.visible()[0].id, lib.shared);

    dashboard.set_filter(OwnershipFilter::All);
    dashboard.set_search("BUDGET");
    assert_eq!(dashboard.visible().len(), 2);

    // Filtering is local
    assert_eq!(lib.fixture.backend.calls(Op::List), 1);
}

#[tokio::test]
async fn test_non_owner_delete_is_refused_and_list_unchanged() {
    let lib = library();
    let mut dashboard = Dashboard::new(lib.fixture.backend.clone(), lib.fixture.me, 150);
    dashboard.refresh().await.unwrap();
    let before = dashboard.documents().to_vec();

    let result = dashboard.delete(lib.shared).await;

    assert_matches!(result, Err(ClientError::PermissionError { .. }));
    assert_eq!(dashboard.documents(), before.as_slice());
    assert!(lib.fixture.backend.document(lib.shared).is_some());
}

#[tokio::test]
async fn test_failed_delete_restores_position() {
    let lib = library();
    let mut dashboard = Dashboard::new(lib.fixture.backend.clone(), lib.fixture.me, 150);
    dashboard.refresh().await.unwrap();
    let before = dashboard.documents().to_vec();
    lib.fixture
        .backend
        .fail(Op::Delete, ClientError::store("connection refused"));

    let result = dashboard.delete(lib.shared).await;
    assert_matches!(result, Err(ClientError::StoreError { .. }));
    assert_eq!(dashboard.documents(), before.as_slice());
}

#[tokio::test]
async fn test_owner_delete_removes_card() {
    let lib = library();
    let mut dashboard = Dashboard::new(lib.fixture.backend.clone(), lib.fixture.me, 150);
    dashboard.refresh().await.unwrap();

    dashboard.delete(lib.mine).await.unwrap();
    assert_eq!(dashboard.documents().len(), 2);
    assert!(lib.fixture.backend.document(lib.mine).is_none());

    assert_matches!(
        dashboard.delete(lib.mine).await,
        Err(ClientError::NotFoundError { .. })
    );
}

#[tokio::test]
async fn test_duplicate_creates_private_copy() {
    let lib = library();
    let mut dashboard = Dashboard::new(lib.fixture.backend.clone(), lib.fixture.me, 150);
    dashboard.refresh().await.unwrap();

    let copy = dashboard.duplicate(lib.shared).await.unwrap();

    assert_eq!(copy.title, "Bob's plan (Copy)");
    assert_eq!(copy.author_id, lib.fixture.me);
    assert_eq!(copy.visibility, Visibility::Private);
    assert_eq!(copy.content, body("shared budget"));
    assert_eq!(dashboard.documents()[0].id, copy.id);
    assert_eq!(lib.fixture.backend.calls(Op::List), 2);
}

#[tokio::test]
async fn test_search_is_restricted_to_accessible_documents() {
    let lib = library();
    let mut results = SearchResults::new(lib.fixture.backend.clone(), lib.fixture.me, 150);

    let found = results.search("budget").await.unwrap();
    let ids = found.iter().map(|d| d.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![lib.newest, lib.shared]);
    assert_eq!(results.route().to_string(), "/search?q=budget");
}

#[tokio::test]
async fn test_empty_search_skips_backend() {
    let lib = library();
    let mut results = SearchResults::new(lib.fixture.backend.clone(), lib.fixture.me, 150);

    assert!(results.search("   ").await.unwrap().is_empty());
    assert_eq!(lib.fixture.backend.calls(Op::Search), 0);
}
