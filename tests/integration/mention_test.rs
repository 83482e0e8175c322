//! Mention popup and persistence through an editor session

use pretty_assertions::assert_eq;

use doccollab::client::{ClientError, PopupEvent, PopupKey, PopupOutcome, PopupState};
use doccollab::shared::{ContentNode, DocumentTarget, NewMention, Visibility};

use crate::common::{Fixture, Op};

/// A saved document whose only paragraph reads "Hi @al"
fn seed_greeting(fixture: &Fixture) -> uuid::Uuid {
    let content = ContentNode::from_plain_text("Hi @al").to_json_string();
    fixture
        .backend
        .seed_document(fixture.me, "Greeting", &content, Visibility::Private)
}

fn query_al() -> PopupEvent {
    PopupEvent::QueryChanged {
        query: "al".into(),
        range: 3..6,
    }
}

fn usernames(state: &PopupState) -> Vec<String> {
    match state {
        PopupState::Open { candidates, .. } => {
            candidates.iter().map(|c| c.username.clone()).collect()
        }
        PopupState::Closed => Vec::new(),
    }
}

#[tokio::test]
async fn test_keyboard_selection_inserts_and_persists_mention() {
    let fixture = Fixture::new();
    fixture.backend.add_user("alice", Some("Alice Liddell"));
    let albert = fixture.backend.add_user("albert", None);
    fixture.backend.add_user("ben", None);
    let id = seed_greeting(&fixture);

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;

    assert_eq!(editor.mention_event(query_al()).unwrap(), PopupOutcome::Consumed);
    assert_eq!(usernames(editor.popup()), vec!["alice", "albert"]);

    editor.mention_event(PopupEvent::Key(PopupKey::Down)).unwrap();
    let outcome = editor.mention_event(PopupEvent::Key(PopupKey::Enter)).unwrap();
    let PopupOutcome::Commit(selection) = outcome else {
        panic!("expected a committed selection, got {outcome:?}");
    };
    assert_eq!(selection.candidate.id, albert);
    assert!(!editor.popup().is_open());

    let albert_id = albert.to_string();
    assert_eq!(editor.content().mentions(), vec![(albert_id.as_str(), "albert")]);
    assert_eq!(editor.content().plain_text(), "Hi  ");

    editor.flush().await.unwrap();
    assert_eq!(
        fixture.backend.mentions(),
        vec![NewMention {
            document_id: id,
            mentioned_user_id: albert,
            mentioning_user_id: fixture.me,
        }]
    );
    let saved = ContentNode::parse(&fixture.backend.document(id).unwrap().content).unwrap();
    assert_eq!(saved.mentions().len(), 1);
}

#[tokio::test]
async fn test_pointer_selection() {
    let fixture = Fixture::new();
    fixture.backend.add_user("alice", None);
    let albert = fixture.backend.add_user("albert", None);
    let id = seed_greeting(&fixture);

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;
    editor.mention_event(query_al()).unwrap();

    let selection = editor.pick_mention(1).unwrap().unwrap();
    assert_eq!(selection.candidate.id, albert);
    assert!(editor.pick_mention(0).unwrap().is_none());

    editor.flush().await.unwrap();
    assert_eq!(fixture.backend.mentions().len(), 1);
}

#[tokio::test]
async fn test_escape_dismisses_without_inserting() {
    let fixture = Fixture::new();
    fixture.backend.add_user("alice", None);
    let id = seed_greeting(&fixture);

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;
    let before = editor.content().clone();

    editor.mention_event(query_al()).unwrap();
    assert_eq!(
        editor.mention_event(PopupEvent::Key(PopupKey::Escape)).unwrap(),
        PopupOutcome::Consumed
    );
    assert_eq!(editor.content(), &before);
    assert!(fixture.backend.mentions().is_empty());
}

#[tokio::test]
async fn test_unsaved_document_skips_persistence() {
    let fixture = Fixture::new();
    fixture.backend.add_user("alice", None);

    let mut editor = fixture.open(DocumentTarget::New).await;
    editor.set_content(ContentNode::from_plain_text("@al"));
    editor
        .mention_event(PopupEvent::QueryChanged {
            query: "al".into(),
            range: 0..3,
        })
        .unwrap();
    let outcome = editor.mention_event(PopupEvent::Key(PopupKey::Enter)).unwrap();
    assert!(matches!(outcome, PopupOutcome::Commit(_)));

    assert_eq!(editor.content().mentions().len(), 1);
    assert_eq!(fixture.backend.calls(Op::CreateMention), 0);
    editor.close().await;
    assert!(fixture.backend.mentions().is_empty());
}

#[tokio::test]
async fn test_persist_failure_keeps_insertion() {
    let fixture = Fixture::new();
    fixture.backend.add_user("alice", None);
    let id = seed_greeting(&fixture);
    fixture
        .backend
        .fail(Op::CreateMention, ClientError::store("mentions unavailable"));

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;
    editor.mention_event(query_al()).unwrap();
    editor.mention_event(PopupEvent::Key(PopupKey::Enter)).unwrap();

    editor.flush().await.unwrap();
    assert_eq!(fixture.backend.calls(Op::CreateMention), 1);
    assert!(fixture.backend.mentions().is_empty());
    assert_eq!(editor.content().mentions().len(), 1);

    let saved = ContentNode::parse(&fixture.backend.document(id).unwrap().content).unwrap();
    assert_eq!(saved.mentions().len(), 1);
}

#[tokio::test]
async fn test_roster_failure_leaves_popup_empty() {
    let fixture = Fixture::new();
    fixture.backend.add_user("alice", None);
    fixture.backend.fail(Op::Roster, ClientError::store("timeout"));
    let id = seed_greeting(&fixture);

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;
    editor.mention_event(query_al()).unwrap();
    assert!(editor.popup().is_open());
    assert!(usernames(editor.popup()).is_empty());
    assert_eq!(
        editor.mention_event(PopupEvent::Key(PopupKey::Enter)).unwrap(),
        PopupOutcome::Consumed
    );
}

#[tokio::test]
async fn test_query_split_across_marks_is_replaced() {
    let fixture = Fixture::new();
    let albert = fixture.backend.add_user("albert", None);
    // "Hi @" plain, then "al" in bold
    let content = ContentNode::container(
        "doc",
        vec![ContentNode::container(
            "paragraph",
            vec![
                ContentNode::text("Hi @"),
                ContentNode::Text {
                    text: "al".into(),
                    marks: vec![serde_json::json!({ "type": "bold" })],
                },
            ],
        )],
    );
    let id = fixture.backend.seed_document(
        fixture.me,
        "Greeting",
        &content.to_json_string(),
        Visibility::Private,
    );

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;
    editor.mention_event(query_al()).unwrap();
    let outcome = editor.mention_event(PopupEvent::Key(PopupKey::Enter)).unwrap();

    assert!(matches!(outcome, PopupOutcome::Commit(_)));
    assert_eq!(editor.content().plain_text(), "Hi  ");
    let albert_id = albert.to_string();
    assert_eq!(editor.content().mentions(), vec![(albert_id.as_str(), "albert")]);

    editor.flush().await.unwrap();
    assert_eq!(fixture.backend.mentions().len(), 1);
}

#[tokio::test]
async fn test_range_outside_one_block_keeps_popup_open() {
    let fixture = Fixture::new();
    fixture.backend.add_user("alice", None);
    let content = ContentNode::from_plain_text("Hi @a\nl").to_json_string();
    let id = fixture
        .backend
        .seed_document(fixture.me, "Split", &content, Visibility::Private);

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;
    editor.mention_event(query_al()).unwrap();

    assert!(matches!(
        editor.mention_event(PopupEvent::Key(PopupKey::Enter)),
        Err(ClientError::Shared(_))
    ));
    assert!(editor.popup().is_open());
    assert!(editor.popup().selected().is_some());
    assert!(matches!(editor.pick_mention(0), Err(ClientError::Shared(_))));
    assert!(editor.popup().is_open());
    assert!(editor.content().mentions().is_empty());

    editor.flush().await.unwrap();
    assert_eq!(fixture.backend.calls(Op::CreateMention), 0);
}

#[tokio::test]
async fn test_mentions_across_flushes_all_persist() {
    let fixture = Fixture::new();
    let albert = fixture.backend.add_user("albert", None);
    let ben = fixture.backend.add_user("ben", None);
    let id = seed_greeting(&fixture);

    let mut editor = fixture.open(DocumentTarget::Existing(id)).await;
    editor.mention_event(query_al()).unwrap();
    editor.pick_mention(0).unwrap();
    editor.flush().await.unwrap();

    editor.set_content(ContentNode::from_plain_text("Hi @ben"));
    editor
        .mention_event(PopupEvent::QueryChanged {
            query: "ben".into(),
            range: 3..7,
        })
        .unwrap();
    editor.pick_mention(0).unwrap();
    editor.flush().await.unwrap();

    let mentioned = fixture
        .backend
        .mentions()
        .iter()
        .map(|m| m.mentioned_user_id)
        .collect::<Vec<_>>();
    assert_eq!(mentioned, vec![albert, ben]);
    assert_eq!(fixture.backend.calls(Op::CreateMention), 2);
}
