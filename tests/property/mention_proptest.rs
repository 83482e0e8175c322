//! Property-based tests for mention filtering and the suggestion popup

use doccollab::client::{MentionPopup, MentionRoster, PopupEvent, PopupKey, PopupOutcome, PopupState};
use doccollab::shared::MentionCandidate;
use proptest::prelude::*;
use uuid::Uuid;

fn candidate_strategy() -> impl Strategy<Value = MentionCandidate> {
    ("[a-zA-Z]{1,10}", proptest::option::of("[a-zA-Z ]{1,20}")).prop_map(|(username, full_name)| {
        MentionCandidate {
            id: Uuid::new_v4(),
            username,
            full_name,
        }
    })
}

fn open(popup: &mut MentionPopup, roster: &MentionRoster, query: &str) {
    popup.handle(
        PopupEvent::QueryChanged {
            query: query.to_string(),
            range: 0..query.len() + 1,
        },
        roster,
    );
}

fn selected_index(popup: &MentionPopup) -> Option<usize> {
    match popup.state() {
        PopupState::Open { selected, .. } => Some(*selected),
        PopupState::Closed => None,
    }
}

proptest! {
    #[test]
    fn test_filter_is_capped_ordered_subset(
        candidates in proptest::collection::vec(candidate_strategy(), 0..30),
        query in "[a-zA-Z]{0,3}",
        cap in 1usize..10,
    ) {
        let roster = MentionRoster::new(candidates.clone(), cap);
        let found = roster.filter(&query);

        prop_assert!(found.len() <= cap);
        prop_assert_eq!(&found, &roster.filter(&query));

        // Every hit matches, and hits appear in roster order
        let mut last = None;
        for hit in &found {
            prop_assert!(hit.matches(&query.to_lowercase()));
            let position = candidates.iter().position(|c| c.id == hit.id).unwrap();
            prop_assert!(last.map_or(true, |prev| position > prev));
            last = Some(position);
        }
    }

    #[test]
    fn test_filter_ignores_case(
        candidates in proptest::collection::vec(candidate_strategy(), 0..20),
        query in "[a-zA-Z]{1,3}",
    ) {
        let roster = MentionRoster::new(candidates, 50);
        prop_assert_eq!(roster.filter(&query.to_uppercase()), roster.filter(&query.to_lowercase()));
    }

    #[test]
    fn test_down_then_up_returns_to_start(
        candidates in proptest::collection::vec(candidate_strategy(), 1..10),
        downs in 0usize..25,
    ) {
        let roster = MentionRoster::new(candidates, 10);
        let mut popup = MentionPopup::default();
        open(&mut popup, &roster, "");
        let n = roster.filter("").len();

        for _ in 0..downs {
            prop_assert_eq!(popup.handle(PopupEvent::Key(PopupKey::Down), &roster), PopupOutcome::Consumed);
        }
        prop_assert_eq!(selected_index(&popup), Some(downs % n));

        for _ in 0..downs {
            popup.handle(PopupEvent::Key(PopupKey::Up), &roster);
        }
        prop_assert_eq!(selected_index(&popup), Some(0));
    }

    #[test]
    fn test_new_query_resets_selection(
        candidates in proptest::collection::vec(candidate_strategy(), 1..10),
        downs in 1usize..10,
        query in "[a-z]{0,2}",
    ) {
        let roster = MentionRoster::new(candidates, 10);
        let mut popup = MentionPopup::default();
        open(&mut popup, &roster, "");
        for _ in 0..downs {
            popup.handle(PopupEvent::Key(PopupKey::Down), &roster);
        }

        open(&mut popup, &roster, &query);
        prop_assert_eq!(selected_index(&popup), Some(0));
    }

    #[test]
    fn test_enter_commits_highlighted_candidate(
        candidates in proptest::collection::vec(candidate_strategy(), 0..10),
        downs in 0usize..10,
    ) {
        let roster = MentionRoster::new(candidates, 10);
        let mut popup = MentionPopup::default();
        open(&mut popup, &roster, "");
        for _ in 0..downs {
            popup.handle(PopupEvent::Key(PopupKey::Down), &roster);
        }
        let highlighted = popup.state().selected().cloned();

        match popup.handle(PopupEvent::Key(PopupKey::Enter), &roster) {
            PopupOutcome::Commit(selection) => {
                prop_assert_eq!(Some(selection.candidate), highlighted);
                prop_assert!(!popup.state().is_open());
            }
            other => {
                prop_assert_eq!(other, PopupOutcome::Consumed);
                prop_assert!(highlighted.is_none());
            }
        }
    }
}
