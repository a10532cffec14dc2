#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Browse session tests against an in-memory catalog.
//!
//! Timing-dependent tests run on tokio's paused clock, so debounce windows
//! and slow responses elapse instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use codex_client::{
    ClientConfig, FilterEdit, FetchKind, ListStatus, MemoryHistory, ResultOrder, SessionView,
    UiEvent, spawn_session,
};
use codex_kernel::Card;
use codex_kernel::catalog::{FilterModel, SearchMode, TypeTag};
use codex_test_utils::{InMemoryFetcher, test_card};

fn catalog() -> Vec<Card> {
    vec![
        test_card("c1", "Bigfoot").with_type(TypeTag::Cryptid).into_card(),
        test_card("c2", "Chupacabra").with_type(TypeTag::Cryptid).into_card(),
        test_card("t1", "Hollow Road").with_type(TypeTag::Trail).into_card(),
        test_card("c3", "Jersey Devil").with_type(TypeTag::Cryptid).into_card(),
        test_card("c4", "Mothman").with_type(TypeTag::Cryptid).into_card(),
        test_card("t2", "Moth Trail").with_type(TypeTag::Trail).into_card(),
        test_card("l1", "Swamp Lantern").with_type(TypeTag::Lantern).into_card(),
    ]
}

fn config(page_limit: i64) -> ClientConfig {
    ClientConfig {
        page_limit,
        ..ClientConfig::default()
    }
}

fn settled(view: &SessionView, issued: u64) -> bool {
    view.fetches_issued == issued && !matches!(view.status, ListStatus::Idle | ListStatus::Loading)
}

#[tokio::test(start_paused = true)]
async fn initial_fetch_uses_hydrated_filters() {
    let fetcher = InMemoryFetcher::new(catalog());
    let history = MemoryHistory::new();
    let session = spawn_session(
        Arc::new(fetcher.clone()),
        history.clone(),
        &config(12),
        "type=trail",
    )
    .unwrap();

    let view = session.wait_for(|v| settled(v, 1)).await.unwrap();
    assert_eq!(view.card_ids, ["t1", "t2"]);
    assert_eq!(view.status, ListStatus::Ready);
    assert!(!view.has_more);

    // Already canonical, so hydration does not touch history.
    assert!(history.replacements().is_empty());
    let requests = fetcher.requests();
    assert_eq!(requests[0].offset, 0);
    assert_eq!(requests[0].limit, 12);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_collapse_into_one_fetch() {
    let fetcher = InMemoryFetcher::new(catalog());
    let session =
        spawn_session(Arc::new(fetcher.clone()), MemoryHistory::new(), &config(12), "").unwrap();
    session.wait_for(|v| settled(v, 1)).await.unwrap();

    for text in ["m", "mo", "mot", "moth"] {
        session.send(UiEvent::SearchInput(text.into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
    }

    let view = session.wait_for(|v| settled(v, 2)).await.unwrap();
    assert_eq!(view.card_ids, ["c4", "t2"]);
    assert_eq!(view.query, "search=moth");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let requests = fetcher.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].search_text, "moth");
    assert_eq!(requests[1].search_mode, SearchMode::Name);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn filter_change_discards_in_flight_load_more() {
    // Load-more pages answer slowly, first pages quickly.
    let fetcher = InMemoryFetcher::with_delay(catalog(), |filters: &FilterModel| {
        if filters.offset > 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_millis(10)
        }
    });
    let session =
        spawn_session(Arc::new(fetcher.clone()), MemoryHistory::new(), &config(2), "").unwrap();
    let view = session.wait_for(|v| settled(v, 1)).await.unwrap();
    assert_eq!(view.card_ids, ["c1", "c2"]);
    assert!(view.has_more);

    session.send(UiEvent::SentinelVisible).await.unwrap();
    session
        .send(UiEvent::Edit(FilterEdit::ToggleType(TypeTag::Trail)))
        .await
        .unwrap();

    let view = session.wait_for(|v| settled(v, 3)).await.unwrap();
    assert_eq!(view.card_ids, ["t1", "t2"]);

    // Let the superseded load-more land.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let view = session.view();
    assert_eq!(view.card_ids, ["t1", "t2"]);
    assert_eq!(view.status, ListStatus::Ready);

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].offset, 2);
    assert_eq!(requests[2].offset, 0);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn scrolling_to_the_end_matches_all_ids() {
    let fetcher = InMemoryFetcher::new(catalog());
    let session =
        spawn_session(Arc::new(fetcher.clone()), MemoryHistory::new(), &config(3), "").unwrap();

    let mut issued = 1;
    let mut view = session.wait_for(|v| settled(v, issued)).await.unwrap();
    while view.has_more {
        session.send(UiEvent::SentinelVisible).await.unwrap();
        issued += 1;
        view = session.wait_for(|v| settled(v, issued)).await.unwrap();
    }

    let order = ResultOrder::load(&fetcher, &FilterModel::default())
        .await
        .unwrap();
    assert_eq!(view.card_ids, order.ids());
    // 7 cards in pages of 3: two full pages and one short page.
    assert_eq!(issued, 3);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_is_retryable_and_not_empty() {
    let fetcher = InMemoryFetcher::new(catalog());
    fetcher.fail_next(1);
    let session =
        spawn_session(Arc::new(fetcher.clone()), MemoryHistory::new(), &config(12), "").unwrap();

    let view = session.wait_for(|v| settled(v, 1)).await.unwrap();
    match &view.status {
        ListStatus::Failed(failure) => assert_eq!(failure.kind, FetchKind::Reset),
        other => panic!("expected a failed status, got {other:?}"),
    }
    assert!(view.card_ids.is_empty());

    session.send(UiEvent::Retry).await.unwrap();
    let view = session.wait_for(|v| settled(v, 2)).await.unwrap();
    assert_eq!(view.status, ListStatus::Ready);
    assert_eq!(view.card_ids.len(), 7);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn no_matches_is_empty() {
    let fetcher = InMemoryFetcher::new(catalog());
    let session = spawn_session(
        Arc::new(fetcher),
        MemoryHistory::new(),
        &config(12),
        "search=kraken",
    )
    .unwrap();

    let view = session.wait_for(|v| settled(v, 1)).await.unwrap();
    assert_eq!(view.status, ListStatus::Empty);
    assert!(!view.has_more);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn edits_replace_history_entries() {
    let fetcher = InMemoryFetcher::new(catalog());
    let history = MemoryHistory::new();
    let session = spawn_session(
        Arc::new(fetcher.clone()),
        history.clone(),
        &config(12),
        "type=trail",
    )
    .unwrap();
    session.wait_for(|v| settled(v, 1)).await.unwrap();

    session
        .send(UiEvent::Edit(FilterEdit::ToggleType(TypeTag::Cryptid)))
        .await
        .unwrap();
    session.wait_for(|v| settled(v, 2)).await.unwrap();

    // Re-selecting the current sort is not a change and issues nothing.
    session
        .send(UiEvent::Edit(FilterEdit::SetSort(Default::default())))
        .await
        .unwrap();
    session
        .send(UiEvent::Edit(FilterEdit::ToggleType(TypeTag::Trail)))
        .await
        .unwrap();
    let view = session.wait_for(|v| settled(v, 3)).await.unwrap();

    assert_eq!(
        history.replacements(),
        ["type=cryptid%2Ctrail", "type=cryptid"]
    );
    assert_eq!(view.query, "type=cryptid");
    assert_eq!(view.card_ids, ["c1", "c2", "c3", "c4"]);

    session.shutdown().await;
}
