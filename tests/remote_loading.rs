mod common;
use common::MockFetcher;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tags_input::errors::{TagsError, TagsErrorKind};
use tags_input::host::element::HostSelect;
use tags_input::host::events::UiEvent;
use tags_input::managers::hooks::{Notification, RecordingHooks};
use tags_input::managers::tags::{RemoteWiring, TagsInput};
use tags_input::services::logger::Logger;
use tags_input::services::remote::FetchOutcome;
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn bind_remote(
    fetcher: Arc<MockFetcher>,
    config: serde_json::Value,
) -> (TagsInput, RecordingHooks, UnboundedReceiver<FetchOutcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let hooks = RecordingHooks::new();
    let input = TagsInput::new(
        HostSelect::new("remote").multiple(true),
        &config,
        Box::new(hooks.clone()),
        Some(RemoteWiring {
            fetcher,
            outcomes: tx,
        }),
        &Logger::new("test"),
    )
    .expect("bind");
    (input, hooks, rx)
}

#[tokio::test(start_paused = true)]
async fn live_typing_issues_one_debounced_fetch() {
    let fetcher = Arc::new(MockFetcher::new());
    let (mut input, _, mut rx) = bind_remote(
        fetcher.clone(),
        json!({"server": "http://localhost/search", "liveServer": true, "noCache": false}),
    );
    assert_eq!(fetcher.calls(), 0);

    for text in ["a", "ab", "abc"] {
        input.handle(UiEvent::QueryChanged {
            text: text.to_string(),
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(fetcher.calls(), 0);

    let outcome = rx.recv().await.expect("outcome");
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(fetcher.queries(), vec!["abc"]);
    assert!(input.apply_fetch(outcome));

    let view = input.view();
    assert!(view.open);
    assert_eq!(view.row_values(), vec!["abc-1", "abc-2"]);
    // live results never seed the selection
    assert!(input.get_selected_values().is_empty());
}

#[tokio::test(start_paused = true)]
async fn static_server_loads_once_and_seeds_selection() {
    let fetcher = Arc::new(MockFetcher::new());
    let (mut input, hooks, mut rx) = bind_remote(
        fetcher.clone(),
        json!({"server": "http://localhost/search"}),
    );
    assert!(input.is_loading());

    let outcome = rx.recv().await.expect("outcome");
    let generation = outcome.generation;
    assert!(input.apply_fetch(outcome));
    assert!(!input.is_loading());
    assert_eq!(input.get_selected_values(), vec!["-2"]);
    assert_eq!(input.get_data().len(), 2);
    assert!(!input.is_dropdown_visible());
    assert_eq!(hooks.changes(), 0);

    let stale = FetchOutcome {
        instance: "remote".to_string(),
        generation,
        show: true,
        initial: false,
        result: Ok(json!([])),
    };
    assert!(!input.apply_fetch(stale));
    assert_eq!(input.get_data().len(), 2);

    // typing filters locally in non-live mode
    input.handle(UiEvent::QueryChanged {
        text: "one".to_string(),
    });
    assert_eq!(input.view().row_values(), vec!["-1"]);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn focus_loss_cancels_pending_fetch() {
    let fetcher = Arc::new(MockFetcher::new());
    let (mut input, _, mut rx) = bind_remote(
        fetcher.clone(),
        json!({"server": "http://localhost/search", "liveServer": true}),
    );
    input.handle(UiEvent::FocusGained);
    input.handle(UiEvent::QueryChanged {
        text: "ab".to_string(),
    });
    input.handle(UiEvent::FocusLost);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fetcher.calls(), 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_reaches_error_hook() {
    let fetcher = Arc::new(MockFetcher::failing());
    let (mut input, hooks, mut rx) = bind_remote(
        fetcher,
        json!({"server": "http://localhost/search"}),
    );
    let outcome = rx.recv().await.expect("outcome");
    assert!(matches!(
        &outcome.result,
        Err(err) if err.kind == TagsErrorKind::Network
    ));
    assert!(input.apply_fetch(outcome));
    assert!(input.get_data().is_empty());
    assert!(hooks.drain().contains(&Notification::ServerError {
        message: "upstream unavailable".to_string(),
        kind: "network".to_string(),
    }));
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_last_good_suggestions() {
    let fetcher = Arc::new(MockFetcher::new());
    let (mut input, hooks, mut rx) = bind_remote(
        fetcher,
        json!({"server": "http://localhost/search"}),
    );
    let loaded = rx.recv().await.expect("outcome");
    let generation = loaded.generation;
    assert!(input.apply_fetch(loaded));
    let before = input.get_data();
    assert_eq!(before.len(), 2);
    hooks.drain();

    let failed = FetchOutcome {
        instance: "remote".to_string(),
        generation: generation + 1,
        show: true,
        initial: false,
        result: Err(TagsError::network("connection reset")),
    };
    assert!(input.apply_fetch(failed));
    assert_eq!(input.get_data(), before);
    assert_eq!(input.get_selected_values(), vec!["-2"]);
    assert!(hooks.drain().contains(&Notification::ServerError {
        message: "connection reset".to_string(),
        kind: "network".to_string(),
    }));
}
