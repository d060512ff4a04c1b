//! Search and suggestion integration tests.
//!
//! These drive the coordinator and the debouncer against the mock backend:
//! fan-out, partial provider failure, superseded searches and debounced
//! suggestions.

use std::sync::Arc;
use std::time::Duration;

use curator_core::{
    backend::BackendError,
    config::{SearchConfig, SuggestionConfig},
    search::{ProviderHint, SourceResult, SourceTag},
    testing::{fixtures, MockBackend},
    SearchCoordinator, SearchError, SearchQuery, SourceFlags, SuggestionDebouncer,
    SuggestionUpdate,
};

fn coordinator(mock: &Arc<MockBackend>) -> SearchCoordinator {
    SearchCoordinator::new(mock.clone(), &SearchConfig::default())
}

#[tokio::test]
async fn test_identifier_search_counts_each_source() {
    let mock = Arc::new(MockBackend::new());
    mock.set_library(fixtures::library_page(&["ABC-123"], &[]))
        .await;
    mock.set_provider(Some(fixtures::provider_movie("ABC-123", 7.5)))
        .await;

    let set = coordinator(&mock)
        .search(&SearchQuery::new("ABC-123", SourceFlags::all()))
        .await
        .unwrap();

    assert_eq!(set.total(), 2);
    assert_eq!(set.per_source_counts.get(&SourceTag::Local), Some(&1));
    assert_eq!(set.per_source_counts.get(&SourceTag::Rankings), Some(&0));
    assert_eq!(set.per_source_counts.get(&SourceTag::Provider), Some(&1));
    assert!(set.warnings.is_empty());

    let provider: Vec<_> = set.from_source(SourceTag::Provider).collect();
    match provider[0] {
        SourceResult::Provider(record) => {
            assert_eq!(record.identifier, "ABC-123");
            assert_eq!(record.rating, Some(7.5));
        }
        other => panic!("unexpected {:?}", other),
    }

    // One combined library call plus one provider call.
    assert_eq!(mock.library_calls().await.len(), 1);
    assert_eq!(mock.provider_calls().await.len(), 1);
}

#[tokio::test]
async fn test_provider_outage_keeps_library_results() {
    let mock = Arc::new(MockBackend::new());
    mock.set_library(fixtures::library_page(&["ABC-123"], &["ABC-123", "XYZ-001"]))
        .await;
    mock.fail_provider(BackendError::Timeout).await;

    let set = coordinator(&mock)
        .search(&SearchQuery::new("ABC-123", SourceFlags::all()))
        .await
        .unwrap();

    assert_eq!(set.count(SourceTag::Local), 1);
    assert_eq!(set.count(SourceTag::Rankings), 2);
    assert!(!set.per_source_counts.contains_key(&SourceTag::Provider));
    assert_eq!(set.warnings.len(), 1);
    assert_eq!(set.warnings[0].source, SourceTag::Provider);
}

#[tokio::test]
async fn test_library_outage_fails_search() {
    let mock = Arc::new(MockBackend::new());
    mock.fail_library(BackendError::ConnectionFailed("refused".to_string()))
        .await;
    mock.set_provider(Some(fixtures::provider_movie("ABC-123", 8.0)))
        .await;

    let result = coordinator(&mock)
        .search(&SearchQuery::new("ABC-123", SourceFlags::all()))
        .await;

    assert!(matches!(result, Err(SearchError::RequestFailed(_))));
}

#[tokio::test]
async fn test_actor_search_yields_single_result_with_filmography() {
    let mock = Arc::new(MockBackend::new());
    mock.set_provider(Some(fixtures::provider_actor(
        "Jane Doe",
        &["AAA-001", "AAA-002", "AAA-003"],
    )))
    .await;

    let flags = SourceFlags {
        local: false,
        rankings: false,
        provider: true,
    };
    let set = coordinator(&mock)
        .search(&SearchQuery::new("Jane Doe", flags).with_hint(ProviderHint::Actor))
        .await
        .unwrap();

    assert_eq!(set.total(), 1);
    match &set.results[0] {
        SourceResult::Provider(record) => assert_eq!(record.filmography.len(), 3),
        other => panic!("unexpected {:?}", other),
    }
    assert!(mock.library_calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_newer_search_supersedes_older() {
    let mock = Arc::new(MockBackend::new());
    mock.set_library(fixtures::library_page(&["ABC-123"], &[]))
        .await;
    mock.set_latency(Duration::from_millis(200)).await;
    let coordinator = Arc::new(coordinator(&mock));

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .search(&SearchQuery::new("ABC", SourceFlags::all()))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(coordinator.is_searching());

    let second = coordinator
        .search(&SearchQuery::new("ABC-123", SourceFlags::all()))
        .await;

    assert!(second.is_ok());
    assert!(matches!(
        first.await.unwrap(),
        Err(SearchError::Superseded)
    ));
    assert!(!coordinator.is_searching());
}

#[tokio::test(start_paused = true)]
async fn test_typing_burst_issues_one_suggestion_request() {
    let mock = Arc::new(MockBackend::new());
    mock.set_suggestions(vec!["ABC-123".to_string(), "ABC-124".to_string()])
        .await;
    let (debouncer, mut updates) =
        SuggestionDebouncer::new(mock.clone(), &SuggestionConfig::default());

    for text in ["A", "AB", "ABC", "ABC-", "ABC-1"] {
        debouncer.on_input(text);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    let calls = mock.suggestion_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query, "ABC-1");

    // "A" is below the minimum length and hides the list first.
    assert_eq!(updates.recv().await, Some(SuggestionUpdate::Hide));
    assert_eq!(
        updates.recv().await,
        Some(SuggestionUpdate::Show {
            query: "ABC-1".to_string(),
            suggestions: vec!["ABC-123".to_string(), "ABC-124".to_string()],
        })
    );
}
