//! As-you-type suggestion debouncer.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::CatalogBackend;
use crate::config::SuggestionConfig;
use crate::metrics;
use crate::schedule::ScheduledTask;

/// What the suggestion list should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionUpdate {
    Show {
        query: String,
        suggestions: Vec<String>,
    },
    Hide,
}

/// Debounces input into suggestion requests.
///
/// Each call to [`on_input`](Self::on_input) replaces the pending timer, so
/// only input that stays unchanged for the configured delay reaches the
/// backend. Responses for text that is no longer current are dropped.
pub struct SuggestionDebouncer {
    backend: Arc<dyn CatalogBackend>,
    delay: Duration,
    min_chars: usize,
    current: Arc<Mutex<String>>,
    pending: Mutex<Option<ScheduledTask>>,
    updates: mpsc::UnboundedSender<SuggestionUpdate>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl SuggestionDebouncer {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        config: &SuggestionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SuggestionUpdate>) {
        let (updates, receiver) = mpsc::unbounded_channel();
        let debouncer = Self {
            backend,
            delay: Duration::from_millis(config.debounce_ms),
            min_chars: config.min_chars.max(1),
            current: Arc::new(Mutex::new(String::new())),
            pending: Mutex::new(None),
            updates,
        };
        (debouncer, receiver)
    }

    /// Feed the current input value. Must be called within a tokio runtime.
    pub fn on_input(&self, text: &str) {
        let query = text.trim().to_string();
        *lock(&self.current) = query.clone();

        let mut pending = lock(&self.pending);
        if let Some(task) = pending.take() {
            task.cancel();
        }

        if query.chars().count() < self.min_chars {
            let _ = self.updates.send(SuggestionUpdate::Hide);
            return;
        }

        let backend = self.backend.clone();
        let current = self.current.clone();
        let updates = self.updates.clone();
        *pending = Some(ScheduledTask::after(self.delay, async move {
            debug!(query = %query, "Requesting suggestions");
            let result = backend.suggestions(&query).await;

            if *lock(&current) != query {
                debug!(query = %query, "Discarding stale suggestions");
                metrics::SUGGESTION_REQUESTS
                    .with_label_values(&["stale"])
                    .inc();
                return;
            }

            let update = match result {
                Ok(suggestions) if !suggestions.is_empty() => {
                    metrics::SUGGESTION_REQUESTS
                        .with_label_values(&["shown"])
                        .inc();
                    SuggestionUpdate::Show { query, suggestions }
                }
                Ok(_) => {
                    metrics::SUGGESTION_REQUESTS
                        .with_label_values(&["empty"])
                        .inc();
                    SuggestionUpdate::Hide
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "Suggestion request failed");
                    metrics::SUGGESTION_REQUESTS
                        .with_label_values(&["failed"])
                        .inc();
                    SuggestionUpdate::Hide
                }
            };
            let _ = updates.send(update);
        }));
    }

    /// Drop the pending timer, if any.
    pub fn cancel(&self) {
        if let Some(task) = lock(&self.pending).take() {
            task.cancel();
        }
    }

    /// Whether a timer is armed or a request is still running.
    pub fn has_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::testing::MockBackend;
    use tokio::time::Instant;

    fn debouncer(
        mock: &Arc<MockBackend>,
    ) -> (SuggestionDebouncer, mpsc::UnboundedReceiver<SuggestionUpdate>) {
        SuggestionDebouncer::new(mock.clone(), &SuggestionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystroke_burst_issues_one_request() {
        let mock = Arc::new(MockBackend::new());
        mock.set_suggestions(vec!["ABC-123".to_string(), "ABC-124".to_string()])
            .await;
        let (debouncer, mut updates) = debouncer(&mock);
        let start = Instant::now();

        debouncer.on_input("AB");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.on_input("ABC");
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.on_input("ABC-");
        tokio::time::sleep(Duration::from_millis(250)).await;
        debouncer.on_input("ABC-1");

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(mock.suggestion_calls().await.is_empty());

        let update = updates.recv().await.unwrap();
        assert_eq!(
            update,
            SuggestionUpdate::Show {
                query: "ABC-1".to_string(),
                suggestions: vec!["ABC-123".to_string(), "ABC-124".to_string()],
            }
        );

        let calls = mock.suggestion_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, "ABC-1");
        assert!(calls[0].at.duration_since(start) >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_hides_without_request() {
        let mock = Arc::new(MockBackend::new());
        let (debouncer, mut updates) = debouncer(&mock);

        debouncer.on_input(" A ");
        assert_eq!(updates.recv().await, Some(SuggestionUpdate::Hide));
        assert!(!debouncer.has_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(mock.suggestion_calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortening_input_cancels_pending_timer() {
        let mock = Arc::new(MockBackend::new());
        let (debouncer, mut updates) = debouncer(&mock);

        debouncer.on_input("AB");
        assert!(debouncer.has_pending());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.on_input("A");
        assert_eq!(updates.recv().await, Some(SuggestionUpdate::Hide));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(mock.suggestion_calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_timer() {
        let mock = Arc::new(MockBackend::new());
        let (debouncer, _updates) = debouncer(&mock);

        debouncer.on_input("ABC");
        debouncer.cancel();
        assert!(!debouncer.has_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(mock.suggestion_calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retyping_during_lookup_shows_only_newer_input() {
        let mock = Arc::new(MockBackend::new());
        mock.set_latency(Duration::from_millis(500)).await;
        mock.set_suggestions(vec!["ABC-123".to_string()]).await;
        let (debouncer, mut updates) = debouncer(&mock);

        debouncer.on_input("ABC");
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.on_input("ABC-1");

        match updates.recv().await {
            Some(SuggestionUpdate::Show { query, .. }) => assert_eq!(query, "ABC-1"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(updates.try_recv().is_err());
        assert_eq!(mock.suggestion_calls().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_for_outdated_input_is_discarded() {
        let mock = Arc::new(MockBackend::new());
        mock.set_latency(Duration::from_millis(500)).await;
        mock.set_suggestions(vec!["ABC-123".to_string()]).await;
        let (debouncer, mut updates) = debouncer(&mock);

        debouncer.on_input("ABC");
        // Timer fires at 300ms; the request is in flight until 800ms.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(mock.suggestion_calls().await.len(), 1);

        // `on_input` would abort the lookup; a response only outlives its
        // input when it lands between the abort and the task stopping. Move
        // the current value directly to stand in for that window.
        *lock(&debouncer.current) = "ABC-9".to_string();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert!(updates.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_or_empty_response_hides() {
        let mock = Arc::new(MockBackend::new());
        mock.set_next_error(BackendError::Timeout).await;
        let (debouncer, mut updates) = debouncer(&mock);

        debouncer.on_input("ABC");
        assert_eq!(updates.recv().await, Some(SuggestionUpdate::Hide));

        debouncer.on_input("ABCD");
        assert_eq!(updates.recv().await, Some(SuggestionUpdate::Hide));
        assert_eq!(mock.suggestion_calls().await.len(), 2);
    }

    #[test]
    fn test_update_serialization() {
        let show = SuggestionUpdate::Show {
            query: "AB".to_string(),
            suggestions: vec!["ABC-1".to_string()],
        };
        let value = serde_json::to_value(&show).unwrap();
        assert_eq!(value["type"], "show");
        assert_eq!(value["suggestions"][0], "ABC-1");

        let hide = serde_json::to_value(SuggestionUpdate::Hide).unwrap();
        assert_eq!(hide["type"], "hide");
    }
}
