//! Query fan-out coordinator.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backend::CatalogBackend;
use crate::config::SearchConfig;
use crate::metrics;

use super::merger::merge;
use super::{
    AggregatedResultSet, ProviderHint, SearchError, SearchQuery, SourceFlags, SourceTag,
    SourceWarning,
};

/// Identity of a logical search: same text, same sources, same hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SearchKey {
    text: String,
    flags: SourceFlags,
    hint: ProviderHint,
}

#[derive(Debug, Default)]
struct SessionState {
    in_flight: HashSet<SearchKey>,
    generation: u64,
}

/// Per-coordinator search context.
///
/// Tracks which searches are in flight (the `is_searching` guard) and the
/// generation of the most recently issued one, so a superseded call can
/// recognize its results as stale when it settles.
#[derive(Debug, Default)]
pub struct SearchSession {
    state: Mutex<SessionState>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // The state is plain data; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether any search is in flight.
    pub fn is_searching(&self) -> bool {
        !self.lock().in_flight.is_empty()
    }

    /// Generation of the most recently issued search.
    pub fn current_generation(&self) -> u64 {
        self.lock().generation
    }

    fn begin(&self, key: SearchKey) -> Result<InFlight<'_>, SearchError> {
        let mut state = self.lock();
        if state.in_flight.contains(&key) {
            return Err(SearchError::Busy);
        }
        state.in_flight.insert(key.clone());
        state.generation += 1;
        Ok(InFlight {
            session: self,
            key,
            generation: state.generation,
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }
}

/// Marks a search as in flight until dropped.
struct InFlight<'a> {
    session: &'a SearchSession,
    key: SearchKey,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.lock().in_flight.remove(&self.key);
    }
}

/// Fans one query out to the selected sources and merges the outcomes.
///
/// The combined local/rankings request is required: its failure fails the
/// call. The metadata provider is best-effort: its failure becomes a
/// `SourceWarning` on an otherwise successful result.
pub struct SearchCoordinator {
    backend: Arc<dyn CatalogBackend>,
    page_limit: u32,
    session: SearchSession,
}

impl SearchCoordinator {
    pub fn new(backend: Arc<dyn CatalogBackend>, config: &SearchConfig) -> Self {
        Self {
            backend,
            page_limit: config.page_limit.clamp(1, 100),
            session: SearchSession::new(),
        }
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn is_searching(&self) -> bool {
        self.session.is_searching()
    }

    /// Run one search.
    pub async fn search(&self, query: &SearchQuery) -> Result<AggregatedResultSet, SearchError> {
        let started = Instant::now();
        let result = self.run(query).await;

        let outcome = match &result {
            Ok(set) if set.is_empty() => "empty",
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::SEARCHES_TOTAL.with_label_values(&[outcome]).inc();
        metrics::SEARCH_DURATION
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());

        result.map(|mut set| {
            set.duration_ms = started.elapsed().as_millis() as u64;
            set
        })
    }

    async fn run(&self, query: &SearchQuery) -> Result<AggregatedResultSet, SearchError> {
        let text = query.normalized();
        if text.is_empty() {
            return Err(SearchError::InvalidInput(
                "search query cannot be empty".to_string(),
            ));
        }
        if query.flags.is_empty() {
            return Err(SearchError::NoScopeSelected);
        }

        // Checked and marked before the first await.
        let in_flight = self.session.begin(SearchKey {
            text: text.to_string(),
            flags: query.flags,
            hint: query.hint,
        })?;

        info!(query = %text, flags = ?query.flags, "Starting search");

        let library_request = async {
            match query.flags.library_scope() {
                Some(scope) => {
                    debug!(query = %text, scope = scope.as_str(), "Querying library");
                    Some(
                        self.backend
                            .search_library(text, scope, 1, self.page_limit)
                            .await,
                    )
                }
                None => None,
            }
        };

        let provider_request = async {
            if query.flags.provider {
                debug!(query = %text, hint = ?query.hint, "Querying metadata provider");
                Some(
                    self.backend
                        .search_provider(text, query.hint.query_type())
                        .await,
                )
            } else {
                None
            }
        };

        let (library, provider) = futures::future::join(library_request, provider_request).await;

        if !self.session.is_current(in_flight.generation) {
            debug!(query = %text, "Dropping superseded search results");
            return Err(SearchError::Superseded);
        }

        let (local, rankings) = match library {
            Some(Ok(page)) => (
                query.flags.local.then_some(page.local_movies),
                query.flags.rankings.then_some(page.rankings),
            ),
            Some(Err(e)) => {
                warn!(query = %text, error = %e, "Library search failed");
                metrics::SOURCE_FAILURES.with_label_values(&["library"]).inc();
                return Err(SearchError::RequestFailed(e));
            }
            None => (None, None),
        };

        let mut warnings = Vec::new();
        let provider = match provider {
            Some(Ok(payload)) => Some(payload.into_iter().collect()),
            Some(Err(e)) => {
                warn!(query = %text, source = "provider", error = %e, "Metadata provider failed");
                metrics::SOURCE_FAILURES
                    .with_label_values(&[SourceTag::Provider.as_str()])
                    .inc();
                warnings.push(SourceWarning {
                    source: SourceTag::Provider,
                    message: e.message(),
                });
                None
            }
            None => None,
        };

        let mut set = merge(text, local, rankings, provider);
        set.warnings = warnings;

        info!(
            query = %text,
            total = set.total(),
            warnings = set.warnings.len(),
            "Search complete"
        );

        Ok(set)
    }
}
