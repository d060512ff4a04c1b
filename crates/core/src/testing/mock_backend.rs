//! Mock media backend for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::backend::{
    BackendError, CatalogBackend, ControlAction, DownloadRequest, LibraryPage, LibraryScope,
    ProviderPayload, ProviderQueryType, StatusEntry, TorrentBackend, TorrentListing,
};

/// A recorded backend call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Library(LibraryCall),
    Provider(ProviderCall),
    Suggestions(SuggestionCall),
    SearchByCode(String),
    SearchTorrents { query: String, page: u32 },
    Download(DownloadRequest),
    Status,
    Control { hash: String, action: ControlAction },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryCall {
    pub query: String,
    pub scope: LibraryScope,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    pub query: String,
    pub query_type: Option<ProviderQueryType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionCall {
    pub query: String,
    /// When the request reached the backend (tokio clock, so paused-time
    /// tests can assert on it).
    pub at: Instant,
}

#[derive(Debug, Default)]
struct Responses {
    library: LibraryPage,
    library_error: Option<BackendError>,
    provider: Option<ProviderPayload>,
    provider_error: Option<BackendError>,
    suggestions: Vec<String>,
    code_results: Vec<TorrentListing>,
    torrent_results: Vec<TorrentListing>,
    status: Vec<StatusEntry>,
    /// When set, each accepted download shows up in `status` with this tag.
    echo_tag: Option<String>,
}

/// Mock implementation of both backend traits.
///
/// Provides controllable behavior for testing:
/// - Scripted responses per endpoint
/// - One-shot failures (`set_next_error`) and per-source failures
/// - Artificial latency
/// - Recorded calls
///
/// # Example
///
/// ```rust,ignore
/// let backend = Arc::new(MockBackend::new());
/// backend.set_library(fixtures::library_page(&["ABC-123"], &[])).await;
/// backend.fail_provider(BackendError::Timeout).await;
///
/// let coordinator = SearchCoordinator::new(backend.clone(), &SearchConfig::default());
/// let set = coordinator.search(&query).await?;
/// assert_eq!(backend.library_calls().await.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockBackend {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    responses: Arc<RwLock<Responses>>,
    /// If set, the next call of any kind fails with this error.
    next_error: Arc<RwLock<Option<BackendError>>>,
    latency: Arc<RwLock<Duration>>,
}

impl MockBackend {
    /// Create a new mock backend with empty responses.
    pub fn new() -> Self {
        Self::default()
    }

    // --- scripting ---------------------------------------------------------

    pub async fn set_library(&self, page: LibraryPage) {
        let mut responses = self.responses.write().await;
        responses.library = page;
        responses.library_error = None;
    }

    /// Make every combined library search fail.
    pub async fn fail_library(&self, error: BackendError) {
        self.responses.write().await.library_error = Some(error);
    }

    pub async fn set_provider(&self, payload: Option<ProviderPayload>) {
        let mut responses = self.responses.write().await;
        responses.provider = payload;
        responses.provider_error = None;
    }

    /// Make every metadata-provider search fail.
    pub async fn fail_provider(&self, error: BackendError) {
        self.responses.write().await.provider_error = Some(error);
    }

    pub async fn set_suggestions(&self, suggestions: Vec<String>) {
        self.responses.write().await.suggestions = suggestions;
    }

    pub async fn set_code_results(&self, listings: Vec<TorrentListing>) {
        self.responses.write().await.code_results = listings;
    }

    pub async fn set_torrent_results(&self, listings: Vec<TorrentListing>) {
        self.responses.write().await.torrent_results = listings;
    }

    pub async fn set_status(&self, entries: Vec<StatusEntry>) {
        self.responses.write().await.status = entries;
    }

    /// Add each accepted download to the status list, tagged with `tag`.
    pub async fn echo_downloads(&self, tag: &str) {
        self.responses.write().await.echo_tag = Some(tag.to_string());
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: BackendError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Delay every response by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    // --- assertions --------------------------------------------------------

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    pub async fn library_calls(&self) -> Vec<LibraryCall> {
        self.collect(|c| match c {
            RecordedCall::Library(call) => Some(call.clone()),
            _ => None,
        })
        .await
    }

    pub async fn provider_calls(&self) -> Vec<ProviderCall> {
        self.collect(|c| match c {
            RecordedCall::Provider(call) => Some(call.clone()),
            _ => None,
        })
        .await
    }

    pub async fn suggestion_calls(&self) -> Vec<SuggestionCall> {
        self.collect(|c| match c {
            RecordedCall::Suggestions(call) => Some(call.clone()),
            _ => None,
        })
        .await
    }

    pub async fn code_calls(&self) -> Vec<String> {
        self.collect(|c| match c {
            RecordedCall::SearchByCode(code) => Some(code.clone()),
            _ => None,
        })
        .await
    }

    pub async fn torrent_search_calls(&self) -> Vec<(String, u32)> {
        self.collect(|c| match c {
            RecordedCall::SearchTorrents { query, page } => Some((query.clone(), *page)),
            _ => None,
        })
        .await
    }

    pub async fn download_calls(&self) -> Vec<DownloadRequest> {
        self.collect(|c| match c {
            RecordedCall::Download(request) => Some(request.clone()),
            _ => None,
        })
        .await
    }

    pub async fn status_calls(&self) -> usize {
        self.collect(|c| matches!(c, RecordedCall::Status).then_some(()))
            .await
            .len()
    }

    pub async fn control_calls(&self) -> Vec<(String, ControlAction)> {
        self.collect(|c| match c {
            RecordedCall::Control { hash, action } => Some((hash.clone(), *action)),
            _ => None,
        })
        .await
    }

    async fn collect<T>(&self, f: impl Fn(&RecordedCall) -> Option<T>) -> Vec<T> {
        self.calls.read().await.iter().filter_map(f).collect()
    }

    /// Record the call, take any one-shot error, then wait out the latency.
    async fn begin(&self, call: RecordedCall) -> Result<(), BackendError> {
        self.calls.write().await.push(call);
        let error = self.next_error.write().await.take();
        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_library(
        &self,
        query: &str,
        scope: LibraryScope,
        page: u32,
        limit: u32,
    ) -> Result<LibraryPage, BackendError> {
        self.begin(RecordedCall::Library(LibraryCall {
            query: query.to_string(),
            scope,
            page,
            limit,
        }))
        .await?;

        let responses = self.responses.read().await;
        if let Some(error) = &responses.library_error {
            return Err(error.clone());
        }
        let mut page = responses.library.clone();
        page.query = query.to_string();
        Ok(page)
    }

    async fn search_provider(
        &self,
        query: &str,
        query_type: Option<ProviderQueryType>,
    ) -> Result<Option<ProviderPayload>, BackendError> {
        self.begin(RecordedCall::Provider(ProviderCall {
            query: query.to_string(),
            query_type,
        }))
        .await?;

        let responses = self.responses.read().await;
        match &responses.provider_error {
            Some(error) => Err(error.clone()),
            None => Ok(responses.provider.clone()),
        }
    }

    async fn suggestions(&self, query: &str) -> Result<Vec<String>, BackendError> {
        self.begin(RecordedCall::Suggestions(SuggestionCall {
            query: query.to_string(),
            at: Instant::now(),
        }))
        .await?;
        Ok(self.responses.read().await.suggestions.clone())
    }
}

#[async_trait]
impl TorrentBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_by_code(&self, code: &str) -> Result<Vec<TorrentListing>, BackendError> {
        self.begin(RecordedCall::SearchByCode(code.to_string()))
            .await?;
        Ok(self.responses.read().await.code_results.clone())
    }

    async fn search_torrents(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<TorrentListing>, BackendError> {
        self.begin(RecordedCall::SearchTorrents {
            query: query.to_string(),
            page,
        })
        .await?;
        Ok(self.responses.read().await.torrent_results.clone())
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), BackendError> {
        self.begin(RecordedCall::Download(request.clone())).await?;

        let mut responses = self.responses.write().await;
        if let Some(tag) = responses.echo_tag.clone() {
            let hash = format!("mockhash{:08x}", responses.status.len() + 1);
            responses.status.push(StatusEntry {
                hash,
                name: request.title.clone(),
                size: request.size as i64,
                state: "metaDL".to_string(),
                progress: 0.0,
                dlspeed: 0,
                eta: 8_640_000,
                tags: tag,
            });
        }
        Ok(())
    }

    async fn status(&self) -> Result<Vec<StatusEntry>, BackendError> {
        self.begin(RecordedCall::Status).await?;
        Ok(self.responses.read().await.status.clone())
    }

    async fn control(&self, hash: &str, action: ControlAction) -> Result<(), BackendError> {
        self.begin(RecordedCall::Control {
            hash: hash.to_string(),
            action,
        })
        .await?;

        if action == ControlAction::Delete {
            let hash = hash.to_lowercase();
            self.responses
                .write()
                .await
                .status
                .retain(|entry| entry.hash.to_lowercase() != hash);
        }
        Ok(())
    }
}
