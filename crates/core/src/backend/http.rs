//! HTTP implementation of both backend seams.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BackendConfig;

use super::{
    BackendError, CatalogBackend, ControlAction, DownloadRequest, LibraryPage, LibraryScope,
    ProviderPayload, ProviderQueryType, StatusEntry, TorrentBackend, TorrentListing,
};

/// Media backend reached over its JSON API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new backend client.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| BackendError::Api(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = format!(
            "{}/{}",
            config.url.trim_end_matches('/'),
            config.api_prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string();

        Ok(Self { client, base_url })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Option<T>, BackendError> {
        let url = self.url(endpoint);
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Option<T>, BackendError> {
        let url = self.url(endpoint);
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::ConnectionFailed(e.to_string())
    } else {
        BackendError::Api(e.to_string())
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Option<T>, BackendError> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Api(e.to_string()))?;
    parse_envelope(status, &body)
}

/// Response envelope. The backend speaks two dialects:
/// `{ success, data, error }` and `{ code, message, data }`.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: Option<bool>,
    code: Option<String>,
    message: Option<String>,
    error: Option<String>,
    data: Option<serde_json::Value>,
}

impl Envelope {
    fn is_success(&self) -> bool {
        match (self.success, self.code.as_deref()) {
            (Some(success), _) => success,
            (None, Some(code)) => code.eq_ignore_ascii_case("SUCCESS"),
            (None, None) => true,
        }
    }

    fn message(&self) -> Option<String> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    /// Status implied by a domain code, for backends that answer 200 with one.
    fn implied_status(&self) -> Option<u16> {
        match self.code.as_deref() {
            Some("EXISTS") => Some(409),
            Some("NOT_FOUND") => Some(404),
            _ => None,
        }
    }
}

fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, BackendError> {
    let envelope: Option<Envelope> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let message = envelope
            .as_ref()
            .and_then(Envelope::message)
            .unwrap_or_else(|| body.chars().take(200).collect());
        return Err(BackendError::Status { status, message });
    }

    let envelope = envelope.ok_or_else(|| {
        BackendError::Api(format!(
            "Failed to parse response: {}",
            body.chars().take(200).collect::<String>()
        ))
    })?;

    if let Some(status) = envelope.implied_status() {
        return Err(BackendError::Status {
            status,
            message: envelope.message().unwrap_or_default(),
        });
    }

    if !envelope.is_success() {
        return Err(BackendError::Rejected(
            envelope
                .message()
                .unwrap_or_else(|| "request failed".to_string()),
        ));
    }

    match envelope.data {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data)
            .map(Some)
            .map_err(|e| BackendError::Api(format!("Failed to parse response: {}", e))),
    }
}

#[derive(Debug, Deserialize)]
struct SuggestionData {
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Torrent lists arrive bare or wrapped in `{ results }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingData {
    Bare(Vec<TorrentListing>),
    Wrapped {
        #[serde(default)]
        results: Vec<TorrentListing>,
    },
}

impl ListingData {
    fn into_listings(self) -> Vec<TorrentListing> {
        match self {
            ListingData::Bare(listings) => listings,
            ListingData::Wrapped { results } => results,
        }
    }
}

#[derive(Debug, Serialize)]
struct ControlBody<'a> {
    hash: &'a str,
}

fn library_endpoint(query: &str, scope: LibraryScope, page: u32, limit: u32) -> String {
    format!(
        "/search?q={}&type={}&page={}&limit={}",
        urlencoding::encode(query),
        scope.as_str(),
        page.max(1),
        limit.clamp(1, 100)
    )
}

fn provider_endpoint(query: &str, query_type: Option<ProviderQueryType>) -> String {
    let mut endpoint = format!("/search/provider?q={}", urlencoding::encode(query));
    if let Some(query_type) = query_type {
        endpoint.push_str("&type=");
        endpoint.push_str(query_type.as_str());
    }
    endpoint
}

#[async_trait]
impl CatalogBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn search_library(
        &self,
        query: &str,
        scope: LibraryScope,
        page: u32,
        limit: u32,
    ) -> Result<LibraryPage, BackendError> {
        let page: Option<LibraryPage> = self
            .get(&library_endpoint(query, scope, page, limit))
            .await?;
        Ok(page.unwrap_or_default())
    }

    async fn search_provider(
        &self,
        query: &str,
        query_type: Option<ProviderQueryType>,
    ) -> Result<Option<ProviderPayload>, BackendError> {
        // A 404 here is a failed lookup; a miss comes back as null data.
        self.get(&provider_endpoint(query, query_type)).await
    }

    async fn suggestions(&self, query: &str) -> Result<Vec<String>, BackendError> {
        let endpoint = format!("/search/suggestions?q={}", urlencoding::encode(query));
        let data: Option<SuggestionData> = self.get(&endpoint).await?;
        Ok(data.map(|d| d.suggestions).unwrap_or_default())
    }
}

#[async_trait]
impl TorrentBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn search_by_code(&self, code: &str) -> Result<Vec<TorrentListing>, BackendError> {
        let endpoint = format!("/torrents/search/code?code={}", urlencoding::encode(code));
        let data: Option<ListingData> = self.get(&endpoint).await?;
        Ok(data.map(ListingData::into_listings).unwrap_or_default())
    }

    async fn search_torrents(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<TorrentListing>, BackendError> {
        let endpoint = format!(
            "/torrents/search?query={}&page={}",
            urlencoding::encode(query),
            page.max(1)
        );
        let data: Option<ListingData> = self.get(&endpoint).await?;
        Ok(data.map(ListingData::into_listings).unwrap_or_default())
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), BackendError> {
        let _: Option<serde_json::Value> = self.post("/torrents/download", request).await?;
        Ok(())
    }

    async fn status(&self) -> Result<Vec<StatusEntry>, BackendError> {
        let data: Option<Vec<StatusEntry>> = self.get("/torrents/status").await?;
        Ok(data.unwrap_or_default())
    }

    async fn control(&self, hash: &str, action: ControlAction) -> Result<(), BackendError> {
        let endpoint = format!("/torrents/{}", action.as_str());
        let _: Option<serde_json::Value> = self.post(&endpoint, &ControlBody { hash }).await?;
        Ok(())
    }
}
