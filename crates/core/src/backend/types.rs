//! Wire types and transport seams for the media backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    Api(String),

    /// Non-2xx response, with the backend's `message`/`error` text when present.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response whose envelope reports failure.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl BackendError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The backend reported a conflict (the identifier is already present).
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// The backend reported the resource (or download client) missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Human-readable message without the HTTP prefix.
    pub fn message(&self) -> String {
        match self {
            BackendError::Status { message, .. } | BackendError::Rejected(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Which half of the combined library search to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryScope {
    All,
    Local,
    Ranking,
}

impl LibraryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryScope::All => "all",
            LibraryScope::Local => "local",
            LibraryScope::Ranking => "ranking",
        }
    }
}

/// `data` of the combined search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryPage {
    pub local_movies: Vec<LibraryMovie>,
    pub rankings: Vec<RankingItem>,
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub query: String,
}

/// A file found in the local library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryMovie {
    pub id: u64,
    pub title: String,
    pub code: String,
    pub actress: String,
    pub path: String,
    pub size: i64,
    pub format: String,
    pub has_fanart: bool,
    pub fanart_url: String,
}

/// One row of a ranking list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingItem {
    pub id: u64,
    pub code: String,
    pub title: String,
    pub cover_url: String,
    pub rank_type: String,
    pub position: i64,
    pub rating: Option<f64>,
    pub local_exists: bool,
}

/// Query type understood by the metadata-provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderQueryType {
    Movie,
    Actress,
}

impl ProviderQueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderQueryType::Movie => "movie",
            ProviderQueryType::Actress => "actress",
        }
    }
}

/// `data` of the metadata-provider endpoint: either a movie or an actor.
///
/// Actors are tried first because they always carry a `name`, which movie
/// payloads never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderPayload {
    Actor(ProviderActor),
    Movie(ProviderMovie),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMovie {
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub detail_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderActor {
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub detail_url: String,
    #[serde(default)]
    pub movie_count: u32,
    #[serde(default)]
    pub movies: Vec<ProviderMovie>,
}

/// A torrent as listed by the backend's indexer proxy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TorrentListing {
    pub title: String,
    pub link: String,
    pub size: i64,
    pub size_formatted: String,
    pub seeders: i64,
    pub leechers: i64,
    pub publish_date: String,
    pub magnet_uri: String,
    pub info_hash: String,
    pub tracker: String,
    pub category: String,
}

/// Body of `POST /torrents/download`. Exactly one of `magnet_uri`/`link` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnet_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub code: String,
    pub title: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<String>,
}

/// One task as reported by the download client (qBittorrent field names).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusEntry {
    pub hash: String,
    pub name: String,
    pub size: i64,
    pub state: String,
    pub progress: f64,
    pub dlspeed: i64,
    pub eta: i64,
    /// Comma-separated tag list.
    pub tags: String,
}

/// Pause/resume/delete actions on a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Pause,
    Resume,
    Delete,
}

impl ControlAction {
    /// Endpoint segment for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Delete => "delete",
        }
    }
}

impl std::str::FromStr for ControlAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pause" => Ok(ControlAction::Pause),
            "resume" => Ok(ControlAction::Resume),
            "delete" => Ok(ControlAction::Delete),
            other => Err(format!("unknown control action '{}'", other)),
        }
    }
}

/// Search side of the backend: local library, rankings, metadata provider.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Combined local/rankings search.
    async fn search_library(
        &self,
        query: &str,
        scope: LibraryScope,
        page: u32,
        limit: u32,
    ) -> Result<LibraryPage, BackendError>;

    /// Metadata-provider lookup. `Ok(None)` means the provider found nothing.
    async fn search_provider(
        &self,
        query: &str,
        query_type: Option<ProviderQueryType>,
    ) -> Result<Option<ProviderPayload>, BackendError>;

    /// Lightweight as-you-type suggestions.
    async fn suggestions(&self, query: &str) -> Result<Vec<String>, BackendError>;
}

/// Torrent side of the backend: indexer search, submission and the download client.
#[async_trait]
pub trait TorrentBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Search torrents for a media identifier. A 409 status means the
    /// identifier already exists locally.
    async fn search_by_code(&self, code: &str) -> Result<Vec<TorrentListing>, BackendError>;

    /// Free-text torrent search.
    async fn search_torrents(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<TorrentListing>, BackendError>;

    /// Submit a download.
    async fn download(&self, request: &DownloadRequest) -> Result<(), BackendError>;

    /// Raw task list of the download client. A 404 status means no client
    /// is configured or running.
    async fn status(&self) -> Result<Vec<StatusEntry>, BackendError>;

    /// Pause, resume or delete one task.
    async fn control(&self, hash: &str, action: ControlAction) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_classification() {
        let conflict = BackendError::Status {
            status: 409,
            message: "already downloaded".to_string(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
        assert_eq!(conflict.message(), "already downloaded");

        let missing = BackendError::Status {
            status: 404,
            message: String::new(),
        };
        assert!(missing.is_not_found());

        assert_eq!(BackendError::Timeout.status(), None);
        assert_eq!(BackendError::Timeout.message(), "Request timeout");
    }

    #[test]
    fn test_provider_payload_movie() {
        let json = r#"{"code":"ABC-123","title":"T","rating":7.5,"release_date":"2023-01-02"}"#;
        let payload: ProviderPayload = serde_json::from_str(json).unwrap();
        match payload {
            ProviderPayload::Movie(m) => {
                assert_eq!(m.code, "ABC-123");
                assert!((m.rating - 7.5).abs() < f64::EPSILON);
                assert_eq!(m.cover_url, "");
            }
            other => panic!("expected movie, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_payload_actor() {
        let json = r#"{
            "name": "Someone",
            "movie_count": 2,
            "movies": [{"code": "ABC-001"}, {"code": "ABC-002", "rating": 4.0}]
        }"#;
        let payload: ProviderPayload = serde_json::from_str(json).unwrap();
        match payload {
            ProviderPayload::Actor(a) => {
                assert_eq!(a.name, "Someone");
                assert_eq!(a.movies.len(), 2);
                assert_eq!(a.movies[1].code, "ABC-002");
            }
            other => panic!("expected actor, got {:?}", other),
        }
    }

    #[test]
    fn test_torrent_listing_camel_case() {
        let json = r#"{
            "title": "ABC-123 1080p",
            "size": 2147483648,
            "sizeFormatted": "2.0 GB",
            "seeders": 12,
            "magnetUri": "magnet:?xt=urn:btih:abc",
            "infoHash": "abc"
        }"#;
        let listing: TorrentListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.size, 2_147_483_648);
        assert_eq!(listing.size_formatted, "2.0 GB");
        assert_eq!(listing.magnet_uri, "magnet:?xt=urn:btih:abc");
        assert_eq!(listing.link, "");
        assert_eq!(listing.leechers, 0);
    }

    #[test]
    fn test_download_request_omits_missing_locator() {
        let request = DownloadRequest {
            magnet_uri: Some("magnet:?xt=urn:btih:abc".to_string()),
            link: None,
            code: "ABC-123".to_string(),
            title: "ABC-123".to_string(),
            size: 42,
            tracker: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["magnet_uri"], "magnet:?xt=urn:btih:abc");
        assert!(value.get("link").is_none());
        assert!(value.get("tracker").is_none());
        assert_eq!(value["size"], 42);
    }

    #[test]
    fn test_library_page_defaults() {
        let page: LibraryPage =
            serde_json::from_str(r#"{"local_movies":[{"code":"ABC-123"}]}"#).unwrap();
        assert_eq!(page.local_movies.len(), 1);
        assert_eq!(page.local_movies[0].title, "");
        assert!(page.rankings.is_empty());
    }

    #[test]
    fn test_control_action_parse() {
        assert_eq!("pause".parse::<ControlAction>(), Ok(ControlAction::Pause));
        assert_eq!("RESUME".parse::<ControlAction>(), Ok(ControlAction::Resume));
        assert_eq!(ControlAction::Delete.as_str(), "delete");
        assert!("stop".parse::<ControlAction>().is_err());
    }
}
