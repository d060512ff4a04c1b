//! Types for candidate resolution and acquisition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{BackendError, DownloadRequest, TorrentListing};

/// Errors from resolve/submit/torrent search.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("An operation for this identifier is already running")]
    Busy,

    /// Submit without a resolved candidate list.
    #[error("Not resolved: {0}")]
    NotResolved(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("No torrent candidates found")]
    NoCandidates,

    #[error("Request failed: {0}")]
    RequestFailed(#[from] BackendError),
}

impl AcquireError {
    /// Short machine-readable name, used for metrics and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AcquireError::InvalidInput(_) => "invalid_input",
            AcquireError::Busy => "busy",
            AcquireError::NotResolved(_) => "not_resolved",
            AcquireError::AlreadyExists(_) => "already_exists",
            AcquireError::NoCandidates => "no_candidates",
            AcquireError::RequestFailed(_) => "request_failed",
        }
    }
}

/// Where a torrent can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uri", rename_all = "snake_case")]
pub enum DownloadLocator {
    Magnet(String),
    HttpLink(String),
}

impl DownloadLocator {
    /// Resolve the listing's magnet/link pair. The magnet wins when both are
    /// present; `None` when neither is usable.
    pub fn from_parts(magnet_uri: &str, link: &str) -> Option<Self> {
        let magnet_uri = magnet_uri.trim();
        let link = link.trim();
        if !magnet_uri.is_empty() {
            Some(DownloadLocator::Magnet(magnet_uri.to_string()))
        } else if !link.is_empty() {
            Some(DownloadLocator::HttpLink(link.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DownloadLocator::Magnet(uri) | DownloadLocator::HttpLink(uri) => uri,
        }
    }

    pub fn is_magnet(&self) -> bool {
        matches!(self, DownloadLocator::Magnet(_))
    }
}

/// An acquirable torrent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TorrentCandidate {
    pub title: String,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<String>,
    pub locator: DownloadLocator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
}

impl TorrentCandidate {
    /// Convert a backend listing; listings without a locator are not acquirable.
    pub fn from_listing(listing: TorrentListing) -> Option<Self> {
        let locator = DownloadLocator::from_parts(&listing.magnet_uri, &listing.link)?;
        Some(Self {
            title: listing.title,
            size_bytes: listing.size.max(0) as u64,
            seeders: listing.seeders.clamp(0, u32::MAX as i64) as u32,
            leechers: listing.leechers.clamp(0, u32::MAX as i64) as u32,
            tracker: non_empty(listing.tracker),
            locator,
            size_formatted: non_empty(listing.size_formatted),
            publish_date: non_empty(listing.publish_date),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A confirmed choice of candidate for an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
    pub identifier: String,
    pub title: String,
    pub candidate: TorrentCandidate,
}

impl AcquisitionRequest {
    /// Body of the download submission; exactly one locator field is set.
    pub fn to_download_request(&self) -> DownloadRequest {
        let (magnet_uri, link) = match &self.candidate.locator {
            DownloadLocator::Magnet(uri) => (Some(uri.clone()), None),
            DownloadLocator::HttpLink(url) => (None, Some(url.clone())),
        };
        DownloadRequest {
            magnet_uri,
            link,
            code: self.identifier.clone(),
            title: self.title.clone(),
            size: self.candidate.size_bytes,
            tracker: self.candidate.tracker.clone(),
        }
    }
}

/// Outcome of a successful resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolveOutcome {
    CandidatesReady { candidates: Vec<TorrentCandidate> },
    /// The identifier is already in the local library; nothing to pick.
    AlreadyExists { message: String },
}

/// Lifecycle of one identifier:
/// `idle -> resolving -> {candidates_ready | already_exists | resolve_failed}
/// -> submitting -> {submitted | submit_failed}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AcquisitionState {
    #[default]
    Idle,
    Resolving,
    CandidatesReady {
        candidates: Vec<TorrentCandidate>,
    },
    AlreadyExists {
        message: String,
    },
    ResolveFailed {
        reason: String,
    },
    Submitting {
        candidates: Vec<TorrentCandidate>,
        request: AcquisitionRequest,
    },
    Submitted {
        request: AcquisitionRequest,
    },
    /// Retryable: the candidate list is kept.
    SubmitFailed {
        candidates: Vec<TorrentCandidate>,
        reason: String,
    },
}

impl AcquisitionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "idle",
            AcquisitionState::Resolving => "resolving",
            AcquisitionState::CandidatesReady { .. } => "candidates_ready",
            AcquisitionState::AlreadyExists { .. } => "already_exists",
            AcquisitionState::ResolveFailed { .. } => "resolve_failed",
            AcquisitionState::Submitting { .. } => "submitting",
            AcquisitionState::Submitted { .. } => "submitted",
            AcquisitionState::SubmitFailed { .. } => "submit_failed",
        }
    }

    /// Whether a network call for this identifier is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AcquisitionState::Resolving | AcquisitionState::Submitting { .. }
        )
    }

    /// Candidates a submit may pick from, if any.
    pub fn candidates(&self) -> Option<&[TorrentCandidate]> {
        match self {
            AcquisitionState::CandidatesReady { candidates }
            | AcquisitionState::SubmitFailed { candidates, .. } => Some(candidates),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_magnet_wins() {
        let locator = DownloadLocator::from_parts("magnet:?xt=urn:btih:abc", "http://x/t.torrent");
        assert_eq!(
            locator,
            Some(DownloadLocator::Magnet("magnet:?xt=urn:btih:abc".to_string()))
        );
    }

    #[test]
    fn test_locator_falls_back_to_link() {
        let locator = DownloadLocator::from_parts("  ", "http://x/t.torrent");
        assert_eq!(
            locator,
            Some(DownloadLocator::HttpLink("http://x/t.torrent".to_string()))
        );
        assert_eq!(DownloadLocator::from_parts("", ""), None);
    }

    #[test]
    fn test_candidate_from_listing_without_locator() {
        let listing = TorrentListing {
            title: "no link".to_string(),
            ..Default::default()
        };
        assert!(TorrentCandidate::from_listing(listing).is_none());
    }

    #[test]
    fn test_candidate_from_listing_normalizes() {
        let listing = TorrentListing {
            title: "ABC-123".to_string(),
            size: -1,
            seeders: -3,
            leechers: 4,
            link: "http://x/t.torrent".to_string(),
            tracker: "".to_string(),
            ..Default::default()
        };
        let candidate = TorrentCandidate::from_listing(listing).unwrap();
        assert_eq!(candidate.size_bytes, 0);
        assert_eq!(candidate.seeders, 0);
        assert_eq!(candidate.leechers, 4);
        assert_eq!(candidate.tracker, None);
        assert!(!candidate.locator.is_magnet());
    }

    #[test]
    fn test_download_request_has_one_locator() {
        let request = AcquisitionRequest {
            identifier: "ABC-123".to_string(),
            title: "ABC-123 1080p".to_string(),
            candidate: TorrentCandidate {
                title: "ABC-123 1080p".to_string(),
                size_bytes: 2_000,
                seeders: 1,
                leechers: 0,
                tracker: Some("tracker".to_string()),
                locator: DownloadLocator::HttpLink("http://x/t.torrent".to_string()),
                size_formatted: None,
                publish_date: None,
            },
        };
        let body = request.to_download_request();
        assert_eq!(body.magnet_uri, None);
        assert_eq!(body.link.as_deref(), Some("http://x/t.torrent"));
        assert_eq!(body.code, "ABC-123");
        assert_eq!(body.size, 2_000);
        assert_eq!(body.tracker.as_deref(), Some("tracker"));
    }

    #[test]
    fn test_state_serialization() {
        let value = serde_json::to_value(AcquisitionState::AlreadyExists {
            message: "in library".to_string(),
        })
        .unwrap();
        assert_eq!(value["state"], "already_exists");
        assert_eq!(value["message"], "in library");

        let value = serde_json::to_value(AcquisitionState::Idle).unwrap();
        assert_eq!(value["state"], "idle");
    }
}
