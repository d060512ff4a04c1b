//! Testing utilities and mock implementations.
//!
//! `MockBackend` implements both backend seams so every component can be
//! driven headlessly, including under paused tokio time.
//!
//! # Example
//!
//! ```rust,ignore
//! use curator_core::testing::{fixtures, MockBackend};
//!
//! let backend = Arc::new(MockBackend::new());
//! backend.set_code_results(vec![fixtures::listing("ABC-123 1080p", 2048, 30)]).await;
//! backend.echo_downloads("PornDB").await;
//!
//! let desk = AcquisitionDesk::new(backend.clone());
//! // ...
//! ```

mod mock_backend;

pub use mock_backend::{LibraryCall, MockBackend, ProviderCall, RecordedCall, SuggestionCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::acquire::TorrentCandidate;
    use crate::backend::{
        BackendError, LibraryMovie, LibraryPage, ProviderActor, ProviderMovie, ProviderPayload,
        RankingItem, StatusEntry, TorrentListing,
    };

    const MB: i64 = 1024 * 1024;

    /// Library page with one local file per `local` code and one ranking
    /// entry per `rankings` code.
    pub fn library_page(local: &[&str], rankings: &[&str]) -> LibraryPage {
        LibraryPage {
            local_movies: local
                .iter()
                .enumerate()
                .map(|(i, code)| LibraryMovie {
                    id: i as u64 + 1,
                    title: format!("{} local title", code),
                    code: code.to_string(),
                    actress: "Someone".to_string(),
                    path: format!("/media/{}.mp4", code),
                    size: 1024 * MB,
                    format: "mp4".to_string(),
                    has_fanart: false,
                    fanart_url: String::new(),
                })
                .collect(),
            rankings: rankings
                .iter()
                .enumerate()
                .map(|(i, code)| RankingItem {
                    id: i as u64 + 1,
                    code: code.to_string(),
                    title: format!("{} ranked title", code),
                    cover_url: String::new(),
                    rank_type: "daily".to_string(),
                    position: i as i64 + 1,
                    rating: None,
                    local_exists: false,
                })
                .collect(),
            total: (local.len() + rankings.len()) as u32,
            page: 1,
            limit: 20,
            query: String::new(),
        }
    }

    /// Metadata-provider movie hit.
    pub fn provider_movie(code: &str, rating: f64) -> ProviderPayload {
        ProviderPayload::Movie(ProviderMovie {
            code: code.to_string(),
            title: format!("{} provider title", code),
            cover_url: format!("https://covers.example/{}.jpg", code),
            rating,
            release_date: "2024-01-01".to_string(),
            detail_url: format!("https://provider.example/v/{}", code),
        })
    }

    /// Metadata-provider actor hit with a filmography.
    pub fn provider_actor(name: &str, codes: &[&str]) -> ProviderPayload {
        ProviderPayload::Actor(ProviderActor {
            name: name.to_string(),
            avatar_url: String::new(),
            detail_url: format!("https://provider.example/a/{}", name),
            movie_count: codes.len() as u32,
            movies: codes
                .iter()
                .map(|code| ProviderMovie {
                    code: code.to_string(),
                    title: code.to_string(),
                    ..Default::default()
                })
                .collect(),
        })
    }

    /// Torrent listing with a magnet URI; size in MiB.
    pub fn listing(title: &str, size_mb: i64, seeders: i64) -> TorrentListing {
        let hash = title
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        TorrentListing {
            title: title.to_string(),
            size: size_mb * MB,
            size_formatted: format!("{} MB", size_mb),
            seeders,
            leechers: seeders / 2,
            magnet_uri: format!("magnet:?xt=urn:btih:{:040x}", hash),
            info_hash: format!("{:040x}", hash),
            tracker: "mock-tracker".to_string(),
            ..Default::default()
        }
    }

    /// Acquirable candidate equivalent to `listing(title, size_mb, 10)`.
    pub fn candidate(title: &str, size_mb: i64) -> TorrentCandidate {
        TorrentCandidate::from_listing(listing(title, size_mb, 10))
            .unwrap_or_else(|| unreachable!("fixture listings always carry a magnet"))
    }

    /// The backend's "already exists" answer.
    pub fn conflict(message: &str) -> BackendError {
        BackendError::Status {
            status: 409,
            message: message.to_string(),
        }
    }

    /// Raw download-client task.
    pub fn status_entry(hash: &str, state: &str, tags: &str) -> StatusEntry {
        StatusEntry {
            hash: hash.to_string(),
            name: format!("task {}", hash),
            size: 1024 * MB,
            state: state.to_string(),
            progress: 0.25,
            dlspeed: 1024,
            eta: 600,
            tags: tags.to_string(),
        }
    }
}
