use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::TorrentBackend;

use super::resolver::rank_candidates;
use super::{AcquireError, TorrentCandidate};

/// Free-text torrent search, one at a time.
pub struct TorrentFinder {
    backend: Arc<dyn TorrentBackend>,
    searching: AtomicBool,
}

/// Clears the searching flag when the search ends, however it ends.
struct Searching<'a>(&'a AtomicBool);

impl Drop for Searching<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TorrentFinder {
    pub fn new(backend: Arc<dyn TorrentBackend>) -> Self {
        Self {
            backend,
            searching: AtomicBool::new(false),
        }
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }

    /// Search torrents by free text, ranked like resolved candidates.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<TorrentCandidate>, AcquireError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AcquireError::InvalidInput(
                "search query cannot be empty".to_string(),
            ));
        }

        if self
            .searching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AcquireError::Busy);
        }
        let _searching = Searching(&self.searching);

        debug!(query = %query, page, "Searching torrents");
        let listings = self
            .backend
            .search_torrents(query, page.max(1))
            .await
            .map_err(|e| {
                warn!(query = %query, error = %e, "Torrent search failed");
                AcquireError::RequestFailed(e)
            })?;

        Ok(rank_candidates(listings))
    }
}
