use crate::backend::TorrentListing;

use super::{AcquireError, TorrentCandidate};

const MAX_IDENTIFIER_CHARS: usize = 64;

/// Validate a media identifier, returning it trimmed (case preserved).
pub fn validate_identifier(raw: &str) -> Result<String, AcquireError> {
    let identifier = raw.trim();
    if identifier.is_empty() {
        return Err(AcquireError::InvalidInput(
            "identifier cannot be empty".to_string(),
        ));
    }
    if identifier.chars().count() > MAX_IDENTIFIER_CHARS {
        return Err(AcquireError::InvalidInput(format!(
            "identifier longer than {} characters",
            MAX_IDENTIFIER_CHARS
        )));
    }
    if identifier
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(AcquireError::InvalidInput(format!(
            "identifier '{}' contains whitespace or control characters",
            identifier.escape_debug()
        )));
    }
    Ok(identifier.to_string())
}

/// Keep acquirable listings and order them largest first, more seeders
/// breaking ties. Full ties keep the backend's order.
pub fn rank_candidates(listings: Vec<TorrentListing>) -> Vec<TorrentCandidate> {
    let mut candidates: Vec<TorrentCandidate> = listings
        .into_iter()
        .filter_map(TorrentCandidate::from_listing)
        .collect();
    candidates.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then_with(|| b.seeders.cmp(&a.seeders))
    });
    candidates
}

/// First acquirable candidate of a ranked list.
pub fn best_candidate(candidates: &[TorrentCandidate]) -> Option<&TorrentCandidate> {
    candidates.first()
}
