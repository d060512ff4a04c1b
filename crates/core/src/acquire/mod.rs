//! Torrent candidate resolution and acquisition.
//!
//! An identifier is resolved against the torrent index, the user picks one of
//! the ranked candidates, and the pick is submitted to the download client.

mod desk;
mod finder;
mod resolver;
mod types;

pub use desk::AcquisitionDesk;
pub use finder::TorrentFinder;
pub use resolver::{best_candidate, rank_candidates, validate_identifier};
pub use types::*;
