//! Media backend transport.
//!
//! The engine reaches its three search sources, the torrent indexer proxy and
//! the download client through one HTTP backend. This module defines the two
//! seams (`CatalogBackend`, `TorrentBackend`) and the reqwest implementation.

mod http;
mod types;

pub use http::HttpBackend;
pub use types::*;
