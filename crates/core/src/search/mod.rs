//! Multi-source search.
//!
//! One user query fans out to the local library, the ranking lists and the
//! metadata provider. Local and rankings share one combined backend request;
//! the provider runs concurrently and is allowed to fail. Results are merged
//! source by source without cross-source ranking.

mod coordinator;
mod merger;
mod suggest;
mod types;

pub use coordinator::{SearchCoordinator, SearchSession};
pub use merger::merge;
pub use suggest::{SuggestionDebouncer, SuggestionUpdate};
pub use types::*;
