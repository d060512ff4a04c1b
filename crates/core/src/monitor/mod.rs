//! Download monitoring and control.
//!
//! The monitor polls the download client on a fixed interval, keeps only the
//! tasks carrying the ownership tag, and publishes each result as a whole
//! snapshot. Control actions go straight to the client and trigger a refresh.

mod control;
mod poller;
mod types;

pub use crate::backend::ControlAction;
pub use control::ControlDispatcher;
pub use poller::DownloadMonitor;
pub use types::*;
