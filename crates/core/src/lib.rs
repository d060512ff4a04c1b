pub mod acquire;
pub mod backend;
pub mod config;
pub mod metrics;
pub mod monitor;
pub mod schedule;
pub mod search;
pub mod testing;

pub use acquire::{
    AcquireError, AcquisitionDesk, AcquisitionRequest, AcquisitionState, DownloadLocator,
    ResolveOutcome, TorrentCandidate, TorrentFinder,
};
pub use backend::{BackendError, CatalogBackend, HttpBackend, TorrentBackend};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use monitor::{
    ControlAction, ControlDispatcher, ControlError, DownloadMonitor, DownloadSnapshot,
    DownloadTask, MonitorError, MonitorView, TaskState,
};
pub use search::{
    AggregatedResultSet, SearchCoordinator, SearchError, SearchQuery, SourceFlags,
    SuggestionDebouncer, SuggestionUpdate,
};
