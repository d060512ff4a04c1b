use std::sync::Arc;

use tokio::sync::mpsc;

use curator_core::{
    AcquisitionDesk, CatalogBackend, Config, ControlDispatcher, DownloadMonitor, SanitizedConfig,
    SearchCoordinator, SuggestionDebouncer, SuggestionUpdate, TorrentBackend, TorrentFinder,
};

/// Shared application state
pub struct AppState {
    config: Config,
    catalog: Arc<dyn CatalogBackend>,
    coordinator: SearchCoordinator,
    desk: AcquisitionDesk,
    finder: TorrentFinder,
    monitor: Arc<DownloadMonitor>,
    dispatcher: ControlDispatcher,
}

impl AppState {
    /// Wire every component to one backend that serves both the catalog and
    /// the torrent endpoints.
    pub fn new<B>(config: Config, backend: Arc<B>) -> Self
    where
        B: CatalogBackend + TorrentBackend + 'static,
    {
        let catalog: Arc<dyn CatalogBackend> = backend.clone();
        let torrents: Arc<dyn TorrentBackend> = backend;

        let monitor = Arc::new(DownloadMonitor::new(torrents.clone(), &config.monitor));
        let coordinator = SearchCoordinator::new(catalog.clone(), &config.search);
        let desk = AcquisitionDesk::new(torrents.clone()).with_monitor(monitor.clone());
        let finder = TorrentFinder::new(torrents.clone());
        let dispatcher = ControlDispatcher::new(torrents).with_monitor(monitor.clone());

        Self {
            config,
            catalog,
            coordinator,
            desk,
            finder,
            monitor,
            dispatcher,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn coordinator(&self) -> &SearchCoordinator {
        &self.coordinator
    }

    /// A fresh debouncer; each suggestion socket owns one.
    pub fn suggestion_debouncer(
        &self,
    ) -> (SuggestionDebouncer, mpsc::UnboundedReceiver<SuggestionUpdate>) {
        SuggestionDebouncer::new(self.catalog.clone(), &self.config.suggestions)
    }

    pub fn desk(&self) -> &AcquisitionDesk {
        &self.desk
    }

    pub fn finder(&self) -> &TorrentFinder {
        &self.finder
    }

    pub fn monitor(&self) -> &Arc<DownloadMonitor> {
        &self.monitor
    }

    pub fn dispatcher(&self) -> &ControlDispatcher {
        &self.dispatcher
    }
}
