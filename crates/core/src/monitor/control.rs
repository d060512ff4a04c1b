use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{ControlAction, TorrentBackend};
use crate::metrics;

use super::{ControlError, DownloadMonitor};

/// Forwards pause/resume/delete to the download client.
///
/// Never touches the published snapshot; a successful action schedules a
/// monitor refresh instead.
pub struct ControlDispatcher {
    backend: Arc<dyn TorrentBackend>,
    monitor: Option<Arc<DownloadMonitor>>,
}

impl ControlDispatcher {
    pub fn new(backend: Arc<dyn TorrentBackend>) -> Self {
        Self {
            backend,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<DownloadMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub async fn control(&self, hash: &str, action: ControlAction) -> Result<(), ControlError> {
        let hash = hash.trim();
        if hash.is_empty() {
            return Err(ControlError::InvalidInput(
                "task hash cannot be empty".to_string(),
            ));
        }

        let result = self.backend.control(hash, action).await;
        metrics::CONTROL_ACTIONS
            .with_label_values(&[action.as_str(), if result.is_ok() { "ok" } else { "error" }])
            .inc();

        match result {
            Ok(()) => {
                info!(hash = %hash, action = action.as_str(), "Control action applied");
                if let Some(monitor) = &self.monitor {
                    monitor.refresh_soon();
                }
                Ok(())
            }
            Err(e) => {
                warn!(hash = %hash, action = action.as_str(), error = %e, "Control action failed");
                Err(ControlError::Backend(e))
            }
        }
    }
}
