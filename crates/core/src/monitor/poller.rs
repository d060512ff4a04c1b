//! Periodic reconciliation against the download client.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::TorrentBackend;
use crate::config::MonitorConfig;
use crate::metrics;
use crate::schedule::ScheduledTask;

use super::{DownloadSnapshot, MonitorError, MonitorView};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Polls the download client and publishes the owned tasks.
///
/// The interval loop and out-of-cycle refreshes write to the same watch
/// slot; the last poll to finish wins. A refresh never cancels a poll that is
/// already running.
pub struct DownloadMonitor {
    backend: Arc<dyn TorrentBackend>,
    poll_interval: Duration,
    refresh_delay: Duration,
    ownership_tag: String,
    view: watch::Sender<MonitorView>,
    /// Sequence of the last published snapshot; held while publishing.
    published: Mutex<u64>,
    interval_task: Mutex<Option<ScheduledTask>>,
    refreshes: Mutex<Vec<ScheduledTask>>,
}

impl DownloadMonitor {
    pub fn new(backend: Arc<dyn TorrentBackend>, config: &MonitorConfig) -> Self {
        let (view, _) = watch::channel(MonitorView::Pending);
        Self {
            backend,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            refresh_delay: Duration::from_millis(config.refresh_delay_ms),
            ownership_tag: config.ownership_tag.clone(),
            view,
            published: Mutex::new(0),
            interval_task: Mutex::new(None),
            refreshes: Mutex::new(Vec::new()),
        }
    }

    pub fn ownership_tag(&self) -> &str {
        &self.ownership_tag
    }

    /// Receiver that observes every published view.
    pub fn subscribe(&self) -> watch::Receiver<MonitorView> {
        self.view.subscribe()
    }

    /// Current view.
    pub fn view(&self) -> MonitorView {
        self.view.borrow().clone()
    }

    /// Latest snapshot, if the last poll succeeded.
    pub fn latest(&self) -> Option<Arc<DownloadSnapshot>> {
        self.view.borrow().snapshot().cloned()
    }

    /// Poll once and publish the outcome.
    pub async fn poll(&self) -> Result<Arc<DownloadSnapshot>, MonitorError> {
        let result = self.backend.status().await;

        let mut sequence = lock(&self.published);
        match result {
            Ok(entries) => {
                *sequence += 1;
                let snapshot = Arc::new(DownloadSnapshot::from_entries(
                    entries,
                    &self.ownership_tag,
                    *sequence,
                ));
                self.view.send_replace(MonitorView::Ready(snapshot.clone()));

                metrics::MONITOR_POLLS.with_label_values(&["ok"]).inc();
                metrics::TASKS_OWNED.set(snapshot.stats.total as i64);
                debug!(
                    sequence = snapshot.sequence,
                    tasks = snapshot.stats.total,
                    "Published download snapshot"
                );
                Ok(snapshot)
            }
            Err(e) if e.is_not_found() => {
                self.view.send_replace(MonitorView::ClientUnavailable);
                metrics::MONITOR_POLLS
                    .with_label_values(&["client_unavailable"])
                    .inc();
                warn!("Download client unavailable");
                Err(MonitorError::ClientUnavailable)
            }
            Err(e) => {
                self.view.send_replace(MonitorView::Unreachable {
                    message: e.message(),
                });
                metrics::MONITOR_POLLS.with_label_values(&["failed"]).inc();
                warn!(error = %e, "Download status poll failed");
                Err(MonitorError::RequestFailed(e))
            }
        }
    }

    /// Start the interval loop; the first poll runs immediately. No-op if
    /// already running.
    pub fn start(self: &Arc<Self>) {
        let mut interval_task = lock(&self.interval_task);
        if interval_task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            tag = %self.ownership_tag,
            "Starting download monitor"
        );
        let monitor: Weak<Self> = Arc::downgrade(self);
        *interval_task = Some(ScheduledTask::every(self.poll_interval, move || {
            let monitor = monitor.clone();
            async move {
                if let Some(monitor) = monitor.upgrade() {
                    let _ = monitor.poll().await;
                }
            }
        }));
    }

    /// Stop the loop and cancel every pending refresh.
    pub fn stop(&self) {
        if let Some(task) = lock(&self.interval_task).take() {
            task.cancel();
            info!("Stopped download monitor");
        }
        for task in lock(&self.refreshes).drain(..) {
            task.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.interval_task)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Schedule one out-of-cycle poll after the settle delay.
    pub fn refresh_soon(self: &Arc<Self>) {
        let monitor: Weak<Self> = Arc::downgrade(self);
        let task = ScheduledTask::after(self.refresh_delay, async move {
            if let Some(monitor) = monitor.upgrade() {
                debug!("Out-of-cycle refresh");
                let _ = monitor.poll().await;
            }
        });

        let mut refreshes = lock(&self.refreshes);
        refreshes.retain(|t| !t.is_finished());
        refreshes.push(task);
    }

    /// Refreshes scheduled and not yet finished.
    pub fn pending_refreshes(&self) -> usize {
        lock(&self.refreshes)
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }
}

impl Drop for DownloadMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
