//! Types for the download monitor.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::backend::{BackendError, StatusEntry};

/// The client reports this ETA for "unknown" (100 days).
const ETA_INFINITY_SECS: i64 = 8_640_000;

/// Errors from a status poll.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No download client configured or running.
    #[error("Download client unavailable")]
    ClientUnavailable,

    #[error("Status request failed: {0}")]
    RequestFailed(#[from] BackendError),
}

/// Errors from a control action.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// State of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Downloading,
    Paused,
    Stalled,
    Seeding,
    Completed,
    Error,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Queued => "queued",
            TaskState::Downloading => "downloading",
            TaskState::Paused => "paused",
            TaskState::Stalled => "stalled",
            TaskState::Seeding => "seeding",
            TaskState::Completed => "completed",
            TaskState::Error => "error",
        }
    }

    /// Whether the payload is fully on disk.
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Seeding)
    }
}

/// Map the download client's raw state string.
pub fn parse_client_state(state: &str) -> TaskState {
    match state {
        "downloading" | "forcedDL" | "metaDL" | "forcedMetaDL" | "allocating" => {
            TaskState::Downloading
        }
        "uploading" | "forcedUP" | "stalledUP" | "queuedUP" | "checkingUP" | "seeding" => {
            TaskState::Seeding
        }
        "pausedDL" | "stoppedDL" | "paused" => TaskState::Paused,
        "pausedUP" | "stoppedUP" | "completed" => TaskState::Completed,
        "queuedDL" | "checkingDL" | "checkingResumeData" | "moving" | "queued" => {
            TaskState::Queued
        }
        "stalledDL" | "stalled" => TaskState::Stalled,
        "error" | "missingFiles" => TaskState::Error,
        other => {
            debug!(state = other, "Unknown download client state, treating as queued");
            TaskState::Queued
        }
    }
}

/// One task of the download client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Info hash (lowercase); stable across polls.
    pub hash: String,
    pub name: String,
    pub size_bytes: u64,
    pub state: TaskState,
    /// 0.0 - 1.0
    pub progress: f64,
    pub download_speed_bps: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
    pub tags: BTreeSet<String>,
}

impl DownloadTask {
    pub fn from_entry(entry: StatusEntry) -> Self {
        let progress = if entry.progress.is_finite() {
            entry.progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            hash: entry.hash.to_lowercase(),
            name: entry.name,
            size_bytes: entry.size.max(0) as u64,
            state: parse_client_state(&entry.state),
            progress,
            download_speed_bps: entry.dlspeed.max(0) as u64,
            eta_seconds: if entry.eta > 0 && entry.eta < ETA_INFINITY_SECS {
                Some(entry.eta as u64)
            } else {
                None
            },
            tags: parse_tags(&entry.tags),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

fn parse_tags(tags: &str) -> BTreeSet<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Aggregates over the owned tasks of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub total: usize,
    pub downloading: usize,
    /// Completed or seeding.
    pub finished: usize,
    pub other: usize,
    pub download_speed_bps: u64,
}

impl DownloadStats {
    pub fn from_tasks(tasks: &[DownloadTask]) -> Self {
        let mut stats = DownloadStats {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            match task.state {
                TaskState::Downloading => stats.downloading += 1,
                s if s.is_finished() => stats.finished += 1,
                _ => stats.other += 1,
            }
            stats.download_speed_bps = stats
                .download_speed_bps
                .saturating_add(task.download_speed_bps);
        }
        stats
    }
}

/// The owned tasks as of one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Increases with every published snapshot.
    pub sequence: u64,
    pub tasks: Vec<DownloadTask>,
    pub stats: DownloadStats,
}

impl DownloadSnapshot {
    /// Build a snapshot from the raw task list, keeping only tasks tagged
    /// `ownership_tag`. Client order is preserved.
    pub fn from_entries(entries: Vec<StatusEntry>, ownership_tag: &str, sequence: u64) -> Self {
        let tasks: Vec<DownloadTask> = entries
            .into_iter()
            .map(DownloadTask::from_entry)
            .filter(|t| t.has_tag(ownership_tag))
            .collect();
        let stats = DownloadStats::from_tasks(&tasks);
        Self {
            taken_at: Utc::now(),
            sequence,
            tasks,
            stats,
        }
    }

    pub fn task(&self, hash: &str) -> Option<&DownloadTask> {
        let hash = hash.to_lowercase();
        self.tasks.iter().find(|t| t.hash == hash)
    }

    /// Differences from `previous`, matched by hash: additions and state
    /// changes in this snapshot's order, then removals in `previous`'s order.
    pub fn changes_since(&self, previous: &DownloadSnapshot) -> Vec<TaskChange> {
        let before: HashMap<&str, &DownloadTask> = previous
            .tasks
            .iter()
            .map(|t| (t.hash.as_str(), t))
            .collect();
        let after: HashMap<&str, &DownloadTask> =
            self.tasks.iter().map(|t| (t.hash.as_str(), t)).collect();

        let mut changes = Vec::new();
        for task in &self.tasks {
            match before.get(task.hash.as_str()) {
                None => changes.push(TaskChange::Added {
                    hash: task.hash.clone(),
                    name: task.name.clone(),
                }),
                Some(old) if old.state != task.state => changes.push(TaskChange::StateChanged {
                    hash: task.hash.clone(),
                    from: old.state,
                    to: task.state,
                }),
                Some(_) => {}
            }
        }
        for task in &previous.tasks {
            if !after.contains_key(task.hash.as_str()) {
                changes.push(TaskChange::Removed {
                    hash: task.hash.clone(),
                    name: task.name.clone(),
                });
            }
        }
        changes
    }
}

/// A per-task difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum TaskChange {
    Added {
        hash: String,
        name: String,
    },
    Removed {
        hash: String,
        name: String,
    },
    StateChanged {
        hash: String,
        from: TaskState,
        to: TaskState,
    },
}

/// What consumers of the monitor see.
#[derive(Debug, Clone, Default)]
pub enum MonitorView {
    /// No poll has completed yet.
    #[default]
    Pending,
    Ready(Arc<DownloadSnapshot>),
    /// The backend has no download client; show a configuration prompt.
    ClientUnavailable,
    /// The last poll failed for another reason.
    Unreachable { message: String },
}

impl MonitorView {
    pub fn snapshot(&self) -> Option<&Arc<DownloadSnapshot>> {
        match self {
            MonitorView::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorView::Pending => "pending",
            MonitorView::Ready(_) => "ready",
            MonitorView::ClientUnavailable => "client_unavailable",
            MonitorView::Unreachable { .. } => "unreachable",
        }
    }
}
