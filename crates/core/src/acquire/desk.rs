//! Per-identifier resolve/submit lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::backend::TorrentBackend;
use crate::metrics;
use crate::monitor::DownloadMonitor;

use super::resolver::{best_candidate, rank_candidates, validate_identifier};
use super::{AcquireError, AcquisitionRequest, AcquisitionState, ResolveOutcome, TorrentCandidate};

/// Resolves identifiers to torrent candidates and submits the chosen one.
///
/// Each identifier moves through [`AcquisitionState`] independently; a second
/// resolve or submit while one is in flight for the same identifier is
/// rejected with `Busy`. Duplicate protection is left to the backend, which
/// answers 409 for identifiers it already has.
pub struct AcquisitionDesk {
    backend: Arc<dyn TorrentBackend>,
    states: Mutex<HashMap<String, AcquisitionState>>,
    monitor: Option<Arc<DownloadMonitor>>,
}

impl AcquisitionDesk {
    pub fn new(backend: Arc<dyn TorrentBackend>) -> Self {
        Self {
            backend,
            states: Mutex::new(HashMap::new()),
            monitor: None,
        }
    }

    /// Ask `monitor` for an out-of-cycle refresh after each successful submit.
    pub fn with_monitor(mut self, monitor: Arc<DownloadMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, AcquisitionState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state of an identifier (`Idle` if never seen).
    pub fn state(&self, identifier: &str) -> AcquisitionState {
        self.states()
            .get(identifier.trim())
            .cloned()
            .unwrap_or_default()
    }

    /// Discard the identifier's candidate list and return it to `Idle`.
    /// A call still in flight finishes but its outcome is dropped.
    pub fn dismiss(&self, identifier: &str) {
        if self.states().remove(identifier.trim()).is_some() {
            debug!(identifier = %identifier.trim(), "Dismissed acquisition");
        }
    }

    /// Write `next` only if the identifier is still in the state `expected`
    /// names, so dismissed calls do not resurrect an entry.
    fn settle(&self, identifier: &str, expected: &'static str, next: AcquisitionState) {
        let mut states = self.states();
        match states.get_mut(identifier) {
            Some(state) if state.as_str() == expected => *state = next,
            _ => debug!(identifier = %identifier, "Dropping outcome of dismissed acquisition"),
        }
    }

    /// Query the torrent index for `identifier`.
    pub async fn resolve(&self, identifier: &str) -> Result<ResolveOutcome, AcquireError> {
        let identifier = validate_identifier(identifier)?;

        {
            let mut states = self.states();
            if states.get(&identifier).is_some_and(AcquisitionState::is_busy) {
                return Err(AcquireError::Busy);
            }
            states.insert(identifier.clone(), AcquisitionState::Resolving);
        }

        info!(identifier = %identifier, "Resolving torrent candidates");
        let result = self.backend.search_by_code(&identifier).await;

        let (outcome, next) = match result {
            Ok(listings) => {
                let listed = listings.len();
                let candidates = rank_candidates(listings);
                if candidates.is_empty() {
                    debug!(identifier = %identifier, listed, "No acquirable candidates");
                    (
                        Err(AcquireError::NoCandidates),
                        AcquisitionState::ResolveFailed {
                            reason: "no candidates".to_string(),
                        },
                    )
                } else {
                    info!(
                        identifier = %identifier,
                        candidates = candidates.len(),
                        "Candidates ready"
                    );
                    (
                        Ok(ResolveOutcome::CandidatesReady {
                            candidates: candidates.clone(),
                        }),
                        AcquisitionState::CandidatesReady { candidates },
                    )
                }
            }
            Err(e) if e.is_conflict() => {
                let message = e.message();
                info!(identifier = %identifier, "Identifier already exists locally");
                (
                    Ok(ResolveOutcome::AlreadyExists {
                        message: message.clone(),
                    }),
                    AcquisitionState::AlreadyExists { message },
                )
            }
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "Resolve failed");
                let reason = e.message();
                (
                    Err(AcquireError::RequestFailed(e)),
                    AcquisitionState::ResolveFailed { reason },
                )
            }
        };

        metrics::RESOLVES_TOTAL
            .with_label_values(&[match &outcome {
                Ok(ResolveOutcome::CandidatesReady { .. }) => "candidates_ready",
                Ok(ResolveOutcome::AlreadyExists { .. }) => "already_exists",
                Err(AcquireError::NoCandidates) => "no_candidates",
                Err(_) => "failed",
            }])
            .inc();

        self.settle(&identifier, "resolving", next);
        outcome
    }

    /// Submit `candidate`, which must come from the identifier's resolved list.
    pub async fn submit(
        &self,
        identifier: &str,
        candidate: &TorrentCandidate,
    ) -> Result<AcquisitionRequest, AcquireError> {
        let identifier = validate_identifier(identifier)?;

        let (request, candidates) = {
            let mut states = self.states();
            let state = states.get(&identifier).cloned().unwrap_or_default();
            let candidates = match &state {
                s if s.is_busy() => return Err(AcquireError::Busy),
                AcquisitionState::AlreadyExists { message } => {
                    return Err(AcquireError::AlreadyExists(message.clone()))
                }
                s => match s.candidates() {
                    Some(candidates) => candidates.to_vec(),
                    None => {
                        return Err(AcquireError::NotResolved(format!(
                            "'{}' has no candidate list ({})",
                            identifier,
                            s.as_str()
                        )))
                    }
                },
            };
            if !candidates.contains(candidate) {
                return Err(AcquireError::InvalidInput(
                    "candidate is not in the resolved list".to_string(),
                ));
            }

            let request = AcquisitionRequest {
                identifier: identifier.clone(),
                title: candidate.title.clone(),
                candidate: candidate.clone(),
            };
            states.insert(
                identifier.clone(),
                AcquisitionState::Submitting {
                    candidates: candidates.clone(),
                    request: request.clone(),
                },
            );
            (request, candidates)
        };

        info!(
            identifier = %identifier,
            title = %request.title,
            magnet = request.candidate.locator.is_magnet(),
            "Submitting acquisition"
        );
        let result = self.backend.download(&request.to_download_request()).await;

        let (outcome, next) = match result {
            Ok(()) => {
                info!(identifier = %identifier, "Acquisition submitted");
                (
                    Ok(request.clone()),
                    AcquisitionState::Submitted { request },
                )
            }
            Err(e) if e.is_conflict() => {
                let message = e.message();
                info!(identifier = %identifier, "Backend reports identifier already acquired");
                (
                    Err(AcquireError::AlreadyExists(message.clone())),
                    AcquisitionState::AlreadyExists { message },
                )
            }
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "Submit failed");
                let reason = e.message();
                (
                    Err(AcquireError::RequestFailed(e)),
                    AcquisitionState::SubmitFailed { candidates, reason },
                )
            }
        };

        metrics::SUBMITS_TOTAL
            .with_label_values(&[match &outcome {
                Ok(_) => "submitted",
                Err(AcquireError::AlreadyExists(_)) => "already_exists",
                Err(_) => "failed",
            }])
            .inc();

        self.settle(&identifier, "submitting", next);

        if outcome.is_ok() {
            if let Some(monitor) = &self.monitor {
                monitor.refresh_soon();
            }
        }
        outcome
    }

    /// Submit the candidate at `index` of the identifier's resolved list.
    pub async fn submit_index(
        &self,
        identifier: &str,
        index: usize,
    ) -> Result<AcquisitionRequest, AcquireError> {
        let state = self.state(identifier);
        let candidate = match state.candidates() {
            Some(candidates) => candidates.get(index).cloned().ok_or_else(|| {
                AcquireError::InvalidInput(format!(
                    "candidate index {} out of range (0..{})",
                    index,
                    candidates.len()
                ))
            })?,
            None if state.is_busy() => return Err(AcquireError::Busy),
            None => match state {
                AcquisitionState::AlreadyExists { message } => {
                    return Err(AcquireError::AlreadyExists(message))
                }
                other => {
                    return Err(AcquireError::NotResolved(format!(
                        "no candidate list ({})",
                        other.as_str()
                    )))
                }
            },
        };
        self.submit(identifier, &candidate).await
    }

    /// Resolve `identifier` and submit its best candidate in one step.
    ///
    /// An identifier the backend already holds fails with `AlreadyExists`
    /// and nothing is submitted.
    pub async fn acquire_best(
        &self,
        identifier: &str,
    ) -> Result<AcquisitionRequest, AcquireError> {
        let candidates = match self.resolve(identifier).await? {
            ResolveOutcome::CandidatesReady { candidates } => candidates,
            ResolveOutcome::AlreadyExists { message } => {
                return Err(AcquireError::AlreadyExists(message))
            }
        };
        let best = best_candidate(&candidates).ok_or(AcquireError::NoCandidates)?;
        debug!(identifier = %identifier.trim(), title = %best.title, "Picked best candidate");
        self.submit(identifier, best).await
    }
}
