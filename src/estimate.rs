//! Debounced cost estimation.
//!
//! [`CostEstimator`] shadows the draft box: edits and settings changes
//! schedule a delayed `POST /api/estimate-cost`, and only the response that
//! matches the latest scheduled request is ever published. The estimate is
//! advisory; estimation failures clear it and are otherwise silent.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::client::Transport;
use crate::observability::{ESTIMATE_ERRORS, ESTIMATE_REQUESTS, ESTIMATE_STALE_DROPPED};
use crate::types::{CostEstimate, CostEstimateRequest, HistoryEntry, Settings};

/// Quiet period after the last draft edit before an estimate is requested.
pub const DRAFT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Delay after a settings change with a non-empty draft.
pub const SETTINGS_DELAY: Duration = Duration::from_millis(300);

/// Shared between the estimator and its in-flight tasks.
///
/// The generation counter is bumped by every schedule and every clear; a
/// task compares its own generation before firing the request and again
/// before publishing, so a superseded task can never overwrite a newer
/// result.
struct EstimatorState {
    generation: AtomicU64,
    estimate: Mutex<Option<CostEstimate>>,
    enabled: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// The cost-estimation sidecar. Triggers must run inside a tokio runtime.
pub struct CostEstimator<T: Transport + 'static> {
    transport: Arc<T>,
    state: Arc<EstimatorState>,
}

impl<T: Transport + 'static> CostEstimator<T> {
    /// Creates an enabled estimator over the given transport.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            state: Arc::new(EstimatorState {
                generation: AtomicU64::new(0),
                estimate: Mutex::new(None),
                enabled: AtomicBool::new(true),
                pending: Mutex::new(None),
            }),
        }
    }

    /// The current published estimate, if any.
    pub fn current(&self) -> Option<CostEstimate> {
        self.state.estimate.lock().expect("estimate lock poisoned").clone()
    }

    /// True when estimation is enabled.
    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    /// Enables or disables estimation. Disabling clears the current
    /// estimate and cancels any pending request.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.clear();
        }
    }

    /// Drops the current estimate and invalidates everything in flight.
    /// Responses to earlier requests that arrive later are discarded.
    pub fn clear(&self) {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self
            .state
            .pending
            .lock()
            .expect("pending lock poisoned")
            .take()
        {
            pending.abort();
        }
        *self.state.estimate.lock().expect("estimate lock poisoned") = None;
    }

    /// The draft text changed. An empty draft clears immediately; anything
    /// else restarts the debounce window.
    pub fn draft_changed(
        &self,
        draft: &str,
        model: &str,
        settings: &Settings,
        history: Vec<HistoryEntry>,
    ) {
        if !self.is_enabled() {
            return;
        }
        if draft.trim().is_empty() {
            self.clear();
            return;
        }
        let request = CostEstimateRequest::new(draft, model, settings).with_history(history);
        self.schedule(DRAFT_DEBOUNCE, request);
    }

    /// A relevant setting changed. Only schedules when a non-empty draft
    /// exists; there is nothing to price otherwise.
    pub fn settings_changed(
        &self,
        draft: &str,
        model: &str,
        settings: &Settings,
        history: Vec<HistoryEntry>,
    ) {
        if !self.is_enabled() || draft.trim().is_empty() {
            return;
        }
        let request = CostEstimateRequest::new(draft, model, settings).with_history(history);
        self.schedule(SETTINGS_DELAY, request);
    }

    fn schedule(&self, delay: Duration, request: CostEstimateRequest) {
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if state.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            ESTIMATE_REQUESTS.click();
            match transport.estimate_cost(&request).await {
                Ok(estimate) => {
                    if state.generation.load(Ordering::SeqCst) == generation {
                        *state.estimate.lock().expect("estimate lock poisoned") = Some(estimate);
                    } else {
                        ESTIMATE_STALE_DROPPED.click();
                    }
                }
                Err(_) => {
                    ESTIMATE_ERRORS.click();
                    if state.generation.load(Ordering::SeqCst) == generation {
                        *state.estimate.lock().expect("estimate lock poisoned") = None;
                    }
                }
            }
        });

        let replaced = self
            .state
            .pending
            .lock()
            .expect("pending lock poisoned")
            .replace(handle);
        if let Some(old) = replaced {
            old.abort();
        }
    }
}

impl<T: Transport + 'static> Drop for CostEstimator<T> {
    fn drop(&mut self) {
        if let Some(pending) = self
            .state
            .pending
            .lock()
            .expect("pending lock poisoned")
            .take()
        {
            pending.abort();
        }
    }
}
