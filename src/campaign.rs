//! Bulk call scheduling with a fixed inter-call delay.
//!
//! The runner drives the dispatcher sequentially across a selected subset of
//! leads: one attempt at a time, a configurable pause between attempts, and
//! cooperative cancellation observed at the loop boundary. An attempt that
//! has started always runs to completion; the worst-case cancellation
//! latency is one outstanding API round trip.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::domain::lead::{Lead, LeadId};
use crate::error::{OutdialError, Result};
use crate::events::{Event, EventBus};
use crate::http::TelephonyClient;
use crate::leads::LeadStore;

/// Bounds for the configurable inter-call delay.
pub const MIN_DELAY_SECONDS: u64 = 5;
pub const MAX_DELAY_SECONDS: u64 = 300;
pub const DEFAULT_DELAY_SECONDS: u64 = 30;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Configuration for bulk call runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Pause between consecutive dispatches, in seconds (clamped to 5-300).
    pub delay_seconds: u64,

    /// Timeout for each individual call-initiation request in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            delay_seconds: DEFAULT_DELAY_SECONDS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CampaignConfig {
    /// Clamp the delay into its allowed bounds.
    pub fn clamped(mut self) -> Self {
        self.delay_seconds = self.delay_seconds.clamp(MIN_DELAY_SECONDS, MAX_DELAY_SECONDS);
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }
}

/// Scheduler lifecycle. `Cancelled` is transient: it collapses back to
/// `Idle` once cleanup completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Cancelled,
}

/// Progress of the active bulk run, published after each dispatch.
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// 1-based index of the most recently dispatched lead.
    pub current: usize,
    pub total: usize,
    pub lead: Lead,
}

/// Terminal summary of a bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of dispatch attempts that ran.
    pub processed: usize,
    pub cancelled: bool,
}

/// Drives the dispatcher across a selected subset of leads.
pub struct CampaignRunner<C: TelephonyClient> {
    dispatcher: Arc<Dispatcher<C>>,
    leads: Arc<Mutex<LeadStore>>,
    config: CampaignConfig,
    events: EventBus,
    cancel: CancellationToken,
    run_state: Arc<SyncMutex<RunState>>,
    progress: Arc<SyncMutex<Option<RunProgress>>>,
}

impl<C: TelephonyClient> CampaignRunner<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Arc<Dispatcher<C>>,
        leads: Arc<Mutex<LeadStore>>,
        config: CampaignConfig,
        events: EventBus,
        cancel: CancellationToken,
        run_state: Arc<SyncMutex<RunState>>,
        progress: Arc<SyncMutex<Option<RunProgress>>>,
    ) -> Self {
        Self {
            dispatcher,
            leads,
            config: config.clamped(),
            events,
            cancel,
            run_state,
            progress,
        }
    }

    /// Run the bulk loop over the selection, in store order.
    ///
    /// Dispatch-level failures never abort the run; each lead's outcome is
    /// recorded independently. Cancellation is checked before every dispatch
    /// except the first, so an in-flight attempt always resolves.
    #[tracing::instrument(skip(self, selection), fields(selected = selection.len(), delay_seconds = self.config.delay_seconds))]
    pub async fn run(self, selection: HashSet<LeadId>) -> Result<RunSummary> {
        if selection.is_empty() {
            return Err(OutdialError::NoSelection);
        }

        let ordered = {
            let store = self.leads.lock().await;
            store.in_store_order(&selection)
        };
        if ordered.is_empty() {
            return Err(OutdialError::NoSelection);
        }

        *self.run_state.lock() = RunState::Running;
        tracing::info!(total = ordered.len(), "Bulk call run starting");

        let total = ordered.len();
        let mut processed = 0usize;

        for (index, lead_id) in ordered.iter().enumerate() {
            if index > 0 && self.cancel.is_cancelled() {
                tracing::info!(
                    processed,
                    remaining = total - index,
                    "Bulk call run cancelled"
                );
                break;
            }

            match self.dispatcher.dispatch(*lead_id).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    tracing::error!(lead_id = %lead_id, error = %e, "Dispatch attempt could not run");
                }
            }

            let lead = { self.leads.lock().await.get(*lead_id).cloned() };
            if let Some(lead) = lead {
                let progress = RunProgress {
                    current: index + 1,
                    total,
                    lead: lead.clone(),
                };
                *self.progress.lock() = Some(progress);
                self.events.emit(Event::RunProgress {
                    current: index + 1,
                    total,
                    lead: Box::new(lead),
                });
            }

            // No trailing wait after the last dispatch. The sleep itself is
            // interruptible; the cancellation still takes effect only at the
            // loop boundary above.
            if index + 1 < total {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.delay()) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        let cancelled = self.cancel.is_cancelled();
        *self.run_state.lock() = if cancelled {
            RunState::Cancelled
        } else {
            RunState::Idle
        };

        *self.progress.lock() = None;
        if cancelled {
            *self.run_state.lock() = RunState::Idle;
        }

        tracing::info!(processed, cancelled, "Bulk call run finished");
        self.events.emit(Event::RunFinished {
            processed,
            cancelled,
        });
        Ok(RunSummary {
            processed,
            cancelled,
        })
    }
}
