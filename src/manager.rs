//! The orchestration object for outbound calling.
//!
//! `OutboundManager` owns the lead store, the call ledger, the dispatcher,
//! the bulk-run lifecycle, the lead selection, and the notification queue.
//! A presentation layer drives it through these operations and observes
//! state changes through the event bus; shared state is never mutated from
//! the outside.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::campaign::{CampaignConfig, CampaignRunner, RunProgress, RunState, RunSummary};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::domain::lead::{DEFAULT_TIME_ZONE, Lead, LeadId};
use crate::domain::record::{CallRecord, OperatorId};
use crate::error::{OutdialError, Result};
use crate::events::{Event, EventBus};
use crate::http::TelephonyClient;
use crate::ingest::{self, LEADS_TEMPLATE_CSV};
use crate::leads::LeadStore;
use crate::ledger::CallLedger;
use crate::notify::{Notification, NotificationQueue, Severity};
use crate::store::Storage;

/// Outcome of a CSV import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Orchestrates lead management and bulk calling over a telephony client.
pub struct OutboundManager<C: TelephonyClient> {
    leads: Arc<Mutex<LeadStore>>,
    ledger: Arc<Mutex<CallLedger>>,
    dispatcher: Arc<Dispatcher<C>>,
    config: CampaignConfig,
    events: EventBus,
    notifications: SyncMutex<NotificationQueue>,
    selection: SyncMutex<HashSet<LeadId>>,
    run_state: Arc<SyncMutex<RunState>>,
    progress: Arc<SyncMutex<Option<RunProgress>>>,
    cancel: SyncMutex<Option<CancellationToken>>,
}

impl<C: TelephonyClient + 'static> OutboundManager<C> {
    /// Load both collections from storage and assemble the orchestrator.
    pub async fn open(
        storage: Arc<dyn Storage>,
        client: Arc<C>,
        operator: OperatorId,
        config: CampaignConfig,
    ) -> Result<Self> {
        let config = config.clamped();
        let leads = Arc::new(Mutex::new(LeadStore::load(storage.clone()).await?));
        let ledger = Arc::new(Mutex::new(CallLedger::load(storage).await?));
        let events = EventBus::default();
        let dispatcher = Arc::new(Dispatcher::new(
            leads.clone(),
            ledger.clone(),
            client,
            operator,
            config.timeout_ms,
            events.clone(),
        ));

        Ok(Self {
            leads,
            ledger,
            dispatcher,
            config,
            events,
            notifications: SyncMutex::new(NotificationQueue::default()),
            selection: SyncMutex::new(HashSet::new()),
            run_state: Arc::new(SyncMutex::new(RunState::Idle)),
            progress: Arc::new(SyncMutex::new(None)),
            cancel: SyncMutex::new(None),
        })
    }

    /// Subscribe to state-change events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The lead template offered for download.
    pub fn leads_template_csv() -> &'static str {
        LEADS_TEMPLATE_CSV
    }

    // ------------------------------------------------------------------
    // Leads
    // ------------------------------------------------------------------

    pub async fn leads(&self) -> Vec<Lead> {
        self.leads.lock().await.all().to_vec()
    }

    pub async fn search_leads(&self, term: &str) -> Vec<Lead> {
        self.leads.lock().await.search(term)
    }

    /// Ingest raw CSV text and prepend the accepted leads.
    ///
    /// Ingestion errors abort the import with zero leads mutated; row-level
    /// problems are only reflected in the skip count.
    pub async fn import_csv(&self, text: &str) -> Result<ImportSummary> {
        let outcome = match ingest::ingest_leads(text) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.push_notification("Import failed", &e.to_string(), Severity::Error);
                return Err(e);
            }
        };

        let imported = outcome.accepted.len();
        let skipped = outcome.skipped;
        {
            let mut store = self.leads.lock().await;
            store.insert_front(outcome.accepted).await?;
        }
        counter!("outdial_leads_imported_total").increment(imported as u64);
        self.events.emit(Event::LeadsChanged);

        let body = if skipped > 0 {
            format!("{imported} leads imported ({skipped} rows skipped due to missing or invalid data)")
        } else {
            format!("{imported} leads imported")
        };
        self.push_notification("Import complete", &body, Severity::Info);
        Ok(ImportSummary { imported, skipped })
    }

    /// Add one lead from manual entry.
    pub async fn add_lead(
        &self,
        first_name: &str,
        phone_number: &str,
        time_zone: Option<String>,
        reference_id: Option<String>,
    ) -> Result<LeadId> {
        let first_name = first_name.trim();
        let phone_number = phone_number.trim();
        if first_name.is_empty() || phone_number.is_empty() {
            return Err(OutdialError::Validation(
                "first name and phone number are required".to_string(),
            ));
        }

        let reference_id = reference_id
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let lead = Lead::new(
            first_name,
            phone_number,
            time_zone.unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
            reference_id,
        );
        let id = lead.id;

        self.leads.lock().await.insert_front(vec![lead]).await?;
        self.events.emit(Event::LeadsChanged);
        self.push_notification("Lead added", first_name, Severity::Info);
        Ok(id)
    }

    /// Remove a lead. Its call records are kept; `lead_id` on a record is a
    /// non-owning reference.
    pub async fn remove_lead(&self, id: LeadId) -> Result<bool> {
        let removed = self.leads.lock().await.remove(id).await?;
        if removed {
            self.selection.lock().remove(&id);
            self.events.emit(Event::LeadsChanged);
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select(&self, id: LeadId) {
        self.selection.lock().insert(id);
    }

    pub fn deselect(&self, id: LeadId) {
        self.selection.lock().remove(&id);
    }

    pub fn clear_selection(&self) {
        self.selection.lock().clear();
    }

    pub fn selected(&self) -> HashSet<LeadId> {
        self.selection.lock().clone()
    }

    // ------------------------------------------------------------------
    // Calling
    // ------------------------------------------------------------------

    /// Dispatch a single call for one lead.
    ///
    /// Refused while a bulk run is active: dispatches are strictly
    /// serialized, one attempt in flight at a time.
    pub async fn call_lead(&self, id: LeadId) -> Result<DispatchOutcome> {
        if *self.run_state.lock() != RunState::Idle {
            return Err(OutdialError::RunInProgress);
        }

        let name = self
            .leads
            .lock()
            .await
            .get(id)
            .map(|lead| lead.first_name.clone())
            .unwrap_or_default();
        let outcome = self.dispatcher.dispatch(id).await?;
        match &outcome {
            DispatchOutcome::Success { .. } => {
                self.push_notification(
                    "Call initiated",
                    &format!("Call to {name} started"),
                    Severity::Info,
                );
            }
            DispatchOutcome::Failure { detail, .. } => {
                self.push_notification(
                    "Call failed",
                    detail.as_deref().unwrap_or("Failed to initiate call"),
                    Severity::Error,
                );
            }
        }
        Ok(outcome)
    }

    /// Start a bulk run over the current selection.
    ///
    /// The run executes on a background task; the returned handle resolves
    /// to the terminal summary. The selection is cleared and progress reset
    /// when the run finishes, normally or cancelled.
    pub fn start_bulk(self: Arc<Self>) -> Result<JoinHandle<RunSummary>> {
        let selection = self.selection.lock().clone();
        if selection.is_empty() {
            self.push_notification(
                "No leads selected",
                "Select at least one lead before starting a bulk run",
                Severity::Error,
            );
            return Err(OutdialError::NoSelection);
        }

        {
            let mut state = self.run_state.lock();
            if *state != RunState::Idle {
                return Err(OutdialError::RunInProgress);
            }
            *state = RunState::Running;
        }

        let token = CancellationToken::new();
        *self.cancel.lock() = Some(token.clone());

        let runner = CampaignRunner::new(
            self.dispatcher.clone(),
            self.leads.clone(),
            self.config.clone(),
            self.events.clone(),
            token,
            self.run_state.clone(),
            self.progress.clone(),
        );

        let manager = self;
        Ok(tokio::spawn(async move {
            let summary = match runner.run(selection).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!(error = %e, "Bulk run aborted");
                    *manager.run_state.lock() = RunState::Idle;
                    RunSummary {
                        processed: 0,
                        cancelled: false,
                    }
                }
            };

            manager.selection.lock().clear();
            *manager.cancel.lock() = None;
            manager.push_notification(
                "Bulk calling completed",
                &format!("Finished calling {} leads", summary.processed),
                Severity::Info,
            );
            summary
        }))
    }

    /// Request cancellation of the active bulk run. The attempt currently in
    /// flight still resolves; remaining leads are not dispatched.
    pub fn cancel_bulk(&self) {
        if let Some(token) = self.cancel.lock().as_ref() {
            tracing::info!("Bulk run cancellation requested");
            token.cancel();
        }
    }

    pub fn run_state(&self) -> RunState {
        *self.run_state.lock()
    }

    /// Progress of the active bulk run, if any.
    pub fn progress(&self) -> Option<RunProgress> {
        self.progress.lock().clone()
    }

    // ------------------------------------------------------------------
    // Call records
    // ------------------------------------------------------------------

    pub async fn records(&self) -> Vec<CallRecord> {
        self.ledger.lock().await.all().to_vec()
    }

    pub async fn search_records(&self, term: &str) -> Vec<CallRecord> {
        self.ledger.lock().await.search(term)
    }

    pub async fn export_records_csv(&self) -> String {
        self.ledger.lock().await.export_csv()
    }

    /// Irreversibly clear the ledger. Confirmation is the caller's job.
    pub async fn clear_records(&self) -> Result<()> {
        self.ledger.lock().await.clear_all().await?;
        self.events.emit(Event::LedgerChanged);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Advance expiry against the current clock and return what's visible.
    pub fn notifications(&self) -> Vec<Notification> {
        let mut queue = self.notifications.lock();
        queue.advance(Utc::now());
        queue.iter().cloned().collect()
    }

    fn push_notification(&self, title: &str, body: &str, severity: Severity) {
        self.notifications
            .lock()
            .push(Utc::now(), title, body, severity);
    }
}
