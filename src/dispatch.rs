//! Single-lead call dispatch.
//!
//! One invocation performs exactly one call-initiation attempt and applies
//! the resulting lead state transition. Retry scheduling belongs to the
//! caller; the dispatcher never retries internally.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::lead::{LeadId, LeadStatus};
use crate::domain::record::{CallRecord, OperatorId};
use crate::error::Result;
use crate::events::{Event, EventBus};
use crate::http::{CallAccepted, CallData, CallRejected, DialRequest, TelephonyClient};
use crate::leads::LeadStore;
use crate::ledger::CallLedger;

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The call was accepted by the API and ledgered.
    Success { call_id: String },
    /// The attempt failed; retry bookkeeping has been applied.
    Failure {
        retry_count: u32,
        exhausted: bool,
        detail: Option<String>,
    },
}

/// Performs one call-initiation attempt for a single lead.
pub struct Dispatcher<C: TelephonyClient> {
    leads: Arc<Mutex<LeadStore>>,
    ledger: Arc<Mutex<CallLedger>>,
    client: Arc<C>,
    operator: OperatorId,
    timeout_ms: u64,
    events: EventBus,
}

impl<C: TelephonyClient> Dispatcher<C> {
    pub fn new(
        leads: Arc<Mutex<LeadStore>>,
        ledger: Arc<Mutex<CallLedger>>,
        client: Arc<C>,
        operator: OperatorId,
        timeout_ms: u64,
        events: EventBus,
    ) -> Self {
        Self {
            leads,
            ledger,
            client,
            operator,
            timeout_ms,
            events,
        }
    }

    /// Run one attempt against the telephony API and apply the transition.
    ///
    /// API failures and transport faults resolve to
    /// [`DispatchOutcome::Failure`]; an `Err` is returned only when the lead
    /// does not exist or the durable store cannot be written.
    #[tracing::instrument(skip(self), fields(lead_id = %lead_id))]
    pub async fn dispatch(&self, lead_id: LeadId) -> Result<DispatchOutcome> {
        // Mark the lead as calling before the attempt; the transition is
        // observable (and persisted) while the request is in flight.
        let lead = {
            let mut store = self.leads.lock().await;
            store.update(lead_id, |lead| lead.begin_attempt()).await?
        };
        self.events.emit(Event::CallStarted { lead_id });

        let request = DialRequest {
            to: lead.phone_number.clone(),
            lead_id,
            call_data: CallData {
                first_name: lead.first_name.clone(),
                reference_id: lead.reference_id.clone(),
                time_zone: lead.time_zone.clone(),
            },
        };

        let attempt = match self.client.dispatch(&request, self.timeout_ms).await {
            Ok(response) if response.is_success() => {
                match serde_json::from_str::<CallAccepted>(&response.body) {
                    Ok(accepted) => Ok(accepted),
                    Err(e) => {
                        tracing::warn!(
                            lead_id = %lead_id,
                            error = %e,
                            "Unparseable success body, treating attempt as failed"
                        );
                        Err(None)
                    }
                }
            }
            Ok(response) => {
                let detail = serde_json::from_str::<CallRejected>(&response.body)
                    .ok()
                    .and_then(|rejected| rejected.detail);
                tracing::warn!(
                    lead_id = %lead_id,
                    status = response.status,
                    detail = detail.as_deref().unwrap_or(""),
                    "Call rejected by API"
                );
                Err(detail)
            }
            Err(e) => {
                tracing::error!(lead_id = %lead_id, error = %e, "Transport fault during dial");
                Err(None)
            }
        };

        let now = Utc::now();
        match attempt {
            Ok(accepted) => {
                let call_id = accepted
                    .call_id
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));

                {
                    let mut store = self.leads.lock().await;
                    store
                        .update(lead_id, |lead| lead.record_success(now))
                        .await?;
                }
                // The ledger append pairs with the status update above; if it
                // fails the lead still shows call-successful.
                let record =
                    CallRecord::successful(call_id.clone(), self.operator.clone(), &lead, now);
                {
                    let mut ledger = self.ledger.lock().await;
                    ledger.append(record).await?;
                }

                counter!("outdial_calls_total", "outcome" => "success").increment(1);
                if let Some(position) = accepted.queue_position {
                    tracing::info!(lead_id = %lead_id, queue_position = position, "Call queued");
                }
                self.events.emit(Event::LedgerChanged);
                self.events.emit(Event::CallSucceeded {
                    lead_id,
                    call_id: call_id.clone(),
                });
                Ok(DispatchOutcome::Success { call_id })
            }
            Err(detail) => {
                let updated = {
                    let mut store = self.leads.lock().await;
                    store
                        .update(lead_id, |lead| {
                            lead.record_failure(now);
                        })
                        .await?
                };
                let exhausted = updated.status == LeadStatus::Completed;

                counter!("outdial_calls_total", "outcome" => "failure").increment(1);
                if exhausted {
                    counter!("outdial_leads_exhausted_total").increment(1);
                    tracing::warn!(
                        lead_id = %lead_id,
                        retry_count = updated.retry_count,
                        "Retry budget exhausted, lead completed"
                    );
                }
                self.events.emit(Event::CallFailed {
                    lead_id,
                    retry_count: updated.retry_count,
                    exhausted,
                });
                Ok(DispatchOutcome::Failure {
                    retry_count: updated.retry_count,
                    exhausted,
                    detail,
                })
            }
        }
    }
}
