//! Cross-component tests for the outbound calling system: CSV import through
//! bulk runs, timing, cancellation, and persistence.

use std::sync::Arc;
use std::time::Duration;

use outdial::{
    CampaignConfig, DialResponse, DispatchOutcome, ImportSummary, JsonStorage, LeadStatus,
    MemoryStorage, MockTelephonyClient, OperatorId, OutboundManager, OutdialError, RunState,
};

const TEMPLATE: &str = outdial::LEADS_TEMPLATE_CSV;

async fn manager_with(
    storage: Arc<dyn outdial::Storage>,
    delay_seconds: u64,
) -> (Arc<OutboundManager<MockTelephonyClient>>, MockTelephonyClient) {
    let mock = MockTelephonyClient::new();
    let manager = OutboundManager::open(
        storage,
        Arc::new(mock.clone()),
        OperatorId::from("op_test"),
        CampaignConfig {
            delay_seconds,
            ..Default::default()
        },
    )
    .await
    .expect("Failed to open manager");
    (Arc::new(manager), mock)
}

fn success(call_id: &str) -> outdial::Result<DialResponse> {
    Ok(DialResponse {
        status: 200,
        body: format!(r#"{{"callId":"{call_id}","queuePosition":1}}"#),
    })
}

fn failure(status: u16) -> outdial::Result<DialResponse> {
    Ok(DialResponse {
        status,
        body: r#"{"detail":"busy"}"#.to_string(),
    })
}

#[test_log::test(tokio::test(start_paused = true))]
async fn bulk_run_dispatches_in_store_order_with_delays_between() {
    let (manager, mock) = manager_with(Arc::new(MemoryStorage::new()), 5).await;

    let summary = manager.import_csv(TEMPLATE).await.unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            imported: 3,
            skipped: 0
        }
    );

    for lead in manager.leads().await {
        manager.select(lead.id);
    }
    for i in 0..3 {
        mock.add_response(success(&format!("call_{i}")));
    }

    let start = tokio::time::Instant::now();
    let handle = manager.clone().start_bulk().unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.processed, 3);
    assert!(!summary.cancelled);
    // two 5s gaps between three dispatches, no trailing wait
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert_eq!(mock.call_count(), 3);

    // dispatch order follows the store order
    let numbers: Vec<String> = mock.calls().iter().map(|c| c.request.to.clone()).collect();
    assert_eq!(
        numbers,
        ["+8800000000000", "+8800000000000", "+8801555123456"]
    );

    // every lead succeeded and was ledgered, newest-first
    for lead in manager.leads().await {
        assert_eq!(lead.status, LeadStatus::CallSuccessful);
        assert!(lead.last_called.is_some());
    }
    let records = manager.records().await;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].call_id, "call_2");
    assert_eq!(records[2].call_id, "call_0");

    // run is cleaned up
    assert_eq!(manager.run_state(), RunState::Idle);
    assert!(manager.selected().is_empty());
    assert!(manager.progress().is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn cancellation_lets_the_inflight_attempt_finish_then_stops() {
    let (manager, mock) = manager_with(Arc::new(MemoryStorage::new()), 5).await;
    manager.import_csv(TEMPLATE).await.unwrap();

    let leads = manager.leads().await;
    for lead in &leads {
        manager.select(lead.id);
    }

    // First attempt is held in flight until the test releases it.
    let trigger = mock.add_response_with_trigger(success("call_0"));
    mock.add_response(success("call_1"));
    mock.add_response(success("call_2"));

    let handle = manager.clone().start_bulk().unwrap();

    // Wait for the first dispatch to start.
    while mock.call_count() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(manager.run_state(), RunState::Running);

    // Cancel while the first attempt is still in flight, then release it.
    manager.cancel_bulk();
    trigger.send(()).unwrap();

    let summary = handle.await.unwrap();
    assert_eq!(summary.processed, 1);
    assert!(summary.cancelled);
    assert_eq!(mock.call_count(), 1);

    // The in-flight attempt resolved fully; the rest were never dispatched.
    let leads = manager.leads().await;
    assert_eq!(leads[0].status, LeadStatus::CallSuccessful);
    assert_eq!(leads[1].status, LeadStatus::Pending);
    assert_eq!(leads[2].status, LeadStatus::Pending);
    assert_eq!(manager.records().await.len(), 1);
    assert_eq!(manager.run_state(), RunState::Idle);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn failed_attempts_within_a_run_do_not_abort_it() {
    let (manager, mock) = manager_with(Arc::new(MemoryStorage::new()), 5).await;
    manager.import_csv(TEMPLATE).await.unwrap();

    for lead in manager.leads().await {
        manager.select(lead.id);
    }
    mock.add_response(success("call_0"));
    mock.add_response(failure(500));
    mock.add_response(success("call_2"));

    let summary = manager.clone().start_bulk().unwrap().await.unwrap();
    assert_eq!(summary.processed, 3);

    let leads = manager.leads().await;
    assert_eq!(leads[0].status, LeadStatus::CallSuccessful);
    assert_eq!(leads[1].status, LeadStatus::NeedRetry);
    assert_eq!(leads[1].retry_count, 1);
    assert_eq!(leads[2].status, LeadStatus::CallSuccessful);
    assert_eq!(manager.records().await.len(), 2);
}

#[test_log::test(tokio::test)]
async fn three_failures_exhaust_a_lead_and_never_ledger_it() {
    let (manager, mock) = manager_with(Arc::new(MemoryStorage::new()), 5).await;
    let id = manager
        .add_lead("karim", "+8801555123456", None, None)
        .await
        .unwrap();

    for _ in 0..3 {
        mock.add_response(failure(503));
    }

    for expected_retries in 1..=2u32 {
        let outcome = manager.call_lead(id).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Failure {
                retry_count: expected_retries,
                exhausted: false,
                detail: Some("busy".to_string()),
            }
        );
    }
    let outcome = manager.call_lead(id).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Failure {
            retry_count: 3,
            exhausted: true,
            detail: Some("busy".to_string()),
        }
    );

    let lead = &manager.leads().await[0];
    assert_eq!(lead.status, LeadStatus::Completed);
    assert_eq!(lead.retry_count, 3);
    assert!(manager.records().await.is_empty());
}

#[test_log::test(tokio::test)]
async fn two_failures_then_success_ledgers_exactly_once() {
    let (manager, mock) = manager_with(Arc::new(MemoryStorage::new()), 5).await;
    let id = manager
        .add_lead("karim", "+8801555123456", None, None)
        .await
        .unwrap();

    mock.add_response(failure(500));
    mock.add_response(failure(500));
    mock.add_response(success("call_final"));

    manager.call_lead(id).await.unwrap();
    manager.call_lead(id).await.unwrap();
    let outcome = manager.call_lead(id).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Success {
            call_id: "call_final".to_string()
        }
    );

    let lead = &manager.leads().await[0];
    assert_eq!(lead.status, LeadStatus::CallSuccessful);
    assert_eq!(lead.retry_count, 2);

    let records = manager.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].lead_id, id);
    assert_eq!(records[0].call_id, "call_final");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn overlapping_runs_and_manual_calls_are_refused() {
    let (manager, mock) = manager_with(Arc::new(MemoryStorage::new()), 5).await;
    manager.import_csv(TEMPLATE).await.unwrap();
    let leads = manager.leads().await;
    for lead in &leads {
        manager.select(lead.id);
    }

    let trigger = mock.add_response_with_trigger(success("call_0"));
    mock.add_response(success("call_1"));
    mock.add_response(success("call_2"));

    let handle = manager.clone().start_bulk().unwrap();
    while mock.call_count() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        manager.clone().start_bulk(),
        Err(OutdialError::RunInProgress)
    ));
    assert!(matches!(
        manager.call_lead(leads[0].id).await,
        Err(OutdialError::RunInProgress)
    ));

    trigger.send(()).unwrap();
    handle.await.unwrap();
    assert_eq!(manager.run_state(), RunState::Idle);
}

#[test_log::test(tokio::test)]
async fn collections_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(JsonStorage::open(dir.path()).unwrap());

    let lead_id = {
        let (manager, mock) = manager_with(storage.clone(), 5).await;
        manager.import_csv(TEMPLATE).await.unwrap();
        let id = manager.leads().await[0].id;
        mock.add_response(success("call_persisted"));
        manager.call_lead(id).await.unwrap();
        id
    };

    let storage = Arc::new(JsonStorage::open(dir.path()).unwrap());
    let (manager, _) = manager_with(storage, 5).await;

    let leads = manager.leads().await;
    assert_eq!(leads.len(), 3);
    assert_eq!(leads[0].id, lead_id);
    assert_eq!(leads[0].status, LeadStatus::CallSuccessful);

    let records = manager.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].call_id, "call_persisted");
    assert_eq!(records[0].auth_id, OperatorId::from("op_test"));

    let export = manager.export_records_csv().await;
    assert!(export.starts_with("Call ID,Auth ID,Lead Name,"));
    assert!(export.contains("call_persisted"));
}
