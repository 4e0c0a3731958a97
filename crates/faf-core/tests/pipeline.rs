//! End-to-end mutation pipeline through the broker facade

use faf_core::{
    BrokerConfig, BrokerError, FafBroker, FixedClock, MemoryStore, MutationRequest, MutationState,
    TimeoutConfig,
};
use faf_dna::{has_distinction, ProjectDna, UpdateSet};
use faf_test_utils::{
    after_sample, before_sample, complete_dna_yaml, memory_broker, memory_broker_at,
    FailingAuditSink, StalledAuditSink, DOCUMENT_PATH, SAMPLE_DNA,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn request(updates: UpdateSet) -> MutationRequest {
    MutationRequest {
        updates: Some(updates),
        agent_header: Some("gemini".into()),
        ..MutationRequest::default()
    }
}

#[tokio::test]
async fn dotted_and_section_updates_commit_together() {
    let fixture = memory_broker(SAMPLE_DNA);
    let updates = UpdateSet::new()
        .with("project.goal", json!("Serve DNA by voice"))
        .with("stack", json!({"database": "firestore"}));

    let response = fixture.broker.mutate(&request(updates)).await.unwrap();
    assert_eq!(response.updated, vec!["project".to_string(), "stack".to_string()]);

    let stored = ProjectDna::from_yaml(&fixture.store.get(DOCUMENT_PATH).unwrap()).unwrap();
    assert_eq!(stored.get_str("project.goal"), Some("Serve DNA by voice"));
    assert_eq!(stored.get_str("project.name"), Some("gemini-faf-mcp"));
    assert_eq!(stored.get_str("stack.database"), Some("firestore"));
    assert_eq!(stored.get_str("stack.runtime"), Some("python3.11"));
    assert_eq!(stored.generated(), Some("2025-06-02T09:30:00.000000Z"));
}

#[tokio::test]
async fn successive_mutations_move_the_version() {
    let fixture = memory_broker(SAMPLE_DNA);
    let first = fixture
        .broker
        .mutate(&request(UpdateSet::new().with("project.goal", json!("one"))))
        .await
        .unwrap();

    // Same pinned clock: the second commit's stamp equals the first's
    let err = fixture
        .broker
        .mutate(&request(UpdateSet::new().with("project.goal", json!("two"))))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TEMPORAL_NON_MONOTONIC");

    let later = FafBroker::new(
        BrokerConfig::default(),
        fixture.store.clone(),
        fixture.audit.clone(),
    )
    .with_clock(Arc::new(FixedClock(after_sample() + chrono::Duration::hours(1))));
    let second = later
        .mutate(&request(UpdateSet::new().with("project.goal", json!("two"))))
        .await
        .unwrap();
    assert_ne!(first.sha, second.sha);
}

#[tokio::test]
async fn distinction_is_allowed_on_complete_document() {
    let fixture = memory_broker(&complete_dna_yaml());
    let response = fixture
        .broker
        .mutate(&request(
            UpdateSet::new().with("faf_distinction", json!("Big Orange")),
        ))
        .await
        .unwrap();
    assert!(response.distinction);
    assert_eq!(response.score, 100);

    let stored = ProjectDna::from_yaml(&fixture.store.get(DOCUMENT_PATH).unwrap()).unwrap();
    assert!(has_distinction(&stored));
}

#[tokio::test]
async fn distinction_via_orange_key_on_incomplete_document_is_forbidden() {
    let fixture = memory_broker(SAMPLE_DNA);
    let err = fixture
        .broker
        .mutate(&request(UpdateSet::new().with("meta.big_orange", json!(true))))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
    let payload = err.to_payload();
    assert_eq!(payload["invariant"], "scoring_guard");
    assert_eq!(fixture.store.get(DOCUMENT_PATH).as_deref(), Some(SAMPLE_DNA));
}

#[tokio::test]
async fn stale_timestamp_is_forbidden() {
    let fixture = memory_broker_at(SAMPLE_DNA, before_sample());
    let err = fixture
        .broker
        .mutate(&request(UpdateSet::new().with("project.goal", json!("x"))))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::SecurityRejected(_)));
    assert_eq!(err.to_payload()["invariant"], "temporal_integrity");
}

#[tokio::test]
async fn every_outcome_is_audited_once() {
    let fixture = memory_broker(SAMPLE_DNA);

    let _ = fixture
        .broker
        .mutate(&MutationRequest {
            agent_header: Some("gemini".into()),
            ..MutationRequest::default()
        })
        .await;
    let _ = fixture
        .broker
        .mutate(&request(UpdateSet::new().with("x_faf_orange", json!(true))))
        .await;
    let _ = fixture
        .broker
        .mutate(&MutationRequest {
            path: Some("missing.faf".into()),
            ..request(UpdateSet::new().with("a", json!(1)))
        })
        .await;
    let _ = fixture
        .broker
        .mutate(&request(UpdateSet::new().with("project.goal", json!("ok"))))
        .await;

    let states: Vec<(MutationState, String)> = fixture
        .audit
        .records()
        .into_iter()
        .map(|r| (r.state, r.outcome))
        .collect();
    assert_eq!(
        states,
        vec![
            (MutationState::Aborted, "BAD_REQUEST".to_string()),
            (MutationState::Rejected, "DISTINCTION_REQUIRES_FULL_SCORE".to_string()),
            (MutationState::Aborted, "NOT_FOUND".to_string()),
            (MutationState::Committed, "COMMITTED".to_string()),
        ]
    );
    assert!(fixture.audit.records().iter().all(|r| r.agent == "gemini"));
}

#[tokio::test]
async fn anonymous_attempt_is_audited_as_unknown() {
    let fixture = memory_broker(SAMPLE_DNA);
    let _ = fixture.broker.mutate(&MutationRequest::default()).await;

    let records = fixture.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].agent, "unknown");
    assert_eq!(records[0].state, MutationState::Aborted);
}

#[tokio::test]
async fn failing_audit_sink_does_not_alter_response() {
    let store = Arc::new(MemoryStore::new().with_document(DOCUMENT_PATH, SAMPLE_DNA));
    let broker = FafBroker::new(BrokerConfig::default(), store, Arc::new(FailingAuditSink))
        .with_clock(Arc::new(FixedClock(after_sample())));

    let response = tokio_test::assert_ok!(
        broker
            .mutate(&request(UpdateSet::new().with("project.goal", json!("fine"))))
            .await
    );
    assert_eq!(response.message, "voice: update project DNA");
}

#[tokio::test]
async fn stalled_audit_sink_is_bounded() {
    let store = Arc::new(MemoryStore::new().with_document(DOCUMENT_PATH, SAMPLE_DNA));
    let config = BrokerConfig {
        timeouts: TimeoutConfig {
            store_ms: 1_000,
            audit_ms: 25,
        },
        ..BrokerConfig::default()
    };
    let broker = FafBroker::new(config, store, Arc::new(StalledAuditSink))
        .with_clock(Arc::new(FixedClock(after_sample())));

    let started = std::time::Instant::now();
    let err = broker
        .mutate(&request(UpdateSet::new().with("x_faf_orange", json!(true))))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::SecurityRejected(_)));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}
