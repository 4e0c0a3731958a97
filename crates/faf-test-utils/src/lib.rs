//! Testing utilities for the FAF broker workspace
//!
//! Shared fixtures: sample documents, an in-memory broker with a pinned
//! clock, and sinks that misbehave on purpose.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use faf_core::{
    AuditError, AuditRecord, AuditSink, BrokerConfig, FafBroker, FixedClock, MemoryAuditSink,
    MemoryStore,
};
use faf_dna::ProjectDna;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DOCUMENT_PATH: &str = "project.faf";

/// Last-mutation timestamp carried by the fixtures
pub const SAMPLE_GENERATED: &str = "2025-06-01T12:00:00Z";

pub const SAMPLE_DNA: &str = r#"project:
  name: gemini-faf-mcp
  goal: Serve project DNA to every agent
  main_language: Python
  type: cloud-function
stack:
  runtime: python3.11
  hosting: cloud-functions
ai_instructions:
  constraints:
    - never expose tokens
  patterns:
    - pure core, thin transport
  avoid:
    - silent overwrites
human_context:
  who: voice-first developers
generated: "2025-06-01T12:00:00Z"
"#;

pub fn sample_dna() -> ProjectDna {
    ProjectDna::from_yaml(SAMPLE_DNA).unwrap()
}

/// A document filling all 21 slots, so it scores exactly 100
pub fn complete_dna() -> ProjectDna {
    let mut map = Map::new();
    map.insert("project".into(), json!({"name": "complete", "goal": "ship"}));
    for i in 1..20 {
        map.insert(format!("section_{i:02}"), json!(format!("filled {i}")));
    }
    map.insert("generated".into(), Value::String(SAMPLE_GENERATED.into()));
    ProjectDna::from_map(map)
}

pub fn complete_dna_yaml() -> String {
    complete_dna().to_yaml().unwrap()
}

/// An instant after [`SAMPLE_GENERATED`]
pub fn after_sample() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()
}

/// An instant before [`SAMPLE_GENERATED`]
pub fn before_sample() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
}

pub struct TestBroker {
    pub broker: FafBroker,
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
}

/// Broker over a memory store seeded at [`DOCUMENT_PATH`], clock after the sample
pub fn memory_broker(content: &str) -> TestBroker {
    memory_broker_at(content, after_sample())
}

pub fn memory_broker_at(content: &str, now: DateTime<Utc>) -> TestBroker {
    let store = Arc::new(MemoryStore::new().with_document(DOCUMENT_PATH, content));
    let audit = Arc::new(MemoryAuditSink::new());
    let broker = FafBroker::new(BrokerConfig::default(), store.clone(), audit.clone())
        .with_clock(Arc::new(FixedClock(now)));
    TestBroker {
        broker,
        store,
        audit,
    }
}

/// Sink that always fails
#[derive(Debug, Default)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn emit(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("telemetry table offline".into()))
    }
}

/// Sink that never finishes within any sane audit bound
#[derive(Debug, Default)]
pub struct StalledAuditSink;

#[async_trait]
impl AuditSink for StalledAuditSink {
    async fn emit(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}
