//! Audit sinks
//!
//! Exactly one [`AuditRecord`] is produced per mutation attempt. Sinks are
//! write-only telemetry: the broker never reads records back, and a failing
//! sink never changes the response the caller sees.

use crate::coordinator::MutationState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use ulid::Ulid;

/// Tracing target for audit events
pub const AUDIT_TARGET: &str = "faf::audit";

/// Audit sink failures
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Record could not be written
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded
    #[error("audit encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Sink refused the record
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// One flat telemetry entry per mutation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Attempt identifier, shared with the mutation's log span
    pub id: Ulid,
    /// Resolved agent identity
    pub agent: String,
    /// Document path
    pub path: String,
    /// Top-level keys the update set touched
    pub updated: Vec<String>,
    /// Commit message
    pub message: String,
    /// Candidate score, when a candidate was built
    pub score: Option<u8>,
    /// Candidate distinction, when a candidate was built
    pub distinction: Option<bool>,
    /// Terminal state
    pub state: MutationState,
    /// `COMMITTED` or the failure reason code
    pub outcome: String,
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
}

/// Append-only destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one attempt
    async fn emit(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Audit records as structured log events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, record: &AuditRecord) -> Result<(), AuditError> {
        tracing::info!(
            target: AUDIT_TARGET,
            id = %record.id,
            agent = %record.agent,
            path = %record.path,
            updated = %record.updated.join(","),
            message = %record.message,
            score = ?record.score,
            distinction = ?record.distinction,
            state = %record.state,
            outcome = %record.outcome,
            timestamp = %record.timestamp.to_rfc3339(),
            "mutation audited"
        );
        Ok(())
    }
}

/// Audit records appended to a JSON-lines file
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    append_lock: tokio::sync::Mutex<()>,
}

impl JsonlAuditSink {
    /// Append to `path`, creating it on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Log file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn emit(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Audit records kept in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    /// Create an empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    /// Number of records emitted
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was emitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn emit(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: &str) -> AuditRecord {
        AuditRecord {
            id: Ulid::new(),
            agent: "claude".into(),
            path: "project.faf".into(),
            updated: vec!["project".into()],
            message: "voice: update project DNA".into(),
            score: Some(42),
            distinction: Some(false),
            state: MutationState::Committed,
            outcome: outcome.into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn jsonl_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("audit.jsonl"));
        sink.emit(&record("COMMITTED")).await.unwrap();
        sink.emit(&record("CONCURRENCY_CONFLICT")).await.unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["outcome"], "COMMITTED");
        assert_eq!(lines[0]["state"], "COMMITTED");
        assert_eq!(lines[1]["outcome"], "CONCURRENCY_CONFLICT");
        assert_eq!(lines[1]["updated"], serde_json::json!(["project"]));
    }

    #[tokio::test]
    async fn jsonl_unwritable_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("missing-dir").join("audit.jsonl"));
        assert!(matches!(
            sink.emit(&record("COMMITTED")).await,
            Err(AuditError::Io(_))
        ));
    }

    #[tokio::test]
    async fn memory_sink_collects() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());
        sink.emit(&record("COMMITTED")).await.unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].agent, "claude");
    }

    #[tokio::test]
    async fn tracing_sink_never_fails() {
        assert!(TracingAuditSink.emit(&record("COMMITTED")).await.is_ok());
    }
}
