//! Commit coordinator
//!
//! Drives one mutation request through
//! `RECEIVED → MERGED → GATE_CHECKED → {REJECTED | COMMIT_ATTEMPTED} →
//! {COMMITTED | CONFLICT | UPSTREAM_FAILED}`.
//!
//! Requests that fail before a candidate exists (empty update set, missing or
//! malformed document) end in `ABORTED`. Every attempt, whatever its terminal
//! state, emits exactly one audit record. No step is retried.

use crate::audit::{AuditRecord, AuditSink};
use crate::config::TimeoutConfig;
use crate::error::BrokerError;
use crate::store::{CommitRecord, DnaStore, StoreError};
use chrono::{DateTime, Utc};
use faf_dialect::AgentIdentity;
use faf_dna::{has_distinction, merge, score, ProjectDna, UpdateSet, VersionToken};
use faf_gate::{format_instant, MutationProposal, SecurityGate};
use serde::Serialize;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use ulid::Ulid;

/// Outcome code recorded for successful commits
pub const COMMITTED_OUTCOME: &str = "COMMITTED";

/// States of a single mutation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationState {
    /// Request accepted for processing
    Received,
    /// Candidate document built
    Merged,
    /// Security gate evaluated
    GateChecked,
    /// Gate refused the candidate
    Rejected,
    /// Conditional write sent to the store
    CommitAttempted,
    /// Write succeeded
    Committed,
    /// Store version moved on
    Conflict,
    /// Store failed or timed out
    UpstreamFailed,
    /// Failed before a candidate could be built
    Aborted,
}

impl MutationState {
    /// State name as logged and audited
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Merged => "MERGED",
            Self::GateChecked => "GATE_CHECKED",
            Self::Rejected => "REJECTED",
            Self::CommitAttempted => "COMMIT_ATTEMPTED",
            Self::Committed => "COMMITTED",
            Self::Conflict => "CONFLICT",
            Self::UpstreamFailed => "UPSTREAM_FAILED",
            Self::Aborted => "ABORTED",
        }
    }

    /// Whether no further transition follows
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Committed | Self::Conflict | Self::UpstreamFailed | Self::Aborted
        )
    }
}

impl Display for MutationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the mutation timestamp
pub trait Clock: Send + Sync + Debug {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// One mutation request as the coordinator sees it
#[derive(Debug, Clone, Copy)]
pub struct MutationCommand<'a> {
    /// Document path
    pub path: &'a str,
    /// Requested updates
    pub updates: &'a UpdateSet,
    /// Commit message
    pub message: &'a str,
    /// Resolved caller
    pub agent: &'a AgentIdentity,
}

/// A committed mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    /// Store commit
    pub commit: CommitRecord,
    /// Top-level keys applied
    pub updated: Vec<String>,
    /// Score of the committed document
    pub score: u8,
    /// Distinction of the committed document
    pub distinction: bool,
}

/// What is known about an attempt so far
#[derive(Debug)]
struct Progress {
    state: MutationState,
    score: Option<u8>,
    distinction: Option<bool>,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: MutationState::Received,
            score: None,
            distinction: None,
        }
    }

    fn advance(&mut self, next: MutationState) {
        tracing::debug!(from = %self.state, to = %next, "mutation transition");
        self.state = next;
    }

    /// Terminal state for a failure observed in the current state
    fn terminal_for(&self, err: &BrokerError) -> MutationState {
        match (self.state, err) {
            (_, BrokerError::SecurityRejected(_)) => MutationState::Rejected,
            (_, BrokerError::ConcurrencyConflict(_)) => MutationState::Conflict,
            (MutationState::CommitAttempted, _)
            | (_, BrokerError::Upstream { .. } | BrokerError::Timeout { .. }) => {
                MutationState::UpstreamFailed
            }
            _ => MutationState::Aborted,
        }
    }
}

/// Orchestrates merge, gate, conditional write and audit
#[derive(Clone)]
pub struct CommitCoordinator {
    store: Arc<dyn DnaStore>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    gate: SecurityGate,
    timeouts: TimeoutConfig,
}

impl Debug for CommitCoordinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitCoordinator")
            .field("store", &self.store.name())
            .field("clock", &self.clock)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl CommitCoordinator {
    /// Create a coordinator on the wall clock
    #[must_use]
    pub fn new(store: Arc<dyn DnaStore>, audit: Arc<dyn AuditSink>, timeouts: TimeoutConfig) -> Self {
        Self {
            store,
            audit,
            clock: Arc::new(SystemClock),
            gate: SecurityGate::new(),
            timeouts,
        }
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DnaStore> {
        &self.store
    }

    /// Read and parse the document at `path`
    ///
    /// # Errors
    /// Returns `NotFound`, `Parse`, `Upstream` or `Timeout`
    pub async fn load(&self, path: &str) -> Result<(ProjectDna, VersionToken), BrokerError> {
        let stored = bounded("store read", self.timeouts.store(), self.store.read(path)).await?;
        let dna = ProjectDna::from_yaml(&stored.content)?;
        Ok((dna, stored.version))
    }

    /// Run one mutation request to a terminal state
    ///
    /// # Errors
    /// Returns the failure that ended the attempt; the audit record has been
    /// emitted either way
    pub async fn commit(&self, command: &MutationCommand<'_>) -> Result<CommitOutcome, BrokerError> {
        let id = Ulid::new();
        let span = tracing::info_span!(
            "mutation",
            %id,
            agent = %command.agent,
            path = command.path
        );

        async move {
            let mut progress = Progress::new();
            let result = self.run(command, &mut progress).await;

            let (state, outcome) = match &result {
                Ok(_) => (MutationState::Committed, COMMITTED_OUTCOME),
                Err(err) => (progress.terminal_for(err), err.code()),
            };
            progress.advance(state);

            let record = AuditRecord {
                id,
                agent: command.agent.to_string(),
                path: command.path.to_string(),
                updated: command.updates.top_level_keys(),
                message: command.message.to_string(),
                score: progress.score,
                distinction: progress.distinction,
                state,
                outcome: outcome.to_string(),
                timestamp: self.clock.now(),
            };
            self.emit_audit(&record).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        command: &MutationCommand<'_>,
        progress: &mut Progress,
    ) -> Result<CommitOutcome, BrokerError> {
        tracing::info!(updates = %command.updates.summary(), "mutation received");
        if command.updates.is_empty() {
            return Err(BrokerError::BadRequest("update set is empty".into()));
        }

        let (prior, version) = self.load(command.path).await?;

        let mut candidate = merge(&prior, command.updates);
        let stamp = format_instant(self.clock.now());
        candidate.set_generated(stamp.clone());
        let candidate_score = score(&candidate);
        let candidate_distinction = has_distinction(&candidate);
        progress.score = Some(candidate_score);
        progress.distinction = Some(candidate_distinction);
        progress.advance(MutationState::Merged);

        let verdict = self.gate.check(&MutationProposal {
            prior: &prior,
            candidate: &candidate,
            updates: command.updates,
            proposed_at: Some(&stamp),
        });
        progress.advance(MutationState::GateChecked);
        if let Err(violation) = verdict {
            tracing::warn!(
                invariant = %violation.invariant,
                reason = violation.reason_code(),
                "security gate rejected mutation"
            );
            return Err(violation.into());
        }

        let content = candidate.to_yaml()?;
        progress.advance(MutationState::CommitAttempted);
        let commit = bounded(
            "store write",
            self.timeouts.store(),
            self.store.write(command.path, &content, &version, command.message),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = %err, code = err.code(), "commit failed");
            err
        })?;

        tracing::info!(version = %commit.version, url = %commit.url, "mutation committed");
        Ok(CommitOutcome {
            commit,
            updated: command.updates.top_level_keys(),
            score: candidate_score,
            distinction: candidate_distinction,
        })
    }

    async fn emit_audit(&self, record: &AuditRecord) {
        let limit = self.timeouts.audit();
        match tokio::time::timeout(limit, self.audit.emit(record)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(error = %err, id = %record.id, "audit emission failed, record discarded");
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = millis(limit),
                    id = %record.id,
                    "audit emission timed out, record discarded"
                );
            }
        }
    }
}

/// Await a store call under a bound
async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T, BrokerError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(BrokerError::from),
        Err(_) => Err(BrokerError::Timeout {
            operation,
            timeout_ms: millis(limit),
        }),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
