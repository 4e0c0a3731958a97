//! Security gate
//!
//! Two invariants, evaluated in order. The gate is fail-closed: the first
//! violation aborts the mutation and the second check does not run.
//!
//! 1. **Temporal integrity**: the proposed timestamp must be strictly later
//!    than the prior document's `generated` timestamp. Absent or unparseable
//!    timestamps skip the check.
//! 2. **Scoring guard**: an update that raises the Big Orange flag requires
//!    the candidate document to score exactly 100.

use crate::timestamp::parse_instant;
use faf_dna::{is_truthy, score, ProjectDna, UpdateSet, DISTINCTION_LABEL};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Score a document needs before the distinction may be set
pub const DISTINCTION_REQUIRED_SCORE: u8 = 100;

/// Substring that marks an update key as touching the distinction
const ORANGE_MARKER: &str = "orange";

/// Named invariants enforced by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invariant {
    /// Mutations must move the document's timestamp strictly forward
    TemporalIntegrity,
    /// The distinction may only be set on a complete document
    ScoringGuard,
}

impl Invariant {
    /// Invariant name as reported to callers
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemporalIntegrity => "temporal_integrity",
            Self::ScoringGuard => "scoring_guard",
        }
    }

    /// Machine-readable reason code for a violation
    #[inline]
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::TemporalIntegrity => "TEMPORAL_NON_MONOTONIC",
            Self::ScoringGuard => "DISTINCTION_REQUIRES_FULL_SCORE",
        }
    }
}

impl Display for Invariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{invariant} violated: {message}")]
pub struct GateViolation {
    /// Which invariant failed
    pub invariant: Invariant,
    /// Human-readable explanation
    pub message: String,
}

impl GateViolation {
    fn new(invariant: Invariant, message: impl Into<String>) -> Self {
        Self {
            invariant,
            message: message.into(),
        }
    }

    /// Reason code of the failed invariant
    #[inline]
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        self.invariant.reason_code()
    }
}

/// Everything the gate looks at for one mutation
#[derive(Debug, Clone, Copy)]
pub struct MutationProposal<'a> {
    /// Document as currently stored
    pub prior: &'a ProjectDna,
    /// Document after merging the updates
    pub candidate: &'a ProjectDna,
    /// Updates the caller asked for
    pub updates: &'a UpdateSet,
    /// Timestamp the candidate will be stamped with
    pub proposed_at: Option<&'a str>,
}

/// Stateless gate over both invariants
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityGate;

impl SecurityGate {
    /// Create the gate
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run both invariants in order
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn check(&self, proposal: &MutationProposal<'_>) -> Result<(), GateViolation> {
        check_temporal_integrity(proposal.prior.generated(), proposal.proposed_at)?;
        check_scoring_guard(proposal.candidate, proposal.updates)
    }
}

/// Temporal integrity: `proposed` must be strictly after `prior`
///
/// # Errors
/// Returns a [`Invariant::TemporalIntegrity`] violation when the proposed
/// instant is not later than the prior one
pub fn check_temporal_integrity(
    prior: Option<&str>,
    proposed: Option<&str>,
) -> Result<(), GateViolation> {
    let (Some(prior_raw), Some(proposed_raw)) = (prior, proposed) else {
        tracing::debug!("temporal integrity skipped: timestamp absent");
        return Ok(());
    };
    let (Some(prior_at), Some(proposed_at)) = (parse_instant(prior_raw), parse_instant(proposed_raw))
    else {
        tracing::debug!(
            prior = prior_raw,
            proposed = proposed_raw,
            "temporal integrity skipped: timestamp unparseable"
        );
        return Ok(());
    };

    if proposed_at > prior_at {
        Ok(())
    } else {
        Err(GateViolation::new(
            Invariant::TemporalIntegrity,
            format!(
                "proposed timestamp {proposed_raw} is not after the last recorded {prior_raw}"
            ),
        ))
    }
}

/// Scoring guard: raising the distinction needs a full score
///
/// # Errors
/// Returns a [`Invariant::ScoringGuard`] violation when the updates raise
/// the distinction and the candidate scores below 100
pub fn check_scoring_guard(
    candidate: &ProjectDna,
    updates: &UpdateSet,
) -> Result<(), GateViolation> {
    if !raises_distinction(updates) {
        return Ok(());
    }
    let candidate_score = score(candidate);
    if candidate_score == DISTINCTION_REQUIRED_SCORE {
        Ok(())
    } else {
        Err(GateViolation::new(
            Invariant::ScoringGuard,
            format!(
                "Big Orange requires a score of {DISTINCTION_REQUIRED_SCORE}, candidate scores {candidate_score}"
            ),
        ))
    }
}

/// Whether any update sets the distinction to a qualifying value
///
/// Keys containing `orange` (any case) qualify on any truthy value. The
/// direct distinction fields (`faf_distinction`, `meta.distinction`, or a
/// `meta` mapping carrying `distinction`) qualify on `true` or a label
/// naming orange.
#[must_use]
pub fn raises_distinction(updates: &UpdateSet) -> bool {
    updates.iter().any(|(key, value)| {
        if key.to_lowercase().contains(ORANGE_MARKER) && is_truthy(value) {
            return true;
        }
        match key {
            "faf_distinction" | "meta.distinction" => is_qualifying_label(value),
            "meta" => value
                .get("distinction")
                .is_some_and(is_qualifying_label),
            _ => false,
        }
    })
}

fn is_qualifying_label(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(label) => {
            label == DISTINCTION_LABEL || label.to_lowercase().contains(ORANGE_MARKER)
        }
        _ => false,
    }
}
