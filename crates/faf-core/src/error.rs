//! Broker error taxonomy
//!
//! Every failure that can reach a caller is folded into [`BrokerError`]:
//! - Source document missing or malformed
//! - Bad requests (missing or empty update sets)
//! - Security gate rejections, carrying the violated invariant
//! - Concurrency conflicts and upstream store failures
//! - Timeouts on any external call
//! - Configuration and internal failures
//!
//! Messages are passed through [`redact`] before they are rendered so that
//! credential material never leaves the process.

use crate::audit::AuditError;
use crate::config::ConfigError;
use crate::credentials::CredentialError;
use crate::store::StoreError;
use faf_dna::DnaError;
use faf_gate::GateViolation;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

/// Main broker error type
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Source document does not exist
    #[error("document not found: {path}")]
    NotFound {
        /// Requested document path
        path: String,
    },

    /// Stored document could not be parsed
    #[error("malformed document: {0}")]
    Parse(String),

    /// Request was missing required input
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Security gate refused the mutation
    #[error("mutation rejected: {0}")]
    SecurityRejected(#[from] GateViolation),

    /// Another writer committed first
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Document store or network failure
    #[error("upstream failure: {message}")]
    Upstream {
        /// Upstream HTTP status, when there was one
        status: Option<u16>,
        /// Upstream message
        message: String,
    },

    /// An external call exceeded its bound
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Which call timed out
        operation: &'static str,
        /// Configured bound
        timeout_ms: u64,
    },

    /// Configuration or credential source unavailable
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// HTTP status the transport should answer with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Parse(_) | Self::BadRequest(_) => 400,
            Self::SecurityRejected(_) => 403,
            Self::ConcurrencyConflict(_) => 409,
            Self::Upstream { .. } => 502,
            Self::Timeout { .. } => 504,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable reason code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Parse(_) => "PARSE_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::SecurityRejected(violation) => violation.reason_code(),
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if the caller may retry the same request
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict(_) | Self::Upstream { .. } | Self::Timeout { .. }
        )
    }

    /// Status reported by the upstream store, if any
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::ConcurrencyConflict(_) => Some(409),
            _ => None,
        }
    }

    /// Structured failure body
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "success": false,
            "error": redact(&self.to_string()),
            "code": self.code(),
        });
        if let Self::SecurityRejected(violation) = self {
            payload["invariant"] = json!(violation.invariant.as_str());
        }
        if let Some(status) = self.upstream_status() {
            payload["upstream_status"] = json!(status);
        }
        payload
    }
}

impl From<DnaError> for BrokerError {
    fn from(err: DnaError) -> Self {
        if err.is_malformed_input() {
            Self::Parse(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<StoreError> for BrokerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { path } => Self::NotFound { path },
            StoreError::Conflict { path, message } => {
                Self::ConcurrencyConflict(format!("{path}: {message}"))
            }
            StoreError::InvalidPath(path) => Self::BadRequest(format!("invalid document path: {path}")),
            StoreError::Upstream { status, message } => Self::Upstream {
                status: Some(status),
                message: redact(&message),
            },
            StoreError::Http(e) => Self::Upstream {
                status: e.status().map(|s| s.as_u16()),
                message: redact(&e.to_string()),
            },
            StoreError::TimedOut { timeout_ms } => Self::Timeout {
                operation: "store request",
                timeout_ms,
            },
            StoreError::Io(e) => Self::Upstream {
                status: None,
                message: e.to_string(),
            },
            StoreError::Decode(message) => Self::Parse(message),
            StoreError::Credential(e) => Self::from(e),
        }
    }
}

impl From<CredentialError> for BrokerError {
    fn from(err: CredentialError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ConfigError> for BrokerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<AuditError> for BrokerError {
    fn from(err: AuditError) -> Self {
        Self::Internal(err.to_string())
    }
}

static CREDENTIAL_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"github_pat_[A-Za-z0-9_]+", "github_pat_[REDACTED]"),
        (r"gh[pousr]_[A-Za-z0-9]+", "gh*_[REDACTED]"),
        (r"(?i)bearer\s+[A-Za-z0-9._~+/=-]+", "Bearer [REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, mask)| Regex::new(pattern).ok().map(|re| (re, mask)))
    .collect()
});

/// Mask credential-shaped substrings
#[must_use]
pub fn redact(text: &str) -> String {
    CREDENTIAL_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, (pattern, mask)| {
            pattern.replace_all(&acc, *mask).into_owned()
        })
}
