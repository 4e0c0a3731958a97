//! Document stores
//!
//! The store is the only shared mutable resource. It exposes the document
//! together with an opaque version token, and accepts writes only when the
//! caller presents the token it read. No implementation holds a lock across
//! a caller's read-modify-write cycle.

mod github;
mod local;
mod memory;

pub use github::{GitHubContentsStore, GitHubTarget};
pub use local::LocalFileStore;
pub use memory::MemoryStore;

use crate::credentials::CredentialError;
use async_trait::async_trait;
use faf_dna::VersionToken;
use serde::Serialize;
use std::path::{Component, Path};

/// Document content as read, with the token for a conditional write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDna {
    /// Raw `.faf` text
    pub content: String,
    /// Version the content was read at
    pub version: VersionToken,
}

/// Result of a successful conditional write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// Version of the newly written content
    pub version: VersionToken,
    /// Commit message recorded with the write
    pub message: String,
    /// Canonical reference to the committed state
    pub url: String,
}

/// Store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document at the path
    #[error("no document at {path}")]
    NotFound {
        /// Requested path
        path: String,
    },

    /// Path escapes the store or is otherwise unusable
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Version token no longer matches
    #[error("version conflict on {path}: {message}")]
    Conflict {
        /// Document path
        path: String,
        /// Store-provided detail
        message: String,
    },

    /// Non-success response from a remote store
    #[error("upstream returned {status}: {message}")]
    Upstream {
        /// HTTP status
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// HTTP transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote request hit the client timeout
    #[error("request timed out after {timeout_ms}ms")]
    TimedOut {
        /// Client timeout
        timeout_ms: u64,
    },

    /// Local I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes could not be decoded to text
    #[error("decode error: {0}")]
    Decode(String),

    /// Credential source failed
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Read-with-version and conditional-write-with-version
#[async_trait]
pub trait DnaStore: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Read the document at `path` and its current version
    async fn read(&self, path: &str) -> Result<StoredDna, StoreError>;

    /// Replace the document at `path` if its version is still `expected`
    ///
    /// Fails with [`StoreError::Conflict`] instead of overwriting when the
    /// stored version has moved on.
    async fn write(
        &self,
        path: &str,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<CommitRecord, StoreError>;
}

/// Reject absolute paths and parent traversal
pub(crate) fn validate_relative(path: &str) -> Result<&Path, StoreError> {
    let candidate = Path::new(path);
    let clean = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if clean {
        Ok(candidate)
    } else {
        Err(StoreError::InvalidPath(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_pass() {
        assert!(validate_relative("project.faf").is_ok());
        assert!(validate_relative("docs/project.faf").is_ok());
        assert!(validate_relative("./project.faf").is_ok());
    }

    #[test]
    fn escaping_paths_fail() {
        assert!(validate_relative("").is_err());
        assert!(validate_relative("/etc/passwd").is_err());
        assert!(validate_relative("../secrets.faf").is_err());
        assert!(validate_relative("docs/../../x").is_err());
    }
}
