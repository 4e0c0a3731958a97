//! Credential sources
//!
//! The store token is resolved through an injected [`CredentialSource`] so
//! the broker never reads process-wide state directly. Resolved tokens are
//! [`SecretString`]s, so they never end up in logs or error text.

use secrecy::{ExposeSecret, SecretString};
use std::fmt::Debug;
use std::path::PathBuf;

/// Credential resolution failures
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Source has no value
    #[error("credential not set: {origin}")]
    Missing {
        /// Where the credential was looked for
        origin: String,
    },

    /// Source holds an empty value
    #[error("credential is empty: {origin}")]
    Empty {
        /// Where the credential was looked for
        origin: String,
    },

    /// Secret file could not be read
    #[error("cannot read credential file {path}: {error}")]
    Unreadable {
        /// Secret file path
        path: PathBuf,
        /// Underlying failure
        error: std::io::Error,
    },
}

/// Anything that can produce the store token
pub trait CredentialSource: Send + Sync + Debug {
    /// Resolve the token
    ///
    /// # Errors
    /// Returns error if the credential is absent, empty or unreadable
    fn resolve(&self) -> Result<SecretString, CredentialError>;
}

fn non_empty(raw: &str, origin: impl Fn() -> String) -> Result<SecretString, CredentialError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(CredentialError::Empty { origin: origin() })
    } else {
        Ok(SecretString::from(trimmed.to_string()))
    }
}

/// Token from a named environment variable
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    /// Read from `var`
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredentials {
    fn resolve(&self) -> Result<SecretString, CredentialError> {
        let origin = || format!("env:{}", self.var);
        let raw = std::env::var(&self.var).map_err(|_| CredentialError::Missing { origin: origin() })?;
        non_empty(&raw, origin)
    }
}

/// Token from a mounted secret file
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    /// Read from the file at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for FileCredentials {
    fn resolve(&self) -> Result<SecretString, CredentialError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => CredentialError::Missing {
                origin: format!("file:{}", self.path.display()),
            },
            _ => CredentialError::Unreadable {
                path: self.path.clone(),
                error,
            },
        })?;
        non_empty(&raw, || format!("file:{}", self.path.display()))
    }
}

/// Fixed token
#[derive(Debug)]
pub struct StaticCredentials(SecretString);

impl StaticCredentials {
    /// Always resolve to `token`
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

impl CredentialSource for StaticCredentials {
    fn resolve(&self) -> Result<SecretString, CredentialError> {
        non_empty(self.0.expose_secret(), || "static".to_string())
    }
}
