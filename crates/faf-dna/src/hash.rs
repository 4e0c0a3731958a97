//! Version tokens
//!
//! [`VersionToken`] is the opaque optimistic-concurrency token a store hands
//! out with every read. Local stores derive it from a BLAKE3 digest of the
//! stored bytes; remote stores pass through whatever identifier the upstream
//! API uses (a git blob sha for the contents API).

use std::fmt::{self, Display, Formatter};

/// Opaque version token for optimistic concurrency
///
/// Two tokens are equal iff they name the same stored revision. Nothing
/// about the token's shape is interpreted by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap an upstream-provided identifier
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Derive a token from stored bytes
    #[inline]
    #[must_use]
    pub fn for_content(content: &[u8]) -> Self {
        Self(blake3::hash(content).to_hex().to_string())
    }

    /// Token as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VersionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
