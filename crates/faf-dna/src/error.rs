//! Error types for DNA parsing and encoding

/// Errors raised while decoding or encoding a project DNA document
#[derive(Debug, thiserror::Error)]
pub enum DnaError {
    /// The YAML text could not be parsed
    #[error("YAML parse error: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// The JSON text could not be parsed
    #[error("JSON parse error: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The document parsed, but its root is not a mapping
    #[error("document root must be a mapping, found {0}")]
    NotAMapping(&'static str),

    /// The document is empty
    #[error("empty document")]
    Empty,

    /// Re-encoding the document failed
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl DnaError {
    /// Whether the error means the input itself was malformed
    #[inline]
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, Self::Serialization(_))
    }
}
