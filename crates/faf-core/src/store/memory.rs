//! In-process store

use super::{validate_relative, CommitRecord, DnaStore, StoreError, StoredDna};
use async_trait::async_trait;
use faf_dna::VersionToken;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Map-backed store; the version token is the BLAKE3 hash of the content
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, bypassing version checks
    #[must_use]
    pub fn with_document(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.put(path, content);
        self
    }

    /// Insert or replace a document unconditionally
    pub fn put(&self, path: impl Into<String>, content: impl Into<String>) {
        self.documents.lock().insert(path.into(), content.into());
    }

    /// Current content at `path`
    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        self.documents.lock().get(path).cloned()
    }
}

#[async_trait]
impl DnaStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, path: &str) -> Result<StoredDna, StoreError> {
        validate_relative(path)?;
        let documents = self.documents.lock();
        let content = documents.get(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;
        Ok(StoredDna {
            content: content.clone(),
            version: VersionToken::for_content(content.as_bytes()),
        })
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<CommitRecord, StoreError> {
        validate_relative(path)?;
        let mut documents = self.documents.lock();
        let current = documents.get(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;

        let actual = VersionToken::for_content(current.as_bytes());
        if &actual != expected {
            return Err(StoreError::Conflict {
                path: path.to_string(),
                message: format!("expected version {expected}, store is at {actual}"),
            });
        }

        documents.insert(path.to_string(), content.to_string());
        let version = VersionToken::for_content(content.as_bytes());
        Ok(CommitRecord {
            url: format!("memory://{path}@{version}"),
            version,
            message: message.to_string(),
        })
    }
}
