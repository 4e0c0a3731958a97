//! Local filesystem store

use super::{validate_relative, CommitRecord, DnaStore, StoreError, StoredDna};
use async_trait::async_trait;
use faf_dna::VersionToken;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Documents stored as files under a root directory
///
/// Writes are serialized per store and re-check the on-disk content hash
/// before replacing the file through a temp-file rename.
#[derive(Debug)]
pub struct LocalFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalFileStore {
    /// Store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(validate_relative(path)?))
    }

    async fn read_at(full: &Path, path: &str) -> Result<String, StoreError> {
        let bytes = tokio::fs::read(full).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_string(),
            },
            _ => StoreError::Io(e),
        })?;
        String::from_utf8(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DnaStore for LocalFileStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn read(&self, path: &str) -> Result<StoredDna, StoreError> {
        let full = self.resolve(path)?;
        let content = Self::read_at(&full, path).await?;
        let version = VersionToken::for_content(content.as_bytes());
        Ok(StoredDna { content, version })
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<CommitRecord, StoreError> {
        let full = self.resolve(path)?;
        let _guard = self.write_lock.lock().await;

        let current = Self::read_at(&full, path).await?;
        let actual = VersionToken::for_content(current.as_bytes());
        if &actual != expected {
            return Err(StoreError::Conflict {
                path: path.to_string(),
                message: format!("expected version {expected}, file is at {actual}"),
            });
        }

        let file_name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let temp = full.with_file_name(format!(".{file_name}.{}.tmp", ulid::Ulid::new()));
        tokio::fs::write(&temp, content).await?;
        if let Err(e) = tokio::fs::rename(&temp, &full).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        let version = VersionToken::for_content(content.as_bytes());
        tracing::debug!(path, %version, "local document replaced");
        Ok(CommitRecord {
            url: format!("file://{}", full.display()),
            version,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded(content: &str) -> (TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("project.faf"), content)
            .await
            .unwrap();
        let store = LocalFileStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn write_replaces_file_and_returns_file_url() {
        let (dir, store) = seeded("a: 1\n").await;
        let stored = store.read("project.faf").await.unwrap();
        let commit = store
            .write("project.faf", "a: 2\n", &stored.version, "update")
            .await
            .unwrap();

        assert!(commit.url.starts_with("file://"));
        assert_eq!(commit.message, "update");
        let on_disk = std::fs::read_to_string(dir.path().join("project.faf")).unwrap();
        assert_eq!(on_disk, "a: 2\n");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn external_edit_causes_conflict() {
        let (dir, store) = seeded("a: 1\n").await;
        let stored = store.read("project.faf").await.unwrap();
        std::fs::write(dir.path().join("project.faf"), "a: edited\n").unwrap();

        let err = store
            .write("project.faf", "a: 2\n", &stored.version, "update")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let (_dir, store) = seeded("a: 1\n").await;
        let err = store.read("../project.faf").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (_dir, store) = seeded("a: 1\n").await;
        let err = store.read("other.faf").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
