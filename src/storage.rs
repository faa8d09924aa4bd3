//! Session-scoped temporary file storage.
//!
//! Renamed documents are materialized under one directory per user; the
//! whole directory is purged when the session is destroyed.

use crate::session::UserId;
use std::io;
use std::path::PathBuf;

/// Manages per-user temporary directories under a fixed root.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    /// Store rooted at `root`; nothing is created on disk until a rename
    /// needs it.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one user's materialized files.
    #[must_use]
    pub fn user_dir(&self, user_id: UserId) -> PathBuf {
        self.root.join(format!("user_{user_id}"))
    }

    /// Create (if needed) and return the user's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn prepare(&self, user_id: UserId) -> io::Result<PathBuf> {
        let dir = self.user_dir(user_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Delete the user's directory and everything in it. A directory that
    /// was never created is not an error.
    ///
    /// # Errors
    ///
    /// Returns any filesystem error other than the directory being absent.
    pub async fn purge(&self, user_id: UserId) -> io::Result<()> {
        match tokio::fs::remove_dir_all(self.user_dir(user_id)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_store() -> TempStore {
        let root = std::env::temp_dir().join(format!("pdf-post-bot-test-{}", Uuid::new_v4()));
        TempStore::new(root)
    }

    #[tokio::test]
    async fn test_prepare_creates_lazily() {
        let store = scratch_store();
        assert!(!store.user_dir(1).exists());

        let dir = store.prepare(1).await.expect("create user dir");
        assert!(dir.exists());
        // Idempotent.
        store.prepare(1).await.expect("prepare existing dir");

        store.purge(1).await.expect("purge user dir");
    }

    #[tokio::test]
    async fn test_purge_removes_contents() {
        let store = scratch_store();
        let dir = store.prepare(7).await.expect("create user dir");
        tokio::fs::write(dir.join("DOC-UPDATE_Notes.pdf"), b"%PDF-1.4")
            .await
            .expect("write scratch file");

        store.purge(7).await.expect("purge user dir");
        assert!(!store.user_dir(7).exists());
    }

    #[tokio::test]
    async fn test_purge_missing_dir_is_ok() {
        let store = scratch_store();
        store.purge(42).await.expect("purge absent dir");
    }

    #[tokio::test]
    async fn test_user_dirs_are_disjoint() {
        let store = scratch_store();
        assert_ne!(store.user_dir(1), store.user_dir(2));
        assert_ne!(store.user_dir(12), store.user_dir(1));
    }
}
