//! Append-only commit log, one per bundle root.
//!
//! Commit files live under `<root>/_bundlebase/` as
//! `NNNNNNNNNNNNNNNNN.yaml`, alongside `_bundlebase/packs/` and
//! `_bundlebase/views/`. Appending goes through `put_if_absent` so a
//! concurrent writer that raced us to the same sequence number loses with
//! [`BundlebaseError::ConcurrentWriteConflict`] instead of silently
//! clobbering a commit.

use std::sync::Arc;

use crate::commit::{commit_filename, Commit, INIT_COMMIT_NAME};
use crate::errors::{BundlebaseError, Result};
use crate::fingerprint::Fingerprint;
use crate::object_store::{with_retry, ObjectStore};

const MAX_READ_ATTEMPTS: u32 = 3;

pub struct CommitLog {
    store: Arc<dyn ObjectStore>,
    root: String,
}

impl CommitLog {
    pub fn new(store: Arc<dyn ObjectStore>, root: impl Into<String>) -> Self {
        CommitLog {
            store,
            root: root.into(),
        }
    }

    fn path(&self, filename: &str) -> String {
        format!("{}/_bundlebase/{filename}", self.root.trim_end_matches('/'))
    }

    pub async fn read_all(&self) -> Result<Vec<Commit>> {
        let base = format!("{}/_bundlebase/", self.root.trim_end_matches('/'));
        let mut filenames: Vec<String> = self
            .store
            .list(&base)
            .await?
            .into_iter()
            // `_bundlebase/` also holds `packs/` and `views/`; commit files
            // are its only direct `.yaml` children.
            .filter(|path| {
                path.strip_prefix(&base)
                    .is_some_and(|rest| rest.ends_with(".yaml") && !rest.contains('/'))
            })
            .collect();
        filenames.sort();
        let mut commits = Vec::with_capacity(filenames.len());
        for path in filenames {
            let bytes = with_retry(MAX_READ_ATTEMPTS, || self.store.get(&path)).await?;
            commits.push(Commit::from_bytes(&bytes)?);
        }
        Ok(commits)
    }

    pub async fn head(&self) -> Result<Option<Commit>> {
        Ok(self.read_all().await?.into_iter().last())
    }

    pub async fn append_init(&self, commit: Commit) -> Result<()> {
        commit.validate()?;
        let path = self.path(INIT_COMMIT_NAME);
        let wrote = self
            .store
            .put_if_absent(&path, commit.to_bytes())
            .await?;
        if !wrote {
            return Err(BundlebaseError::BundleAlreadyExists(self.root.clone()));
        }
        Ok(())
    }

    /// Appends `commit` at `expected_sequence`, failing with
    /// `ConcurrentWriteConflict` if another writer already claimed that
    /// slot (or if the caller's view of the log is stale).
    pub async fn append(&self, expected_sequence: u64, commit: Commit) -> Result<Fingerprint> {
        commit.validate()?;
        let existing = self.read_all().await?;
        if existing.len() as u64 != expected_sequence {
            return Err(BundlebaseError::ConcurrentWriteConflict(format!(
                "expected {} prior commits, found {}",
                expected_sequence,
                existing.len()
            )));
        }
        if let Some(head) = existing.last() {
            if commit.parent != Some(head.fingerprint()) {
                return Err(BundlebaseError::ConcurrentWriteConflict(
                    "commit's parent does not match the log head".into(),
                ));
            }
        }
        let path = self.path(&commit_filename(expected_sequence));
        let wrote = self
            .store
            .put_if_absent(&path, commit.to_bytes())
            .await?;
        if !wrote {
            tracing::warn!(root = %self.root, expected_sequence, "commit append lost the race");
            return Err(BundlebaseError::ConcurrentWriteConflict(format!(
                "sequence {expected_sequence} was already written by another writer"
            )));
        }
        tracing::debug!(root = %self.root, expected_sequence, "appended commit");
        Ok(commit.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::BundleId;
    use crate::object_store::memory::MemoryObjectStore;

    fn log() -> CommitLog {
        CommitLog::new(Arc::new(MemoryObjectStore::new()), "mem://b")
    }

    #[tokio::test]
    async fn append_init_twice_is_bundle_already_exists() {
        let log = log();
        log.append_init(Commit::init_with_id(BundleId::new_random(), "create"))
            .await
            .unwrap();
        let err = log
            .append_init(Commit::init_with_id(BundleId::new_random(), "create again"))
            .await
            .unwrap_err();
        assert!(matches!(err, BundlebaseError::BundleAlreadyExists(_)));
    }

    #[tokio::test]
    async fn append_after_init_extends_the_log() {
        let log = log();
        log.append_init(Commit::init_with_id(BundleId::new_random(), "create"))
            .await
            .unwrap();
        let head = log.head().await.unwrap().unwrap();
        let parent = head.fingerprint();
        log.append(
            1,
            Commit::child(parent, Fingerprint::of(b"change"), "commit 1", vec![]),
        )
        .await
        .unwrap();
        assert_eq!(log.read_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn append_with_stale_sequence_conflicts() {
        let log = log();
        log.append_init(Commit::init_with_id(BundleId::new_random(), "create"))
            .await
            .unwrap();
        let head = log.head().await.unwrap().unwrap();
        let parent = head.fingerprint();
        let err = log
            .append(
                0,
                Commit::child(parent, Fingerprint::of(b"change"), "commit 1", vec![]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BundlebaseError::ConcurrentWriteConflict(_)));
    }
}
