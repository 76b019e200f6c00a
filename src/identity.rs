//! Resolves a bundle's full commit history across the `FROM` chain.
//!
//! `extend()` never re-mints a [`BundleId`]; the child's init commit
//! records the parent's URL instead, and resolving the child means
//! walking back through every ancestor's commits first. Cycles (a bundle
//! that, transitively, extends itself) are caught by tracking visited
//! URLs rather than by a traversal depth cap.

use std::collections::HashSet;
use std::sync::Arc;

use crate::commit::Commit;
use crate::commit::log::CommitLog;
use crate::errors::{BundlebaseError, Result};
use crate::object_store::ObjectStore;

/// Walks the FROM chain starting at `root_url` and returns every commit
/// in application order: oldest ancestor's commits first, this bundle's
/// own commits last.
pub async fn resolve_chain(store: Arc<dyn ObjectStore>, root_url: &str) -> Result<Vec<Commit>> {
    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    let mut url = root_url.to_string();

    loop {
        if !visited.insert(url.clone()) {
            return Err(BundlebaseError::InvalidUrl("cycle in FROM chain".into()));
        }
        let log = CommitLog::new(store.clone(), &url);
        let commits = log.read_all().await?;
        let init = commits.first().ok_or_else(|| {
            BundlebaseError::NotFound(format!("no commits found at '{url}'"))
        })?;
        match &init.from_url {
            Some(parent_url) => {
                let parent_url = parent_url.clone();
                stack.push(commits);
                url = parent_url;
            }
            None => {
                stack.push(commits);
                break;
            }
        }
    }

    let mut ordered = Vec::new();
    for commits in stack.into_iter().rev() {
        ordered.extend(commits);
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{BundleId, Fingerprint};
    use crate::object_store::memory::MemoryObjectStore;

    #[tokio::test]
    async fn single_bundle_resolves_its_own_commits() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let log = CommitLog::new(store.clone(), "mem://root");
        log.append_init(Commit::init_with_id(BundleId::new_random(), "create"))
            .await
            .unwrap();
        let chain = resolve_chain(store, "mem://root").await.unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn extended_bundle_prepends_parent_commits() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let root_log = CommitLog::new(store.clone(), "mem://root");
        root_log
            .append_init(Commit::init_with_id(BundleId::new_random(), "create root"))
            .await
            .unwrap();
        let head = root_log.head().await.unwrap().unwrap();
        root_log
            .append(
                1,
                Commit::child(head.fingerprint(), Fingerprint::of(b"c"), "op", vec![]),
            )
            .await
            .unwrap();

        let child_log = CommitLog::new(store.clone(), "mem://child");
        child_log
            .append_init(Commit::init_from("mem://root", "extend"))
            .await
            .unwrap();

        let chain = resolve_chain(store, "mem://child").await.unwrap();
        assert_eq!(chain.len(), 3);
        assert!(chain[0].id.is_some());
    }

    #[tokio::test]
    async fn self_referential_from_is_a_cycle() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let log = CommitLog::new(store.clone(), "mem://a");
        log.append_init(Commit::init_from("mem://a", "loop"))
            .await
            .unwrap();
        let err = resolve_chain(store, "mem://a").await.unwrap_err();
        assert!(matches!(err, BundlebaseError::InvalidUrl(_)));
    }
}
