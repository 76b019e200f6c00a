//! Views: named child bundles whose init commit `FROM`s the parent, so
//! resolving a view transparently replays the parent's full history
//! before any operations staged on the view itself.

use std::sync::Arc;

use crate::commit::Commit;
use crate::commit::log::CommitLog;
use crate::errors::{BundlebaseError, Result};
use crate::fingerprint::{BundleId, Fingerprint};
use crate::object_store::ObjectStore;
use crate::operation::Operation;
use crate::resolver::BundleState;

/// Creates a new child bundle rooted at `<parent_root>/views/<id>` whose
/// init commit extends `parent_root`. If `ops` is non-empty (a forked
/// builder's staged `select_sql` and the like), they're written as the
/// child's own second commit, so the view carries a transform rather than
/// being a bare pass-through of the parent. Returns the child's URL, which
/// becomes the `bundle_id` recorded by `Operation::CreateView`.
pub async fn create_view_bundle(
    store: Arc<dyn ObjectStore>,
    parent_root: &str,
    name: &str,
    ops: Vec<Operation>,
) -> Result<String> {
    let id = BundleId::new_random();
    let child_root = format!(
        "{}/views/{}",
        parent_root.trim_end_matches('/'),
        id.as_hex()
    );
    let log = CommitLog::new(store, &child_root);
    let init = Commit::init_from(parent_root, format!("Create view {name}"));
    let init_fingerprint = init.fingerprint();
    log.append_init(init).await?;
    if !ops.is_empty() {
        let change_json: Vec<u8> = ops
            .iter()
            .flat_map(|op| serde_json::to_vec(op).expect("Operation always serializes"))
            .collect();
        let change_fp = Fingerprint::of(&change_json);
        let commit = Commit::child(init_fingerprint, change_fp, format!("View {name} definition"), ops);
        log.append(1, commit).await?;
    }
    tracing::debug!(parent_root, child_root, name, "created view bundle");
    Ok(child_root)
}

pub fn resolve_view_url<'a>(state: &'a BundleState, name: &str) -> Result<&'a str> {
    state.views.get(name).map(String::as_str).ok_or_else(|| {
        let available: Vec<&str> = state.views.keys().map(String::as_str).collect();
        BundlebaseError::ViewNotFound(crate::errors::with_alternatives(
            format!("no such view '{name}'"),
            &available,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::BundleId as Bid;
    use crate::identity::resolve_chain;
    use crate::object_store::memory::MemoryObjectStore;

    #[tokio::test]
    async fn view_bundle_inherits_parent_history() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let parent_log = CommitLog::new(store.clone(), "mem://parent");
        parent_log
            .append_init(Commit::init_with_id(Bid::new_random(), "create"))
            .await
            .unwrap();

        let view_root = create_view_bundle(store.clone(), "mem://parent", "latest", Vec::new())
            .await
            .unwrap();
        let chain = resolve_chain(store, &view_root).await.unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[tokio::test]
    async fn view_bundle_with_ops_carries_its_own_commit() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let parent_log = CommitLog::new(store.clone(), "mem://parent");
        parent_log
            .append_init(Commit::init_with_id(Bid::new_random(), "create"))
            .await
            .unwrap();

        let ops = vec![Operation::Select {
            columns: vec!["id".into()],
        }];
        let view_root = create_view_bundle(store.clone(), "mem://parent", "ids-only", ops)
            .await
            .unwrap();
        let chain = resolve_chain(store, &view_root).await.unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.last().unwrap().operations.len(), 1);
    }

    #[test]
    fn resolve_view_url_lists_defined_view_names() {
        let mut state = BundleState::default();
        state
            .views
            .insert("a".to_string(), "mem://parent/views/x".to_string());
        let err = resolve_view_url(&state, "missing").unwrap_err();
        assert!(err.to_string().contains("a"));
    }
}
