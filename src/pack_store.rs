//! Content-addressed byte storage for a single bundle: the place staged
//! operations that carry new external bytes (an attached local file, a
//! function body) land before the commit that references them is
//! written. Reachable only through [`Fingerprint`]-keyed paths under
//! `<root>/_bundlebase/packs/`; garbage collection is not this module's
//! job.

use std::sync::Arc;

use crate::errors::Result;
use crate::fingerprint::Fingerprint;
use crate::object_store::ObjectStore;

pub struct PackStore {
    store: Arc<dyn ObjectStore>,
    root: String,
}

impl PackStore {
    pub fn new(store: Arc<dyn ObjectStore>, root: impl Into<String>) -> Self {
        PackStore {
            store,
            root: root.into(),
        }
    }

    pub fn path_for(root: &str, fingerprint: &Fingerprint) -> String {
        format!(
            "{}/_bundlebase/packs/{}",
            root.trim_end_matches('/'),
            fingerprint.as_hex()
        )
    }

    /// Writes `bytes` under their own fingerprint and returns it. Racing
    /// writers of identical content converge on the same path, so the
    /// second `put_if_absent` losing is expected, not an error.
    pub async fn put(&self, bytes: &[u8]) -> Result<Fingerprint> {
        let fingerprint = Fingerprint::of(bytes);
        let path = Self::path_for(&self.root, &fingerprint);
        self.store.put_if_absent(&path, bytes.to_vec()).await?;
        Ok(fingerprint)
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>> {
        let path = Self::path_for(&self.root, fingerprint);
        self.store.get(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::memory::MemoryObjectStore;

    fn pack_store() -> PackStore {
        PackStore::new(Arc::new(MemoryObjectStore::new()), "mem://b")
    }

    #[tokio::test]
    async fn put_then_get_round_trips_the_bytes() {
        let store = pack_store();
        let fp = store.put(b"hello").await.unwrap();
        assert_eq!(store.get(&fp).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn identical_content_converges_on_the_same_fingerprint() {
        let store = pack_store();
        let a = store.put(b"same bytes").await.unwrap();
        let b = store.put(b"same bytes").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unwritten_fingerprint_is_not_found() {
        let store = pack_store();
        let missing = Fingerprint::of(b"never written");
        assert!(store.get(&missing).await.is_err());
    }
}
