//! In-process `ObjectStore` backed by a `DashMap`. Used by the crate's own
//! tests and by callers that want a bundle scoped to a single process.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::{BundlebaseError, Result};
use super::ObjectStore;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.objects
            .get(url)
            .map(|v| v.clone())
            .ok_or_else(|| BundlebaseError::NotFound(url.to_string()))
    }

    async fn put(&self, url: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.insert(url.to_string(), bytes);
        Ok(())
    }

    async fn put_if_absent(&self, url: &str, bytes: Vec<u8>) -> Result<bool> {
        match self.objects.entry(url.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(bytes);
                Ok(true)
            }
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        self.objects
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| BundlebaseError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_if_absent_loses_the_race_on_the_second_writer() {
        let store = MemoryObjectStore::new();
        assert!(store.put_if_absent("a", vec![1]).await.unwrap());
        assert!(!store.put_if_absent("a", vec![2]).await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn list_returns_sorted_matching_keys() {
        let store = MemoryObjectStore::new();
        store.put("b/2", vec![]).await.unwrap();
        store.put("b/1", vec![]).await.unwrap();
        store.put("a/1", vec![]).await.unwrap();
        let keys = store.list("b/").await.unwrap();
        assert_eq!(keys, vec!["b/1".to_string(), "b/2".to_string()]);
    }

    #[tokio::test]
    async fn get_on_missing_key_is_not_found() {
        let store = MemoryObjectStore::new();
        assert!(matches!(
            store.get("missing").await,
            Err(BundlebaseError::NotFound(_))
        ));
    }
}
