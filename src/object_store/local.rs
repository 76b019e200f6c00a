//! Filesystem-backed `ObjectStore`, rooted at a directory. URLs are
//! relative paths under the root; `put_if_absent` uses `O_EXCL` semantics
//! via `tokio::fs::OpenOptions::create_new` so the race guarantee holds
//! across processes, not just within one.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::ObjectStore;
#[cfg(test)]
use crate::errors::BundlebaseError;
use crate::errors::Result;

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalObjectStore { root: root.into() }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(url.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path_for(url)).await?)
    }

    async fn put(&self, url: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(tokio::fs::write(path, bytes).await?)
    }

    async fn put_if_absent(&self, url: &str, bytes: Vec<u8>) -> Result<bool> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(&bytes).await?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.path_for(prefix);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                names.push(rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        Ok(tokio::fs::remove_file(self.path_for(url)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("a/b.txt", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("a/b.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn put_if_absent_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.put_if_absent("x", b"1".to_vec()).await.unwrap());
        assert!(!store.put_if_absent("x", b"2".to_vec()).await.unwrap());
        assert_eq!(store.get("x").await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn list_on_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert_eq!(store.list("nope/").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn get_on_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(matches!(
            store.get("nope.txt").await,
            Err(BundlebaseError::NotFound(_))
        ));
    }
}
