//! Storage boundary the commit log is built on.
//!
//! `put_if_absent` is the primitive the log relies on for optimistic
//! concurrency: two writers racing to append the same commit sequence
//! number will have exactly one `put_if_absent` succeed, and the loser
//! surfaces as [`BundlebaseError::ConcurrentWriteConflict`]. Per-URL-prefix
//! configuration (credentials, retry policy) is resolved by longest-prefix
//! match in [`crate::config`], not here.

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::errors::Result;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
    async fn put(&self, url: &str, bytes: Vec<u8>) -> Result<()>;
    /// Writes only if nothing already exists at `url`; returns
    /// `Ok(false)` without writing if something does.
    async fn put_if_absent(&self, url: &str, bytes: Vec<u8>) -> Result<bool>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
    async fn delete(&self, url: &str) -> Result<()>;
    async fn exists(&self, url: &str) -> Result<bool> {
        match self.get(url).await {
            Ok(_) => Ok(true),
            Err(crate::errors::BundlebaseError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Retries a transient `Io`/`Timeout` failure with bounded exponential
/// backoff. Anything else (including `ConcurrentWriteConflict`, which
/// callers must resolve by re-reading the log) propagates immediately.
pub async fn with_retry<F, Fut, T>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::errors::BundlebaseError;

    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e @ (BundlebaseError::Io(_) | BundlebaseError::Timeout(_)))
                if attempt + 1 < max_attempts =>
            {
                let delay_ms = 10u64 * 2u64.pow(attempt);
                tracing::warn!(attempt, delay_ms, error = %e, "retrying object store operation");
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BundlebaseError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn with_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BundlebaseError::Io("disk full".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_non_transient_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BundlebaseError::ColumnNotFound("x".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
