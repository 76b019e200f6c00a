//! Declared sources: a URL prefix plus glob patterns and a decoder
//! function, auto-refreshed by listing the prefix and diffing against
//! what's already attached.

use std::sync::Arc;

use globset::{Glob, GlobSetBuilder};

use crate::errors::{BundlebaseError, Result};
use crate::object_store::ObjectStore;
use crate::resolver::SourceDef;

/// Lists `source.url_prefix` and returns every matching URL not already
/// present in `attached`, in sorted order. Does not attach anything
/// itself — the caller stages the resulting URLs as `Attach` operations.
pub async fn check_refresh(
    store: Arc<dyn ObjectStore>,
    source: &SourceDef,
    attached: &[String],
) -> Result<Vec<String>> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &source.patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| BundlebaseError::InvalidUrl(format!("bad glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    let matcher = builder
        .build()
        .map_err(|e| BundlebaseError::InvalidUrl(format!("bad glob set: {e}")))?;

    let candidates = store.list(&source.url_prefix).await?;
    let mut new_urls: Vec<String> = candidates
        .into_iter()
        .filter(|url| {
            let relative = url.strip_prefix(&source.url_prefix).unwrap_or(url);
            matcher.is_match(relative) && !attached.iter().any(|a| a == url)
        })
        .collect();
    new_urls.sort();
    Ok(new_urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::memory::MemoryObjectStore;

    fn source() -> SourceDef {
        SourceDef {
            url_prefix: "mem://data/".into(),
            patterns: vec!["*.csv".into()],
            function: "decode_csv".into(),
        }
    }

    #[tokio::test]
    async fn refresh_reports_only_unattached_matches() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        store.put("mem://data/a.csv", vec![]).await.unwrap();
        store.put("mem://data/b.csv", vec![]).await.unwrap();
        store.put("mem://data/readme.txt", vec![]).await.unwrap();

        let attached = vec!["mem://data/a.csv".to_string()];
        let fresh = check_refresh(store, &source(), &attached).await.unwrap();
        assert_eq!(fresh, vec!["mem://data/b.csv".to_string()]);
    }

    #[tokio::test]
    async fn refresh_with_nothing_new_is_empty() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        store.put("mem://data/a.csv", vec![]).await.unwrap();
        let attached = vec!["mem://data/a.csv".to_string()];
        let fresh = check_refresh(store, &source(), &attached).await.unwrap();
        assert!(fresh.is_empty());
    }
}
