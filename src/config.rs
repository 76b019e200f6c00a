//! Per-URL-prefix configuration overlay.
//!
//! Keys resolve by longest-matching `url_prefix`; a key set with no
//! prefix applies everywhere. Values are arbitrary JSON, mirroring the
//! scalar/table shapes used elsewhere in the object-store credential and
//! retry configuration.

use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BundleConfig {
    entries: HashMap<String, Vec<(Option<String>, serde_json::Value)>>,
}

impl BundleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value, url_prefix: Option<String>) {
        let slot = self.entries.entry(key.into()).or_default();
        slot.retain(|(p, _)| p != &url_prefix);
        slot.push((url_prefix, value));
    }

    /// Resolves `key` for `url`, preferring the entry whose prefix is the
    /// longest match; falls back to the prefix-less entry if present.
    pub fn get(&self, key: &str, url: &str) -> Option<&serde_json::Value> {
        let candidates = self.entries.get(key)?;
        candidates
            .iter()
            .filter(|(prefix, _)| match prefix {
                Some(p) => url.starts_with(p.as_str()),
                None => true,
            })
            .max_by_key(|(prefix, _)| prefix.as_ref().map(|p| p.len()).unwrap_or(0))
            .map(|(_, v)| v)
    }

    pub fn as_map(&self) -> HashMap<String, serde_json::Value> {
        let mut out = HashMap::new();
        for (key, entries) in &self.entries {
            if let Some((_, v)) = entries.iter().find(|(p, _)| p.is_none()) {
                out.insert(key.clone(), v.clone());
            } else if let Some((_, v)) = entries.first() {
                out.insert(key.clone(), v.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn longest_prefix_wins() {
        let mut config = BundleConfig::new();
        config.set("retries", json!(3), None);
        config.set("retries", json!(5), Some("s3://bucket/".into()));
        config.set(
            "retries",
            json!(9),
            Some("s3://bucket/hot/".into()),
        );
        assert_eq!(
            config.get("retries", "s3://bucket/hot/file.csv"),
            Some(&json!(9))
        );
        assert_eq!(
            config.get("retries", "s3://bucket/cold/file.csv"),
            Some(&json!(5))
        );
        assert_eq!(config.get("retries", "mem://other"), Some(&json!(3)));
    }

    #[test]
    fn setting_the_same_prefix_twice_replaces_it() {
        let mut config = BundleConfig::new();
        config.set("k", json!(1), None);
        config.set("k", json!(2), None);
        assert_eq!(config.get("k", "anything"), Some(&json!(2)));
    }

    #[test]
    fn null_value_is_a_valid_config_entry() {
        let mut config = BundleConfig::new();
        config.set("k", serde_json::Value::Null, None);
        assert_eq!(config.get("k", "x"), Some(&serde_json::Value::Null));
    }
}
