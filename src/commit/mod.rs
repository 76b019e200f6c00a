//! Commit objects: one per entry in a bundle's append-only log.
//!
//! The first commit (`InitCommit`) either mints a fresh [`BundleId`] or
//! records the URL it extends via `FROM`; every subsequent commit carries
//! its parent's fingerprint and the fingerprint of the [`Change`] it
//! applies. `id` and `from_url` are mutually exclusive and only ever
//! populated on the init commit — [`Commit::validate`] enforces that.

pub mod codec;
pub mod log;

use chrono::{DateTime, Utc};

use crate::errors::{BundlebaseError, Result};
use crate::fingerprint::{BundleId, Fingerprint};
use crate::operation::Operation;

/// Zero-padded to 17 digits, matching the log's commit-sequence filenames.
pub const INIT_COMMIT_NAME: &str = "00000000000000000.yaml";

#[derive(Clone, Debug, PartialEq)]
pub struct Commit {
    pub parent: Option<Fingerprint>,
    pub id: Option<BundleId>,
    pub from_url: Option<String>,
    pub change: Fingerprint,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub operations: Vec<Operation>,
}

impl Commit {
    pub fn init_with_id(id: BundleId, message: impl Into<String>) -> Self {
        Commit {
            parent: None,
            id: Some(id),
            from_url: None,
            change: Fingerprint::of(b""),
            timestamp: Utc::now(),
            message: message.into(),
            operations: Vec::new(),
        }
    }

    pub fn init_from(from_url: impl Into<String>, message: impl Into<String>) -> Self {
        Commit {
            parent: None,
            id: None,
            from_url: Some(from_url.into()),
            change: Fingerprint::of(b""),
            timestamp: Utc::now(),
            message: message.into(),
            operations: Vec::new(),
        }
    }

    pub fn child(
        parent: Fingerprint,
        change: Fingerprint,
        message: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        Commit {
            parent: Some(parent),
            id: None,
            from_url: None,
            change,
            timestamp: Utc::now(),
            message: message.into(),
            operations,
        }
    }

    pub fn is_init(&self) -> bool {
        self.parent.is_none()
    }

    /// Enforces the `id` XOR `from_url` exclusivity that only the init
    /// commit is allowed to carry.
    pub fn validate(&self) -> Result<()> {
        if self.is_init() {
            if self.id.is_some() == self.from_url.is_some() {
                return Err(BundlebaseError::InvalidUrl(
                    "init commit must set exactly one of id or from_url".into(),
                ));
            }
        } else if self.id.is_some() || self.from_url.is_some() {
            return Err(BundlebaseError::InvalidUrl(
                "only the init commit may set id or from_url".into(),
            ));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let commit = codec::decode(bytes)?;
        commit.validate()?;
        Ok(commit)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.to_bytes())
    }
}

/// Formats the filename for the `n`th commit after the init commit
/// (`n` is 1-based; the init commit itself uses [`INIT_COMMIT_NAME`]).
pub fn commit_filename(sequence: u64) -> String {
    format!("{sequence:017}.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_commit_with_id_is_valid() {
        let commit = Commit::init_with_id(BundleId::new_random(), "create");
        assert!(commit.validate().is_ok());
    }

    #[test]
    fn init_commit_with_from_is_valid() {
        let commit = Commit::init_from("mem://parent.bundle", "extend");
        assert!(commit.validate().is_ok());
    }

    #[test]
    fn init_commit_cannot_set_both_id_and_from() {
        let mut commit = Commit::init_with_id(BundleId::new_random(), "create");
        commit.from_url = Some("mem://parent.bundle".into());
        assert!(commit.validate().is_err());
    }

    #[test]
    fn init_commit_cannot_set_neither_id_nor_from() {
        let mut commit = Commit::init_with_id(BundleId::new_random(), "create");
        commit.id = None;
        assert!(commit.validate().is_err());
    }

    #[test]
    fn child_commit_rejects_stray_id() {
        let mut commit = Commit::child(
            Fingerprint::of(b"p"),
            Fingerprint::of(b"c"),
            "m",
            Vec::new(),
        );
        commit.id = Some(BundleId::new_random());
        assert!(commit.validate().is_err());
    }

    #[test]
    fn commit_filename_is_seventeen_digits() {
        assert_eq!(commit_filename(1), "00000000000000001.yaml");
        assert_eq!(INIT_COMMIT_NAME.len(), "00000000000000000.yaml".len());
    }
}
