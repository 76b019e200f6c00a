//! Content fingerprints and bundle identity primitives.
//!
//! A [`Fingerprint`] is the low 48 bits of a SHA-256 digest over the
//! canonical serialization of the referenced content, rendered as 12
//! lowercase hex characters. It identifies packs, changes, and commits
//! (the bundle "version"). [`BundleId`] is a separate, larger identifier
//! assigned once at bundle creation and never derived from content.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use sha2::{Digest, Sha256};

pub const FINGERPRINT_HEX_LEN: usize = 12;
const FINGERPRINT_BYTES: usize = 6; // 48 bits = 12 hex chars

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Fingerprint([u8; FINGERPRINT_BYTES]);

impl Fingerprint {
    /// Computes the fingerprint of a byte slice (assumed already canonical).
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        bytes.copy_from_slice(&digest[..FINGERPRINT_BYTES]);
        Fingerprint(bytes)
    }

    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.as_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != FINGERPRINT_HEX_LEN {
            return Err(format!(
                "expected {FINGERPRINT_HEX_LEN}-hex-character fingerprint, got '{s}'"
            ));
        }
        let raw = hex::decode(s).map_err(|e| e.to_string())?;
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        bytes.copy_from_slice(&raw);
        Ok(Fingerprint(bytes))
    }
}

/// 16 random bytes assigned once at bundle creation, rendered as lowercase
/// hex. Extended bundles never generate their own; they inherit the root's
/// via the FROM chain (see [`crate::identity`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BundleId([u8; 16]);

impl BundleId {
    pub fn new_random() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        BundleId(bytes)
    }

    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BundleId({})", self.as_hex())
    }
}

impl FromStr for BundleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(format!("expected 32-hex-character bundle id, got '{s}'"));
        }
        let raw = hex::decode(s).map_err(|e| e.to_string())?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&raw);
        Ok(BundleId(bytes))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use quickcheck::quickcheck;

    quickcheck! {
        fn fingerprint_hex_round_trips(data: Vec<u8>) -> bool {
            let fp = Fingerprint::of(&data);
            fp.as_hex().parse::<Fingerprint>().unwrap() == fp
        }
    }
}
