//! Canonical, line-oriented encoding for commit files.
//!
//! Deliberately not a generic YAML dump: field order is fixed and each
//! operation serializes to exactly one line of JSON, so two processes
//! that build the same commit always produce byte-identical files —
//! required since the commit's own bytes feed the next commit's parent
//! fingerprint. Modeled on the line-per-field envelope git itself uses
//! for commit objects (`tree`, `parent`, `author`, blank line, message).

use chrono::{DateTime, Utc};

use crate::errors::{BundlebaseError, Result};
use crate::fingerprint::{BundleId, Fingerprint};
use crate::operation::Operation;

use super::Commit;

const NONE: &str = "none";

fn escape(message: &str) -> String {
    message.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn encode(commit: &Commit) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!(
        "parent={}\n",
        commit
            .parent
            .map(|fp| fp.as_hex())
            .unwrap_or_else(|| NONE.to_string())
    ));
    out.push_str(&format!(
        "id={}\n",
        commit
            .id
            .map(|id| id.as_hex())
            .unwrap_or_else(|| NONE.to_string())
    ));
    out.push_str(&format!(
        "from_url={}\n",
        commit.from_url.clone().unwrap_or_else(|| NONE.to_string())
    ));
    out.push_str(&format!("change={}\n", commit.change.as_hex()));
    out.push_str(&format!("timestamp={}\n", commit.timestamp.to_rfc3339()));
    out.push_str(&format!("message={}\n", escape(&commit.message)));
    for op in &commit.operations {
        let json = serde_json::to_string(op).expect("Operation always serializes");
        out.push_str(&format!("op={json}\n"));
    }
    out.into_bytes()
}

pub fn decode(bytes: &[u8]) -> Result<Commit> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| BundlebaseError::DecodeError(format!("commit is not utf-8: {e}")))?;

    let mut parent = None;
    let mut id = None;
    let mut from_url = None;
    let mut change = None;
    let mut timestamp = None;
    let mut message = None;
    let mut operations = Vec::new();

    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key {
            "parent" => {
                if value != NONE {
                    parent = Some(parse_fingerprint(value)?);
                }
            }
            "id" => {
                if value != NONE {
                    id = Some(parse_bundle_id(value)?);
                }
            }
            "from_url" => {
                if value != NONE {
                    from_url = Some(value.to_string());
                }
            }
            "change" => change = Some(parse_fingerprint(value)?),
            "timestamp" => {
                timestamp = Some(
                    DateTime::parse_from_rfc3339(value)
                        .map_err(|e| {
                            BundlebaseError::DecodeError(format!("bad commit timestamp: {e}"))
                        })?
                        .with_timezone(&Utc),
                )
            }
            "message" => message = Some(unescape(value)),
            "op" => {
                let op: Operation = serde_json::from_str(value).map_err(|e| {
                    BundlebaseError::DecodeError(format!("bad operation json: {e}"))
                })?;
                operations.push(op);
            }
            _ => {}
        }
    }

    Ok(Commit {
        parent,
        id,
        from_url,
        change: change
            .ok_or_else(|| BundlebaseError::DecodeError("commit missing 'change' field".into()))?,
        timestamp: timestamp
            .ok_or_else(|| BundlebaseError::DecodeError("commit missing 'timestamp' field".into()))?,
        message: message.unwrap_or_default(),
        operations,
    })
}

fn parse_fingerprint(value: &str) -> Result<Fingerprint> {
    value
        .parse()
        .map_err(|e| BundlebaseError::DecodeError(format!("bad fingerprint '{value}': {e}")))
}

fn parse_bundle_id(value: &str) -> Result<BundleId> {
    value
        .parse()
        .map_err(|e| BundlebaseError::DecodeError(format!("bad bundle id '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;

    fn sample_commit() -> Commit {
        Commit {
            parent: Some(Fingerprint::of(b"parent")),
            id: Some(BundleId::new_random()),
            from_url: None,
            change: Fingerprint::of(b"change"),
            timestamp: Utc::now(),
            message: "Set name to Test Bundle\nline two".into(),
            operations: vec![Operation::SetName {
                name: "Test Bundle".into(),
            }],
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let commit = sample_commit();
        let bytes = encode(&commit);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(commit.parent, decoded.parent);
        assert_eq!(commit.id, decoded.id);
        assert_eq!(commit.change, decoded.change);
        assert_eq!(commit.message, decoded.message);
        assert_eq!(commit.operations, decoded.operations);
    }

    #[test]
    fn encoding_is_deterministic() {
        let commit = sample_commit();
        assert_eq!(encode(&commit), encode(&commit));
    }

    #[test]
    fn none_parent_round_trips_for_init_commit() {
        let mut commit = sample_commit();
        commit.parent = None;
        let decoded = decode(&encode(&commit)).unwrap();
        assert!(decoded.parent.is_none());
    }
}
