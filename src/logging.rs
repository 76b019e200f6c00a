//! Process-wide log bridge.
//!
//! A set-once sink with an atomic log-level cell, per §9: out of scope
//! beyond its level-setter contract. Every suspension point elsewhere in
//! the crate logs through `tracing` directly; this module only owns the
//! one-time subscriber install that the CLI/bindings call at startup.

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs a default `tracing_subscriber` formatter exactly once per
/// process. Safe to call repeatedly (e.g. once per test) since only the
/// first call has any effect.
pub fn init_logging() {
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_target(false)
            .with_level(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logging();
        init_logging();
    }
}
