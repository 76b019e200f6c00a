//! Error types for the bundlebase-core crate.
//!
//! A single enumeration covers every failure kind named by the contract
//! between the core and its external collaborators (object store,
//! execution engine, format decoders). Transient object-store failures
//! (`Io`, `Timeout`) are retried at the store boundary; everything else
//! propagates to the caller unchanged, usually carrying a message that
//! lists available alternatives when the caller named a missing entity.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundlebaseError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bundle already exists at {0}")]
    BundleAlreadyExists(String),

    #[error("concurrent write conflict: another writer advanced the commit log past {0}")]
    ConcurrentWriteConflict(String),

    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("index not found for column '{0}'")]
    IndexNotFound(String),

    #[error("unsupported index type: {0}")]
    UnsupportedIndexType(String),

    #[error("view not found: {0}")]
    ViewNotFound(String),

    #[error("view already exists: {0}")]
    ViewAlreadyExists(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("function not found: {0}")]
    FunctionNotFound(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("plan error: {0}")]
    PlanError(String),

    #[error("execution error: {0}")]
    ExecutionError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("auth denied: {0}")]
    AuthDenied(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("canceled")]
    Canceled,
}

pub type Result<T> = std::result::Result<T, BundlebaseError>;

impl From<std::io::Error> for BundlebaseError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => BundlebaseError::NotFound(e.to_string()),
            std::io::ErrorKind::TimedOut => BundlebaseError::Timeout(e.to_string()),
            std::io::ErrorKind::AlreadyExists => {
                BundlebaseError::ConcurrentWriteConflict(e.to_string())
            }
            _ => BundlebaseError::Io(e.to_string()),
        }
    }
}

/// Builds the "valid alternatives" suffix used by `NotFound`-shaped errors
/// so that callers who named a missing view/column/index/source always see
/// what else was available, per the §7 user-visible contract.
pub fn with_alternatives(message: impl Into<String>, available: &[impl AsRef<str>]) -> String {
    let mut msg = message.into();
    if available.is_empty() {
        msg.push_str(" (none defined)");
    } else {
        msg.push_str(" (available: ");
        msg.push_str(
            &available
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        );
        msg.push(')');
    }
    msg
}
