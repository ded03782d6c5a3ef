use std::path::PathBuf;

use thiserror::Error;

/// Why a single setting could not be used as configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    #[error("{key}: expected an integer, got {raw:?}")]
    InvalidInteger { key: &'static str, raw: String },

    #[error("{key}: must be at least {min}, got {value}")]
    OutOfRange {
        key: &'static str,
        min: i64,
        value: i64,
    },

    #[error("{key}: unknown action {raw:?} (expected kick, tempban or permban)")]
    UnknownAction { key: &'static str, raw: String },

    #[error("{key}: invalid duration {raw:?}")]
    InvalidDuration { key: &'static str, raw: String },
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to append to audit log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
