//! Append-only plaintext audit log.
//!
//! The file is opened and closed on every write so external log rotation
//! never leaves us holding a stale handle.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::AuditError;

#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    location: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(location: Option<PathBuf>) -> Self {
        Self { location }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Append `line`. Lines that cannot be written go to tracing instead.
    pub fn write(&self, line: &str) {
        if let Err(err) = self.try_write(line) {
            warn!(%err, "audit log unavailable");
            info!(target: "namewatch::audit", "{line}");
        }
    }

    /// Append `line` without the tracing fallback. A disabled log is a no-op.
    pub fn try_write(&self, line: &str) -> Result<(), AuditError> {
        let Some(path) = &self.location else {
            return Ok(());
        };
        let io_err = |source| AuditError::Io {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        file.write_all(format!("{line}\n").as_bytes())
            .map_err(io_err)?;
        Ok(())
    }
}
