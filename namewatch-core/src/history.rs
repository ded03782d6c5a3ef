//! Per-player rename history.
//!
//! Histories live only in memory for the current session. A player who
//! disconnects or gets penalized starts over with nothing on reconnect.

use crate::models::RenameEvent;

/// Names one player has switched to, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameHistory {
    /// Client slot the history was opened with.
    slot: u32,
    /// IP address the history was opened with.
    ip: String,
    names: Vec<String>,
}

impl NameHistory {
    /// Open a history with the event's name as its first entry.
    pub fn open(event: &RenameEvent) -> Self {
        Self {
            slot: event.slot,
            ip: event.ip.clone(),
            names: vec![event.name.clone()],
        }
    }

    /// Whether a rename comes from the same connection that opened this history.
    /// A GUID seen on a different slot or IP means the stored entry is stale.
    pub fn matches(&self, event: &RenameEvent) -> bool {
        self.slot == event.slot && self.ip == event.ip
    }

    pub fn push(&mut self, name: &str) {
        self.names.push(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: a history is created with its first name.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// The alias used before the most recent rename.
    pub fn previous_alias(&self) -> Option<&str> {
        self.names
            .len()
            .checked_sub(2)
            .map(|idx| self.names[idx].as_str())
    }
}
