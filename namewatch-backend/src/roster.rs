//! Players currently connected to the game server.
//!
//! Rebuilt from connect/sync calls after a restart, so nothing here is persisted.

use namewatch_core::{Guid, RenameEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedPlayer {
    pub guid: Guid,
    pub slot: u32,
    pub ip: String,
    pub name: String,
    pub level: u32,
}

impl ConnectedPlayer {
    fn same_connection(&self, other: &ConnectedPlayer) -> bool {
        self.slot == other.slot && self.ip == other.ip
    }
}

/// Connected players. A Vec keeps iteration cheap at typical server sizes.
#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<ConnectedPlayer>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh a player. Returns true when this starts a new session,
    /// i.e. the GUID was absent or is now on a different slot or IP.
    pub fn join(&mut self, player: ConnectedPlayer) -> bool {
        match self.players.iter_mut().find(|p| p.guid == player.guid) {
            Some(existing) => {
                let fresh = !existing.same_connection(&player);
                *existing = player;
                fresh
            }
            None => {
                self.players.push(player);
                true
            }
        }
    }

    /// Remove a player. Uses swap_remove since order doesn't matter.
    pub fn leave(&mut self, guid: &Guid) -> bool {
        match self.players.iter().position(|p| &p.guid == guid) {
            Some(idx) => {
                self.players.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    /// Keep the roster in step with a rename: new name and level, and the
    /// player is added if we missed their connect.
    pub fn rename(&mut self, event: &RenameEvent) {
        let updated = ConnectedPlayer {
            guid: event.guid.clone(),
            slot: event.slot,
            ip: event.ip.clone(),
            name: event.name.clone(),
            level: event.level,
        };
        match self.players.iter_mut().find(|p| p.guid == event.guid) {
            Some(existing) => *existing = updated,
            None => self.players.push(updated),
        }
    }

    /// Replace everyone (sync after a restart or map change).
    pub fn sync(&mut self, players: Vec<ConnectedPlayer>) {
        self.players = players;
    }

    pub fn contains(&self, guid: &Guid) -> bool {
        self.players.iter().any(|p| &p.guid == guid)
    }

    pub fn observers(&self, min_level: u32) -> Vec<Guid> {
        self.players
            .iter()
            .filter(|p| p.level >= min_level)
            .map(|p| p.guid.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
