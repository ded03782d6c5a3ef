use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SettingError;

/// Persistent player GUID. Stable across renames for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Guid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for Guid {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl From<String> for Guid {
  fn from(value: String) -> Self {
    Self(value)
  }
}

/// A connected player's display name changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEvent {
  pub guid: Guid,
  /// Server-assigned client slot, the player's public identifier.
  pub slot: u32,
  pub ip: String,
  /// The name the player switched to.
  pub name: String,
  /// Highest privilege level of the player.
  pub level: u32,
}

/// Every event the tracker consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  Rename(RenameEvent),
  Kick(Guid),
  TempBan(Guid),
  Ban(Guid),
  Disconnect(Guid),
}

impl Event {
  pub fn guid(&self) -> &Guid {
    match self {
      Event::Rename(rename) => &rename.guid,
      Event::Kick(guid) | Event::TempBan(guid) | Event::Ban(guid) | Event::Disconnect(guid) => guid,
    }
  }
}

/// Penalty applied once a player reaches the rename threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
  #[default]
  Kick,
  TempBan,
  PermBan,
}

impl Action {
  pub fn as_str(self) -> &'static str {
    match self {
      Action::Kick => "kick",
      Action::TempBan => "tempban",
      Action::PermBan => "permban",
    }
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Action {
  type Err = SettingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "kick" => Ok(Action::Kick),
      "tempban" => Ok(Action::TempBan),
      "permban" => Ok(Action::PermBan),
      _ => Err(SettingError::UnknownAction {
        key: "ACTION",
        raw: s.to_string(),
      }),
    }
  }
}

/// Details attached to every kick or ban request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyRequest {
  pub reason: &'static str,
  /// Machine-readable category for the game server's penalty records.
  pub keyword: &'static str,
  /// Human-readable rename count, e.g. "5 Namechanges".
  pub data: String,
}

impl PenaltyRequest {
  pub const REASON: &'static str = "Too many name changes";
  pub const KEYWORD: &'static str = "NameChanger";

  pub fn for_count(count: usize) -> Self {
    Self {
      reason: Self::REASON,
      keyword: Self::KEYWORD,
      data: format!("{count} Namechanges"),
    }
  }
}
