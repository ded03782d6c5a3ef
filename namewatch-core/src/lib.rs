mod audit;
mod control;
mod error;
mod history;
mod models;
pub mod settings;

pub use audit::AuditLog;
pub use control::ServerControl;
pub use error::{AuditError, SettingError};
pub use history::NameHistory;
pub use models::{Action, Event, Guid, PenaltyRequest, RenameEvent};
pub use settings::{Messages, Settings};

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

/// Watches renames and penalizes players who change name too often.
///
/// The tracker is driven by a single owner: every handler runs to completion
/// before the next event is delivered.
#[derive(Debug)]
pub struct Tracker {
  settings: Settings,
  audit: AuditLog,
  histories: HashMap<Guid, NameHistory>,
  /// Penalized players whose kick/ban event has not come back yet.
  awaiting_removal: HashSet<Guid>,
}

impl Tracker {
  pub fn new(settings: Settings) -> Self {
    let audit = AuditLog::new(settings.log_location.clone());
    Self {
      settings,
      audit,
      histories: HashMap::new(),
      awaiting_removal: HashSet::new(),
    }
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  /// Swap in freshly loaded settings. Tracked histories are kept.
  pub fn reload(&mut self, settings: Settings) {
    self.audit = AuditLog::new(settings.log_location.clone());
    self.settings = settings;
    info!(
      max_names = self.settings.max_names,
      action = %self.settings.action,
      "settings reloaded"
    );
  }

  /// Number of players currently tracked.
  pub fn tracked(&self) -> usize {
    self.histories.len()
  }

  pub fn history(&self, guid: &Guid) -> Option<&NameHistory> {
    self.histories.get(guid)
  }

  /// Route one event to its handler.
  pub fn handle<S: ServerControl + ?Sized>(&mut self, event: &Event, server: &mut S) {
    match event {
      Event::Rename(rename) => self.handle_rename(rename, server),
      Event::Kick(guid) | Event::TempBan(guid) | Event::Ban(guid) | Event::Disconnect(guid) => {
        self.handle_penalty_or_disconnect(guid);
      }
    }
  }

  pub fn handle_rename<S: ServerControl + ?Sized>(&mut self, event: &RenameEvent, server: &mut S) {
    debug!(guid = %event.guid, name = %event.name, "checking rename");

    if event.level >= self.settings.ignore_level {
      debug!(guid = %event.guid, level = event.level, "player at ignore level");
      return;
    }

    if self.awaiting_removal.contains(&event.guid) {
      debug!(guid = %event.guid, "player already penalized");
      return;
    }

    let history = match self.histories.entry(event.guid.clone()) {
      Entry::Vacant(entry) => entry.insert(NameHistory::open(event)),
      Entry::Occupied(entry) => {
        let history = entry.into_mut();
        if history.matches(event) {
          history.push(&event.name);
        } else {
          debug!(guid = %event.guid, slot = event.slot, "stored history belongs to another connection, starting over");
          *history = NameHistory::open(event);
        }
        history
      }
    };

    let count = history.len();
    self.audit.write(&format!(
      "Client with GUID: {} has changed name. Used names: {}",
      event.guid,
      history.names().join(", ")
    ));

    if count >= self.settings.max_names {
      self.penalize(event, count, server);
    } else {
      self.notify(event, count, server);
    }
  }

  /// Issue the configured penalty. The history is dropped when the
  /// matching kick/ban event is delivered back to the tracker.
  fn penalize<S: ServerControl + ?Sized>(&mut self, event: &RenameEvent, count: usize, server: &mut S) {
    let action = self.settings.action;
    info!(guid = %event.guid, count, %action, "too many name changes, penalizing");

    let request = PenaltyRequest::for_count(count);
    match action {
      Action::Kick => server.kick(&event.guid, &request),
      Action::TempBan => server.tempban(&event.guid, &request, self.settings.tempban_duration),
      Action::PermBan => server.ban(&event.guid, &request),
    }
    self.awaiting_removal.insert(event.guid.clone());

    self.audit.write(&format!(
      "{} penalized for too many name changes. Penalty: {}",
      event.guid, action
    ));
    let message = self
      .settings
      .messages
      .render(action, &event.name, event.guid.as_str());
    server.broadcast(&message);
  }

  fn notify<S: ServerControl + ?Sized>(&self, event: &RenameEvent, count: usize, server: &mut S) {
    let Some(level) = self.settings.notify_level else {
      return;
    };
    let alert = format!(
      "^1ALERT!^7 Player ^3{} ^7changed name ^3{} ^7times",
      event.slot, count
    );
    let previous = self
      .histories
      .get(&event.guid)
      .and_then(NameHistory::previous_alias)
      .map(|alias| format!("Last alias: {alias}"));

    for observer in server.observers(level) {
      server.message_observer(&observer, &alert);
      if let Some(previous) = &previous {
        server.message_observer(&observer, previous);
      }
    }
  }

  /// Forget a player after any kick, ban or disconnect, whoever issued it.
  /// Returns whether the player was tracked.
  pub fn handle_penalty_or_disconnect(&mut self, guid: &Guid) -> bool {
    self.awaiting_removal.remove(guid);
    let removed = self.histories.remove(guid).is_some();
    if removed {
      debug!(%guid, "removed from tracked players");
    }
    removed
  }

  /// Forget every tracked player for whom `is_connected` is false.
  /// Returns how many were dropped.
  pub fn retain_connected(&mut self, is_connected: impl Fn(&Guid) -> bool) -> usize {
    let gone: Vec<Guid> = self
      .histories
      .keys()
      .chain(self.awaiting_removal.iter())
      .filter(|guid| !is_connected(*guid))
      .cloned()
      .collect();
    gone
      .iter()
      .filter(|guid| self.handle_penalty_or_disconnect(guid))
      .count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[derive(Debug, Clone, PartialEq)]
  enum Call {
    Kick(Guid, PenaltyRequest),
    TempBan(Guid, PenaltyRequest, Duration),
    Ban(Guid, PenaltyRequest),
    Broadcast(String),
    Message(Guid, String),
  }

  #[derive(Default)]
  struct RecordingServer {
    calls: Vec<Call>,
    players: Vec<(Guid, u32)>,
  }

  impl RecordingServer {
    fn with_players(players: &[(&str, u32)]) -> Self {
      Self {
        calls: Vec::new(),
        players: players.iter().map(|(g, l)| (Guid::from(*g), *l)).collect(),
      }
    }

    fn penalties(&self) -> usize {
      self
        .calls
        .iter()
        .filter(|c| matches!(c, Call::Kick(..) | Call::TempBan(..) | Call::Ban(..)))
        .count()
    }

    fn messages(&self) -> Vec<(String, String)> {
      self
        .calls
        .iter()
        .filter_map(|c| match c {
          Call::Message(g, m) => Some((g.to_string(), m.clone())),
          _ => None,
        })
        .collect()
    }
  }

  impl ServerControl for RecordingServer {
    fn kick(&mut self, guid: &Guid, request: &PenaltyRequest) {
      self.calls.push(Call::Kick(guid.clone(), request.clone()));
    }

    fn tempban(&mut self, guid: &Guid, request: &PenaltyRequest, duration: Duration) {
      self
        .calls
        .push(Call::TempBan(guid.clone(), request.clone(), duration));
    }

    fn ban(&mut self, guid: &Guid, request: &PenaltyRequest) {
      self.calls.push(Call::Ban(guid.clone(), request.clone()));
    }

    fn broadcast(&mut self, message: &str) {
      self.calls.push(Call::Broadcast(message.to_string()));
    }

    fn message_observer(&mut self, observer: &Guid, message: &str) {
      self
        .calls
        .push(Call::Message(observer.clone(), message.to_string()));
    }

    fn observers(&self, min_level: u32) -> Vec<Guid> {
      self
        .players
        .iter()
        .filter(|(_, level)| *level >= min_level)
        .map(|(guid, _)| guid.clone())
        .collect()
    }
  }

  fn rename(guid: &str, name: &str) -> RenameEvent {
    RenameEvent {
      guid: Guid::from(guid),
      slot: 4,
      ip: "203.0.113.7".to_string(),
      name: name.to_string(),
      level: 0,
    }
  }

  fn settings(max_names: usize) -> Settings {
    Settings {
      max_names,
      ..Settings::default()
    }
  }

  fn names(tracker: &Tracker, guid: &str) -> Option<Vec<String>> {
    tracker
      .history(&Guid::from(guid))
      .map(|h| h.names().to_vec())
  }

  #[test]
  fn test_no_penalty_below_threshold() {
    let mut tracker = Tracker::new(settings(5));
    let mut server = RecordingServer::default();

    for name in ["a", "b", "c", "d"] {
      tracker.handle_rename(&rename("G1", name), &mut server);
    }

    assert_eq!(server.penalties(), 0);
    assert_eq!(names(&tracker, "G1").unwrap(), ["a", "b", "c", "d"]);
  }

  #[test]
  fn test_three_rename_walkthrough() {
    let mut tracker = Tracker::new(Settings {
      notify_level: Some(20),
      ..settings(3)
    });
    let mut server = RecordingServer::with_players(&[("ADMIN", 40)]);

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    assert_eq!(names(&tracker, "G1").unwrap(), ["a"]);
    assert_eq!(server.penalties(), 0);

    tracker.handle_rename(&rename("G1", "b"), &mut server);
    assert_eq!(names(&tracker, "G1").unwrap(), ["a", "b"]);
    assert_eq!(server.penalties(), 0);
    assert!(
      server
        .messages()
        .contains(&("ADMIN".to_string(), "Last alias: a".to_string()))
    );

    let before = server.calls.len();
    tracker.handle_rename(&rename("G1", "c"), &mut server);
    assert_eq!(names(&tracker, "G1").unwrap(), ["a", "b", "c"]);
    assert_eq!(
      server.calls[before..],
      [
        Call::Kick(Guid::from("G1"), PenaltyRequest::for_count(3)),
        Call::Broadcast("Player c Kicked for too many namechanges (GUID: G1)".to_string()),
      ]
    );
  }

  #[test]
  fn test_exactly_one_penalty_until_removal_event() {
    let mut tracker = Tracker::new(settings(2));
    let mut server = RecordingServer::default();

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    tracker.handle_rename(&rename("G1", "b"), &mut server);
    assert_eq!(server.penalties(), 1);

    // More renames before the kick lands must not penalize again.
    tracker.handle_rename(&rename("G1", "c"), &mut server);
    tracker.handle_rename(&rename("G1", "d"), &mut server);
    assert_eq!(server.penalties(), 1);

    tracker.handle(&Event::Kick(Guid::from("G1")), &mut server);
    assert!(tracker.history(&Guid::from("G1")).is_none());
    assert_eq!(tracker.tracked(), 0);
  }

  #[test]
  fn test_tempban_uses_configured_duration() {
    let mut tracker = Tracker::new(Settings {
      action: Action::TempBan,
      ..settings(1)
    });
    let mut server = RecordingServer::default();

    tracker.handle_rename(&rename("G1", "a"), &mut server);

    assert_eq!(
      server.calls[0],
      Call::TempBan(
        Guid::from("G1"),
        PenaltyRequest::for_count(1),
        Duration::from_secs(2 * 60 * 60)
      )
    );
  }

  #[test]
  fn test_permban_with_custom_message() {
    let mut config = Settings {
      action: Action::PermBan,
      ..settings(2)
    };
    config.messages.set(Action::PermBan, "${name} ($guid) is out");
    let mut tracker = Tracker::new(config);
    let mut server = RecordingServer::default();

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    tracker.handle_rename(&rename("G1", "b"), &mut server);

    assert_eq!(
      server.calls,
      [
        Call::Ban(Guid::from("G1"), PenaltyRequest::for_count(2)),
        Call::Broadcast("b (G1) is out".to_string()),
      ]
    );
  }

  #[test]
  fn test_history_resets_after_penalty_or_disconnect() {
    let mut tracker = Tracker::new(settings(5));
    let mut server = RecordingServer::default();

    for event in [
      Event::Kick(Guid::from("G1")),
      Event::TempBan(Guid::from("G1")),
      Event::Ban(Guid::from("G1")),
      Event::Disconnect(Guid::from("G1")),
    ] {
      tracker.handle_rename(&rename("G1", "a"), &mut server);
      tracker.handle_rename(&rename("G1", "b"), &mut server);
      tracker.handle(&event, &mut server);
      assert!(tracker.history(&Guid::from("G1")).is_none());

      tracker.handle_rename(&rename("G1", "c"), &mut server);
      assert_eq!(names(&tracker, "G1").unwrap(), ["c"]);
      tracker.handle_penalty_or_disconnect(&Guid::from("G1"));
    }
  }

  #[test]
  fn test_ignored_level_never_tracked() {
    let mut tracker = Tracker::new(settings(2));
    let mut server = RecordingServer::default();

    for name in ["a", "b", "c", "d", "e"] {
      let mut event = rename("ADMIN", name);
      event.level = 100;
      tracker.handle_rename(&event, &mut server);
    }

    assert_eq!(tracker.tracked(), 0);
    assert!(server.calls.is_empty());
  }

  #[test]
  fn test_notify_on_every_rename_below_threshold() {
    let mut tracker = Tracker::new(Settings {
      notify_level: Some(20),
      ..settings(4)
    });
    let mut server =
      RecordingServer::with_players(&[("MOD", 20), ("PLAYER", 0), ("ADMIN", 80)]);

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    // Single recorded name: alert without a previous alias.
    assert_eq!(
      server.messages(),
      [
        ("MOD".to_string(), "^1ALERT!^7 Player ^34 ^7changed name ^31 ^7times".to_string()),
        ("ADMIN".to_string(), "^1ALERT!^7 Player ^34 ^7changed name ^31 ^7times".to_string()),
      ]
    );

    tracker.handle_rename(&rename("G1", "b"), &mut server);
    tracker.handle_rename(&rename("G1", "c"), &mut server);
    // Two messages per observer per rename, except the first.
    assert_eq!(server.messages().len(), 2 + 4 + 4);
    assert!(server.messages().iter().all(|(guid, _)| guid != "PLAYER"));
    assert!(
      server
        .messages()
        .contains(&("MOD".to_string(), "Last alias: b".to_string()))
    );

    let before = server.messages().len();
    tracker.handle_rename(&rename("G1", "d"), &mut server);
    assert_eq!(server.messages().len(), before);
    assert_eq!(server.penalties(), 1);
  }

  #[test]
  fn test_no_notify_when_unset() {
    let mut tracker = Tracker::new(settings(5));
    let mut server = RecordingServer::with_players(&[("ADMIN", 100)]);

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    tracker.handle_rename(&rename("G1", "b"), &mut server);

    assert!(server.calls.is_empty());
  }

  #[test]
  fn test_repeated_disconnect_of_untracked_is_noop() {
    let mut tracker = Tracker::new(settings(5));
    let mut server = RecordingServer::default();

    tracker.handle(&Event::Disconnect(Guid::from("G9")), &mut server);
    tracker.handle(&Event::Disconnect(Guid::from("G9")), &mut server);

    assert_eq!(tracker.tracked(), 0);
    assert!(server.calls.is_empty());
    assert!(!tracker.handle_penalty_or_disconnect(&Guid::from("G9")));
  }

  #[test]
  fn test_stale_history_is_replaced() {
    let mut tracker = Tracker::new(settings(3));
    let mut server = RecordingServer::default();

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    tracker.handle_rename(&rename("G1", "b"), &mut server);

    let mut moved = rename("G1", "c");
    moved.slot = 9;
    tracker.handle_rename(&moved, &mut server);

    assert_eq!(names(&tracker, "G1").unwrap(), ["c"]);
    assert_eq!(tracker.history(&Guid::from("G1")).unwrap().slot(), 9);
    assert_eq!(server.penalties(), 0);
  }

  #[test]
  fn test_players_tracked_independently() {
    let mut tracker = Tracker::new(settings(2));
    let mut server = RecordingServer::default();

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    tracker.handle_rename(&rename("G2", "x"), &mut server);
    tracker.handle(&Event::Disconnect(Guid::from("G2")), &mut server);
    tracker.handle_rename(&rename("G2", "y"), &mut server);

    assert_eq!(server.penalties(), 0);
    tracker.handle_rename(&rename("G1", "b"), &mut server);
    assert_eq!(server.penalties(), 1);
    assert_eq!(names(&tracker, "G2").unwrap(), ["y"]);
  }

  #[test]
  fn test_retain_connected_drops_absent_players() {
    let mut tracker = Tracker::new(settings(5));
    let mut server = RecordingServer::default();

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    tracker.handle_rename(&rename("G2", "b"), &mut server);

    let dropped = tracker.retain_connected(|guid| guid.as_str() == "G1");

    assert_eq!(dropped, 1);
    assert!(tracker.history(&Guid::from("G1")).is_some());
    assert!(tracker.history(&Guid::from("G2")).is_none());
  }

  #[test]
  fn test_audit_log_contains_full_history() {
    let path = std::env::temp_dir().join(format!(
      "namewatch-tracker-{}.log",
      std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let mut tracker = Tracker::new(Settings {
      log_location: Some(path.clone()),
      ..settings(3)
    });
    let mut server = RecordingServer::default();

    for name in ["a", "b", "c"] {
      tracker.handle_rename(&rename("G1", name), &mut server);
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
      lines,
      [
        "Client with GUID: G1 has changed name. Used names: a",
        "Client with GUID: G1 has changed name. Used names: a, b",
        "Client with GUID: G1 has changed name. Used names: a, b, c",
        "G1 penalized for too many name changes. Penalty: kick",
      ]
    );
    std::fs::remove_file(&path).unwrap();
  }

  #[test]
  fn test_reload_keeps_histories() {
    let mut tracker = Tracker::new(settings(5));
    let mut server = RecordingServer::default();

    tracker.handle_rename(&rename("G1", "a"), &mut server);
    tracker.handle_rename(&rename("G1", "b"), &mut server);
    tracker.reload(settings(3));
    tracker.handle_rename(&rename("G1", "c"), &mut server);

    assert_eq!(tracker.settings().max_names, 3);
    assert_eq!(server.penalties(), 1);
  }
}
