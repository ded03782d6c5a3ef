use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SettingError;
use crate::models::Action;

pub const DEFAULT_MAX_NAMES: usize = 5;
pub const DEFAULT_IGNORE_LEVEL: u32 = 100;
pub const DEFAULT_TEMPBAN_DURATION: Duration = Duration::from_secs(2 * 60 * 60);

/// Why a setting is running on its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    Unset,
    Malformed(SettingError),
}

/// Result of reading one setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Value(T),
    UseDefault(Fallback),
}

/// A setting that fell back to its default, kept so the caller can report it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingNote {
    pub key: &'static str,
    pub fallback: Fallback,
}

/// Broadcast templates per penalty.
///
/// Templates may use `$name`/`${name}` and `$guid`/`${guid}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    templates: HashMap<Action, String>,
}

impl Messages {
    pub fn default_template(action: Action) -> &'static str {
        match action {
            Action::Kick => "Player $name Kicked for too many namechanges (GUID: $guid)",
            Action::TempBan => "Player $name Temp Banned for too many namechanges (GUID: $guid)",
            Action::PermBan => "Player $name PermBanned for too many namechanges (GUID: $guid)",
        }
    }

    pub fn set(&mut self, action: Action, template: impl Into<String>) {
        self.templates.insert(action, template.into());
    }

    /// Configured template, or the built-in one when none is configured.
    pub fn template(&self, action: Action) -> &str {
        self.templates
            .get(&action)
            .map(String::as_str)
            .unwrap_or_else(|| Self::default_template(action))
    }

    pub fn render(&self, action: Action, name: &str, guid: &str) -> String {
        render_template(self.template(action), &[("name", name), ("guid", guid)])
    }
}

/// Tracker policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Rename count that triggers the penalty.
    pub max_names: usize,
    pub action: Action,
    /// Only used when `action` is a temporary ban.
    pub tempban_duration: Duration,
    /// Players at or above this level are never tracked.
    pub ignore_level: u32,
    /// Observers at or above this level get an alert on every rename below the threshold.
    pub notify_level: Option<u32>,
    /// Plaintext audit log. Disabled when unset.
    pub log_location: Option<PathBuf>,
    pub messages: Messages,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_names: DEFAULT_MAX_NAMES,
            action: Action::Kick,
            tempban_duration: DEFAULT_TEMPBAN_DURATION,
            ignore_level: DEFAULT_IGNORE_LEVEL,
            notify_level: None,
            log_location: None,
            messages: Messages::default(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables, logging every fallback once.
    pub fn from_env() -> Self {
        let (settings, notes) = Self::from_lookup(|key| std::env::var(key).ok());
        for note in &notes {
            match &note.fallback {
                Fallback::Unset => debug!(key = note.key, "setting not configured, using default"),
                Fallback::Malformed(err) => warn!(key = note.key, %err, "invalid setting, using default"),
            }
        }
        if settings.notify_level.is_none() {
            debug!("rename notifications disabled");
        }
        if settings.log_location.is_none() {
            debug!("audit log disabled");
        }
        settings
    }

    /// Resolve every setting through `lookup`. Each one falls back to its
    /// default on its own; the returned notes list which ones did.
    pub fn from_lookup<F>(lookup: F) -> (Self, Vec<SettingNote>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut notes = Vec::new();
        let mut settle = |key: &'static str, outcome: Outcome<i64>, default: i64| match outcome {
            Outcome::Value(value) => value,
            Outcome::UseDefault(fallback) => {
                notes.push(SettingNote { key, fallback });
                default
            }
        };

        let max_names = settle(
            "MAX_NAMES",
            read(&lookup, "MAX_NAMES", |raw| parse_int(raw, "MAX_NAMES", 1)),
            DEFAULT_MAX_NAMES as i64,
        ) as usize;

        let ignore_level = settle(
            "IGNORE_LEVEL",
            read(&lookup, "IGNORE_LEVEL", |raw| parse_int(raw, "IGNORE_LEVEL", 0)),
            DEFAULT_IGNORE_LEVEL as i64,
        ) as u32;

        let action = match read(&lookup, "ACTION", |raw| raw.parse::<Action>()) {
            Outcome::Value(action) => action,
            Outcome::UseDefault(fallback) => {
                notes.push(SettingNote { key: "ACTION", fallback });
                Action::Kick
            }
        };

        let tempban_duration = match read(&lookup, "TEMPBAN_DURATION", |raw| {
            parse_duration(raw, "TEMPBAN_DURATION")
        }) {
            Outcome::Value(duration) => duration,
            Outcome::UseDefault(fallback) => {
                if action == Action::TempBan || fallback != Fallback::Unset {
                    notes.push(SettingNote {
                        key: "TEMPBAN_DURATION",
                        fallback,
                    });
                }
                DEFAULT_TEMPBAN_DURATION
            }
        };

        // 0 turns notifications off, like leaving the setting out.
        let notify_level = match read(&lookup, "NOTIFY_LEVEL", |raw| parse_int(raw, "NOTIFY_LEVEL", 0)) {
            Outcome::Value(0) => None,
            Outcome::Value(level) => Some(level as u32),
            Outcome::UseDefault(Fallback::Unset) => None,
            Outcome::UseDefault(fallback) => {
                notes.push(SettingNote {
                    key: "NOTIFY_LEVEL",
                    fallback,
                });
                None
            }
        };

        let log_location = non_empty(&lookup, "LOG_LOCATION").map(PathBuf::from);

        let mut messages = Messages::default();
        for (key, action) in [
            ("MESSAGE_KICK", Action::Kick),
            ("MESSAGE_TEMPBAN", Action::TempBan),
            ("MESSAGE_PERMBAN", Action::PermBan),
        ] {
            if let Some(template) = non_empty(&lookup, key) {
                messages.set(action, template);
            }
        }

        let settings = Self {
            max_names,
            action,
            tempban_duration,
            ignore_level,
            notify_level,
            log_location,
            messages,
        };
        (settings, notes)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn read<F, T>(lookup: &F, key: &str, parse: impl FnOnce(&str) -> Result<T, SettingError>) -> Outcome<T>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        None => Outcome::UseDefault(Fallback::Unset),
        Some(raw) => match parse(&raw) {
            Ok(value) => Outcome::Value(value),
            Err(err) => Outcome::UseDefault(Fallback::Malformed(err)),
        },
    }
}

fn parse_int(raw: &str, key: &'static str, min: i64) -> Result<i64, SettingError> {
    let value: i64 = raw.parse().map_err(|_| SettingError::InvalidInteger {
        key,
        raw: raw.to_string(),
    })?;
    if value < min || value > u32::MAX as i64 {
        return Err(SettingError::OutOfRange { key, min, value });
    }
    Ok(value)
}

/// Parse a duration such as `90`, `30m`, `2h`, `1.5d` or `1w`.
/// A bare number is minutes.
pub fn parse_duration(raw: &str, key: &'static str) -> Result<Duration, SettingError> {
    let invalid = || SettingError::InvalidDuration {
        key,
        raw: raw.to_string(),
    };
    let raw_lower = raw.trim().to_ascii_lowercase();
    let split = raw_lower
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw_lower.len());
    let (number, unit) = raw_lower.split_at(split);
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let unit_secs = match unit.trim() {
        "s" => 1.0,
        "" | "m" => 60.0,
        "h" => 60.0 * 60.0,
        "d" => 24.0 * 60.0 * 60.0,
        "w" => 7.0 * 24.0 * 60.0 * 60.0,
        _ => return Err(invalid()),
    };
    let secs = value * unit_secs;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

/// Substitute `$key` and `${key}` placeholders. `$$` is a literal dollar sign;
/// unknown placeholders are left untouched.
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let (ident, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match vars.iter().find(|(key, _)| !ident.is_empty() && *key == ident) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after[consumed..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
