//! Commands waiting for the game server to pick them up.
//!
//! The tracker never talks to the game server directly. Penalties and chat
//! messages are queued here and the server drains them via `GET /commands`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use namewatch_core::{Guid, PenaltyRequest, ServerControl};
use serde::Serialize;
use tracing::warn;

use crate::roster::Roster;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Kick {
        guid: Guid,
        reason: String,
        keyword: String,
        data: String,
    },
    Tempban {
        guid: Guid,
        reason: String,
        keyword: String,
        duration_minutes: u64,
        data: String,
    },
    Ban {
        guid: Guid,
        reason: String,
        keyword: String,
        data: String,
    },
    /// Public chat to everyone.
    Say { message: String },
    /// Private message to one player.
    Message { guid: Guid, message: String },
}

/// Commands kept while nobody polls. Past this the oldest are dropped.
pub const MAX_QUEUED_COMMANDS: usize = 4096;

#[derive(Debug)]
pub struct Outbox {
    queue: Mutex<VecDeque<Command>>,
    limit: usize,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::with_limit(MAX_QUEUED_COMMANDS)
    }
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            limit: limit.max(1),
        }
    }

    pub fn push(&self, command: Command) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() >= self.limit {
            let dropped = queue.pop_front();
            warn!(limit = self.limit, ?dropped, "outbox full, dropping oldest command");
        }
        queue.push_back(command);
    }

    /// Take every queued command, oldest first.
    pub fn drain(&self) -> Vec<Command> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Round up to whole minutes; game servers take ban lengths in minutes.
fn whole_minutes(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60).max(1)
}

/// The game server as seen by the tracker: its roster plus the outbox.
#[derive(Debug)]
pub struct GameServer {
    roster: Roster,
    outbox: Arc<Outbox>,
}

impl GameServer {
    pub fn new(outbox: Arc<Outbox>) -> Self {
        Self {
            roster: Roster::new(),
            outbox,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }
}

impl ServerControl for GameServer {
    fn kick(&mut self, guid: &Guid, request: &PenaltyRequest) {
        self.outbox.push(Command::Kick {
            guid: guid.clone(),
            reason: request.reason.to_string(),
            keyword: request.keyword.to_string(),
            data: request.data.clone(),
        });
    }

    fn tempban(&mut self, guid: &Guid, request: &PenaltyRequest, duration: Duration) {
        self.outbox.push(Command::Tempban {
            guid: guid.clone(),
            reason: request.reason.to_string(),
            keyword: request.keyword.to_string(),
            duration_minutes: whole_minutes(duration),
            data: request.data.clone(),
        });
    }

    fn ban(&mut self, guid: &Guid, request: &PenaltyRequest) {
        self.outbox.push(Command::Ban {
            guid: guid.clone(),
            reason: request.reason.to_string(),
            keyword: request.keyword.to_string(),
            data: request.data.clone(),
        });
    }

    fn broadcast(&mut self, message: &str) {
        self.outbox.push(Command::Say {
            message: message.to_string(),
        });
    }

    fn message_observer(&mut self, observer: &Guid, message: &str) {
        self.outbox.push(Command::Message {
            guid: observer.clone(),
            message: message.to_string(),
        });
    }

    fn observers(&self, min_level: u32) -> Vec<Guid> {
        self.roster.observers(min_level)
    }
}
