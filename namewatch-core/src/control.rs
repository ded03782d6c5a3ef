use std::time::Duration;

use crate::models::{Guid, PenaltyRequest};

/// Outbound side of the game server: penalties, chat, and the list of
/// connected players who may receive alerts.
///
/// Calls are fire-and-forget. The tracker never waits for the server to
/// confirm and never retries.
pub trait ServerControl {
    fn kick(&mut self, guid: &Guid, request: &PenaltyRequest);

    fn tempban(&mut self, guid: &Guid, request: &PenaltyRequest, duration: Duration);

    fn ban(&mut self, guid: &Guid, request: &PenaltyRequest);

    /// Say `message` to every connected player.
    fn broadcast(&mut self, message: &str);

    /// Privately message one connected player.
    fn message_observer(&mut self, observer: &Guid, message: &str);

    /// Connected players whose level is at least `min_level`.
    fn observers(&self, min_level: u32) -> Vec<Guid>;
}
