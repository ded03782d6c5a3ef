//! Single owner of the tracker.
//!
//! HTTP handlers run concurrently, but the tracker must see events one at a
//! time and in arrival order. Handlers send requests over a channel to one
//! task that owns the [`Tracker`] and the roster, and wait for its reply.

use std::sync::Arc;

use namewatch_core::{Event, Settings, Tracker};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::AppError;
use crate::outbox::{GameServer, Outbox};
use crate::roster::ConnectedPlayer;

const QUEUE_CAPACITY: usize = 1024;

/// Produces fresh settings when a reload is requested.
pub type Reloader = Box<dyn FnMut() -> Settings + Send>;

#[derive(Debug)]
pub enum Request {
    Event(Event),
    Connect(ConnectedPlayer),
    Sync(Vec<ConnectedPlayer>),
    Reload,
    Status(oneshot::Sender<Status>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub online: usize,
    pub tracked: usize,
}

/// A request plus the acknowledgement sent once it has been applied.
type Envelope = (Request, oneshot::Sender<()>);

/// Cheap handle for sending requests to the dispatcher task.
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<Envelope>,
}

impl DispatchHandle {
    /// Send a request and wait until it has been applied.
    pub async fn send(&self, request: Request) -> Result<(), AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| AppError::DispatcherUnavailable)?;
        reply_rx.await.map_err(|_| AppError::DispatcherUnavailable)
    }

    /// Ask for the current player and history counts.
    pub async fn status(&self) -> Result<Status, AppError> {
        let (status_tx, status_rx) = oneshot::channel();
        self.send(Request::Status(status_tx)).await?;
        status_rx.await.map_err(|_| AppError::DispatcherUnavailable)
    }
}

pub struct Dispatcher {
    tracker: Tracker,
    server: GameServer,
    reload: Reloader,
}

impl Dispatcher {
    pub fn new(settings: Settings, outbox: Arc<Outbox>, reload: Reloader) -> Self {
        Self {
            tracker: Tracker::new(settings),
            server: GameServer::new(outbox),
            reload,
        }
    }

    /// Start the dispatcher task. It stops once every handle is dropped,
    /// taking the tracker state with it.
    pub fn spawn(self) -> DispatchHandle {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(self.run(rx));
        DispatchHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Envelope>) {
        info!("dispatcher started");
        while let Some((request, reply_tx)) = rx.recv().await {
            self.apply(request);
            // The handler may have gone away (client hung up); the event still counts.
            let _ = reply_tx.send(());
        }
        info!(tracked = self.tracker.tracked(), "dispatcher stopped");
    }

    fn apply(&mut self, request: Request) {
        match request {
            Request::Event(event) => {
                if let Event::Rename(rename) = &event {
                    self.server.roster_mut().rename(rename);
                }
                self.tracker.handle(&event, &mut self.server);
                if !matches!(event, Event::Rename(_)) {
                    self.server.roster_mut().leave(event.guid());
                }
            }
            Request::Connect(player) => {
                let guid = player.guid.clone();
                if self.server.roster_mut().join(player) {
                    // New session: nothing from an earlier connection carries over.
                    self.tracker.handle_penalty_or_disconnect(&guid);
                }
            }
            Request::Sync(players) => {
                self.server.roster_mut().sync(players);
                let roster = self.server.roster();
                let dropped = self.tracker.retain_connected(|guid| roster.contains(guid));
                debug!(online = roster.len(), dropped, "synced roster");
            }
            Request::Reload => {
                let settings = (self.reload)();
                self.tracker.reload(settings);
            }
            Request::Status(status_tx) => {
                let _ = status_tx.send(Status {
                    online: self.server.roster().len(),
                    tracked: self.tracker.tracked(),
                });
            }
        }
    }
}

/// Build the outbox, spawn a dispatcher around `settings`, and return both handles.
pub fn launch(settings: Settings, reload: Reloader) -> (DispatchHandle, Arc<Outbox>) {
    let outbox = Arc::new(Outbox::new());
    let handle = Dispatcher::new(settings, outbox.clone(), reload).spawn();
    (handle, outbox)
}
