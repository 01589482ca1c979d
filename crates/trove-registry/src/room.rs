//! One task per room.
//!
//! The actor owns the [`GameEngine`] and its [`TurnClock`] outright;
//! every mutation arrives as a [`RoomCommand`] over the actor's mailbox,
//! so engine access is serialized without locks. The turn deadline is
//! plain data on the engine; after every command the actor mirrors it
//! into the clock, and a firing clock feeds back into the engine through
//! the same loop.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, oneshot};
use trove_clock::TurnClock;
use trove_engine::{GameEngine, GameError};
use trove_protocol::{
    ActionEnvelope, ConnectionId, DebugCommand, PlayerId, RoomId,
    RoomSnapshot, RoomStatus, SettingsUpdate,
};

use crate::error::RegistryError;

const COMMAND_BUFFER: usize = 64;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Liveness summary the registry uses for listings and sweeping.
#[derive(Debug, Clone)]
pub struct RoomHealth {
    pub status: RoomStatus,
    pub player_count: usize,
    pub connected_count: usize,
    pub created_at_ms: u64,
}

/// Mailbox protocol of a room actor.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<RoomSnapshot, RegistryError>>,
    },
    /// Explicit departure. Replies with the number of remaining players
    /// so the registry can close empty rooms.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<usize>,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Start {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<RoomSnapshot, RegistryError>>,
    },
    Action {
        envelope: ActionEnvelope,
        reply: oneshot::Sender<Result<RoomSnapshot, RegistryError>>,
    },
    UpdateSettings {
        player_id: PlayerId,
        update: SettingsUpdate,
        reply: oneshot::Sender<Result<RoomSnapshot, RegistryError>>,
    },
    Debug {
        command: DebugCommand,
        reply: oneshot::Sender<RoomSnapshot>,
    },
    /// Registers a snapshot feed. The current snapshot is pushed
    /// immediately; closed feeds are pruned on the next broadcast.
    Subscribe {
        tx: mpsc::UnboundedSender<RoomSnapshot>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Health {
        reply: oneshot::Sender<RoomHealth>,
    },
    Shutdown,
}

/// Cheap, cloneable sender half of a room's mailbox.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    async fn send(&self, cmd: RoomCommand) -> Result<(), RegistryError> {
        self.tx.send(cmd).await.map_err(|_| RegistryError::RoomClosed)
    }

    async fn request<T>(
        &self,
        cmd: RoomCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, RegistryError> {
        self.send(cmd).await?;
        rx.await.map_err(|_| RegistryError::RoomClosed)
    }

    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        connection_id: ConnectionId,
    ) -> Result<RoomSnapshot, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            RoomCommand::Join {
                player_id,
                name,
                connection_id,
                reply,
            },
            rx,
        )
        .await?
    }

    pub async fn leave(
        &self,
        player_id: PlayerId,
    ) -> Result<usize, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Leave { player_id, reply }, rx).await
    }

    pub async fn disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> Result<(), RegistryError> {
        self.send(RoomCommand::Disconnect { connection_id }).await
    }

    pub async fn start(
        &self,
        player_id: PlayerId,
    ) -> Result<RoomSnapshot, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Start { player_id, reply }, rx)
            .await?
    }

    pub async fn action(
        &self,
        envelope: ActionEnvelope,
    ) -> Result<RoomSnapshot, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Action { envelope, reply }, rx)
            .await?
    }

    pub async fn update_settings(
        &self,
        player_id: PlayerId,
        update: SettingsUpdate,
    ) -> Result<RoomSnapshot, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            RoomCommand::UpdateSettings {
                player_id,
                update,
                reply,
            },
            rx,
        )
        .await?
    }

    pub async fn debug(
        &self,
        command: DebugCommand,
    ) -> Result<RoomSnapshot, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Debug { command, reply }, rx).await
    }

    pub async fn subscribe(
        &self,
        tx: mpsc::UnboundedSender<RoomSnapshot>,
    ) -> Result<(), RegistryError> {
        self.send(RoomCommand::Subscribe { tx }).await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Snapshot { reply }, rx).await
    }

    pub async fn health(&self) -> Result<RoomHealth, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Health { reply }, rx).await
    }

    /// Asks the actor to stop. Pending mailbox commands ahead of this
    /// one are still served.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(RoomCommand::Shutdown).await;
    }
}

/// The task body behind a [`RoomHandle`].
pub struct RoomActor {
    engine: GameEngine,
    clock: TurnClock,
    rx: mpsc::Receiver<RoomCommand>,
    subscribers: Vec<mpsc::UnboundedSender<RoomSnapshot>>,
    /// Deadline last mirrored into the clock, to avoid re-arming on
    /// commands that left it unchanged.
    synced_deadline_ms: Option<u64>,
}

impl RoomActor {
    /// Spawns the actor task and returns its handle.
    pub fn spawn(
        room_id: RoomId,
        options: Option<SettingsUpdate>,
    ) -> RoomHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = Self {
            engine: GameEngine::new(room_id, options),
            clock: TurnClock::new(),
            rx,
            subscribers: Vec::new(),
            synced_deadline_ms: None,
        };
        tokio::spawn(actor.run());
        RoomHandle { tx }
    }

    async fn run(mut self) {
        tracing::debug!(room_id = %self.engine.room_id(), "room actor started");
        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        None | Some(RoomCommand::Shutdown) => break,
                        Some(cmd) => self.handle(cmd),
                    }
                    self.sync_clock();
                }
                () = self.clock.expired() => {
                    self.engine.expire_turn();
                    // The clock disarmed itself on firing.
                    self.synced_deadline_ms = None;
                    self.sync_clock();
                    self.broadcast();
                }
            }
        }
        tracing::debug!(room_id = %self.engine.room_id(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                connection_id,
                reply,
            } => {
                let result = self
                    .engine
                    .join(player_id, name, connection_id)
                    .map(|()| self.broadcast())
                    .map_err(RegistryError::from);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                self.engine.remove_player(&player_id);
                self.broadcast();
                let _ = reply.send(self.engine.player_count());
            }
            RoomCommand::Disconnect { connection_id } => {
                self.engine.mark_disconnected(&connection_id);
                self.broadcast();
            }
            RoomCommand::Start { player_id, reply } => {
                let result = if self.engine.host_id() != Some(&player_id) {
                    Err(GameError::NotHost.into())
                } else {
                    self.engine
                        .start()
                        .map(|()| self.broadcast())
                        .map_err(RegistryError::from)
                };
                let _ = reply.send(result);
            }
            RoomCommand::Action { envelope, reply } => {
                let result = self
                    .engine
                    .apply_action(envelope)
                    .map(|()| self.broadcast())
                    .map_err(RegistryError::from);
                let _ = reply.send(result);
            }
            RoomCommand::UpdateSettings {
                player_id,
                update,
                reply,
            } => {
                let result = self
                    .engine
                    .update_settings(&player_id, update)
                    .map(|()| self.broadcast())
                    .map_err(RegistryError::from);
                let _ = reply.send(result);
            }
            RoomCommand::Debug { command, reply } => {
                self.engine.apply_debug(command);
                let _ = reply.send(self.broadcast());
            }
            RoomCommand::Subscribe { tx } => {
                let _ = tx.send(self.engine.snapshot());
                self.subscribers.push(tx);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot());
            }
            RoomCommand::Health { reply } => {
                let _ = reply.send(RoomHealth {
                    status: self.engine.status(),
                    player_count: self.engine.player_count(),
                    connected_count: self.engine.connected_count(),
                    created_at_ms: self.engine.created_at_ms(),
                });
            }
            // Handled in the run loop.
            RoomCommand::Shutdown => {}
        }
    }

    /// Pushes the current snapshot to every live subscriber and returns it.
    fn broadcast(&mut self) -> RoomSnapshot {
        let snapshot = self.engine.snapshot();
        self.subscribers
            .retain(|sub| sub.send(snapshot.clone()).is_ok());
        snapshot
    }

    /// Mirrors the engine's deadline into the clock.
    fn sync_clock(&mut self) {
        let target = self.engine.turn_deadline_ms();
        if target == self.synced_deadline_ms {
            return;
        }
        self.synced_deadline_ms = target;
        match target {
            Some(deadline_ms) => {
                let remaining = deadline_ms.saturating_sub(now_ms());
                self.clock.arm(Duration::from_millis(remaining));
            }
            None => self.clock.cancel(),
        }
    }
}
