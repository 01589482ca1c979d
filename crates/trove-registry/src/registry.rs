//! The shared room directory: id allocation, connection routing, and
//! stale-room sweeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use trove_protocol::{
    ConnectionId, PlayerId, RoomId, RoomInfo, RoomSnapshot, SettingsUpdate,
};

use crate::error::RegistryError;
use crate::room::{RoomActor, RoomHandle};

const ROOM_ID_LEN: usize = 8;

/// Age after which a room with every seat disconnected is swept.
pub const STALE_ROOM_AGE: Duration = Duration::from_secs(2 * 60 * 60);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn random_room_id() -> RoomId {
    let id: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(ROOM_ID_LEN)
        .map(char::from)
        .collect();
    RoomId(id.to_lowercase())
}

/// Directory of live rooms plus the connection-to-seat routing table.
///
/// Callers share it behind `Arc<Mutex<_>>`; the lock covers only
/// directory bookkeeping, all game work happens inside the room actors.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
    connections: HashMap<ConnectionId, (RoomId, PlayerId)>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).cloned()
    }

    /// Spawns a fresh room actor under a previously unused id.
    pub fn create_room(
        &mut self,
        options: Option<SettingsUpdate>,
    ) -> (RoomId, RoomHandle) {
        let mut room_id = random_room_id();
        while self.rooms.contains_key(&room_id) {
            room_id = random_room_id();
        }

        let handle = RoomActor::spawn(room_id.clone(), options);
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = self.rooms.len(), "room created");
        (room_id, handle)
    }

    /// Routes a connection into a room. A known player id on a fresh
    /// connection is a reconnect; the previous binding for that seat is
    /// superseded.
    pub async fn join_room(
        &mut self,
        room_id: &RoomId,
        player_id: PlayerId,
        name: String,
        connection_id: ConnectionId,
    ) -> Result<RoomSnapshot, RegistryError> {
        let handle = self.room(room_id).ok_or(RegistryError::RoomNotFound)?;
        let snapshot = handle
            .join(player_id.clone(), name, connection_id.clone())
            .await?;
        self.connections
            .insert(connection_id, (room_id.clone(), player_id));
        Ok(snapshot)
    }

    /// Explicit departure. The room is closed once its last player
    /// leaves.
    pub async fn leave_room(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Result<(), RegistryError> {
        let (room_id, player_id) = self
            .connections
            .remove(connection_id)
            .ok_or(RegistryError::RoomNotFound)?;
        let Some(handle) = self.room(&room_id) else {
            return Err(RegistryError::RoomNotFound);
        };

        let remaining = handle.leave(player_id).await?;
        if remaining == 0 {
            handle.shutdown().await;
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room closed, last player left");
        }
        Ok(())
    }

    /// Transport-level drop: the seat is kept for a later reconnect.
    pub async fn handle_disconnect(&mut self, connection_id: &ConnectionId) {
        let Some((room_id, _)) = self.connections.remove(connection_id) else {
            return;
        };
        if let Some(handle) = self.room(&room_id) {
            let _ = handle.disconnect(connection_id.clone()).await;
        }
    }

    /// Lobby-status rooms, newest first.
    pub async fn list_joinable(&self) -> Vec<RoomInfo> {
        let mut listings = Vec::new();
        for (room_id, handle) in &self.rooms {
            let Ok(health) = handle.health().await else {
                continue;
            };
            if health.status.is_joinable() {
                listings.push(RoomInfo {
                    room_id: room_id.clone(),
                    player_count: health.player_count,
                    created_at_ms: health.created_at_ms,
                });
            }
        }
        listings.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        listings
    }

    /// Removes rooms whose actor has died, and rooms with zero connected
    /// players older than `max_age`. Returns the number swept.
    pub async fn sweep(&mut self, max_age: Duration) -> usize {
        let now = now_ms();
        let mut stale = Vec::new();

        for (room_id, handle) in &self.rooms {
            match handle.health().await {
                Err(_) => stale.push(room_id.clone()),
                Ok(health) => {
                    let age_ms = now.saturating_sub(health.created_at_ms);
                    if health.connected_count == 0
                        && age_ms >= max_age.as_millis() as u64
                    {
                        stale.push(room_id.clone());
                    }
                }
            }
        }

        for room_id in &stale {
            if let Some(handle) = self.rooms.remove(room_id) {
                handle.shutdown().await;
            }
            self.connections.retain(|_, (rid, _)| rid != room_id);
            tracing::info!(%room_id, "stale room swept");
        }
        stale.len()
    }
}

/// Background task sweeping stale rooms at a fixed interval.
pub fn spawn_sweeper(
    registry: Arc<Mutex<RoomRegistry>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let swept = registry.lock().await.sweep(STALE_ROOM_AGE).await;
            if swept > 0 {
                tracing::info!(swept, "sweep pass finished");
            }
        }
    })
}
