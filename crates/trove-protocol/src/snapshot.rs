//! Outbound state: the full room snapshot and lobby listings.
//!
//! The engine is the single source of truth; after every applied action
//! the transport layer broadcasts a fresh [`RoomSnapshot`] to every
//! session in the room. Clients never compute outcomes.

use serde::{Deserialize, Serialize};

use crate::types::{
    Card, CardKind, PlayerId, RoomId, RoomStatus, Trophy, TrophyId,
};

/// A player as seen in a snapshot.
///
/// `score` is derived from owned trophies when the snapshot is built —
/// the engine never stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<Card>,
    pub trophies: Vec<TrophyId>,
    pub score: u32,
    pub connected: bool,
}

/// An outstanding obligation for one player to pick sleeping trophies
/// before the turn can legally end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPick {
    pub player_id: PlayerId,
    pub picks_remaining: u32,
}

/// The last applied action, enriched with resolved display names so
/// observers can narrate it without a card/trophy lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LastAction {
    CardPlayed {
        player_id: PlayerId,
        kind: CardKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        card_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        trophy_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_player_name: Option<String>,
    },
    Discarded {
        player_id: PlayerId,
        count: usize,
    },
    TrophyPicked {
        player_id: PlayerId,
        trophy_name: String,
    },
}

/// The authoritative per-room state view.
///
/// Draw pile contents are hidden (count only); the discard pile is fully
/// visible with its top card last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub status: RoomStatus,
    /// `None` only for a freshly created room nobody has joined yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_turn_player_id: Option<PlayerId>,
    pub trophies: Vec<Trophy>,
    pub draw_pile_count: usize,
    pub discard_pile: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<LastAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_pick: Option<PendingPick>,
    /// Unix-epoch milliseconds at which the current turn is forced to end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_deadline_ms: Option<u64>,
    pub turn_time_limit_secs: u64,
}

/// A joinable-room listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub player_count: usize,
    pub created_at_ms: u64,
}
