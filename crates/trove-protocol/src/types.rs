//! Identity newtypes and the core game objects.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's stable identity.
///
/// Supplied by the client at join time and kept for the lifetime of the
/// room — reconnecting with the same `PlayerId` resumes the same seat,
/// hand, and trophies. Wrapped in a newtype so it can never be confused
/// with a [`ConnectionId`], which is ephemeral.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ephemeral transport connection reference.
///
/// A new one is minted every time a client connects; the registry maps it
/// back to the `(RoomId, PlayerId)` pair for disconnect handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A room's join code: 8 alphanumeric characters, generated server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A card's identity within one room. Assigned sequentially when the
/// supply is built; never reused within a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A trophy's identity within one room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TrophyId(pub u32);

impl fmt::Display for TrophyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// The six effect archetypes plus numeric filler cards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Claims a sleeping trophy from the pool.
    Wake,
    /// Steals an owned trophy from another player; blocked by a ward.
    Raid,
    /// Reaction card: auto-discarded to block an incoming raid.
    Ward,
    /// Returns an opponent's trophy to the pool; blocked by a counter.
    Sleep,
    /// Reaction card: auto-discarded to block an incoming sleep.
    Counter,
    /// Reveal-loop card: draws until a non-numeric card (kept) or a
    /// numeric card (delegates a trophy pick by seat arithmetic).
    Wildcard,
    /// Value 1–10; discarded in equal-sum combinations to cycle the hand.
    Numeric,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wake => "wake",
            Self::Raid => "raid",
            Self::Ward => "ward",
            Self::Sleep => "sleep",
            Self::Counter => "counter",
            Self::Wildcard => "wildcard",
            Self::Numeric => "numeric",
        };
        write!(f, "{s}")
    }
}

/// A single card. Immutable once created; identity is the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub kind: CardKind,
    /// Face value — numeric cards only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    /// Variant name — wake and raid cards only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Trophies
// ---------------------------------------------------------------------------

/// A scoreable object players compete to collect.
///
/// Sixteen fixed instances per room. The invariant
/// `awake == owner.is_some()` holds after every applied action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trophy {
    pub id: TrophyId,
    pub name: String,
    pub points: u8,
    pub awake: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// Room status
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Lobby ──(start)──→ Playing ──(win / all awake)──→ Finished
///   ↑                   │
///   └──(reset / < 2 players)──────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if the room is accepting new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}
