//! External interface types for the Trove game engine.
//!
//! Everything the transport layer exchanges with the core lives here:
//! identity newtypes, card and trophy records, the action envelope, and
//! the full room snapshot. The wire encoding itself (JSON, binary, ...)
//! is the transport layer's business — this crate only defines the
//! serde-facing shapes.
//!
//! # Key types
//!
//! - [`PlayerId`], [`ConnectionId`], [`RoomId`] — identity newtypes
//! - [`Card`], [`Trophy`] — the game objects
//! - [`ActionEnvelope`] / [`ActionKind`] — inbound player actions
//! - [`RoomSnapshot`] — the authoritative state view broadcast to a room
//! - [`DebugCommand`] — the diagnostic control surface

mod action;
mod snapshot;
mod types;

pub use action::{ActionEnvelope, ActionKind, DebugCommand, SettingsUpdate};
pub use snapshot::{
    LastAction, PendingPick, PlayerView, RoomInfo, RoomSnapshot,
};
pub use types::{
    Card, CardId, CardKind, ConnectionId, PlayerId, RoomId, RoomStatus,
    Trophy, TrophyId,
};
