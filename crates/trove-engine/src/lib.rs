//! Per-room game state machine for Trove.
//!
//! The [`GameEngine`] is the single source of truth for one room: turn
//! order, card effects, chained pending picks, discard validation, win
//! detection, and the turn deadline. Every mutation goes through one of
//! its synchronous entry points; an operation either applies atomically
//! or is rejected with a [`GameError`] leaving state untouched.
//!
//! The engine performs no I/O and owns no tasks. The registry layer
//! wraps it in a room actor, serializes calls, and couples
//! [`GameEngine::turn_deadline_ms`] to a real timer.
//!
//! # Key types
//!
//! - [`GameEngine`] — the room state machine
//! - [`DrawPile`] — the 67-card supply with recycle-on-empty
//! - [`TrophyPool`] — the 16 scoreable trophies
//! - [`PlayerSession`] — one seat: hand, trophies, liveness
//! - [`GameError`] — named, non-mutating rejections

mod engine;
mod error;
mod player;
mod supply;
mod trophies;

pub use engine::GameEngine;
pub use error::GameError;
pub use player::PlayerSession;
pub use supply::{BONUS_PICK_WAKE_VARIANT, DECK_SIZE, DrawPile, HAND_SIZE};
pub use trophies::{
    BONUS_PICK_TROPHY, INVULNERABLE_TROPHY, PREDATOR_TROPHY, PREY_TROPHY,
    TROPHY_COUNT, TrophyPool,
};
