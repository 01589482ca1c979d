//! Room actors and the shared room registry.
//!
//! Each room runs as its own tokio task owning a
//! [`trove_engine::GameEngine`] and a [`trove_clock::TurnClock`];
//! the [`RoomRegistry`] maps room ids to actor handles and connection
//! ids to seats. Transport layers talk to rooms exclusively through
//! [`RoomHandle`], so no game state is ever shared across tasks.

mod error;
mod registry;
mod room;

pub use error::RegistryError;
pub use registry::{RoomRegistry, STALE_ROOM_AGE, spawn_sweeper};
pub use room::{RoomActor, RoomCommand, RoomHandle, RoomHealth};
