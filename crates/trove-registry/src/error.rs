use thiserror::Error;
use trove_engine::GameError;

/// Failures surfaced by the registry and room actors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("room not found")]
    RoomNotFound,

    /// The room actor has shut down; the handle is stale.
    #[error("room closed")]
    RoomClosed,

    #[error(transparent)]
    Game(#[from] GameError),
}
