//! Error types for the game engine.
//!
//! Every rejection is synchronous and leaves room state exactly as it
//! was before the call. The transport layer returns these only to the
//! originating session, never to the whole room.

/// Errors produced by [`GameEngine`](crate::GameEngine) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The acting player is not the current-turn player.
    #[error("not your turn")]
    NotYourTurn,

    /// A pending trophy pick blocks every action except the designated
    /// player's pick.
    #[error("waiting for pending pick")]
    PendingPickInProgress,

    /// A pick was submitted while no pick is outstanding.
    #[error("no pending pick to resolve")]
    NoPendingPick,

    /// The acting player is not in this room.
    #[error("player not found")]
    PlayerNotFound,

    /// Gameplay actions require a started, unfinished game.
    #[error("game is not in progress")]
    GameNotInProgress,

    /// The named card is not in the acting player's hand.
    #[error("card not in hand")]
    CardNotInHand,

    /// The card's kind does not match the requested play (reaction
    /// cards and numeric cards are never played proactively).
    #[error("card cannot be played this way")]
    CannotPlayDirectly,

    /// Missing or unusable target (sleeping trophy required, target
    /// player unknown, trophy already awake, ...).
    #[error("invalid target")]
    InvalidTarget,

    /// The targeted player does not own the named trophy.
    #[error("target does not own that trophy")]
    TargetDoesNotOwnTrophy,

    /// The designated invulnerable trophy can never be raided or slept.
    #[error("{0} cannot be targeted")]
    InvulnerableTrophy(String),

    /// The discard is neither a single card nor an equal-sum
    /// combination.
    #[error("invalid discard combination")]
    InvalidDiscard,

    /// Players can only be added while the room is in the lobby.
    #[error("game already started")]
    GameAlreadyStarted,

    /// The room already holds the maximum of five players.
    #[error("room is full")]
    RoomFull,

    /// Starting requires at least two players.
    #[error("not enough players")]
    NotEnoughPlayers,

    /// Settings updates are accepted from the host only.
    #[error("only host can update settings")]
    NotHost,
}
