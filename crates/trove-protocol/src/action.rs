//! Inbound requests: player actions, settings updates, and the
//! diagnostic control surface.

use serde::{Deserialize, Serialize};

use crate::types::{CardId, CardKind, PlayerId, RoomStatus, TrophyId};

/// One payload shape per action kind, exhaustively matched by the engine.
///
/// Adjacently tagged so the wire form is
/// `{ "type": "PlayRaid", "payload": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ActionKind {
    /// Play a wake card targeting a sleeping trophy.
    PlayWake {
        card_id: CardId,
        trophy_id: TrophyId,
    },

    /// Play a raid card against a trophy another player owns.
    PlayRaid {
        card_id: CardId,
        target_player_id: PlayerId,
        trophy_id: TrophyId,
    },

    /// Play a sleep card against a trophy another player owns.
    PlaySleep {
        card_id: CardId,
        target_player_id: PlayerId,
        trophy_id: TrophyId,
    },

    /// Play a wildcard, starting the reveal loop.
    PlayWildcard { card_id: CardId },

    /// Discard numeric cards (single card, or an equal-sum combination)
    /// and draw replacements.
    Discard { card_ids: Vec<CardId> },

    /// Resolve one outstanding trophy pick.
    ResolvePick { trophy_id: TrophyId },
}

/// An action envelope: who is acting, and what they want to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// A host-only settings update.
///
/// The engine clamps the limit to 5–60 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub turn_time_limit_secs: u64,
}

/// Diagnostic commands, outside normal gameplay rules enforcement.
///
/// Supported for tooling; none of these are reachable through the
/// ordinary action path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DebugCommand {
    /// Force the room into a status.
    SetStatus { status: RoomStatus },
    /// Reset the room back to a fresh lobby.
    Reset,
    /// Grant the current-turn player an arbitrary card.
    GiveCard { kind: CardKind },
    /// Force-end the current turn.
    SwitchTurn,
    /// Award every sleeping trophy to the current-turn player,
    /// bypassing constraints.
    WakeAllTrophies,
    /// Return every owned trophy to the pool.
    SleepAllTrophies,
}
