//! The per-room game state machine.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use trove_protocol::{
    ActionEnvelope, ActionKind, Card, CardId, CardKind, ConnectionId,
    DebugCommand, LastAction, PendingPick, PlayerId, RoomId, RoomSnapshot,
    RoomStatus, SettingsUpdate, TrophyId,
};

use crate::error::GameError;
use crate::player::PlayerSession;
use crate::supply::{BONUS_PICK_WAKE_VARIANT, DECK_SIZE, DrawPile, HAND_SIZE};
use crate::trophies::{
    self, BONUS_PICK_TROPHY, INVULNERABLE_TROPHY, TrophyPool,
};

const MAX_PLAYERS: usize = 5;
const MIN_PLAYERS: usize = 2;
const MIN_TURN_SECS: u64 = 5;
const MAX_TURN_SECS: u64 = 60;
const DEFAULT_TURN_SECS: u64 = 60;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The single source of truth for one room.
///
/// All mutation flows through [`GameEngine::apply_action`], the lobby
/// operations, the connect/disconnect callbacks, and
/// [`GameEngine::expire_turn`]. The owner (the room actor) must
/// serialize these with respect to each other; the engine itself holds
/// no locks and spawns no tasks.
///
/// The turn deadline is plain data here ([`GameEngine::turn_deadline_ms`]);
/// the owner mirrors it into a real timer and calls `expire_turn` when
/// it fires.
#[derive(Debug)]
pub struct GameEngine {
    id: RoomId,
    host_id: Option<PlayerId>,
    players: Vec<PlayerSession>,
    draw_pile: DrawPile,
    discard_pile: Vec<Card>,
    trophies: TrophyPool,
    status: RoomStatus,
    current_turn: usize,
    pending_pick: Option<PendingPick>,
    last_action: Option<LastAction>,
    winner: Option<PlayerId>,
    turn_deadline_ms: Option<u64>,
    turn_duration: Duration,
    created_at_ms: u64,
    /// Id source for diagnostic-granted cards, outside the supply's
    /// 0..67 range.
    debug_card_seq: u32,
}

impl GameEngine {
    pub fn new(id: RoomId, options: Option<SettingsUpdate>) -> Self {
        let mut engine = Self {
            id,
            host_id: None,
            players: Vec::new(),
            draw_pile: DrawPile::standard(),
            discard_pile: Vec::new(),
            trophies: TrophyPool::shuffled(),
            status: RoomStatus::Lobby,
            current_turn: 0,
            pending_pick: None,
            last_action: None,
            winner: None,
            turn_deadline_ms: None,
            turn_duration: Duration::from_secs(DEFAULT_TURN_SECS),
            created_at_ms: now_ms(),
            debug_card_seq: 10_000,
        };
        if let Some(opts) = options {
            engine.set_turn_limit(opts.turn_time_limit_secs);
        }
        engine
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn room_id(&self) -> &RoomId {
        &self.id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }

    pub fn host_id(&self) -> Option<&PlayerId> {
        self.host_id.as_ref()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.players.iter().any(|p| &p.id == id)
    }

    pub fn player_id_by_connection(
        &self,
        conn: &ConnectionId,
    ) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| &p.connection_id == conn)
            .map(|p| p.id.clone())
    }

    pub fn current_turn_player_id(&self) -> Option<PlayerId> {
        self.players.get(self.current_turn).map(|p| p.id.clone())
    }

    /// Unix-epoch milliseconds at which the current turn must be
    /// forced to end, if a deadline is armed.
    pub fn turn_deadline_ms(&self) -> Option<u64> {
        self.turn_deadline_ms
    }

    pub fn turn_duration(&self) -> Duration {
        self.turn_duration
    }

    // -----------------------------------------------------------------
    // Lobby / membership
    // -----------------------------------------------------------------

    /// Adds a player, or treats a known player id as a reconnect.
    pub fn join(
        &mut self,
        id: PlayerId,
        name: String,
        connection_id: ConnectionId,
    ) -> Result<(), GameError> {
        if self.has_player(&id) {
            self.mark_reconnected(&id, connection_id);
            return Ok(());
        }
        self.add_player(id, name, connection_id)
    }

    /// Adds a fresh player. The first player becomes host.
    pub fn add_player(
        &mut self,
        id: PlayerId,
        name: String,
        connection_id: ConnectionId,
    ) -> Result<(), GameError> {
        if self.status != RoomStatus::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }

        if self.players.is_empty() || self.host_id.is_none() {
            self.host_id = Some(id.clone());
            tracing::info!(room_id = %self.id, player_id = %id, "host assigned");
        }

        tracing::info!(
            room_id = %self.id,
            player_id = %id,
            name = %name,
            players = self.players.len() + 1,
            "player joined"
        );
        self.players.push(PlayerSession::new(id, name, connection_id));
        Ok(())
    }

    /// Explicit departure. Mid-game, the departing hand goes to the
    /// discard pile and their trophies return to the pool, keeping the
    /// card supply and trophy ownership intact. Reassigns the host if
    /// needed; a playing room that drops below two players is
    /// force-reset to the lobby.
    pub fn remove_player(&mut self, id: &PlayerId) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        let mut departing = self.players.remove(idx);

        if self.status == RoomStatus::Playing {
            self.discard_pile.append(&mut departing.hand);
            for trophy_id in departing.trophies {
                self.release_trophy(trophy_id);
            }
            tracing::info!(room_id = %self.id, player_id = %id, "mid-game departure, cards and trophies returned");
        }

        // Seats above the removed one shift down; keep the turn on the
        // same player.
        if idx < self.current_turn {
            self.current_turn -= 1;
        }
        if self.current_turn >= self.players.len() {
            self.current_turn = 0;
        }

        if self.host_id.as_ref() == Some(id) {
            self.host_id = self.players.first().map(|p| p.id.clone());
            if let Some(host) = &self.host_id {
                tracing::info!(room_id = %self.id, player_id = %host, "host left, reassigned");
            }
        }

        if self.status == RoomStatus::Playing && self.players.len() < MIN_PLAYERS {
            tracing::info!(room_id = %self.id, "too few players, resetting to lobby");
            self.reset_room();
        }
    }

    /// Marks the session behind a connection as disconnected without
    /// touching hand, seat, or ownership.
    pub fn mark_disconnected(&mut self, conn: &ConnectionId) {
        if let Some(p) =
            self.players.iter_mut().find(|p| &p.connection_id == conn)
        {
            p.connected = false;
            tracing::info!(room_id = %self.id, player_id = %p.id, "player disconnected");
        }
    }

    /// Rebinds a known player to a new connection and marks them live.
    /// Reconnecting the current-turn player with no armed deadline
    /// re-arms the turn timer.
    pub fn mark_reconnected(
        &mut self,
        id: &PlayerId,
        connection_id: ConnectionId,
    ) {
        let Some(p) = self.players.iter_mut().find(|p| &p.id == id) else {
            return;
        };
        p.connected = true;
        p.connection_id = connection_id;
        tracing::info!(room_id = %self.id, player_id = %id, "player reconnected");

        if self.status == RoomStatus::Playing
            && self.winner.is_none()
            && self.current_turn_player_id().as_ref() == Some(id)
            && self.turn_deadline_ms.is_none()
        {
            self.arm_turn_deadline();
        }
    }

    // -----------------------------------------------------------------
    // Game start / settings
    // -----------------------------------------------------------------

    /// Deals five cards to every player, picks a random starting seat,
    /// arms the turn timer, and transitions to Playing.
    pub fn start(&mut self) -> Result<(), GameError> {
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        self.status = RoomStatus::Playing;
        self.draw_pile.shuffle();

        for idx in 0..self.players.len() {
            for _ in 0..HAND_SIZE {
                if let Some(card) = self.draw_pile.draw() {
                    self.players[idx].add_card(card);
                }
            }
        }

        self.current_turn = rand::rng().random_range(0..self.players.len());
        self.arm_turn_deadline();
        tracing::info!(
            room_id = %self.id,
            players = self.players.len(),
            first_seat = self.current_turn,
            "game started"
        );
        Ok(())
    }

    /// Applies a host-only settings update, clamping the turn limit to
    /// 5–60 seconds.
    pub fn update_settings(
        &mut self,
        requester: &PlayerId,
        update: SettingsUpdate,
    ) -> Result<(), GameError> {
        if self.host_id.as_ref() != Some(requester) {
            return Err(GameError::NotHost);
        }
        self.set_turn_limit(update.turn_time_limit_secs);
        Ok(())
    }

    fn set_turn_limit(&mut self, secs: u64) {
        let clamped = secs.clamp(MIN_TURN_SECS, MAX_TURN_SECS);
        self.turn_duration = Duration::from_secs(clamped);
        tracing::debug!(room_id = %self.id, secs = clamped, "turn limit updated");
    }

    // -----------------------------------------------------------------
    // Action entry point
    // -----------------------------------------------------------------

    /// Validates and applies one action atomically.
    ///
    /// Validation order: player exists, pending-pick gate, current-turn
    /// check. A rejected action mutates nothing. A successful action is
    /// recorded (with display names resolved before execution) and
    /// followed by a win check.
    pub fn apply_action(
        &mut self,
        envelope: ActionEnvelope,
    ) -> Result<(), GameError> {
        let actor_idx = self
            .index_of(&envelope.player_id)
            .ok_or(GameError::PlayerNotFound)?;
        if self.status != RoomStatus::Playing {
            return Err(GameError::GameNotInProgress);
        }

        let is_pending_pick_action = matches!(
            (&self.pending_pick, &envelope.kind),
            (Some(p), ActionKind::ResolvePick { .. })
                if p.player_id == envelope.player_id
        );

        if self.pending_pick.is_some() && !is_pending_pick_action {
            return Err(GameError::PendingPickInProgress);
        }
        if !is_pending_pick_action && actor_idx != self.current_turn {
            return Err(GameError::NotYourTurn);
        }

        // Resolve display names before any mutation; only stored on
        // success.
        let record = self.enrich(&envelope);

        match envelope.kind {
            ActionKind::PlayWake { card_id, trophy_id } => {
                self.play_wake(actor_idx, card_id, trophy_id)?;
                if self.pending_pick.is_none() {
                    self.end_turn(actor_idx);
                }
            }
            ActionKind::PlayRaid {
                card_id,
                target_player_id,
                trophy_id,
            } => {
                self.play_raid(actor_idx, card_id, &target_player_id, trophy_id)?;
                if self.pending_pick.is_none() {
                    self.end_turn(actor_idx);
                }
            }
            ActionKind::PlaySleep {
                card_id,
                target_player_id,
                trophy_id,
            } => {
                self.play_sleep(actor_idx, card_id, &target_player_id, trophy_id)?;
                if self.pending_pick.is_none() {
                    self.end_turn(actor_idx);
                }
            }
            ActionKind::PlayWildcard { card_id } => {
                let ends_turn = self.play_wildcard(actor_idx, card_id)?;
                if ends_turn && self.pending_pick.is_none() {
                    self.end_turn(actor_idx);
                }
            }
            ActionKind::Discard { ref card_ids } => {
                self.resolve_discard(actor_idx, card_ids)?;
            }
            ActionKind::ResolvePick { trophy_id } => {
                self.resolve_pick(actor_idx, trophy_id)?;
            }
        }

        self.last_action = Some(record);
        self.check_win();
        Ok(())
    }

    fn enrich(&self, envelope: &ActionEnvelope) -> LastAction {
        let actor = envelope.player_id.clone();
        let card_played = |kind: CardKind,
                           card_id: CardId,
                           trophy_id: Option<TrophyId>,
                           target: Option<&PlayerId>| {
            LastAction::CardPlayed {
                player_id: actor.clone(),
                kind,
                card_name: self
                    .index_of(&actor)
                    .and_then(|i| self.players[i].card(card_id))
                    .and_then(|c| c.name.clone()),
                trophy_name: trophy_id
                    .and_then(|id| self.trophies.get(id))
                    .map(|t| t.name.clone()),
                target_player_name: target
                    .and_then(|id| self.index_of(id))
                    .map(|i| self.players[i].name.clone()),
            }
        };

        match &envelope.kind {
            ActionKind::PlayWake { card_id, trophy_id } => {
                card_played(CardKind::Wake, *card_id, Some(*trophy_id), None)
            }
            ActionKind::PlayRaid {
                card_id,
                target_player_id,
                trophy_id,
            } => card_played(
                CardKind::Raid,
                *card_id,
                Some(*trophy_id),
                Some(target_player_id),
            ),
            ActionKind::PlaySleep {
                card_id,
                target_player_id,
                trophy_id,
            } => card_played(
                CardKind::Sleep,
                *card_id,
                Some(*trophy_id),
                Some(target_player_id),
            ),
            ActionKind::PlayWildcard { card_id } => {
                card_played(CardKind::Wildcard, *card_id, None, None)
            }
            ActionKind::Discard { card_ids } => LastAction::Discarded {
                player_id: actor.clone(),
                count: card_ids.len(),
            },
            ActionKind::ResolvePick { trophy_id } => LastAction::TrophyPicked {
                player_id: actor.clone(),
                trophy_name: self
                    .trophies
                    .get(*trophy_id)
                    .map(|t| t.name.clone())
                    .unwrap_or_default(),
            },
        }
    }

    // -----------------------------------------------------------------
    // Card effects
    // -----------------------------------------------------------------

    fn take_played_card(
        &mut self,
        idx: usize,
        card_id: CardId,
        expected: CardKind,
    ) -> Result<Card, GameError> {
        let card = self.players[idx]
            .card(card_id)
            .ok_or(GameError::CardNotInHand)?;
        if card.kind != expected {
            return Err(GameError::CannotPlayDirectly);
        }
        let card = self.players[idx]
            .remove_card(card_id)
            .ok_or(GameError::CardNotInHand)?;
        Ok(card)
    }

    fn play_wake(
        &mut self,
        idx: usize,
        card_id: CardId,
        trophy_id: TrophyId,
    ) -> Result<(), GameError> {
        let variant = self.players[idx]
            .card(card_id)
            .ok_or(GameError::CardNotInHand)?
            .name
            .clone();
        match self.trophies.get(trophy_id) {
            Some(t) if !t.awake => {}
            _ => return Err(GameError::InvalidTarget),
        }

        let card = self.take_played_card(idx, card_id, CardKind::Wake)?;
        self.discard_pile.push(card);

        // The aurora variant queues its extra pick before the wake
        // resolves, so a predator-pair no-op still leaves the pick.
        if variant.as_deref() == Some(BONUS_PICK_WAKE_VARIANT)
            && self.trophies.any_sleeping_except(trophy_id)
        {
            let picker = self.players[idx].id.clone();
            self.add_pending_pick(picker, 1);
        }

        self.wake_effects(idx, trophy_id);
        Ok(())
    }

    fn play_raid(
        &mut self,
        idx: usize,
        card_id: CardId,
        target_player_id: &PlayerId,
        trophy_id: TrophyId,
    ) -> Result<(), GameError> {
        let target_idx = self
            .index_of(target_player_id)
            .ok_or(GameError::InvalidTarget)?;
        let trophy_name = self
            .trophies
            .get(trophy_id)
            .ok_or(GameError::InvalidTarget)?
            .name
            .clone();
        if !self.players[target_idx].owns(trophy_id) {
            return Err(GameError::TargetDoesNotOwnTrophy);
        }
        if trophy_name == INVULNERABLE_TROPHY {
            return Err(GameError::InvulnerableTrophy(trophy_name));
        }

        let card = self.take_played_card(idx, card_id, CardKind::Raid)?;
        self.discard_pile.push(card);

        // A held ward blocks the raid: auto-discarded, defender draws
        // one replacement, raider's card stays spent.
        if let Some(ward_id) = self.players[target_idx].first_of_kind(CardKind::Ward)
        {
            self.discard_from_hand(target_idx, ward_id);
            self.draw_to(target_idx);
            tracing::debug!(room_id = %self.id, trophy = %trophy_name, "raid blocked by ward");
            return Ok(());
        }

        // Predator-pair conflict: the raid is spent but the trophy
        // stays with its owner.
        let raider = self.players[idx].id.clone();
        if trophies::predator_conflict(&self.trophies, &raider, &trophy_name) {
            return Ok(());
        }

        self.release_trophy(trophy_id);
        self.grant_trophy(idx, trophy_id);
        Ok(())
    }

    fn play_sleep(
        &mut self,
        idx: usize,
        card_id: CardId,
        target_player_id: &PlayerId,
        trophy_id: TrophyId,
    ) -> Result<(), GameError> {
        let target_idx = self
            .index_of(target_player_id)
            .ok_or(GameError::InvalidTarget)?;
        let trophy_name = self
            .trophies
            .get(trophy_id)
            .ok_or(GameError::InvalidTarget)?
            .name
            .clone();
        if !self.players[target_idx].owns(trophy_id) {
            return Err(GameError::TargetDoesNotOwnTrophy);
        }
        if trophy_name == INVULNERABLE_TROPHY {
            return Err(GameError::InvulnerableTrophy(trophy_name));
        }

        let card = self.take_played_card(idx, card_id, CardKind::Sleep)?;
        self.discard_pile.push(card);

        if let Some(counter_id) =
            self.players[target_idx].first_of_kind(CardKind::Counter)
        {
            self.discard_from_hand(target_idx, counter_id);
            self.draw_to(target_idx);
            tracing::debug!(room_id = %self.id, trophy = %trophy_name, "sleep blocked by counter");
            return Ok(());
        }

        self.release_trophy(trophy_id);
        Ok(())
    }

    /// Reveal loop. Returns `true` if the turn should end.
    fn play_wildcard(
        &mut self,
        idx: usize,
        card_id: CardId,
    ) -> Result<bool, GameError> {
        let card = self.take_played_card(idx, card_id, CardKind::Wildcard)?;
        self.discard_pile.push(card);

        loop {
            let Some(revealed) = self.draw_pile.draw() else {
                self.recycle_discard();
                if self.draw_pile.is_empty() {
                    return Ok(true);
                }
                continue;
            };

            if revealed.kind != CardKind::Numeric {
                // Kept directly by the active player; the turn carries on.
                self.players[idx].add_card(revealed);
                return Ok(false);
            }

            let value = usize::from(revealed.value.unwrap_or(0));
            self.discard_pile.push(revealed);

            let seat = (self.current_turn + value.saturating_sub(1))
                % self.players.len();
            let picker = self.players[seat].id.clone();
            tracing::debug!(
                room_id = %self.id,
                value,
                seat,
                picker = %picker,
                "wildcard delegated a pick"
            );
            self.add_pending_pick(picker, 1);
            return Ok(true);
        }
    }

    fn resolve_pick(
        &mut self,
        idx: usize,
        trophy_id: TrophyId,
    ) -> Result<(), GameError> {
        if self.pending_pick.is_none() {
            return Err(GameError::NoPendingPick);
        }
        match self.trophies.get(trophy_id) {
            Some(t) if !t.awake => {}
            _ => return Err(GameError::InvalidTarget),
        }

        if let Some(p) = &mut self.pending_pick {
            p.picks_remaining = p.picks_remaining.saturating_sub(1);
        }

        // Wake effects may queue further picks (bonus trophy).
        self.wake_effects(idx, trophy_id);

        let exhausted = self
            .pending_pick
            .as_ref()
            .is_none_or(|p| p.picks_remaining == 0);
        if exhausted {
            self.pending_pick = None;
            // The ORIGINAL turn owner's turn ends, not necessarily the
            // picker's.
            let owner_idx = self.current_turn;
            self.end_turn(owner_idx);
        }
        Ok(())
    }

    fn resolve_discard(
        &mut self,
        idx: usize,
        card_ids: &[CardId],
    ) -> Result<(), GameError> {
        if card_ids.is_empty() {
            return Err(GameError::InvalidDiscard);
        }
        // Duplicated ids would discard once but draw twice.
        for (i, id) in card_ids.iter().enumerate() {
            if card_ids[..i].contains(id) {
                return Err(GameError::InvalidDiscard);
            }
        }

        let mut values = Vec::with_capacity(card_ids.len());
        for &id in card_ids {
            let card =
                self.players[idx].card(id).ok_or(GameError::CardNotInHand)?;
            values.push(u32::from(card.value.unwrap_or(0)));
        }

        if card_ids.len() > 1 && !can_split_evenly(&values) {
            return Err(GameError::InvalidDiscard);
        }

        for &id in card_ids {
            self.discard_from_hand(idx, id);
        }
        for _ in 0..card_ids.len() {
            self.draw_to(idx);
        }
        self.end_turn(idx);
        Ok(())
    }

    /// Shared wake path for direct plays and pending picks: predator
    /// conflict leaves the trophy asleep (silent no-op), and waking the
    /// bonus trophy queues one more pick.
    fn wake_effects(&mut self, idx: usize, trophy_id: TrophyId) {
        let Some(trophy) = self.trophies.get(trophy_id) else {
            return;
        };
        let name = trophy.name.clone();
        let claimant = self.players[idx].id.clone();

        if trophies::predator_conflict(&self.trophies, &claimant, &name) {
            tracing::debug!(
                room_id = %self.id,
                player_id = %claimant,
                trophy = %name,
                "predator pair conflict, trophy stays asleep"
            );
            return;
        }

        self.grant_trophy(idx, trophy_id);

        if name == BONUS_PICK_TROPHY
            && self.trophies.any_sleeping_except(trophy_id)
        {
            self.add_pending_pick(claimant, 1);
        }
    }

    fn add_pending_pick(&mut self, player_id: PlayerId, count: u32) {
        match &mut self.pending_pick {
            Some(p) if p.player_id == player_id => {
                p.picks_remaining += count;
            }
            _ => {
                self.pending_pick = Some(PendingPick {
                    player_id,
                    picks_remaining: count,
                });
                // The picker gets a fresh deadline.
                self.arm_turn_deadline();
            }
        }
    }

    // -----------------------------------------------------------------
    // Ownership — the single grant/release path
    // -----------------------------------------------------------------

    fn grant_trophy(&mut self, idx: usize, trophy_id: TrophyId) {
        let owner = self.players[idx].id.clone();
        if let Some(t) = self.trophies.get_mut(trophy_id) {
            t.awake = true;
            t.owner = Some(owner);
        }
        if !self.players[idx].trophies.contains(&trophy_id) {
            self.players[idx].trophies.push(trophy_id);
        }
    }

    fn release_trophy(&mut self, trophy_id: TrophyId) {
        let prev_owner = self
            .trophies
            .get(trophy_id)
            .and_then(|t| t.owner.clone());
        if let Some(owner) = prev_owner {
            if let Some(i) = self.index_of(&owner) {
                self.players[i].trophies.retain(|&t| t != trophy_id);
            }
        }
        if let Some(t) = self.trophies.get_mut(trophy_id) {
            t.awake = false;
            t.owner = None;
        }
    }

    // -----------------------------------------------------------------
    // Piles and turn flow
    // -----------------------------------------------------------------

    fn discard_from_hand(&mut self, idx: usize, card_id: CardId) {
        if let Some(card) = self.players[idx].remove_card(card_id) {
            self.discard_pile.push(card);
        }
    }

    fn draw_to(&mut self, idx: usize) {
        if self.draw_pile.is_empty() {
            self.recycle_discard();
        }
        if let Some(card) = self.draw_pile.draw() {
            self.players[idx].add_card(card);
        }
    }

    fn recycle_discard(&mut self) {
        if self.discard_pile.is_empty() {
            return;
        }
        tracing::debug!(room_id = %self.id, "draw pile empty, recycling discard pile");
        self.draw_pile.recycle(std::mem::take(&mut self.discard_pile));
    }

    /// Shared turn-end procedure: refill to five, advance to the next
    /// connected seat (bounded by one lap), re-arm the deadline.
    fn end_turn(&mut self, idx: usize) {
        self.clear_turn_deadline();

        while self.players[idx].hand.len() < HAND_SIZE {
            self.draw_to(idx);
            if self.draw_pile.is_empty() && self.discard_pile.is_empty() {
                break;
            }
        }

        if self.players.is_empty() {
            return;
        }
        let seats = self.players.len();
        let mut attempts = 0;
        loop {
            self.current_turn = (self.current_turn + 1) % seats;
            attempts += 1;
            if self.players[self.current_turn].connected || attempts >= seats {
                break;
            }
        }

        if self.status == RoomStatus::Playing
            && self.winner.is_none()
            && self.players[self.current_turn].connected
        {
            self.arm_turn_deadline();
        }
    }

    /// Deadline fired: clear any pending pick and force the current
    /// turn to end. No card effects, no refill beyond the standard
    /// top-up.
    pub fn expire_turn(&mut self) {
        let Some(current) = self.players.get(self.current_turn) else {
            return;
        };
        tracing::info!(
            room_id = %self.id,
            player_id = %current.id,
            "turn deadline expired, forcing advance"
        );
        self.pending_pick = None;
        let idx = self.current_turn;
        self.end_turn(idx);
    }

    fn arm_turn_deadline(&mut self) {
        self.turn_deadline_ms =
            Some(now_ms() + self.turn_duration.as_millis() as u64);
    }

    fn clear_turn_deadline(&mut self) {
        self.turn_deadline_ms = None;
    }

    // -----------------------------------------------------------------
    // Win detection
    // -----------------------------------------------------------------

    fn check_win(&mut self) {
        if self.status != RoomStatus::Playing {
            return;
        }
        let seats = self.players.len();
        let points_to_win = if seats >= 4 { 40 } else { 50 };
        let trophies_to_win = if seats >= 4 { 4 } else { 5 };

        let mut winner_id = self
            .players
            .iter()
            .find(|p| {
                p.score(&self.trophies) >= points_to_win
                    || p.trophies.len() >= trophies_to_win
            })
            .map(|p| p.id.clone());

        // Every trophy claimed with nobody over the threshold: highest
        // score wins, ties broken by earliest seat.
        if winner_id.is_none() && self.trophies.all_awake() && seats > 0 {
            let mut best = 0;
            for i in 1..seats {
                if self.players[i].score(&self.trophies)
                    > self.players[best].score(&self.trophies)
                {
                    best = i;
                }
            }
            winner_id = Some(self.players[best].id.clone());
        }

        if let Some(id) = winner_id {
            tracing::info!(room_id = %self.id, winner = %id, "game over");
            self.winner = Some(id);
            self.status = RoomStatus::Finished;
            self.clear_turn_deadline();
        }
    }

    // -----------------------------------------------------------------
    // Reset and diagnostics
    // -----------------------------------------------------------------

    fn reset_room(&mut self) {
        self.clear_turn_deadline();
        self.status = RoomStatus::Lobby;
        self.draw_pile = DrawPile::standard();
        self.trophies = TrophyPool::shuffled();
        self.discard_pile.clear();
        self.winner = None;
        self.last_action = None;
        self.pending_pick = None;
        self.current_turn = 0;
        for p in &mut self.players {
            p.hand.clear();
            p.trophies.clear();
        }
    }

    /// Diagnostic control surface. Bypasses gameplay rules; supported
    /// for tooling only.
    pub fn apply_debug(&mut self, command: DebugCommand) {
        match command {
            DebugCommand::SetStatus { status } => {
                self.status = status;
                if status == RoomStatus::Finished
                    && self.winner.is_none()
                    && !self.players.is_empty()
                {
                    self.winner = Some(self.players[0].id.clone());
                    self.clear_turn_deadline();
                }
                if status == RoomStatus::Playing
                    && self.players.len() >= MIN_PLAYERS
                    && self.draw_pile.len() == DECK_SIZE
                {
                    if let Err(e) = self.start() {
                        tracing::warn!(room_id = %self.id, error = %e, "debug start failed");
                    }
                }
            }
            DebugCommand::Reset => self.reset_room(),
            DebugCommand::GiveCard { kind } => {
                if self.players.get(self.current_turn).is_some() {
                    let card = Card {
                        id: CardId(self.debug_card_seq),
                        kind,
                        value: (kind == CardKind::Numeric).then_some(5),
                        name: Some("debug".to_owned()),
                    };
                    self.debug_card_seq += 1;
                    self.players[self.current_turn].add_card(card);
                }
            }
            DebugCommand::SwitchTurn => {
                if !self.players.is_empty() {
                    let idx = self.current_turn;
                    self.end_turn(idx);
                }
            }
            DebugCommand::WakeAllTrophies => {
                if self.players.get(self.current_turn).is_some() {
                    let idx = self.current_turn;
                    for id in self.trophies.sleeping_ids() {
                        self.grant_trophy(idx, id);
                    }
                }
            }
            DebugCommand::SleepAllTrophies => {
                let awake: Vec<TrophyId> = self
                    .trophies
                    .iter()
                    .filter(|t| t.awake)
                    .map(|t| t.id)
                    .collect();
                for id in awake {
                    self.release_trophy(id);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------

    /// The full state view broadcast to every session in the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            status: self.status,
            host_id: self.host_id.clone(),
            players: self
                .players
                .iter()
                .map(|p| p.view(&self.trophies))
                .collect(),
            current_turn_player_id: self.current_turn_player_id(),
            trophies: self.trophies.to_vec(),
            draw_pile_count: self.draw_pile.len(),
            discard_pile: self.discard_pile.clone(),
            last_action: self.last_action.clone(),
            winner_id: self.winner.clone(),
            pending_pick: self.pending_pick.clone(),
            turn_deadline_ms: self.turn_deadline_ms,
            turn_time_limit_secs: self.turn_duration.as_secs(),
        }
    }

    fn index_of(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    /// Test/diagnostic helper: total cards across hands and both piles.
    pub fn total_cards(&self) -> usize {
        self.draw_pile.len()
            + self.discard_pile.len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }

    /// Test/diagnostic helper: the trophy↔owner invariant.
    pub fn ownership_consistent(&self) -> bool {
        self.trophies.ownership_consistent()
            && self.players.iter().all(|p| {
                p.trophies.iter().all(|&id| {
                    self.trophies
                        .get(id)
                        .is_some_and(|t| t.owner.as_ref() == Some(&p.id))
                })
            })
    }
}

/// Discard validity for multi-card discards: can the values be split
/// into two subsets with equal sums? Decided by a subset-sum sweep over
/// achievable partial sums (cards without a value count as 0).
fn can_split_evenly(values: &[u32]) -> bool {
    let total: u32 = values.iter().sum();
    if total % 2 != 0 {
        return false;
    }
    let target = (total / 2) as usize;

    let mut reachable = vec![false; target + 1];
    reachable[0] = true;
    for &v in values {
        let v = v as usize;
        if v > target {
            continue;
        }
        for sum in (v..=target).rev() {
            if reachable[sum - v] {
                reachable[sum] = true;
            }
        }
        if reachable[target] {
            return true;
        }
    }
    reachable[target]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId(s.to_owned())
    }

    fn cid(s: &str) -> ConnectionId {
        ConnectionId(s.to_owned())
    }

    fn named(id: u32, kind: CardKind, name: &str) -> Card {
        Card {
            id: CardId(id),
            kind,
            value: None,
            name: Some(name.to_owned()),
        }
    }

    fn plain(id: u32, kind: CardKind) -> Card {
        Card {
            id: CardId(id),
            kind,
            value: None,
            name: None,
        }
    }

    fn numeric(id: u32, value: u8) -> Card {
        Card {
            id: CardId(id),
            kind: CardKind::Numeric,
            value: Some(value),
            name: None,
        }
    }

    /// A started game with `n` players and seat 0 (p1) on turn.
    fn game(n: usize) -> GameEngine {
        let mut e = GameEngine::new(RoomId("room".into()), None);
        for i in 1..=n {
            e.add_player(
                pid(&format!("p{i}")),
                format!("Player {i}"),
                cid(&format!("c{i}")),
            )
            .unwrap();
        }
        e.start().unwrap();
        e.current_turn = 0;
        e
    }

    fn trophy_named(e: &GameEngine, name: &str) -> TrophyId {
        e.trophies.iter().find(|t| t.name == name).unwrap().id
    }

    fn act(
        e: &mut GameEngine,
        player: &str,
        kind: ActionKind,
    ) -> Result<(), GameError> {
        e.apply_action(ActionEnvelope {
            player_id: pid(player),
            kind,
        })
    }

    #[test]
    fn test_wake_claims_sleeping_trophy_and_advances() {
        let mut e = game(2);
        e.players[0].hand = vec![named(500, CardKind::Wake, "ember")];
        let target = trophy_named(&e, "Comet");

        act(
            &mut e,
            "p1",
            ActionKind::PlayWake {
                card_id: CardId(500),
                trophy_id: target,
            },
        )
        .unwrap();

        let trophy = e.trophies.get(target).unwrap();
        assert!(trophy.awake);
        assert_eq!(trophy.owner, Some(pid("p1")));
        assert!(e.players[0].owns(target));
        assert!(e.discard_pile.iter().any(|c| c.id == CardId(500)));
        assert_eq!(e.current_turn, 1);
        assert_eq!(e.players[0].hand.len(), HAND_SIZE);
        assert!(e.turn_deadline_ms().is_some());
        assert!(e.ownership_consistent());
    }

    #[test]
    fn test_wake_rejects_awake_target() {
        let mut e = game(2);
        let target = trophy_named(&e, "Comet");
        e.grant_trophy(1, target);
        e.players[0].hand = vec![named(500, CardKind::Wake, "ember")];

        let result = act(
            &mut e,
            "p1",
            ActionKind::PlayWake {
                card_id: CardId(500),
                trophy_id: target,
            },
        );

        assert!(matches!(result, Err(GameError::InvalidTarget)));
        assert_eq!(e.players[0].hand.len(), 1);
        assert_eq!(e.current_turn, 0);
    }

    #[test]
    fn test_aurora_wake_queues_bonus_pick() {
        let mut e = game(2);
        e.players[0].hand = vec![named(500, CardKind::Wake, "aurora")];
        let first = trophy_named(&e, "Comet");
        let second = trophy_named(&e, "Glacier");

        act(
            &mut e,
            "p1",
            ActionKind::PlayWake {
                card_id: CardId(500),
                trophy_id: first,
            },
        )
        .unwrap();

        assert_eq!(
            e.pending_pick,
            Some(PendingPick {
                player_id: pid("p1"),
                picks_remaining: 1,
            })
        );
        // Turn is held open until the pick resolves.
        assert_eq!(e.current_turn, 0);

        // Everyone else is locked out while the pick is pending.
        let blocked_card = e.players[1].hand[0].id;
        let blocked = act(
            &mut e,
            "p2",
            ActionKind::Discard {
                card_ids: vec![blocked_card],
            },
        );
        assert!(matches!(blocked, Err(GameError::PendingPickInProgress)));

        act(
            &mut e,
            "p1",
            ActionKind::ResolvePick { trophy_id: second },
        )
        .unwrap();

        assert!(e.players[0].owns(first));
        assert!(e.players[0].owns(second));
        assert!(e.pending_pick.is_none());
        assert_eq!(e.current_turn, 1);
    }

    #[test]
    fn test_bonus_trophy_queues_extra_pick() {
        let mut e = game(2);
        e.players[0].hand = vec![named(500, CardKind::Wake, "ember")];
        let lotus = trophy_named(&e, BONUS_PICK_TROPHY);

        act(
            &mut e,
            "p1",
            ActionKind::PlayWake {
                card_id: CardId(500),
                trophy_id: lotus,
            },
        )
        .unwrap();

        assert!(e.players[0].owns(lotus));
        assert_eq!(
            e.pending_pick,
            Some(PendingPick {
                player_id: pid("p1"),
                picks_remaining: 1,
            })
        );

        let comet = trophy_named(&e, "Comet");
        act(&mut e, "p1", ActionKind::ResolvePick { trophy_id: comet })
            .unwrap();
        assert!(e.players[0].owns(comet));
        assert!(e.pending_pick.is_none());
        assert_eq!(e.current_turn, 1);
    }

    #[test]
    fn test_raid_blocked_by_ward() {
        let mut e = game(2);
        let target = trophy_named(&e, "Comet");
        e.grant_trophy(1, target);
        e.players[0].hand = vec![named(500, CardKind::Raid, "crimson")];
        e.players[1].hand = vec![plain(501, CardKind::Ward)];

        act(
            &mut e,
            "p1",
            ActionKind::PlayRaid {
                card_id: CardId(500),
                target_player_id: pid("p2"),
                trophy_id: target,
            },
        )
        .unwrap();

        // Trophy stays put, both cards are spent, defender drew one.
        assert_eq!(e.trophies.get(target).unwrap().owner, Some(pid("p2")));
        assert!(e.discard_pile.iter().any(|c| c.id == CardId(500)));
        assert!(e.discard_pile.iter().any(|c| c.id == CardId(501)));
        assert_eq!(e.players[1].hand.len(), 1);
        assert!(e.players[1].hand.iter().all(|c| c.id != CardId(501)));
        assert_eq!(e.current_turn, 1);
    }

    #[test]
    fn test_raid_transfers_trophy_awake() {
        let mut e = game(2);
        let target = trophy_named(&e, "Comet");
        e.grant_trophy(1, target);
        e.players[0].hand = vec![named(500, CardKind::Raid, "crimson")];
        e.players[1].hand.clear();

        act(
            &mut e,
            "p1",
            ActionKind::PlayRaid {
                card_id: CardId(500),
                target_player_id: pid("p2"),
                trophy_id: target,
            },
        )
        .unwrap();

        let trophy = e.trophies.get(target).unwrap();
        assert!(trophy.awake);
        assert_eq!(trophy.owner, Some(pid("p1")));
        assert!(e.players[0].owns(target));
        assert!(!e.players[1].owns(target));
        assert!(e.ownership_consistent());
    }

    #[test]
    fn test_raid_respects_predator_pair() {
        let mut e = game(2);
        let hare = trophy_named(&e, trophies::PREY_TROPHY);
        let hawk = trophy_named(&e, trophies::PREDATOR_TROPHY);
        e.grant_trophy(0, hare);
        e.grant_trophy(1, hawk);
        e.players[0].hand = vec![named(500, CardKind::Raid, "crimson")];
        e.players[1].hand.clear();

        act(
            &mut e,
            "p1",
            ActionKind::PlayRaid {
                card_id: CardId(500),
                target_player_id: pid("p2"),
                trophy_id: hawk,
            },
        )
        .unwrap();

        // Raid is spent but the trophy never moves.
        assert_eq!(e.trophies.get(hawk).unwrap().owner, Some(pid("p2")));
        assert!(e.discard_pile.iter().any(|c| c.id == CardId(500)));
        assert_eq!(e.current_turn, 1);
    }

    #[test]
    fn test_wake_predator_pair_is_silent_noop() {
        let mut e = game(2);
        let hawk = trophy_named(&e, trophies::PREDATOR_TROPHY);
        let hare = trophy_named(&e, trophies::PREY_TROPHY);
        e.grant_trophy(0, hawk);
        e.players[0].hand = vec![named(500, CardKind::Wake, "ember")];

        act(
            &mut e,
            "p1",
            ActionKind::PlayWake {
                card_id: CardId(500),
                trophy_id: hare,
            },
        )
        .unwrap();

        let trophy = e.trophies.get(hare).unwrap();
        assert!(!trophy.awake);
        assert!(trophy.owner.is_none());
        assert!(!e.players[0].owns(hare));
        assert_eq!(e.current_turn, 1);
    }

    #[test]
    fn test_sleep_releases_trophy() {
        let mut e = game(2);
        let target = trophy_named(&e, "Comet");
        e.grant_trophy(1, target);
        e.players[0].hand = vec![plain(500, CardKind::Sleep)];
        e.players[1].hand.clear();

        act(
            &mut e,
            "p1",
            ActionKind::PlaySleep {
                card_id: CardId(500),
                target_player_id: pid("p2"),
                trophy_id: target,
            },
        )
        .unwrap();

        let trophy = e.trophies.get(target).unwrap();
        assert!(!trophy.awake);
        assert!(trophy.owner.is_none());
        assert!(!e.players[1].owns(target));
        assert!(e.ownership_consistent());
    }

    #[test]
    fn test_sleep_blocked_by_counter() {
        let mut e = game(2);
        let target = trophy_named(&e, "Comet");
        e.grant_trophy(1, target);
        e.players[0].hand = vec![plain(500, CardKind::Sleep)];
        e.players[1].hand = vec![plain(501, CardKind::Counter)];

        act(
            &mut e,
            "p1",
            ActionKind::PlaySleep {
                card_id: CardId(500),
                target_player_id: pid("p2"),
                trophy_id: target,
            },
        )
        .unwrap();

        assert_eq!(e.trophies.get(target).unwrap().owner, Some(pid("p2")));
        assert!(e.discard_pile.iter().any(|c| c.id == CardId(501)));
        assert_eq!(e.players[1].hand.len(), 1);
    }

    #[test]
    fn test_invulnerable_trophy_rejects_raid_and_sleep() {
        let mut e = game(2);
        let obsidian = trophy_named(&e, INVULNERABLE_TROPHY);
        e.grant_trophy(1, obsidian);
        e.players[0].hand = vec![
            named(500, CardKind::Raid, "crimson"),
            plain(501, CardKind::Sleep),
        ];

        let raid = act(
            &mut e,
            "p1",
            ActionKind::PlayRaid {
                card_id: CardId(500),
                target_player_id: pid("p2"),
                trophy_id: obsidian,
            },
        );
        assert!(matches!(raid, Err(GameError::InvulnerableTrophy(_))));

        let sleep = act(
            &mut e,
            "p1",
            ActionKind::PlaySleep {
                card_id: CardId(501),
                target_player_id: pid("p2"),
                trophy_id: obsidian,
            },
        );
        assert!(matches!(sleep, Err(GameError::InvulnerableTrophy(_))));

        // Failed plays leave everything untouched.
        assert_eq!(e.players[0].hand.len(), 2);
        assert_eq!(e.current_turn, 0);
        assert_eq!(e.trophies.get(obsidian).unwrap().owner, Some(pid("p2")));
    }

    #[test]
    fn test_wildcard_numeric_delegates_pick_by_seat_offset() {
        let mut e = game(3);
        e.players[0].hand = vec![plain(500, CardKind::Wildcard)];
        e.draw_pile.place_on_top(numeric(501, 3));

        act(
            &mut e,
            "p1",
            ActionKind::PlayWildcard {
                card_id: CardId(500),
            },
        )
        .unwrap();

        // Seat (0 + 3 - 1) % 3 = 2, so p3 picks.
        assert_eq!(
            e.pending_pick,
            Some(PendingPick {
                player_id: pid("p3"),
                picks_remaining: 1,
            })
        );
        assert!(e.discard_pile.iter().any(|c| c.id == CardId(500)));
        assert!(e.discard_pile.iter().any(|c| c.id == CardId(501)));

        let comet = trophy_named(&e, "Comet");
        act(&mut e, "p3", ActionKind::ResolvePick { trophy_id: comet })
            .unwrap();

        assert!(e.players[2].owns(comet));
        assert!(e.pending_pick.is_none());
        // The wildcard player's turn ends, not the picker's.
        assert_eq!(e.current_turn, 1);
    }

    #[test]
    fn test_wildcard_non_numeric_is_kept_and_turn_continues() {
        let mut e = game(2);
        e.players[0].hand = vec![plain(500, CardKind::Wildcard)];
        e.draw_pile.place_on_top(plain(501, CardKind::Ward));

        act(
            &mut e,
            "p1",
            ActionKind::PlayWildcard {
                card_id: CardId(500),
            },
        )
        .unwrap();

        assert!(e.players[0].hand.iter().any(|c| c.id == CardId(501)));
        assert!(e.pending_pick.is_none());
        assert_eq!(e.current_turn, 0);
    }

    #[test]
    fn test_discard_rejects_odd_sum_multi() {
        let mut e = game(2);
        e.players[0].hand =
            vec![numeric(500, 2), numeric(501, 3), numeric(502, 6)];

        let result = act(
            &mut e,
            "p1",
            ActionKind::Discard {
                card_ids: vec![CardId(500), CardId(501), CardId(502)],
            },
        );

        assert!(matches!(result, Err(GameError::InvalidDiscard)));
        assert_eq!(e.players[0].hand.len(), 3);
        assert_eq!(e.current_turn, 0);
    }

    #[test]
    fn test_discard_accepts_even_split() {
        let mut e = game(2);
        e.players[0].hand =
            vec![numeric(500, 2), numeric(501, 3), numeric(502, 5)];

        act(
            &mut e,
            "p1",
            ActionKind::Discard {
                card_ids: vec![CardId(500), CardId(501), CardId(502)],
            },
        )
        .unwrap();

        assert_eq!(e.players[0].hand.len(), HAND_SIZE);
        assert!(e.players[0].hand.iter().all(|c| c.id.0 < 500));
        assert_eq!(e.current_turn, 1);
    }

    #[test]
    fn test_single_card_discard_always_legal() {
        let mut e = game(2);
        e.players[0].hand = vec![plain(500, CardKind::Ward)];

        act(
            &mut e,
            "p1",
            ActionKind::Discard {
                card_ids: vec![CardId(500)],
            },
        )
        .unwrap();
        assert_eq!(e.current_turn, 1);
        assert_eq!(e.players[0].hand.len(), HAND_SIZE);
    }

    #[test]
    fn test_discard_rejects_duplicate_ids() {
        let mut e = game(2);
        e.players[0].hand = vec![numeric(500, 5)];

        let result = act(
            &mut e,
            "p1",
            ActionKind::Discard {
                card_ids: vec![CardId(500), CardId(500)],
            },
        );
        assert!(matches!(result, Err(GameError::InvalidDiscard)));
        assert_eq!(e.players[0].hand.len(), 1);
    }

    #[test]
    fn test_out_of_turn_action_rejected() {
        let mut e = game(2);
        let card = e.players[1].hand[0].id;

        let result = act(
            &mut e,
            "p2",
            ActionKind::Discard {
                card_ids: vec![card],
            },
        );
        assert!(matches!(result, Err(GameError::NotYourTurn)));
    }

    #[test]
    fn test_resolve_pick_without_pending() {
        let mut e = game(2);
        let comet = trophy_named(&e, "Comet");

        let result =
            act(&mut e, "p1", ActionKind::ResolvePick { trophy_id: comet });
        assert!(matches!(result, Err(GameError::NoPendingPick)));
    }

    #[test]
    fn test_expire_turn_clears_pending_and_advances_once() {
        let mut e = game(2);
        e.pending_pick = Some(PendingPick {
            player_id: pid("p2"),
            picks_remaining: 1,
        });

        e.expire_turn();

        assert!(e.pending_pick.is_none());
        assert_eq!(e.current_turn, 1);
        assert!(e.turn_deadline_ms().is_some());
    }

    #[test]
    fn test_turn_order_skips_disconnected() {
        let mut e = game(3);
        e.players[1].connected = false;
        e.players[0].hand = vec![plain(500, CardKind::Ward)];

        act(
            &mut e,
            "p1",
            ActionKind::Discard {
                card_ids: vec![CardId(500)],
            },
        )
        .unwrap();
        assert_eq!(e.current_turn, 2);
    }

    #[test]
    fn test_win_on_point_threshold_two_players() {
        let mut e = game(2);
        for name in ["Comet", "Hawk", "Glacier"] {
            let t = trophy_named(&e, name);
            e.grant_trophy(0, t);
        }
        let card = e.players[0].hand[0].id;

        act(
            &mut e,
            "p1",
            ActionKind::Discard {
                card_ids: vec![card],
            },
        )
        .unwrap();

        assert_eq!(e.winner(), Some(&pid("p1")));
        assert_eq!(e.status(), RoomStatus::Finished);
        assert!(e.turn_deadline_ms().is_none());

        // Finished game rejects further actions.
        let card = e.players[1].hand[0].id;
        let late = act(
            &mut e,
            "p2",
            ActionKind::Discard {
                card_ids: vec![card],
            },
        );
        assert!(matches!(late, Err(GameError::GameNotInProgress)));
    }

    #[test]
    fn test_win_on_trophy_count_four_players() {
        let mut e = game(4);
        // Four five-point trophies: 20 points, under the 40 threshold.
        for name in ["Lotus", "Ember", "Willow", "Pebble"] {
            let t = trophy_named(&e, name);
            e.grant_trophy(0, t);
        }
        let card = e.players[0].hand[0].id;

        act(
            &mut e,
            "p1",
            ActionKind::Discard {
                card_ids: vec![card],
            },
        )
        .unwrap();

        assert_eq!(e.winner(), Some(&pid("p1")));
        assert_eq!(e.status(), RoomStatus::Finished);
    }

    #[test]
    fn test_mid_game_departure_returns_cards_and_trophies() {
        let mut e = game(3);
        let comet = trophy_named(&e, "Comet");
        e.grant_trophy(2, comet);
        assert_eq!(e.total_cards(), DECK_SIZE);

        e.remove_player(&pid("p3"));

        assert_eq!(e.status(), RoomStatus::Playing);
        assert_eq!(e.player_count(), 2);
        // The departing hand lands in the discard pile.
        assert_eq!(e.total_cards(), DECK_SIZE);
        assert_eq!(e.discard_pile.len(), HAND_SIZE);
        // Their trophies go back to the pool and stay targetable.
        let trophy = e.trophies.get(comet).unwrap();
        assert!(!trophy.awake);
        assert!(trophy.owner.is_none());
        assert!(e.ownership_consistent());
    }

    #[test]
    fn test_departure_before_current_seat_keeps_turn() {
        let mut e = game(3);
        e.current_turn = 2;

        e.remove_player(&pid("p1"));

        // p3 shifted down one seat; it is still their turn.
        assert_eq!(e.current_turn, 1);
        assert_eq!(e.current_turn_player_id(), Some(pid("p3")));
    }

    #[test]
    fn test_all_trophies_awake_highest_score_earliest_seat_wins() {
        let mut e = game(3);
        // p1 and p2 tie at 30 points, p3 trails at 20; nobody reaches
        // the 50-point or 5-trophy threshold.
        for name in ["Comet", "Meadow"] {
            let t = trophy_named(&e, name);
            e.grant_trophy(0, t);
        }
        for name in ["Hawk", "Glacier"] {
            let t = trophy_named(&e, name);
            e.grant_trophy(1, t);
        }
        for name in ["Tide", "Harbor"] {
            let t = trophy_named(&e, name);
            e.grant_trophy(2, t);
        }
        // The remainder of the pool is awake under an id no longer
        // seated, so the pool is exhausted without a threshold winner.
        for id in e.trophies.sleeping_ids() {
            let t = e.trophies.get_mut(id).unwrap();
            t.awake = true;
            t.owner = Some(pid("p9"));
        }

        e.check_win();

        // Earliest-seated of the tied top scorers takes it.
        assert_eq!(e.winner(), Some(&pid("p1")));
        assert_eq!(e.status(), RoomStatus::Finished);
        assert!(e.turn_deadline_ms().is_none());
    }

    #[test]
    fn test_remove_player_reassigns_host() {
        let mut e = GameEngine::new(RoomId("room".into()), None);
        for i in 1..=3 {
            e.add_player(
                pid(&format!("p{i}")),
                format!("Player {i}"),
                cid(&format!("c{i}")),
            )
            .unwrap();
        }
        assert_eq!(e.host_id(), Some(&pid("p1")));

        e.remove_player(&pid("p1"));
        assert_eq!(e.host_id(), Some(&pid("p2")));
        assert_eq!(e.player_count(), 2);
    }

    #[test]
    fn test_playing_room_below_minimum_resets_to_lobby() {
        let mut e = game(2);
        e.remove_player(&pid("p2"));

        assert_eq!(e.status(), RoomStatus::Lobby);
        assert!(e.players[0].hand.is_empty());
        assert!(e.players[0].trophies.is_empty());
        assert!(e.turn_deadline_ms().is_none());
        assert_eq!(e.draw_pile.len(), DECK_SIZE);
    }

    #[test]
    fn test_reconnect_rebinds_and_rearms_deadline() {
        let mut e = game(2);
        e.mark_disconnected(&cid("c1"));
        assert!(!e.players[0].connected);
        e.clear_turn_deadline();

        e.mark_reconnected(&pid("p1"), cid("c9"));

        assert!(e.players[0].connected);
        assert_eq!(e.players[0].connection_id, cid("c9"));
        assert!(e.turn_deadline_ms().is_some());
        // Hand and trophies survive the disconnect cycle.
        assert_eq!(e.players[0].hand.len(), HAND_SIZE);
    }

    #[test]
    fn test_lobby_gates() {
        let mut e = GameEngine::new(RoomId("room".into()), None);
        assert!(matches!(e.start(), Err(GameError::NotEnoughPlayers)));

        for i in 1..=5 {
            e.add_player(
                pid(&format!("p{i}")),
                format!("Player {i}"),
                cid(&format!("c{i}")),
            )
            .unwrap();
        }
        let full = e.add_player(pid("p6"), "Player 6".into(), cid("c6"));
        assert!(matches!(full, Err(GameError::RoomFull)));

        e.start().unwrap();
        let late = e.add_player(pid("p7"), "Player 7".into(), cid("c7"));
        assert!(matches!(late, Err(GameError::GameAlreadyStarted)));
    }

    #[test]
    fn test_update_settings_host_only_and_clamped() {
        let mut e = game(2);

        let denied = e.update_settings(
            &pid("p2"),
            SettingsUpdate {
                turn_time_limit_secs: 10,
            },
        );
        assert!(matches!(denied, Err(GameError::NotHost)));

        e.update_settings(
            &pid("p1"),
            SettingsUpdate {
                turn_time_limit_secs: 10,
            },
        )
        .unwrap();
        assert_eq!(e.turn_duration(), Duration::from_secs(10));

        e.update_settings(
            &pid("p1"),
            SettingsUpdate {
                turn_time_limit_secs: 500,
            },
        )
        .unwrap();
        assert_eq!(e.turn_duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_snapshot_reflects_started_game() {
        let e = game(2);
        let snap = e.snapshot();

        assert_eq!(snap.status, RoomStatus::Playing);
        assert_eq!(snap.host_id, Some(pid("p1")));
        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.current_turn_player_id, Some(pid("p1")));
        assert_eq!(snap.draw_pile_count, DECK_SIZE - 2 * HAND_SIZE);
        assert_eq!(snap.trophies.len(), crate::trophies::TROPHY_COUNT);
        assert_eq!(snap.turn_time_limit_secs, 60);
        assert!(snap.turn_deadline_ms.is_some());
    }

    #[test]
    fn test_last_action_enriched_with_names() {
        let mut e = game(2);
        e.players[0].hand = vec![named(500, CardKind::Wake, "ember")];
        let target = trophy_named(&e, "Comet");

        act(
            &mut e,
            "p1",
            ActionKind::PlayWake {
                card_id: CardId(500),
                trophy_id: target,
            },
        )
        .unwrap();

        match e.last_action {
            Some(LastAction::CardPlayed {
                ref player_id,
                kind,
                ref card_name,
                ref trophy_name,
                ..
            }) => {
                assert_eq!(player_id, &pid("p1"));
                assert_eq!(kind, CardKind::Wake);
                assert_eq!(card_name.as_deref(), Some("ember"));
                assert_eq!(trophy_name.as_deref(), Some("Comet"));
            }
            ref other => panic!("unexpected last action: {other:?}"),
        }
    }

    #[test]
    fn test_can_split_evenly_pairs_and_sums() {
        assert!(can_split_evenly(&[5, 5]));
        assert!(can_split_evenly(&[2, 3, 5]));
        assert!(can_split_evenly(&[3, 4, 5, 6])); // 3+6 = 4+5
        assert!(can_split_evenly(&[1, 2, 3])); // 1+2 = 3
    }

    #[test]
    fn test_can_split_evenly_rejects() {
        assert!(!can_split_evenly(&[2, 3, 6])); // odd total
        assert!(!can_split_evenly(&[2, 4])); // even total, no split
    }

    #[test]
    fn test_can_split_evenly_even_total_without_partition() {
        // total 10, target 5, unreachable from {2, 8}
        assert!(!can_split_evenly(&[2, 8]));
        // total 6, target 3, reachable sums are 1, 2, 4, 5, 6
        assert!(!can_split_evenly(&[1, 1, 4]));
    }

    #[test]
    fn test_new_engine_is_fresh_lobby() {
        let engine = GameEngine::new(RoomId("room1".into()), None);
        assert_eq!(engine.status(), RoomStatus::Lobby);
        assert_eq!(engine.total_cards(), DECK_SIZE);
        assert_eq!(engine.turn_duration(), Duration::from_secs(60));
        assert!(engine.turn_deadline_ms().is_none());
    }

    #[test]
    fn test_options_clamp_turn_limit() {
        let engine = GameEngine::new(
            RoomId("room1".into()),
            Some(SettingsUpdate {
                turn_time_limit_secs: 2,
            }),
        );
        assert_eq!(engine.turn_duration(), Duration::from_secs(5));

        let engine = GameEngine::new(
            RoomId("room2".into()),
            Some(SettingsUpdate {
                turn_time_limit_secs: 600,
            }),
        );
        assert_eq!(engine.turn_duration(), Duration::from_secs(60));
    }
}
