//! One seat at the table: hand, owned trophies, and liveness.

use trove_protocol::{Card, CardId, CardKind, ConnectionId, PlayerId, PlayerView, TrophyId};

use crate::trophies::TrophyPool;

/// A participant bound to a stable identity and an ephemeral connection.
///
/// Disconnects flip `connected` without touching hand, seat, or trophy
/// ownership; a reconnect rebinds `connection_id` and flips it back.
#[derive(Debug)]
pub struct PlayerSession {
    pub id: PlayerId,
    pub name: String,
    pub connection_id: ConnectionId,
    pub hand: Vec<Card>,
    /// Index of owned trophies. Maintained only through the engine's
    /// grant/release path, mirroring the `owner` field on each trophy.
    pub trophies: Vec<TrophyId>,
    pub connected: bool,
}

impl PlayerSession {
    pub fn new(id: PlayerId, name: String, connection_id: ConnectionId) -> Self {
        Self {
            id,
            name,
            connection_id,
            hand: Vec::new(),
            trophies: Vec::new(),
            connected: true,
        }
    }

    pub fn add_card(&mut self, card: Card) {
        self.hand.push(card);
    }

    /// Removes and returns the named card, if held.
    pub fn remove_card(&mut self, card_id: CardId) -> Option<Card> {
        let idx = self.hand.iter().position(|c| c.id == card_id)?;
        Some(self.hand.remove(idx))
    }

    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.hand.iter().find(|c| c.id == card_id)
    }

    /// First held card of the given kind (reaction-card lookup).
    pub fn first_of_kind(&self, kind: CardKind) -> Option<CardId> {
        self.hand.iter().find(|c| c.kind == kind).map(|c| c.id)
    }

    pub fn owns(&self, trophy_id: TrophyId) -> bool {
        self.trophies.contains(&trophy_id)
    }

    /// Derived score: sum of owned trophies' point values. Never stored.
    pub fn score(&self, pool: &TrophyPool) -> u32 {
        self.trophies.iter().map(|&id| pool.points_of(id)).sum()
    }

    pub fn view(&self, pool: &TrophyPool) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            name: self.name.clone(),
            hand: self.hand.clone(),
            trophies: self.trophies.clone(),
            score: self.score(pool),
            connected: self.connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: u32, kind: CardKind) -> Card {
        Card {
            id: CardId(id),
            kind,
            value: None,
            name: None,
        }
    }

    fn session() -> PlayerSession {
        PlayerSession::new(
            PlayerId("p1".into()),
            "Ada".into(),
            ConnectionId("c1".into()),
        )
    }

    #[test]
    fn test_remove_card_returns_it_once() {
        let mut p = session();
        p.add_card(card(1, CardKind::Ward));
        p.add_card(card(2, CardKind::Sleep));

        let removed = p.remove_card(CardId(1)).unwrap();
        assert_eq!(removed.id, CardId(1));
        assert!(p.remove_card(CardId(1)).is_none());
        assert_eq!(p.hand.len(), 1);
    }

    #[test]
    fn test_first_of_kind_finds_reaction_card() {
        let mut p = session();
        p.add_card(card(1, CardKind::Sleep));
        p.add_card(card(2, CardKind::Ward));
        p.add_card(card(3, CardKind::Ward));

        assert_eq!(p.first_of_kind(CardKind::Ward), Some(CardId(2)));
        assert_eq!(p.first_of_kind(CardKind::Counter), None);
    }

    #[test]
    fn test_score_derives_from_pool() {
        let pool = TrophyPool::shuffled();
        let mut p = session();
        assert_eq!(p.score(&pool), 0);

        let comet = pool.iter().find(|t| t.name == "Comet").unwrap().id;
        p.trophies.push(comet);
        assert_eq!(p.score(&pool), 20);
    }
}
