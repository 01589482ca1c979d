//! The card supply: an immutable catalog of archetypes and the mutable
//! draw pile built from it.
//!
//! Catalog composition (67 cards total):
//! - 8 wake cards, one named variant each
//! - 4 raid cards, one named variant each
//! - 3 ward cards (block raids)
//! - 4 sleep cards
//! - 3 counter cards (block sleeps)
//! - 5 wildcards
//! - 40 numeric cards, four of each value 1–10

use rand::seq::SliceRandom;
use trove_protocol::{Card, CardId, CardKind};

/// Total cards in a fresh supply. Conserved across draw pile, discard
/// pile, and all hands for the lifetime of a playing room.
pub const DECK_SIZE: usize = 67;

/// Cards dealt to, and refilled up to, each hand.
pub const HAND_SIZE: usize = 5;

/// The wake variant that grants one extra pending pick when another
/// trophy is still asleep.
pub const BONUS_PICK_WAKE_VARIANT: &str = "aurora";

const WAKE_VARIANTS: [&str; 8] = [
    "aurora", "ember", "frost", "garland", "harlequin", "meridian",
    "onyx", "saffron",
];

const RAID_VARIANTS: [&str; 4] = ["amber", "cobalt", "crimson", "jade"];

/// The face-down draw pile.
///
/// Draws come off the top (`Vec` tail). When it runs dry the engine
/// recycles the discard pile back in via [`DrawPile::recycle`].
#[derive(Debug)]
pub struct DrawPile {
    cards: Vec<Card>,
}

impl DrawPile {
    /// Builds the full 67-card supply, shuffled, with sequential ids.
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        let mut next_id = 0u32;
        let mut push = |kind: CardKind, name: Option<&str>, value: Option<u8>| {
            cards.push(Card {
                id: CardId(next_id),
                kind,
                value,
                name: name.map(str::to_owned),
            });
            next_id += 1;
        };

        for variant in WAKE_VARIANTS {
            push(CardKind::Wake, Some(variant), None);
        }
        for variant in RAID_VARIANTS {
            push(CardKind::Raid, Some(variant), None);
        }
        for _ in 0..3 {
            push(CardKind::Ward, None, None);
        }
        for _ in 0..4 {
            push(CardKind::Sleep, None, None);
        }
        for _ in 0..3 {
            push(CardKind::Counter, None, None);
        }
        for _ in 0..5 {
            push(CardKind::Wildcard, None, None);
        }
        for value in 1..=10u8 {
            for _ in 0..4 {
                push(CardKind::Numeric, None, Some(value));
            }
        }

        let mut pile = Self { cards };
        pile.shuffle();
        pile
    }

    /// Randomizes the draw order in place.
    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
    }

    /// Takes the top card, or `None` when the pile is empty.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Returns discarded cards to the pile and reshuffles.
    pub fn recycle(&mut self, cards: Vec<Card>) {
        self.cards.extend(cards);
        self.shuffle();
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Places a card on top of the pile, so it is drawn next.
    #[cfg(test)]
    pub(crate) fn place_on_top(&mut self, card: Card) {
        self.cards.push(card);
    }
}
