//! The trophy pool: sixteen fixed scoreable objects.
//!
//! Ownership lives on the trophy record itself; each player session
//! keeps an index of owned ids. Both sides are mutated only through the
//! engine's single grant/release path, never independently.

use rand::seq::SliceRandom;
use trove_protocol::{PlayerId, Trophy, TrophyId};

/// Number of trophies in every room.
pub const TROPHY_COUNT: usize = 16;

/// One half of the predator pair. No player may own both
/// [`PREDATOR_TROPHY`] and [`PREY_TROPHY`] at once.
pub const PREDATOR_TROPHY: &str = "Hawk";

/// The other half of the predator pair.
pub const PREY_TROPHY: &str = "Hare";

/// Immune to raid and sleep effects.
pub const INVULNERABLE_TROPHY: &str = "Obsidian";

/// Waking this trophy grants one extra pending pick if any other trophy
/// still sleeps.
pub const BONUS_PICK_TROPHY: &str = "Lotus";

const TROPHY_TABLE: [(&str, u8); TROPHY_COUNT] = [
    ("Comet", 20),
    ("Hawk", 15),
    ("Hare", 15),
    ("Glacier", 15),
    ("Thunder", 15),
    ("Obsidian", 10),
    ("Meadow", 10),
    ("Harbor", 10),
    ("Lantern", 10),
    ("Tide", 10),
    ("Canyon", 10),
    ("Lotus", 5),
    ("Ember", 5),
    ("Willow", 5),
    ("Pebble", 5),
    ("Drift", 5),
];

/// The sixteen trophies of one room, shuffled once at creation.
#[derive(Debug)]
pub struct TrophyPool {
    trophies: Vec<Trophy>,
}

impl TrophyPool {
    /// Builds a fresh, fully asleep pool in random display order.
    pub fn shuffled() -> Self {
        let mut trophies: Vec<Trophy> = TROPHY_TABLE
            .iter()
            .enumerate()
            .map(|(i, (name, points))| Trophy {
                id: TrophyId(i as u32),
                name: (*name).to_owned(),
                points: *points,
                awake: false,
                owner: None,
            })
            .collect();
        trophies.shuffle(&mut rand::rng());
        Self { trophies }
    }

    pub fn get(&self, id: TrophyId) -> Option<&Trophy> {
        self.trophies.iter().find(|t| t.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: TrophyId) -> Option<&mut Trophy> {
        self.trophies.iter_mut().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trophy> {
        self.trophies.iter()
    }

    /// Points of the given trophy, 0 if unknown.
    pub fn points_of(&self, id: TrophyId) -> u32 {
        self.get(id).map_or(0, |t| u32::from(t.points))
    }

    /// `true` once every trophy has been claimed.
    pub fn all_awake(&self) -> bool {
        self.trophies.iter().all(|t| t.awake)
    }

    /// `true` if any trophy other than `except` is still asleep.
    pub fn any_sleeping_except(&self, except: TrophyId) -> bool {
        self.trophies.iter().any(|t| !t.awake && t.id != except)
    }

    /// Ids of all currently sleeping trophies.
    pub fn sleeping_ids(&self) -> Vec<TrophyId> {
        self.trophies
            .iter()
            .filter(|t| !t.awake)
            .map(|t| t.id)
            .collect()
    }

    /// A clone of the full list, for snapshots.
    pub fn to_vec(&self) -> Vec<Trophy> {
        self.trophies.clone()
    }

    /// Checks the invariant `awake == owner.is_some()` across the pool.
    pub fn ownership_consistent(&self) -> bool {
        self.trophies.iter().all(|t| t.awake == t.owner.is_some())
    }

    /// `true` if `owner` currently owns a trophy with the given name.
    pub fn owner_has_named(&self, owner: &PlayerId, name: &str) -> bool {
        self.trophies
            .iter()
            .any(|t| t.name == name && t.owner.as_ref() == Some(owner))
    }
}

/// `true` if claiming `candidate` would give a player both halves of
/// the predator pair.
pub(crate) fn predator_conflict(
    pool: &TrophyPool,
    claimant: &PlayerId,
    candidate: &str,
) -> bool {
    (candidate == PREDATOR_TROPHY && pool.owner_has_named(claimant, PREY_TROPHY))
        || (candidate == PREY_TROPHY
            && pool.owner_has_named(claimant, PREDATOR_TROPHY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_has_sixteen_sleeping_trophies() {
        let pool = TrophyPool::shuffled();
        assert_eq!(pool.iter().count(), TROPHY_COUNT);
        assert!(pool.iter().all(|t| !t.awake && t.owner.is_none()));
        assert!(pool.ownership_consistent());
    }

    #[test]
    fn test_point_total_and_special_trophies_present() {
        let pool = TrophyPool::shuffled();
        let total: u32 = pool.iter().map(|t| u32::from(t.points)).sum();
        assert_eq!(total, 165);
        for name in [
            PREDATOR_TROPHY,
            PREY_TROPHY,
            INVULNERABLE_TROPHY,
            BONUS_PICK_TROPHY,
        ] {
            assert!(pool.iter().any(|t| t.name == name), "{name} missing");
        }
    }

    #[test]
    fn test_predator_conflict_detection() {
        let mut pool = TrophyPool::shuffled();
        let p1 = PlayerId("p1".into());

        let hare_id = pool.iter().find(|t| t.name == PREY_TROPHY).unwrap().id;
        {
            let hare = pool.get_mut(hare_id).unwrap();
            hare.awake = true;
            hare.owner = Some(p1.clone());
        }

        assert!(predator_conflict(&pool, &p1, PREDATOR_TROPHY));
        assert!(!predator_conflict(&pool, &p1, "Comet"));
        assert!(!predator_conflict(
            &pool,
            &PlayerId("p2".into()),
            PREDATOR_TROPHY
        ));
    }

    #[test]
    fn test_any_sleeping_except() {
        let mut pool = TrophyPool::shuffled();
        let ids: Vec<TrophyId> = pool.iter().map(|t| t.id).collect();

        // Wake all but one.
        for &id in &ids[1..] {
            let t = pool.get_mut(id).unwrap();
            t.awake = true;
            t.owner = Some(PlayerId("p1".into()));
        }
        assert!(!pool.any_sleeping_except(ids[0]));
        assert!(pool.any_sleeping_except(ids[1]));
        assert!(!pool.all_awake());
    }
}
