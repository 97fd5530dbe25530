//! Numeric rating lookup and persistence.
//!
//! The actual storage backend (database schema and all) is an external
//! collaborator; the room only needs lookup-or-create at join and an
//! atomic all-or-nothing apply at game end. The in-memory implementation
//! is the reference and serves tests and the demo binary.

use std::collections::HashMap;

use thiserror::Error;
use tiltball_shared::protocol::RatingChange;
use tiltball_shared::PlayerId;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("unknown player \"{0}\"")]
    UnknownPlayer(PlayerId),
    #[error("rating store unavailable: {0}")]
    Unavailable(String),
}

pub trait RatingStore: Send {
    /// Look up a player's rating, creating the record on first sight.
    fn ensure(&mut self, player_id: &PlayerId) -> Result<u32, RatingError>;

    /// Persist a batch of rating updates. Either every change is applied
    /// or none is.
    fn apply(&mut self, changes: &HashMap<PlayerId, RatingChange>) -> Result<(), RatingError>;
}

pub struct MemoryRatingStore {
    ratings: HashMap<PlayerId, u32>,
    default_rating: u32,
}

impl MemoryRatingStore {
    pub fn new(default_rating: u32) -> Self {
        Self {
            ratings: HashMap::new(),
            default_rating,
        }
    }

    pub fn rating(&self, player_id: &PlayerId) -> Option<u32> {
        self.ratings.get(player_id).copied()
    }
}

impl RatingStore for MemoryRatingStore {
    fn ensure(&mut self, player_id: &PlayerId) -> Result<u32, RatingError> {
        Ok(*self
            .ratings
            .entry(player_id.clone())
            .or_insert(self.default_rating))
    }

    fn apply(&mut self, changes: &HashMap<PlayerId, RatingChange>) -> Result<(), RatingError> {
        // Validate the whole batch before touching anything.
        for player_id in changes.keys() {
            if !self.ratings.contains_key(player_id) {
                return Err(RatingError::UnknownPlayer(player_id.clone()));
            }
        }
        for (player_id, change) in changes {
            self.ratings.insert(player_id.clone(), change.rating);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(rating: u32, change: i32) -> RatingChange {
        RatingChange { change, rating }
    }

    #[test]
    fn ensure_creates_with_default_rating() {
        let mut store = MemoryRatingStore::new(1000);
        assert_eq!(store.ensure(&"7".to_string()).unwrap(), 1000);
        assert_eq!(store.rating(&"7".to_string()), Some(1000));
    }

    #[test]
    fn apply_updates_every_player() {
        let mut store = MemoryRatingStore::new(1000);
        store.ensure(&"1".to_string()).unwrap();
        store.ensure(&"2".to_string()).unwrap();

        let mut changes = HashMap::new();
        changes.insert("1".to_string(), change(1010, 10));
        changes.insert("2".to_string(), change(990, -10));
        store.apply(&changes).unwrap();

        assert_eq!(store.rating(&"1".to_string()), Some(1010));
        assert_eq!(store.rating(&"2".to_string()), Some(990));
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut store = MemoryRatingStore::new(1000);
        store.ensure(&"1".to_string()).unwrap();

        let mut changes = HashMap::new();
        changes.insert("1".to_string(), change(1010, 10));
        changes.insert("stranger".to_string(), change(990, -10));

        assert!(store.apply(&changes).is_err());
        assert_eq!(
            store.rating(&"1".to_string()),
            Some(1000),
            "partial apply must not happen"
        );
    }
}
