use duel_core::*;
use std::collections::HashMap;

/// Local rating plus a cache of opponent ratings.
/// Opponents read as [`DEFAULT_RATING`] until their rating has been fetched.
#[derive(Debug, Clone)]
pub struct RatingBook {
    local: Rating,
    opponents: HashMap<ID<Player>, Rating>,
}

impl RatingBook {
    pub fn new(local: Rating) -> Self {
        Self {
            local,
            opponents: HashMap::new(),
        }
    }
    pub fn local(&self) -> Rating {
        self.local
    }
    pub fn set_local(&mut self, rating: Rating) {
        self.local = rating;
    }
    pub fn opponent(&self, id: ID<Player>) -> Rating {
        self.opponents.get(&id).copied().unwrap_or(DEFAULT_RATING)
    }
    pub fn is_known(&self, id: ID<Player>) -> bool {
        self.opponents.contains_key(&id)
    }
    pub fn remember(&mut self, id: ID<Player>, rating: Rating) {
        log::trace!("[rating] cached {} at {}", id, rating);
        self.opponents.insert(id, rating);
    }
}

impl Default for RatingBook {
    fn default() -> Self {
        Self::new(DEFAULT_RATING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn unknown_opponents_read_default() {
        let mut book = RatingBook::default();
        let id = ID::default();
        assert_eq!(book.opponent(id), DEFAULT_RATING);
        assert!(!book.is_known(id));
        book.remember(id, 1730);
        assert_eq!(book.opponent(id), 1730);
        assert!(book.is_known(id));
    }
}
