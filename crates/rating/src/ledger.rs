use super::*;
use duel_core::*;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct Entries {
    rating: Rating,
    rated: BTreeSet<ID<Match>>,
    tallied: BTreeSet<ID<Match>>,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            rating: DEFAULT_RATING,
            rated: BTreeSet::new(),
            tallied: BTreeSet::new(),
        }
    }
}

/// Durable local state: this device's rating and the two append-only sets
/// of matches already folded into the rating and into head-to-head records.
///
/// Every mutation is flushed before it is reported, so a crash can at worst
/// repeat a remote write that is itself idempotent, never a rating update.
#[derive(Debug)]
pub struct Ledger {
    path: Option<PathBuf>,
    entries: Entries,
}

impl Ledger {
    /// A ledger that lives only as long as the process.
    pub fn memory() -> Self {
        Self {
            path: None,
            entries: Entries::default(),
        }
    }
    /// Loads the ledger at `path`, starting fresh if the file is absent or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!("[ledger] discarding unreadable {}: {}", path.display(), e);
                Entries::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::default(),
            Err(e) => return Err(e),
        };
        log::debug!(
            "[ledger] opened {} at rating {}",
            path.display(),
            entries.rating
        );
        Ok(Self {
            path: Some(path),
            entries,
        })
    }
    pub fn rating(&self) -> Rating {
        self.entries.rating
    }
    pub fn is_rated(&self, id: ID<Match>) -> bool {
        self.entries.rated.contains(&id)
    }
    pub fn is_tallied(&self, id: ID<Match>) -> bool {
        self.entries.tallied.contains(&id)
    }
    /// Applies this device's Elo update for an ended match, once.
    /// Returns the new rating, or `None` if the match was already rated.
    pub fn rate(
        &mut self,
        id: ID<Match>,
        opponent: Rating,
        score: Score,
        k: f64,
    ) -> std::io::Result<Option<Rating>> {
        if self.is_rated(id) {
            return Ok(None);
        }
        let before = self.entries.rating;
        let after = Elo::updated(before, opponent, score, k);
        let mut next = self.entries.clone();
        next.rating = after;
        next.rated.insert(id);
        self.commit(next)?;
        log::info!("[ledger] {} vs {}: {} -> {}", score, opponent, before, after);
        Ok(Some(after))
    }
    /// Records that a match has been folded into its head-to-head record.
    /// Returns false if it already had been.
    pub fn tally(&mut self, id: ID<Match>) -> std::io::Result<bool> {
        if self.is_tallied(id) {
            return Ok(false);
        }
        let mut next = self.entries.clone();
        next.tallied.insert(id);
        self.commit(next).map(|_| true)
    }
    /// Flushes `next`, then adopts it. A failed flush leaves memory untouched.
    fn commit(&mut self, next: Entries) -> std::io::Result<()> {
        self.save(&next)?;
        self.entries = next;
        Ok(())
    }
    fn save(&self, entries: &Entries) -> std::io::Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let bytes = serde_json::to_vec_pretty(entries).map_err(std::io::Error::other)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> PathBuf {
        std::env::temp_dir()
            .join(format!("duel-ledger-{}", uuid::Uuid::now_v7()))
            .join("ledger.json")
    }

    #[test]
    fn rates_each_match_once() {
        let mut ledger = Ledger::memory();
        let id = ID::default();
        assert_eq!(ledger.rate(id, 1500, Score::Win, 32.0).unwrap(), Some(1516));
        assert_eq!(ledger.rate(id, 1500, Score::Win, 32.0).unwrap(), None);
        assert_eq!(ledger.rating(), 1516);
    }
    #[test]
    fn tallies_each_match_once() {
        let mut ledger = Ledger::memory();
        let id = ID::default();
        assert!(ledger.tally(id).unwrap());
        assert!(!ledger.tally(id).unwrap());
        assert!(ledger.is_tallied(id));
        assert!(!ledger.is_rated(id));
    }
    #[test]
    fn survives_restart() {
        let path = scratch();
        let id = ID::default();
        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger.rate(id, 1500, Score::Loss, 32.0).unwrap();
            ledger.tally(id).unwrap();
        }
        let mut ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.rating(), 1484);
        assert!(ledger.is_rated(id));
        assert!(ledger.is_tallied(id));
        assert_eq!(ledger.rate(id, 1500, Score::Loss, 32.0).unwrap(), None);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
    #[test]
    fn failed_flush_changes_nothing() {
        let path = scratch();
        let mut ledger = Ledger::open(&path).unwrap();
        let blocker = path.parent().unwrap();
        std::fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        std::fs::write(blocker, b"in the way").unwrap();
        let id = ID::default();
        assert!(ledger.rate(id, 1500, Score::Win, 32.0).is_err());
        assert!(ledger.tally(id).is_err());
        assert_eq!(ledger.rating(), DEFAULT_RATING);
        assert!(!ledger.is_rated(id));
        assert!(!ledger.is_tallied(id));
        std::fs::remove_file(blocker).unwrap();
        assert_eq!(ledger.rate(id, 1500, Score::Win, 32.0).unwrap(), Some(1516));
        let _ = std::fs::remove_dir_all(blocker);
    }
    #[test]
    fn unreadable_file_starts_fresh() {
        let path = scratch();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();
        let ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.rating(), DEFAULT_RATING);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
