use super::*;
use duel_core::*;
use duel_rating::Score;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Head-to-head counts seen from one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl Tally {
    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}

impl std::fmt::Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.wins, self.losses, self.draws)
    }
}

/// Lifetime results between one unordered pair of players.
/// `a` sorts before `b`; every match id is folded in at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
    a: ID<Player>,
    b: ID<Player>,
    #[serde(default)]
    wins_a: u32,
    #[serde(default)]
    wins_b: u32,
    #[serde(default)]
    draws: u32,
    #[serde(default)]
    processed: BTreeSet<ID<Match>>,
    #[serde(default)]
    updated_at: Millis,
}

impl HeadToHead {
    pub fn between(x: ID<Player>, y: ID<Player>) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self {
            a,
            b,
            wins_a: 0,
            wins_b: 0,
            draws: 0,
            processed: BTreeSet::new(),
            updated_at: 0,
        }
    }
    pub fn key_for(x: ID<Player>, y: ID<Player>) -> String {
        let ref pair = Self::between(x, y);
        format!("h2h:{}:{}", pair.a, pair.b)
    }
    pub fn contains(&self, id: ID<Match>) -> bool {
        self.processed.contains(&id)
    }
    /// Counts from `local`'s side of the pair.
    pub fn tally(&self, local: ID<Player>) -> Tally {
        let (wins, losses) = match local == self.a {
            true => (self.wins_a, self.wins_b),
            false => (self.wins_b, self.wins_a),
        };
        Tally {
            wins,
            losses,
            draws: self.draws,
        }
    }
    fn folded(&self, id: ID<Match>, local: ID<Player>, score: Score, now: Millis) -> Self {
        let mut next = self.clone();
        match (score, local == self.a) {
            (Score::Draw, _) => next.draws += 1,
            (Score::Win, true) | (Score::Loss, false) => next.wins_a += 1,
            (Score::Win, false) | (Score::Loss, true) => next.wins_b += 1,
        }
        next.processed.insert(id);
        next.updated_at = now;
        next
    }
}

impl Document for HeadToHead {
    fn key(&self) -> String {
        Self::key_for(self.a, self.b)
    }
}

/// Folds ended matches into shared head-to-head records.
#[derive(Clone)]
pub struct Rivalry {
    records: Records,
    clock: Arc<dyn Clock>,
}

impl Rivalry {
    pub fn new(records: Records, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }
    /// Adds one ended match to the pair's record, from `local`'s perspective.
    /// Safe to repeat and to race with the opponent doing the same.
    pub async fn record_result(
        &self,
        id: ID<Match>,
        local: ID<Player>,
        opponent: ID<Player>,
        score: Score,
    ) -> Result<Tally, SyncError> {
        if local == opponent {
            return Err(SyncError::Rejected("head-to-head needs two players".to_string()));
        }
        let now = self.clock.now();
        let record = self
            .records
            .reconcile(&HeadToHead::key_for(local, opponent), |current: Option<&HeadToHead>| {
                let base = current
                    .cloned()
                    .unwrap_or_else(|| HeadToHead::between(local, opponent));
                match base.contains(id) {
                    true => Step::Done(base),
                    false => Step::Write(base.folded(id, local, score, now)),
                }
            })
            .await?;
        let tally = record.tally(local);
        log::info!("[h2h] {} vs {}: {}", local, opponent, tally);
        Ok(tally)
    }
    pub async fn tally(
        &self,
        local: ID<Player>,
        opponent: ID<Player>,
    ) -> Result<Tally, StoreError> {
        Ok(self
            .records
            .load::<HeadToHead>(&HeadToHead::key_for(local, opponent))
            .await?
            .map(|h| h.tally(local))
            .unwrap_or_default())
    }
}
