use super::*;
use duel_core::Millis;
use serde::Deserialize;
use serde::Serialize;

/// Current wire format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Immutable game + clock state exchanged through the match service.
///
/// Decoding tolerates unknown fields and defaults missing ones, so older
/// and newer clients can read each other's snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSnapshot {
    #[serde(rename = "v")]
    version: u8,
    #[serde(rename = "p")]
    position: Position,
    #[serde(rename = "pc", skip_serializing_if = "Option::is_none")]
    party: Option<PartyCode>,
    #[serde(rename = "sy")]
    symbols: ByMark<Option<String>>,
    #[serde(rename = "ck")]
    clocks: ByMark<Millis>,
    #[serde(rename = "ts")]
    turn_started_at: Millis,
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            position: Position::default(),
            party: None,
            symbols: ByMark::default(),
            clocks: ByMark::both(duel_core::TURN_ALLOWANCE),
            turn_started_at: 0,
        }
    }
}

impl GameSnapshot {
    /// First real snapshot of a session: empty board, X to move, full clocks.
    pub fn opening(size: u8, party: Option<PartyCode>, allowance: Millis, now: Millis) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            position: Position::opening(size),
            party,
            symbols: ByMark::default(),
            clocks: ByMark::both(allowance),
            turn_started_at: now,
        }
    }
    pub fn position(&self) -> &Position {
        &self.position
    }
    pub fn party(&self) -> Option<PartyCode> {
        self.party
    }
    pub fn symbol(&self, mark: Mark) -> Option<&str> {
        self.symbols[mark].as_deref()
    }
    pub fn turn_started_at(&self) -> Millis {
        self.turn_started_at
    }
    /// Stored remaining time, without live elapsed time subtracted.
    pub fn stamped(&self, mark: Mark) -> Millis {
        self.clocks[mark]
    }
    /// Remaining time for a side, live-adjusted for the side to move.
    pub fn remaining(&self, mark: Mark, now: Millis) -> Millis {
        match self.position.current() == Some(mark) {
            true => self.clocks[mark].saturating_sub(now.saturating_sub(self.turn_started_at)),
            false => self.clocks[mark],
        }
    }
    /// True once the side to move has no time left.
    pub fn expired(&self, now: Millis) -> bool {
        self.position
            .current()
            .is_some_and(|mark| self.remaining(mark, now) == 0)
    }
    /// Snapshot for a committed turn: new position, actor's symbol merged in,
    /// both clocks reset to the full allowance.
    pub fn advance(
        &self,
        position: Position,
        actor: Mark,
        symbol: Option<&str>,
        allowance: Millis,
        now: Millis,
    ) -> Self {
        let mut symbols = self.symbols.clone();
        if let Some(symbol) = symbol {
            symbols[actor] = Some(symbol.to_string());
        }
        Self {
            version: SNAPSHOT_VERSION,
            position,
            party: self.party,
            symbols,
            clocks: ByMark::both(allowance),
            turn_started_at: now,
        }
    }
    /// Snapshot for a forfeited turn: the move passes and the timed-out
    /// side is stamped with zero remaining time.
    pub fn timed_out(&self, allowance: Millis, now: Millis) -> Option<Self> {
        let loser = self.position.current()?;
        let mut clocks = ByMark::both(allowance);
        clocks[loser] = 0;
        Some(Self {
            version: SNAPSHOT_VERSION,
            position: self.position.pass(),
            party: self.party,
            symbols: self.symbols.clone(),
            clocks,
            turn_started_at: now,
        })
    }
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("serialize snapshot")
    }
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        let snapshot = serde_json::from_slice::<Self>(bytes)
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
        snapshot.position.verify()?;
        Ok(snapshot)
    }
    /// Classifies a raw blob from the match service.
    pub fn read(bytes: &[u8]) -> Blob {
        match Self::decode(bytes) {
            Ok(snapshot) => Blob::Ready(snapshot),
            Err(CodecError::Empty) => Blob::Empty,
            Err(e) => Blob::Garbled(e),
        }
    }
}

/// Outcome of reading a session's opaque snapshot blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blob {
    /// No snapshot has been written yet.
    Empty,
    Ready(GameSnapshot),
    /// Unusable data; callers fall back to a default snapshot.
    Garbled(CodecError),
}

impl Blob {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
    pub fn party(&self) -> Option<PartyCode> {
        match self {
            Self::Ready(s) => s.party(),
            _ => None,
        }
    }
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        match self {
            Self::Ready(s) => Some(s),
            _ => None,
        }
    }
    /// The usable snapshot, or a default one when there is none.
    pub fn or_default(self) -> GameSnapshot {
        match self {
            Self::Ready(s) => s,
            Self::Empty => GameSnapshot::default(),
            Self::Garbled(e) => {
                log::warn!("[codec] falling back to default snapshot: {}", e);
                GameSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::Cell;

    struct Never;
    impl Referee for Never {
        fn judge(&self, _: &Board) -> Verdict {
            Verdict::Open
        }
    }

    /// X wins on the top row; a full board otherwise draws.
    struct TopRow;
    impl Referee for TopRow {
        fn judge(&self, board: &Board) -> Verdict {
            match (0..3).all(|c| board.get(c) == Some(Mark::X)) {
                true => Verdict::Won {
                    mark: Mark::X,
                    line: vec![0, 1, 2],
                },
                false if board.is_full() => Verdict::Drawn,
                false => Verdict::Open,
            }
        }
    }

    fn played(cells: &[Cell]) -> GameSnapshot {
        let opening = GameSnapshot::opening(3, None, 60_000, 1_000);
        let position = cells
            .iter()
            .try_fold(opening.position().clone(), |p, c| p.place(*c, &TopRow))
            .unwrap();
        opening.advance(position, Mark::X, None, 60_000, 5_000)
    }

    fn midgame() -> GameSnapshot {
        let code = PartyCode::parse("K7QX2M").unwrap();
        let opening = GameSnapshot::opening(3, Some(code), 60_000, 1_000);
        let position = opening.position().place(4, &Never).unwrap();
        opening.advance(position, Mark::X, Some("🐱"), 60_000, 5_000)
    }

    #[test]
    fn round_trip_is_identity() {
        let s = midgame();
        assert_eq!(GameSnapshot::decode(&s.encode()).unwrap(), s);
        let fresh = GameSnapshot::default();
        assert_eq!(GameSnapshot::decode(&fresh.encode()).unwrap(), fresh);
    }
    #[test]
    fn won_game_round_trips() {
        let s = played(&[0, 3, 1, 4, 2]);
        assert_eq!(s.position().winner(), Some(Mark::X));
        assert_eq!(s.position().current(), None);
        let back = GameSnapshot::decode(&s.encode()).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.position().winning_line(), Some(&[0, 1, 2][..]));
    }
    #[test]
    fn drawn_game_round_trips() {
        let s = played(&[0, 1, 2, 4, 3, 5, 7, 6, 8]);
        assert!(s.position().is_draw());
        assert_eq!(s.position().current(), None);
        assert_eq!(GameSnapshot::decode(&s.encode()).unwrap(), s);
    }
    #[test]
    fn unknown_fields_are_ignored() {
        let mut value = serde_json::to_value(midgame()).unwrap();
        value["future"] = serde_json::json!({"anything": [1, 2, 3]});
        let bytes = serde_json::to_vec(&value).unwrap();
        assert_eq!(GameSnapshot::decode(&bytes).unwrap(), midgame());
    }
    #[test]
    fn missing_fields_default() {
        let s = GameSnapshot::decode(br#"{"p":{"b":"3:.........","l":[],"t":"X"}}"#).unwrap();
        assert_eq!(s.party(), None);
        assert_eq!(s.symbol(Mark::X), None);
        assert_eq!(s.stamped(Mark::O), duel_core::TURN_ALLOWANCE);
        assert_eq!(s.position().current(), Some(Mark::X));
    }
    #[test]
    fn blobs_classify() {
        assert!(GameSnapshot::read(b"").is_empty());
        assert!(matches!(GameSnapshot::read(b"{{{"), Blob::Garbled(_)));
        assert!(matches!(GameSnapshot::read(&midgame().encode()), Blob::Ready(_)));
        assert_eq!(GameSnapshot::read(b"junk").or_default(), GameSnapshot::default());
    }
    #[test]
    fn inconsistent_log_is_rejected() {
        let bytes = br#"{"p":{"b":"3:X........","l":[],"t":"O"}}"#;
        assert!(matches!(GameSnapshot::decode(bytes), Err(CodecError::Inconsistent(_))));
    }
    #[test]
    fn symbols_merge_per_actor() {
        let s = midgame();
        let position = s.position().place(0, &Never).unwrap();
        let next = s.advance(position, Mark::O, Some("🐶"), 60_000, 9_000);
        assert_eq!(next.symbol(Mark::X), Some("🐱"));
        assert_eq!(next.symbol(Mark::O), Some("🐶"));
        assert_eq!(next.party(), s.party());
    }
    #[test]
    fn live_clock_counts_down_for_side_to_move() {
        let s = midgame();
        assert_eq!(s.position().current(), Some(Mark::O));
        assert_eq!(s.remaining(Mark::O, 15_000), 50_000);
        assert_eq!(s.remaining(Mark::X, 15_000), 60_000);
        assert!(!s.expired(64_999));
        assert!(s.expired(65_000));
        assert_eq!(s.remaining(Mark::O, 1_000_000), 0);
    }
    #[test]
    fn timeout_stamps_zero_and_passes() {
        let s = midgame();
        let t = s.timed_out(60_000, 70_000).unwrap();
        assert_eq!(t.stamped(Mark::O), 0);
        assert_eq!(t.stamped(Mark::X), 60_000);
        assert_eq!(t.position().current(), Some(Mark::X));
        assert_eq!(t.position().moves(), s.position().moves());
    }
}
