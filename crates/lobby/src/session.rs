use duel_codec::*;
use duel_core::*;

/// Session lifecycle as the service reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Waiting for the service to fill open seats.
    Searching,
    Open,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatStatus {
    /// Auto-match seat not yet filled.
    Matching,
    /// Named player who has not accepted yet.
    Invited,
    Active,
    Declined,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Outcome {
    #[default]
    None,
    Won,
    Lost,
    Tied,
    Quit,
}

/// Client-side lifecycle, derived from service status and seat fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Searching,
    /// One seat filled, or the second seat invited but not yet active.
    Pending,
    Active,
    Ended,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Searching => write!(f, "searching"),
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatInfo {
    pub player: Option<ID<Player>>,
    pub status: SeatStatus,
    pub outcome: Outcome,
}

impl SeatInfo {
    pub fn open() -> Self {
        Self {
            player: None,
            status: SeatStatus::Matching,
            outcome: Outcome::None,
        }
    }
    pub fn taken(player: ID<Player>, status: SeatStatus) -> Self {
        Self {
            player: Some(player),
            status,
            outcome: Outcome::None,
        }
    }
    /// Seats the turn may be handed to.
    pub fn is_eligible(&self) -> bool {
        matches!(
            self.status,
            SeatStatus::Active | SeatStatus::Invited | SeatStatus::Matching
        )
    }
}

/// A turn-based session as seen by one client. Owned by the match service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: ID<Match>,
    pub status: SessionStatus,
    pub seats: [SeatInfo; SEATS],
    /// Seat currently holding the turn.
    pub holder: Option<Seat>,
    /// Opaque snapshot, empty until the first turn is submitted.
    pub blob: Vec<u8>,
    /// Service-side creation time.
    pub created_at: Millis,
    pub group: Option<GroupKey>,
}

impl Session {
    pub fn seat_of(&self, player: ID<Player>) -> Option<Seat> {
        self.seats.iter().position(|s| s.player == Some(player))
    }
    pub fn player_at(&self, seat: Seat) -> Option<ID<Player>> {
        self.seats.get(seat).and_then(|s| s.player)
    }
    pub fn opponent_of(&self, player: ID<Player>) -> Option<ID<Player>> {
        self.seats
            .iter()
            .filter_map(|s| s.player)
            .find(|p| *p != player)
    }
    pub fn holds_turn(&self, player: ID<Player>) -> bool {
        self.holder.is_some() && self.holder == self.seat_of(player)
    }
    /// Seats with an active player.
    pub fn filled(&self) -> usize {
        self.seats
            .iter()
            .filter(|s| s.status == SeatStatus::Active)
            .count()
    }
    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }
    pub fn outcome_of(&self, player: ID<Player>) -> Outcome {
        self.seat_of(player)
            .map(|seat| self.seats[seat].outcome)
            .unwrap_or_default()
    }
    pub fn phase(&self) -> Phase {
        match self.status {
            SessionStatus::Ended => Phase::Ended,
            _ if self.filled() == SEATS => Phase::Active,
            _ if self.seats.iter().any(|s| s.status == SeatStatus::Invited) => Phase::Pending,
            SessionStatus::Open => Phase::Pending,
            SessionStatus::Searching => match self.filled() {
                0 => Phase::Searching,
                _ => Phase::Pending,
            },
        }
    }
    /// The first seat after the holder that can take the turn.
    pub fn next_seat(&self) -> Option<Seat> {
        let from = self.holder.unwrap_or_default();
        (1..=SEATS)
            .map(|step| (from + step) % SEATS)
            .find(|seat| self.seats[*seat].is_eligible())
    }
    pub fn snapshot(&self) -> Blob {
        GameSnapshot::read(&self.blob)
    }
}

impl Unique<Match> for Session {
    fn id(&self) -> ID<Match> {
        self.id
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {}/{})", self.id, self.phase(), self.filled(), SEATS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(seats: [SeatInfo; SEATS], status: SessionStatus) -> Session {
        Session {
            id: ID::default(),
            status,
            seats,
            holder: Some(0),
            blob: Vec::new(),
            created_at: 0,
            group: None,
        }
    }

    #[test]
    fn phase_follows_seat_fill() {
        let (a, b) = (ID::default(), ID::default());
        let one = session(
            [SeatInfo::taken(a, SeatStatus::Active), SeatInfo::open()],
            SessionStatus::Searching,
        );
        assert_eq!(one.phase(), Phase::Pending);
        let invited = session(
            [SeatInfo::taken(a, SeatStatus::Active), SeatInfo::taken(b, SeatStatus::Invited)],
            SessionStatus::Open,
        );
        assert_eq!(invited.phase(), Phase::Pending);
        let both = session(
            [SeatInfo::taken(a, SeatStatus::Active), SeatInfo::taken(b, SeatStatus::Active)],
            SessionStatus::Open,
        );
        assert_eq!(both.phase(), Phase::Active);
        assert_eq!(both.opponent_of(a), Some(b));
        assert!(both.holds_turn(a));
        assert!(!both.holds_turn(b));
    }
    #[test]
    fn next_seat_skips_finished_seats() {
        let (a, b) = (ID::default(), ID::default());
        let mut s = session(
            [SeatInfo::taken(a, SeatStatus::Active), SeatInfo::taken(b, SeatStatus::Active)],
            SessionStatus::Open,
        );
        assert_eq!(s.next_seat(), Some(1));
        s.holder = Some(1);
        assert_eq!(s.next_seat(), Some(0));
        s.seats[0].status = SeatStatus::Done;
        assert_eq!(s.next_seat(), Some(1));
        s.seats[1].status = SeatStatus::Declined;
        assert_eq!(s.next_seat(), None);
    }
    #[test]
    fn matching_seat_can_take_the_turn() {
        let a = ID::default();
        let s = session(
            [SeatInfo::taken(a, SeatStatus::Active), SeatInfo::open()],
            SessionStatus::Searching,
        );
        assert_eq!(s.next_seat(), Some(1));
    }
}
