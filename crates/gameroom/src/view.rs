use duel_codec::*;
use duel_core::*;
use duel_lobby::*;
use duel_records::Tally;

/// Where the local player stands on a rematch of the last match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RematchState {
    #[default]
    None,
    /// We asked; the opponent has not answered.
    Offered,
    /// The opponent asked; we have not answered.
    Incoming,
    Accepted,
    Declined,
}

/// Everything the UI renders, published as a whole on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: Phase,
    pub session: Option<ID<Match>>,
    pub party: Option<PartyCode>,
    pub seat: Option<Seat>,
    pub opponent: Option<ID<Player>>,
    pub snapshot: GameSnapshot,
    pub my_turn: bool,
    /// Live remaining time per side.
    pub clocks: ByMark<Millis>,
    pub outcome: Outcome,
    pub rating: Rating,
    pub opponent_rating: Option<Rating>,
    pub tally: Tally,
    pub rematch: RematchState,
    pub friend_requests: Vec<ID<Player>>,
    pub opponent_online: Option<bool>,
    pub error: Option<String>,
    pub signed_out: bool,
}

impl SessionView {
    pub fn mark(&self) -> Option<Mark> {
        self.seat.map(Mark::from_seat)
    }
    pub fn is_over(&self) -> bool {
        self.phase == Phase::Ended
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            session: None,
            party: None,
            seat: None,
            opponent: None,
            snapshot: GameSnapshot::default(),
            my_turn: false,
            clocks: ByMark::both(TURN_ALLOWANCE),
            outcome: Outcome::None,
            rating: DEFAULT_RATING,
            opponent_rating: None,
            tally: Tally::default(),
            rematch: RematchState::None,
            friend_requests: Vec::new(),
            opponent_online: None,
            error: None,
            signed_out: false,
        }
    }
}
