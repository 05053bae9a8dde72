use super::*;
use duel_codec::GroupKey;
use duel_core::*;
use tokio::sync::broadcast;

/// Parameters for creating or joining a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindRequest {
    pub players: usize,
    /// Private pool, or the open pool when absent.
    pub group: Option<GroupKey>,
}

impl FindRequest {
    pub fn open() -> Self {
        Self {
            players: SEATS,
            group: None,
        }
    }
    pub fn grouped(group: GroupKey) -> Self {
        Self {
            players: SEATS,
            group: Some(group),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TurnReceived,
    MatchEnded,
}

/// Push notification about a session the local player is seated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceEvent {
    pub kind: EventKind,
    pub id: ID<Match>,
    /// Whether the recipient now holds the turn.
    pub active: bool,
}

/// The turn-based match service, bound to one signed-in local player.
///
/// Listings are eventually consistent: a session returned by one call may be
/// missing from the next.
#[async_trait::async_trait]
pub trait MatchService: Send + Sync {
    fn local(&self) -> ID<Player>;
    /// Joins a waiting session in the requested pool, or creates one.
    async fn find(&self, request: FindRequest) -> Result<Session, ServiceError>;
    /// All sessions the local player is seated in.
    async fn sessions(&self) -> Result<Vec<Session>, ServiceError>;
    /// Ends the local turn, storing `blob` and handing the turn to `next`.
    async fn submit_turn(
        &self,
        id: ID<Match>,
        next: Seat,
        blob: Vec<u8>,
    ) -> Result<Session, ServiceError>;
    async fn end_match(
        &self,
        id: ID<Match>,
        blob: Vec<u8>,
        outcomes: [Outcome; SEATS],
    ) -> Result<Session, ServiceError>;
    /// Leaves while holding the turn, handing it to `next`.
    async fn quit_in_turn(
        &self,
        id: ID<Match>,
        next: Seat,
        blob: Vec<u8>,
        outcome: Outcome,
    ) -> Result<Session, ServiceError>;
    async fn quit_out_of_turn(
        &self,
        id: ID<Match>,
        outcome: Outcome,
    ) -> Result<Session, ServiceError>;
    async fn accept_invite(&self, id: ID<Match>) -> Result<Session, ServiceError>;
    async fn remove(&self, id: ID<Match>) -> Result<(), ServiceError>;
    /// Creates a successor session with the same participants.
    async fn rematch(&self, id: ID<Match>) -> Result<Session, ServiceError>;
    fn events(&self) -> broadcast::Receiver<ServiceEvent>;
}
