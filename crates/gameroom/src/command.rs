use duel_core::*;
use duel_lobby::Mode;

/// Requests from the UI to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(Mode),
    Cancel,
    /// Re-read session listings now, alongside the timers.
    Refresh,
    Place(Cell),
    Resign,
    /// Symbol preference merged into this player's next committed turn.
    Symbol(String),
    Rematch,
    AcceptRematch,
    DeclineRematch,
    Befriend(ID<Player>),
    AnswerFriend(ID<Player>, bool),
    Shutdown,
}
