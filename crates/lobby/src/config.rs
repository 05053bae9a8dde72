use duel_core::*;
use std::time::Duration;

/// Matchmaking windows. Grace windows are wall-clock milliseconds measured
/// against local first observation.
#[derive(Debug, Clone, Copy)]
pub struct LobbyConfig {
    pub poll: Duration,
    pub vanish_grace: Millis,
    pub handshake_grace: Millis,
    pub stale_age: Millis,
    /// Board side written into bootstrap snapshots.
    pub board: u8,
    pub allowance: Millis,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            poll: MATCH_POLL_INTERVAL,
            vanish_grace: VANISH_GRACE,
            handshake_grace: PARTY_HANDSHAKE_GRACE,
            stale_age: STALE_SESSION_AGE,
            board: BOARD_SIZE,
            allowance: TURN_ALLOWANCE,
        }
    }
}
