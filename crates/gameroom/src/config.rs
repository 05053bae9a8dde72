use duel_core::*;
use duel_lobby::LobbyConfig;
use std::time::Duration;

/// Coordinator timing and rating parameters.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    /// Matchmaking windows; `lobby.poll` also paces rematch polling.
    pub lobby: LobbyConfig,
    pub inbox: Duration,
    pub tick: Duration,
    pub k: f64,
}

impl RoomConfig {
    pub fn allowance(&self) -> Millis {
        self.lobby.allowance
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            lobby: LobbyConfig::default(),
            inbox: INBOX_POLL_INTERVAL,
            tick: CLOCK_TICK_INTERVAL,
            k: ELO_K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_follow_constants() {
        let config = RoomConfig::default();
        assert_eq!(config.lobby.poll, MATCH_POLL_INTERVAL);
        assert_eq!(config.inbox, INBOX_POLL_INTERVAL);
        assert_eq!(config.allowance(), TURN_ALLOWANCE);
        assert_eq!(config.k, ELO_K);
    }
}
