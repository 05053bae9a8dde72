use super::*;
use duel_core::*;
use std::sync::Arc;

/// Last time a player announced itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beacon {
    player: ID<Player>,
    updated_at: Millis,
}

impl Beacon {
    pub fn key_for(player: ID<Player>) -> String {
        format!("presence:{}", player)
    }
    pub fn is_fresh(&self, now: Millis, window: Millis) -> bool {
        now.saturating_sub(self.updated_at) <= window
    }
}

impl Document for Beacon {
    fn key(&self) -> String {
        Self::key_for(self.player)
    }
}

/// Heartbeats and online checks. Each player only ever writes its own beacon.
#[derive(Clone)]
pub struct Presence {
    records: Records,
    clock: Arc<dyn Clock>,
    window: Millis,
}

impl Presence {
    pub fn new(records: Records, clock: Arc<dyn Clock>) -> Self {
        Self {
            records,
            clock,
            window: PRESENCE_WINDOW,
        }
    }
    pub fn with_window(self, window: Millis) -> Self {
        Self { window, ..self }
    }
    pub async fn heartbeat(&self, local: ID<Player>) -> Result<(), StoreError> {
        let beacon = Beacon {
            player: local,
            updated_at: self.clock.now(),
        };
        log::trace!("[presence] heartbeat {}", local);
        self.records.upsert(&beacon).await
    }
    pub async fn is_online(&self, player: ID<Player>) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(self
            .records
            .load::<Beacon>(&Beacon::key_for(player))
            .await?
            .is_some_and(|b| b.is_fresh(now, self.window)))
    }
    /// Online players among `roster`.
    pub async fn online_count(&self, roster: &[ID<Player>]) -> Result<usize, StoreError> {
        let mut count = 0;
        for player in roster {
            if self.is_online(*player).await? {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn beacons_go_stale() {
        let clock = ManualClock::at(1_000);
        let presence = Presence::new(
            Records::new(Arc::new(MemoryStore::default())),
            Arc::new(clock.clone()),
        );
        let (alice, bob, carol) = (ID::default(), ID::default(), ID::default());
        presence.heartbeat(alice).await.unwrap();
        presence.heartbeat(bob).await.unwrap();
        assert_eq!(presence.online_count(&[alice, bob, carol]).await.unwrap(), 2);
        clock.advance(PRESENCE_WINDOW / 2);
        presence.heartbeat(bob).await.unwrap();
        clock.advance(PRESENCE_WINDOW / 2 + 1);
        assert!(!presence.is_online(alice).await.unwrap());
        assert!(presence.is_online(bob).await.unwrap());
        assert_eq!(presence.online_count(&[alice, bob, carol]).await.unwrap(), 1);
    }
}
