use super::*;
use duel_core::*;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 64;

#[derive(Default)]
struct Hall {
    sessions: BTreeMap<ID<Match>, Session>,
    feeds: HashMap<ID<Player>, broadcast::Sender<ServiceEvent>>,
    hidden: HashMap<(ID<Player>, ID<Match>), usize>,
    revoked: HashSet<ID<Player>>,
    offline: bool,
}

impl Hall {
    fn find(&mut self, local: ID<Player>, request: FindRequest, now: Millis) -> Session {
        let waiting = self.sessions.values_mut().find(|s| {
            s.status == SessionStatus::Searching
                && s.group == request.group
                && s.seat_of(local).is_none()
                && s.seats.iter().any(|seat| seat.player.is_none())
        });
        if let Some(s) = waiting {
            if let Some(seat) = s.seats.iter_mut().find(|seat| seat.player.is_none()) {
                *seat = SeatInfo::taken(local, SeatStatus::Active);
            }
            if s.filled() == SEATS {
                s.status = SessionStatus::Open;
            }
            let joined = s.clone();
            log::debug!("[hub] {} joined {}", local, joined.id);
            self.notify(&joined, local, EventKind::TurnReceived);
            return joined;
        }
        let mut seats = [SeatInfo::open(); SEATS];
        seats[0] = SeatInfo::taken(local, SeatStatus::Active);
        let created = Session {
            id: ID::default(),
            status: SessionStatus::Searching,
            seats,
            holder: Some(0),
            blob: Vec::new(),
            created_at: now,
            group: request.group,
        };
        log::debug!("[hub] {} created {}", local, created.id);
        self.sessions.insert(created.id, created.clone());
        created
    }
    fn listing(&mut self, local: ID<Player>) -> Vec<Session> {
        let mut listed = Vec::new();
        for s in self.sessions.values() {
            if s.seat_of(local).is_none() {
                continue;
            }
            if let Some(lag) = self.hidden.get_mut(&(local, s.id)).filter(|n| **n > 0) {
                *lag -= 1;
                continue;
            }
            listed.push(s.clone());
        }
        listed
    }
    fn seated(&mut self, local: ID<Player>, id: ID<Match>) -> Result<&mut Session, ServiceError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        match session.seat_of(local) {
            Some(_) => Ok(session),
            None => Err(ServiceError::Rejected(format!("not seated in {}", id))),
        }
    }
    fn holding(&mut self, local: ID<Player>, id: ID<Match>) -> Result<&mut Session, ServiceError> {
        let session = self.seated(local, id)?;
        if session.is_ended() {
            return Err(ServiceError::Rejected(format!("{} has ended", id)));
        }
        match session.holds_turn(local) {
            true => Ok(session),
            false => Err(ServiceError::Rejected("not your turn".to_string())),
        }
    }
    fn quit(
        &mut self,
        local: ID<Player>,
        id: ID<Match>,
        outcome: Outcome,
    ) -> Result<Session, ServiceError> {
        let session = self.seated(local, id)?;
        if session.is_ended() {
            return Err(ServiceError::Rejected(format!("{} has ended", id)));
        }
        for seat in session.seats.iter_mut() {
            match seat.player {
                Some(p) if p == local => seat.outcome = outcome,
                Some(_) if seat.status == SeatStatus::Active => seat.outcome = Outcome::Won,
                _ => {}
            }
            if seat.player.is_some() {
                seat.status = SeatStatus::Done;
            }
        }
        session.status = SessionStatus::Ended;
        session.holder = None;
        let ended = session.clone();
        self.notify(&ended, local, EventKind::MatchEnded);
        Ok(ended)
    }
    fn notify(&self, session: &Session, except: ID<Player>, kind: EventKind) {
        for player in session.seats.iter().filter_map(|s| s.player) {
            if player == except {
                continue;
            }
            if let Some(feed) = self.feeds.get(&player) {
                let _ = feed.send(ServiceEvent {
                    kind,
                    id: session.id,
                    active: session.holds_turn(player),
                });
            }
        }
    }
}

/// In-process match service shared by any number of local players.
///
/// Exists so that matchmaking and turn flow can be exercised without a
/// network. Read lag, outages, and sign-outs can be injected.
#[derive(Clone)]
pub struct MatchHub {
    hall: Arc<Mutex<Hall>>,
    clock: Arc<dyn Clock>,
}

impl MatchHub {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            hall: Arc::new(Mutex::new(Hall::default())),
            clock,
        }
    }
    /// A service handle signed in as `player`.
    pub async fn client(&self, player: ID<Player>) -> HubClient {
        let feed = self
            .hall
            .lock()
            .await
            .feeds
            .entry(player)
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .clone();
        HubClient {
            hub: self.clone(),
            local: player,
            feed,
        }
    }
    pub async fn offline(&self, on: bool) {
        self.hall.lock().await.offline = on;
    }
    /// Signs `player` out; every later call from them is unauthorized.
    pub async fn revoke(&self, player: ID<Player>) {
        self.hall.lock().await.revoked.insert(player);
    }
    /// Omits session `id` from the next `listings` listings `player` requests.
    pub async fn hide(&self, player: ID<Player>, id: ID<Match>, listings: usize) {
        self.hall.lock().await.hidden.insert((player, id), listings);
    }
    /// Inserts a session as-is.
    pub async fn seed(&self, session: Session) {
        self.hall.lock().await.sessions.insert(session.id, session);
    }
    pub async fn session(&self, id: ID<Match>) -> Option<Session> {
        self.hall.lock().await.sessions.get(&id).cloned()
    }
    pub async fn sessions(&self) -> Vec<Session> {
        self.hall.lock().await.sessions.values().cloned().collect()
    }
}

/// One player's view of a [`MatchHub`].
#[derive(Clone)]
pub struct HubClient {
    hub: MatchHub,
    local: ID<Player>,
    feed: broadcast::Sender<ServiceEvent>,
}

impl HubClient {
    async fn hall(&self) -> Result<MutexGuard<'_, Hall>, ServiceError> {
        tokio::task::yield_now().await;
        let hall = self.hub.hall.lock().await;
        if hall.offline {
            return Err(ServiceError::Transport("match hub offline".to_string()));
        }
        if hall.revoked.contains(&self.local) {
            return Err(ServiceError::Unauthorized);
        }
        Ok(hall)
    }
}

#[async_trait::async_trait]
impl MatchService for HubClient {
    fn local(&self) -> ID<Player> {
        self.local
    }
    async fn find(&self, request: FindRequest) -> Result<Session, ServiceError> {
        if request.players != SEATS {
            return Err(ServiceError::Rejected(format!("{} players", request.players)));
        }
        let now = self.hub.clock.now();
        Ok(self.hall().await?.find(self.local, request, now))
    }
    async fn sessions(&self) -> Result<Vec<Session>, ServiceError> {
        Ok(self.hall().await?.listing(self.local))
    }
    async fn submit_turn(
        &self,
        id: ID<Match>,
        next: Seat,
        blob: Vec<u8>,
    ) -> Result<Session, ServiceError> {
        if next >= SEATS {
            return Err(ServiceError::Rejected(format!("no seat {}", next)));
        }
        let mut hall = self.hall().await?;
        let session = hall.holding(self.local, id)?;
        session.blob = blob;
        session.holder = Some(next);
        let updated = session.clone();
        hall.notify(&updated, self.local, EventKind::TurnReceived);
        Ok(updated)
    }
    async fn end_match(
        &self,
        id: ID<Match>,
        blob: Vec<u8>,
        outcomes: [Outcome; SEATS],
    ) -> Result<Session, ServiceError> {
        let mut hall = self.hall().await?;
        let session = hall.holding(self.local, id)?;
        session.blob = blob;
        session.status = SessionStatus::Ended;
        session.holder = None;
        for (seat, outcome) in session.seats.iter_mut().zip(outcomes) {
            seat.outcome = outcome;
            if seat.player.is_some() {
                seat.status = SeatStatus::Done;
            }
        }
        let ended = session.clone();
        hall.notify(&ended, self.local, EventKind::MatchEnded);
        Ok(ended)
    }
    async fn quit_in_turn(
        &self,
        id: ID<Match>,
        next: Seat,
        blob: Vec<u8>,
        outcome: Outcome,
    ) -> Result<Session, ServiceError> {
        let mut hall = self.hall().await?;
        let session = hall.holding(self.local, id)?;
        session.blob = blob;
        session.holder = Some(next);
        hall.quit(self.local, id, outcome)
    }
    async fn quit_out_of_turn(
        &self,
        id: ID<Match>,
        outcome: Outcome,
    ) -> Result<Session, ServiceError> {
        self.hall().await?.quit(self.local, id, outcome)
    }
    async fn accept_invite(&self, id: ID<Match>) -> Result<Session, ServiceError> {
        let local = self.local;
        let mut hall = self.hall().await?;
        let session = hall.seated(local, id)?;
        let seat = session
            .seats
            .iter_mut()
            .find(|s| s.player == Some(local) && s.status == SeatStatus::Invited)
            .ok_or_else(|| ServiceError::Rejected(format!("no invitation to {}", id)))?;
        seat.status = SeatStatus::Active;
        if session.filled() == SEATS {
            session.status = SessionStatus::Open;
        }
        let accepted = session.clone();
        hall.notify(&accepted, local, EventKind::TurnReceived);
        Ok(accepted)
    }
    async fn remove(&self, id: ID<Match>) -> Result<(), ServiceError> {
        let mut hall = self.hall().await?;
        hall.seated(self.local, id)?;
        hall.sessions.remove(&id);
        log::debug!("[hub] {} removed {}", self.local, id);
        Ok(())
    }
    async fn rematch(&self, id: ID<Match>) -> Result<Session, ServiceError> {
        let local = self.local;
        let now = self.hub.clock.now();
        let mut hall = self.hall().await?;
        let origin = hall.seated(local, id)?;
        if !origin.is_ended() {
            return Err(ServiceError::Rejected(format!("{} is still running", id)));
        }
        let opponent = origin
            .opponent_of(local)
            .ok_or_else(|| ServiceError::Rejected(format!("{} had no opponent", id)))?;
        let successor = Session {
            id: ID::default(),
            status: SessionStatus::Open,
            seats: [
                SeatInfo::taken(local, SeatStatus::Active),
                SeatInfo::taken(opponent, SeatStatus::Invited),
            ],
            holder: Some(0),
            blob: Vec::new(),
            created_at: now,
            group: origin.group,
        };
        hall.sessions.insert(successor.id, successor.clone());
        hall.notify(&successor, local, EventKind::TurnReceived);
        log::debug!("[hub] {} rematched {} as {}", local, id, successor.id);
        Ok(successor)
    }
    fn events(&self) -> broadcast::Receiver<ServiceEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> MatchHub {
        MatchHub::new(Arc::new(ManualClock::at(0)))
    }

    #[tokio::test]
    async fn second_finder_joins_the_first() {
        let hub = hub();
        let (alice, bob) = (hub.client(ID::default()).await, hub.client(ID::default()).await);
        let a = alice.find(FindRequest::open()).await.unwrap();
        assert_eq!(a.phase(), Phase::Pending);
        let b = bob.find(FindRequest::open()).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.phase(), Phase::Active);
        assert_eq!(hub.sessions().await.len(), 1);
    }
    #[tokio::test]
    async fn groups_do_not_mix() {
        let hub = hub();
        let (alice, bob) = (hub.client(ID::default()).await, hub.client(ID::default()).await);
        let a = alice.find(FindRequest::grouped(7.into())).await.unwrap();
        let b = bob.find(FindRequest::open()).await.unwrap();
        assert_ne!(a.id, b.id);
    }
    #[tokio::test]
    async fn turns_notify_the_opponent() {
        let hub = hub();
        let (alice, bob) = (hub.client(ID::default()).await, hub.client(ID::default()).await);
        let mut feed = bob.events();
        let s = alice.find(FindRequest::open()).await.unwrap();
        bob.find(FindRequest::open()).await.unwrap();
        assert!(bob.submit_turn(s.id, 0, b"x".to_vec()).await.is_err());
        let s = alice.submit_turn(s.id, 1, b"x".to_vec()).await.unwrap();
        assert!(s.holds_turn(bob.local()));
        let event = feed.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::TurnReceived);
        assert_eq!(event.id, s.id);
        assert!(event.active);
    }
    #[tokio::test]
    async fn quitting_awards_the_opponent() {
        let hub = hub();
        let (alice, bob) = (hub.client(ID::default()).await, hub.client(ID::default()).await);
        let s = alice.find(FindRequest::open()).await.unwrap();
        bob.find(FindRequest::open()).await.unwrap();
        let s = bob.quit_out_of_turn(s.id, Outcome::Lost).await.unwrap();
        assert!(s.is_ended());
        assert_eq!(s.outcome_of(alice.local()), Outcome::Won);
        assert_eq!(s.outcome_of(bob.local()), Outcome::Lost);
    }
    #[tokio::test]
    async fn rematch_invites_the_opponent() {
        let hub = hub();
        let (alice, bob) = (hub.client(ID::default()).await, hub.client(ID::default()).await);
        let s = alice.find(FindRequest::open()).await.unwrap();
        bob.find(FindRequest::open()).await.unwrap();
        assert!(alice.rematch(s.id).await.is_err());
        alice
            .end_match(s.id, Vec::new(), [Outcome::Tied, Outcome::Tied])
            .await
            .unwrap();
        let next = bob.rematch(s.id).await.unwrap();
        assert_eq!(next.phase(), Phase::Pending);
        let next = alice.accept_invite(next.id).await.unwrap();
        assert_eq!(next.phase(), Phase::Active);
        assert!(next.holds_turn(bob.local()));
    }
    #[tokio::test]
    async fn hidden_sessions_reappear() {
        let hub = hub();
        let alice = hub.client(ID::default()).await;
        let s = alice.find(FindRequest::open()).await.unwrap();
        hub.hide(alice.local(), s.id, 2).await;
        assert!(alice.sessions().await.unwrap().is_empty());
        assert!(alice.sessions().await.unwrap().is_empty());
        assert_eq!(alice.sessions().await.unwrap().len(), 1);
    }
    #[tokio::test]
    async fn revoked_players_are_unauthorized() {
        let hub = hub();
        let alice = hub.client(ID::default()).await;
        hub.revoke(alice.local()).await;
        assert_eq!(alice.sessions().await, Err(ServiceError::Unauthorized));
    }
}
