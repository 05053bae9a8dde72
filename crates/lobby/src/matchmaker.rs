use super::*;
use duel_codec::*;
use duel_core::*;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// How to look for an opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The open pool.
    Solo,
    /// A private pool under a freshly shared code.
    Host(PartyCode),
    /// A private pool under a code typed in by the player.
    Join(PartyCode),
}

impl Mode {
    pub fn party(&self) -> Option<PartyCode> {
        match self {
            Self::Solo => None,
            Self::Host(code) | Self::Join(code) => Some(*code),
        }
    }
    pub fn request(&self) -> FindRequest {
        match self.party() {
            Some(code) => FindRequest::grouped(code.group()),
            None => FindRequest::open(),
        }
    }
}

/// Whether a listed session can be adopted right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    Ready,
    Wait,
    Reject(&'static str),
}

/// Search/adopt/cancel state machine over a [`MatchService`].
///
/// Idle → Searching → Pending → Active, driven by [`start`](Self::start),
/// periodic [`poll`](Self::poll), and [`cancel`](Self::cancel). Every method
/// that returns `Some(session)` has adopted that session as the one match.
///
/// Ordering between candidate sessions uses only the local time at which
/// each id was first observed, never the service's creation stamp.
pub struct Matchmaker {
    service: Arc<dyn MatchService>,
    clock: Arc<dyn Clock>,
    config: LobbyConfig,
    phase: Phase,
    /// None when validating nothing, as for a directly adopted successor.
    mode: Option<Mode>,
    /// Code written into the first snapshot of a bootstrapped session.
    party: Option<PartyCode>,
    tracked: Option<Session>,
    missing_since: Option<Millis>,
    first_seen: HashMap<ID<Match>, Millis>,
    ignored: HashSet<ID<Match>>,
    created: HashSet<ID<Match>>,
    bootstrapped: HashSet<ID<Match>>,
}

impl Matchmaker {
    pub fn new(service: Arc<dyn MatchService>, clock: Arc<dyn Clock>, config: LobbyConfig) -> Self {
        Self {
            service,
            clock,
            config,
            phase: Phase::Idle,
            mode: None,
            party: None,
            tracked: None,
            missing_since: None,
            first_seen: HashMap::new(),
            ignored: HashSet::new(),
            created: HashSet::new(),
            bootstrapped: HashSet::new(),
        }
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }
    pub fn tracked(&self) -> Option<&Session> {
        self.tracked.as_ref()
    }
    /// Sessions still carrying search bookkeeping.
    pub fn remembered(&self) -> usize {
        self.first_seen
            .keys()
            .chain(&self.created)
            .chain(&self.bootstrapped)
            .collect::<HashSet<_>>()
            .len()
    }
    pub fn is_searching(&self) -> bool {
        matches!(self.phase, Phase::Searching | Phase::Pending)
    }
    fn local(&self) -> ID<Player> {
        self.service.local()
    }
}

impl Matchmaker {
    /// Begins a search: purges this client's stale sessions, adopts a
    /// session it already sits in, or asks the service for one.
    pub async fn start(&mut self, mode: Mode) -> Result<Option<Session>, ServiceError> {
        log::info!("[lobby] starting {:?} search", mode);
        self.mode = Some(mode);
        self.party = mode.party();
        self.phase = Phase::Searching;
        self.tracked = None;
        self.missing_since = None;
        self.ignored.clear();
        let listed = self.service.sessions().await?;
        let listed = self.purge(listed).await;
        self.observe(&listed);
        if let Some(found) = self.scan(&listed).await? {
            return Ok(Some(found));
        }
        if let Some(waiting) = self.resumable(&listed) {
            log::info!("[lobby] resuming {}", waiting);
            return self.track(waiting).await;
        }
        self.search().await
    }
    /// Re-checks listings. Transport errors are returned for the caller to
    /// retry on its next tick.
    pub async fn poll(&mut self) -> Result<Option<Session>, ServiceError> {
        if !self.is_searching() {
            return Ok(None);
        }
        let listed = self.service.sessions().await?;
        self.observe(&listed);
        if let Some(found) = self.scan(&listed).await? {
            return Ok(Some(found));
        }
        let Some(id) = self.tracked.as_ref().map(|s| s.id) else {
            return self.search().await;
        };
        match listed.iter().find(|s| s.id == id) {
            Some(current) => {
                self.missing_since = None;
                self.phase = match current.phase() {
                    Phase::Searching => Phase::Searching,
                    _ => Phase::Pending,
                };
                self.tracked = Some(current.clone());
                if current.is_ended() {
                    log::info!("[lobby] {} ended before it started", id);
                    self.tracked = None;
                    return self.search().await;
                }
                Ok(None)
            }
            None => self.vanished(id).await,
        }
    }
    /// Abandons the search, removing a self-created session nobody joined.
    pub async fn cancel(&mut self) -> Result<(), ServiceError> {
        log::info!("[lobby] cancelling search");
        self.phase = Phase::Idle;
        self.mode = None;
        self.missing_since = None;
        let result = self.abandon().await;
        self.forget();
        result
    }
    async fn abandon(&mut self) -> Result<(), ServiceError> {
        let Some(tracked) = self.tracked.take() else {
            return Ok(());
        };
        if !self.created.contains(&tracked.id) {
            return Ok(());
        }
        let fresh = self
            .service
            .sessions()
            .await?
            .into_iter()
            .find(|s| s.id == tracked.id)
            .unwrap_or(tracked);
        match self.is_orphan(&fresh) {
            true => self.service.remove(fresh.id).await,
            false => Ok(()),
        }
    }
    /// Takes over a session created elsewhere, such as a rematch successor,
    /// without party validation.
    pub async fn adopt(
        &mut self,
        session: Session,
        party: Option<PartyCode>,
    ) -> Result<Option<Session>, ServiceError> {
        log::info!("[lobby] adopting {}", session);
        self.mode = None;
        self.party = party;
        self.missing_since = None;
        self.observe(std::slice::from_ref(&session));
        self.track(session).await
    }
    /// Forgets the current match once play on it is over.
    pub fn release(&mut self) {
        self.phase = Phase::Idle;
        self.tracked = None;
        self.mode = None;
        self.forget();
    }
    fn forget(&mut self) {
        self.first_seen.clear();
        self.ignored.clear();
        self.created.clear();
        self.bootstrapped.clear();
    }
}

impl Matchmaker {
    async fn search(&mut self) -> Result<Option<Session>, ServiceError> {
        let request = self.mode.map(|m| m.request()).unwrap_or_else(FindRequest::open);
        let session = self.service.find(request).await?;
        if session.seat_of(self.local()) == Some(0) && session.filled() < SEATS {
            self.created.insert(session.id);
        }
        log::info!("[lobby] service returned {}", session);
        self.observe(std::slice::from_ref(&session));
        self.track(session).await
    }
    async fn track(&mut self, session: Session) -> Result<Option<Session>, ServiceError> {
        self.missing_since = None;
        match self.fit(&session) {
            Fit::Ready => self.settle(session).await.map(Some),
            Fit::Wait => {
                self.phase = match session.phase() {
                    Phase::Searching => Phase::Searching,
                    _ => Phase::Pending,
                };
                self.tracked = Some(session);
                Ok(None)
            }
            Fit::Reject(why) => {
                self.reject(&session, why).await;
                self.phase = Phase::Searching;
                Ok(None)
            }
        }
    }
    /// Adopts the best ready candidate among `listed`, rejecting mismatches.
    async fn scan(&mut self, listed: &[Session]) -> Result<Option<Session>, ServiceError> {
        let mut ready = Vec::new();
        for s in listed {
            if self.ignored.contains(&s.id) || s.seat_of(self.local()).is_none() {
                continue;
            }
            match self.fit(s) {
                Fit::Ready => ready.push(s.clone()),
                Fit::Wait => continue,
                Fit::Reject(why) => self.reject(s, why).await,
            }
        }
        match self.choose(ready) {
            Some(best) => self.settle(best).await.map(Some),
            None => Ok(None),
        }
    }
    fn fit(&self, s: &Session) -> Fit {
        if s.is_ended() || s.phase() != Phase::Active || self.ignored.contains(&s.id) {
            return Fit::Wait;
        }
        let Some(mode) = self.mode else {
            return match self.tracked.as_ref().is_none_or(|t| t.id == s.id) {
                true => Fit::Ready,
                false => Fit::Wait,
            };
        };
        let blob = s.snapshot();
        match (mode.party(), blob.party()) {
            (None, Some(_)) => Fit::Reject("party session in open search"),
            (None, None) => Fit::Ready,
            (Some(mine), Some(theirs)) if mine == theirs => Fit::Ready,
            (Some(_), Some(_)) => Fit::Reject("party code mismatch"),
            (Some(_), None) if blob.is_empty() && s.holds_turn(self.local()) => Fit::Ready,
            (Some(_), None) if self.age(s.id) <= self.config.handshake_grace => Fit::Wait,
            (Some(_), None) => Fit::Reject("no party code"),
        }
    }
    /// Most recently first-observed wins; the others are left untouched.
    fn choose(&self, ready: Vec<Session>) -> Option<Session> {
        ready
            .into_iter()
            .max_by_key(|s| (self.first_seen.get(&s.id).copied().unwrap_or_default(), s.id))
    }
    /// Bootstraps if needed, then makes `session` the one match.
    async fn settle(&mut self, session: Session) -> Result<Session, ServiceError> {
        let session = self.bootstrap(session).await?;
        if let Some(previous) = self.tracked.take().filter(|t| t.id != session.id) {
            if self.is_orphan(&previous) {
                log::info!("[lobby] dropping unjoined {}", previous.id);
                let _ = self
                    .service
                    .remove(previous.id)
                    .await
                    .inspect_err(|e| log::warn!("[lobby] could not remove {}: {}", previous.id, e));
            }
        }
        log::info!("[lobby] adopted {}", session);
        self.phase = Phase::Active;
        self.missing_since = None;
        self.tracked = Some(session.clone());
        Ok(session)
    }
    /// Writes the first real snapshot into a freshly two-sided session,
    /// once, and only from the seat holding the turn.
    async fn bootstrap(&mut self, session: Session) -> Result<Session, ServiceError> {
        let due = session.blob.is_empty()
            && session.holds_turn(self.local())
            && !self.bootstrapped.contains(&session.id);
        if !due {
            return Ok(session);
        }
        let opening = GameSnapshot::opening(
            self.config.board,
            self.party,
            self.config.allowance,
            self.clock.now(),
        );
        let written = self
            .service
            .submit_turn(session.id, Mark::X.seat(), opening.encode())
            .await?;
        self.bootstrapped.insert(session.id);
        log::info!("[lobby] bootstrapped {}", session.id);
        Ok(written)
    }
    async fn reject(&mut self, session: &Session, why: &str) {
        log::warn!("[lobby] rejecting {}: {}", session.id, why);
        self.ignored.insert(session.id);
        if self.tracked.as_ref().is_some_and(|t| t.id == session.id) {
            self.tracked = None;
        }
        if !session.is_ended() {
            let _ = self
                .service
                .quit_out_of_turn(session.id, Outcome::Quit)
                .await
                .inspect_err(|e| log::warn!("[lobby] could not quit {}: {}", session.id, e));
        }
    }
    async fn vanished(&mut self, id: ID<Match>) -> Result<Option<Session>, ServiceError> {
        let now = self.clock.now();
        let since = *self.missing_since.get_or_insert(now);
        if now.saturating_sub(since) <= self.config.vanish_grace {
            log::debug!("[lobby] {} missing from listing", id);
            return Ok(None);
        }
        log::warn!("[lobby] lost {} after {}ms", id, now.saturating_sub(since));
        if let Some(lost) = self.tracked.take() {
            self.ignored.insert(lost.id);
            if self.created.contains(&lost.id) {
                let _ = self
                    .service
                    .remove(lost.id)
                    .await
                    .inspect_err(|e| log::debug!("[lobby] orphan {} not removed: {}", lost.id, e));
            }
        }
        self.missing_since = None;
        self.phase = Phase::Searching;
        self.search().await
    }
    /// Drops this client's own sessions that nobody joined in time.
    async fn purge(&mut self, listed: Vec<Session>) -> Vec<Session> {
        let now = self.clock.now();
        let mut kept = Vec::with_capacity(listed.len());
        for s in listed {
            let stale = s.seat_of(self.local()) == Some(0)
                && !s.is_ended()
                && s.filled() < SEATS
                && now.saturating_sub(s.created_at) > self.config.stale_age;
            if !stale {
                kept.push(s);
                continue;
            }
            log::info!("[lobby] purging stale {}", s.id);
            match self.service.remove(s.id).await {
                Ok(()) => {}
                Err(e) => log::warn!("[lobby] could not purge {}: {}", s.id, e),
            }
        }
        kept
    }
    /// A session this client already waits in for the current pool.
    fn resumable(&self, listed: &[Session]) -> Option<Session> {
        let group = self.mode.and_then(|m| m.request().group);
        listed
            .iter()
            .filter(|s| !s.is_ended() && !self.ignored.contains(&s.id))
            .filter(|s| s.group == group && s.seat_of(self.local()).is_some())
            .filter(|s| matches!(s.phase(), Phase::Pending | Phase::Active))
            .max_by_key(|s| (self.first_seen.get(&s.id).copied().unwrap_or_default(), s.id))
            .cloned()
    }
    fn observe(&mut self, listed: &[Session]) {
        let now = self.clock.now();
        for s in listed {
            self.first_seen.entry(s.id).or_insert(now);
        }
    }
    fn age(&self, id: ID<Match>) -> Millis {
        self.first_seen
            .get(&id)
            .map(|seen| self.clock.now().saturating_sub(*seen))
            .unwrap_or_default()
    }
    fn is_orphan(&self, session: &Session) -> bool {
        self.created.contains(&session.id) && !session.is_ended() && session.filled() < SEATS
    }
}
