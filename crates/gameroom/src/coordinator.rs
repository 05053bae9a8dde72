use super::*;
use duel_codec::*;
use duel_core::*;
use duel_lobby::*;
use duel_rating::*;
use duel_records::*;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Collaborators a coordinator is built from.
pub struct Wiring {
    pub service: Arc<dyn MatchService>,
    pub store: Arc<dyn RecordStore>,
    pub referee: Arc<dyn Referee>,
    pub clock: Arc<dyn Clock>,
    pub ledger: Ledger,
    pub config: RoomConfig,
}

/// What the matchmaker is asked to do while it is lent to a task.
enum Probe {
    Start(Mode),
    Poll,
    Adopt(Session, Option<PartyCode>),
}

/// Results of spawned work, rejoining the actor.
enum Landing {
    /// The flag marks a status poll rather than a start or adoption.
    Search(Box<Matchmaker>, bool, Result<Option<Session>, ServiceError>),
    Cancelled(Box<Matchmaker>, Result<(), ServiceError>),
    /// Tagged with the submission epoch the listing was requested in.
    Listed(u64, Result<Vec<Session>, ServiceError>),
    Submitted(Result<Session, SubmitError>),
    Ticket(ID<Match>, Result<Option<RematchTicket>, SyncError>),
    Successor(ID<Match>, Result<Session, RoomError>),
    Tallied(ID<Match>, Result<Tally, SyncError>),
    Tally(ID<Player>, Result<Tally, StoreError>),
    OpponentRating(ID<Player>, Result<Option<Rating>, StoreError>),
    Inbox(Result<Inbox, RoomError>),
    Note(Result<(), RoomError>),
}

/// One inbox poll: friend requests, the rematch ticket, and presence.
struct Inbox {
    friends: Vec<ID<Player>>,
    ticket: Option<(ID<Match>, Option<RematchTicket>)>,
    online: Option<bool>,
}

/// Owns all match state for one device and is its only writer.
///
/// Commands and landed task results are applied one at a time on the actor
/// task; every change is published as a fresh [`SessionView`].
pub struct SessionCoordinator {
    local: ID<Player>,
    service: Arc<dyn MatchService>,
    referee: Arc<dyn Referee>,
    clock: Arc<dyn Clock>,
    config: RoomConfig,
    pipeline: Pipeline,
    negotiator: Negotiator,
    rivalry: Rivalry,
    friends: Friends,
    presence: Presence,
    cards: Cards,
    ledger: Ledger,
    book: RatingBook,
    /// Home unless lent to a search task.
    lobby: Option<Box<Matchmaker>>,
    queued: Option<Probe>,
    cancelling: bool,
    phase: Phase,
    party: Option<PartyCode>,
    session: Option<Session>,
    snapshot: GameSnapshot,
    symbol: Option<String>,
    submitting: bool,
    epoch: u64,
    origin: Option<ID<Match>>,
    rematch: RematchState,
    successor: Successor,
    tallying: HashSet<ID<Match>>,
    tally: Tally,
    friend_requests: Vec<ID<Player>>,
    opponent_online: Option<bool>,
    error: Option<String>,
    authorized: bool,
    token: CancellationToken,
    landing: mpsc::UnboundedSender<Landing>,
    view: watch::Sender<SessionView>,
}

impl SessionCoordinator {
    /// Starts the actor on the current runtime.
    pub fn spawn(wiring: Wiring) -> SessionHandle {
        let (commands, inbound) = mpsc::unbounded_channel();
        let (landing, landed) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let Wiring {
            service,
            store,
            referee,
            clock,
            ledger,
            config,
        } = wiring;
        let records = Records::new(store);
        let book = RatingBook::new(ledger.rating());
        let view = SessionView {
            rating: book.local(),
            ..SessionView::default()
        };
        let (view, watcher) = watch::channel(view);
        let this = Self {
            local: service.local(),
            pipeline: Pipeline::new(service.clone(), clock.clone(), config.allowance()),
            negotiator: Negotiator::new(records.clone(), clock.clone()),
            rivalry: Rivalry::new(records.clone(), clock.clone()),
            friends: Friends::new(records.clone(), clock.clone()),
            presence: Presence::new(records.clone(), clock.clone()),
            cards: Cards::new(records, clock.clone()),
            lobby: Some(Box::new(Matchmaker::new(service.clone(), clock.clone(), config.lobby))),
            service,
            referee,
            clock,
            config,
            ledger,
            book,
            queued: None,
            cancelling: false,
            phase: Phase::Idle,
            party: None,
            session: None,
            snapshot: GameSnapshot::default(),
            symbol: None,
            submitting: false,
            epoch: 0,
            origin: None,
            rematch: RematchState::None,
            successor: Successor::default(),
            tallying: HashSet::new(),
            tally: Tally::default(),
            friend_requests: Vec::new(),
            opponent_online: None,
            error: None,
            authorized: true,
            token: token.clone(),
            landing,
            view,
        };
        tokio::spawn(this.run(inbound, landed));
        SessionHandle::new(commands, watcher, token)
    }
}

impl SessionCoordinator {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut landed: mpsc::UnboundedReceiver<Landing>,
    ) {
        log::info!("[room] coordinator up for {}", self.local);
        let token = self.token.clone();
        let mut events = self.service.events();
        let mut listening = true;
        let mut matches = tokio::time::interval(self.config.lobby.poll);
        let mut inbox = tokio::time::interval(self.config.inbox);
        let mut clock = tokio::time::interval(self.config.tick);
        matches.set_missed_tick_behavior(MissedTickBehavior::Delay);
        inbox.set_missed_tick_behavior(MissedTickBehavior::Delay);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.publish();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                command = commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.command(command),
                },
                Some(landing) = landed.recv() => self.land(landing),
                event = events.recv(), if listening => match event {
                    Ok(event) => self.notice(event),
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("[room] missed {} service events", n);
                        self.refresh();
                    }
                    Err(RecvError::Closed) => listening = false,
                },
                _ = matches.tick(), if self.polls_matches() => self.refresh(),
                _ = inbox.tick(), if self.polls_inbox() => self.check_inbox(),
                _ = clock.tick(), if self.ticks() => self.tick(),
            }
            self.publish();
        }
        token.cancel();
        log::info!("[room] coordinator down for {}", self.local);
    }
    /// Runs `work` off the actor and routes its result back, unless the
    /// coordinator shuts down first.
    fn detach<F>(&self, work: F)
    where
        F: Future<Output = Landing> + Send + 'static,
    {
        let token = self.token.clone();
        let landing = self.landing.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                landed = work => {
                    let _ = landing.send(landed);
                }
            }
        });
    }
    fn polls_matches(&self) -> bool {
        self.authorized
            && match self.phase {
                Phase::Searching | Phase::Pending => true,
                Phase::Ended => {
                    matches!(self.rematch, RematchState::Offered | RematchState::Accepted)
                }
                Phase::Idle | Phase::Active => false,
            }
    }
    fn polls_inbox(&self) -> bool {
        self.authorized && !matches!(self.phase, Phase::Searching | Phase::Pending)
    }
    fn ticks(&self) -> bool {
        self.authorized && self.phase == Phase::Active && !self.snapshot.position().is_over()
    }
}

impl SessionCoordinator {
    fn command(&mut self, command: Command) {
        log::debug!("[room] command {:?}", command);
        if !self.authorized {
            self.error = Some("signed out".to_string());
            return;
        }
        match command {
            Command::Start(mode) => self.start(mode),
            Command::Cancel => self.cancel(),
            Command::Refresh => self.refresh(),
            Command::Place(cell) => self.place(cell),
            Command::Resign => self.resign(),
            Command::Symbol(symbol) => self.symbol = Some(symbol),
            Command::Rematch => self.answer(RematchState::Offered),
            Command::AcceptRematch => self.answer(RematchState::Accepted),
            Command::DeclineRematch => self.answer(RematchState::Declined),
            Command::Befriend(player) => {
                let friends = self.friends.clone();
                let local = self.local;
                self.detach(async move {
                    Landing::Note(
                        friends
                            .send_request(local, player)
                            .await
                            .map(|_| ())
                            .map_err(RoomError::from),
                    )
                });
            }
            Command::AnswerFriend(sender, accept) => {
                self.friend_requests.retain(|p| *p != sender);
                let friends = self.friends.clone();
                let local = self.local;
                self.detach(async move {
                    Landing::Note(
                        friends
                            .respond(local, sender, accept)
                            .await
                            .map(|_| ())
                            .map_err(RoomError::from),
                    )
                });
            }
            Command::Shutdown => self.token.cancel(),
        }
    }
    fn start(&mut self, mode: Mode) {
        if self.phase == Phase::Active {
            self.error = Some("a match is already in play".to_string());
            return;
        }
        self.reset();
        self.cancelling = false;
        self.party = mode.party();
        self.phase = Phase::Searching;
        self.search(Probe::Start(mode));
    }
    fn cancel(&mut self) {
        if !matches!(self.phase, Phase::Searching | Phase::Pending) {
            return;
        }
        self.phase = Phase::Idle;
        self.queued = None;
        match self.lobby.take() {
            Some(mut lobby) => self.detach(async move {
                let result = lobby.cancel().await;
                Landing::Cancelled(lobby, result)
            }),
            None => self.cancelling = true,
        }
    }
    /// Lends the matchmaker to a task, or queues the probe until it returns.
    fn search(&mut self, probe: Probe) {
        let Some(mut lobby) = self.lobby.take() else {
            if !matches!(probe, Probe::Poll) {
                self.queued = Some(probe);
            }
            return;
        };
        let polled = matches!(probe, Probe::Poll);
        self.detach(async move {
            let result = match probe {
                Probe::Start(mode) => lobby.start(mode).await,
                Probe::Poll => lobby.poll().await,
                Probe::Adopt(session, party) => lobby.adopt(session, party).await,
            };
            Landing::Search(lobby, polled, result)
        });
    }
    fn refresh(&mut self) {
        match self.phase {
            Phase::Searching | Phase::Pending => self.search(Probe::Poll),
            Phase::Active => self.list(),
            Phase::Ended => {
                self.list();
                self.fetch_ticket();
            }
            Phase::Idle => {}
        }
    }
    fn list(&self) {
        let service = self.service.clone();
        let epoch = self.epoch;
        self.detach(async move { Landing::Listed(epoch, service.sessions().await) });
    }
    fn notice(&mut self, event: ServiceEvent) {
        log::debug!("[room] {:?} on {}", event.kind, event.id);
        match self.session.as_ref().is_some_and(|s| s.id == event.id) {
            true => self.list(),
            false => self.refresh(),
        }
    }
    fn place(&mut self, cell: Cell) {
        let Some(session) = self.playable() else {
            return;
        };
        let Some(seat) = session.seat_of(self.local) else {
            return;
        };
        if !session.holds_turn(self.local) {
            self.error = Some(SubmitError::NotYourTurn.to_string());
            return;
        }
        let next = match self.pipeline.play(
            &self.snapshot,
            seat,
            cell,
            self.symbol.as_deref(),
            self.referee.as_ref(),
        ) {
            Ok(next) => next,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };
        self.error = None;
        self.snapshot = next.clone();
        self.submitting = true;
        let pipeline = self.pipeline.clone();
        self.detach(async move { Landing::Submitted(pipeline.submit_turn(&session, &next).await) });
    }
    fn resign(&mut self) {
        let Some(session) = self.playable() else {
            return;
        };
        self.submitting = true;
        let pipeline = self.pipeline.clone();
        let snapshot = self.snapshot.clone();
        self.detach(async move { Landing::Submitted(pipeline.resign(&session, &snapshot).await) });
    }
    /// The current session if a turn may be submitted on it now.
    fn playable(&mut self) -> Option<Session> {
        if self.phase != Phase::Active {
            self.error = Some(SubmitError::NotActive.to_string());
            return None;
        }
        if self.submitting {
            self.error = Some("a turn is already being submitted".to_string());
            return None;
        }
        self.session.clone().filter(|s| !s.is_ended())
    }
    fn answer(&mut self, intent: RematchState) {
        let Some(origin) = self.origin.filter(|_| self.phase == Phase::Ended) else {
            self.error = Some("no finished match to rematch".to_string());
            return;
        };
        let negotiator = self.negotiator.clone();
        let local = self.local;
        self.detach(async move {
            let result = match intent {
                RematchState::Offered => negotiator.request(origin, local).await,
                RematchState::Accepted => negotiator.accept_incoming(origin, local).await,
                _ => negotiator.decline_incoming(origin, local).await,
            };
            Landing::Ticket(origin, result.map(Some))
        });
    }
    fn fetch_ticket(&self) {
        let Some(origin) = self.origin else {
            return;
        };
        let negotiator = self.negotiator.clone();
        self.detach(async move {
            let result = negotiator.ticket(origin).await.map_err(SyncError::from);
            Landing::Ticket(origin, result)
        });
    }
    fn check_inbox(&mut self) {
        if self.phase == Phase::Ended {
            self.settle();
        }
        let local = self.local;
        let friends = self.friends.clone();
        let presence = self.presence.clone();
        let negotiator = self.negotiator.clone();
        let origin = self.origin.filter(|_| self.phase == Phase::Ended);
        let opponent = self.session.as_ref().and_then(|s| s.opponent_of(local));
        self.detach(async move {
            let result = async {
                presence.heartbeat(local).await?;
                let friends = friends
                    .incoming(local)
                    .await?
                    .into_iter()
                    .map(|r| r.sender())
                    .collect();
                let ticket = match origin {
                    Some(origin) => Some((origin, negotiator.ticket(origin).await?)),
                    None => None,
                };
                let online = match opponent {
                    Some(opponent) => Some(presence.is_online(opponent).await?),
                    None => None,
                };
                Ok::<_, RoomError>(Inbox {
                    friends,
                    ticket,
                    online,
                })
            }
            .await;
            Landing::Inbox(result)
        });
    }
    /// Forfeits the local turn once its clock runs out.
    fn tick(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let now = self.clock.now();
        if self.submitting || !session.holds_turn(self.local) || !self.snapshot.expired(now) {
            return;
        }
        if session.blob.is_empty() {
            return;
        }
        log::info!("[room {}] local clock expired", session.id);
        self.submitting = true;
        let pipeline = self.pipeline.clone();
        let snapshot = self.snapshot.clone();
        self.detach(async move { Landing::Submitted(pipeline.timeout(&session, &snapshot).await) });
    }
}

impl SessionCoordinator {
    fn land(&mut self, landing: Landing) {
        match landing {
            Landing::Search(lobby, polled, result) => self.searched(lobby, polled, result),
            Landing::Cancelled(lobby, result) => {
                self.lobby = Some(lobby);
                if let Err(e) = result {
                    self.fail(RoomError::Service(e));
                }
                self.dequeue();
            }
            Landing::Listed(epoch, _) if epoch != self.epoch || self.submitting => {
                log::debug!("[room] dropping listing from before a submission");
            }
            Landing::Listed(_, Ok(listed)) => {
                let id = self.session.as_ref().map(|s| s.id);
                if let Some(current) = listed.into_iter().find(|s| Some(s.id) == id) {
                    self.apply(current);
                }
            }
            Landing::Listed(_, Err(e)) => self.retry_later(RoomError::Service(e)),
            Landing::Submitted(result) => {
                self.submitting = false;
                self.epoch += 1;
                match result {
                    Ok(session) => {
                        self.error = None;
                        self.apply(session);
                    }
                    Err(e) => {
                        log::warn!("[room] submit failed: {}", e);
                        if let Some(ref session) = self.session {
                            if !session.blob.is_empty() {
                                self.snapshot = session.snapshot().or_default();
                            }
                        }
                        match e {
                            SubmitError::Service(e) => self.fail(RoomError::Service(e)),
                            e => self.error = Some(e.to_string()),
                        }
                    }
                }
            }
            Landing::Ticket(origin, Ok(ticket)) => self.on_ticket(origin, ticket),
            Landing::Ticket(_, Err(e)) => self.fail(RoomError::Sync(e)),
            Landing::Successor(origin, result) => self.on_successor(origin, result),
            Landing::Tallied(id, result) => {
                self.tallying.remove(&id);
                match result {
                    Ok(tally) => {
                        self.tally = tally;
                        if let Err(e) = self.ledger.tally(id) {
                            log::warn!("[room] could not persist tally of {}: {}", id, e);
                        }
                    }
                    Err(e) => self.fail(RoomError::Sync(e)),
                }
            }
            Landing::Tally(opponent, Ok(tally)) => {
                if self.opponent() == Some(opponent) {
                    self.tally = tally;
                }
            }
            Landing::Tally(_, Err(e)) => self.fail(RoomError::Store(e)),
            Landing::OpponentRating(opponent, Ok(rating)) => {
                if let Some(rating) = rating {
                    self.book.remember(opponent, rating);
                }
            }
            Landing::OpponentRating(_, Err(e)) => self.fail(RoomError::Store(e)),
            Landing::Inbox(Ok(inbox)) => {
                self.friend_requests = inbox.friends;
                if inbox.online.is_some() {
                    self.opponent_online = inbox.online;
                }
                if let Some((origin, ticket)) = inbox.ticket {
                    self.on_ticket(origin, ticket);
                }
            }
            Landing::Inbox(Err(e)) => self.retry_later(e),
            Landing::Note(Ok(())) => {}
            Landing::Note(Err(e)) => self.fail(e),
        }
    }
    fn searched(
        &mut self,
        lobby: Box<Matchmaker>,
        polled: bool,
        result: Result<Option<Session>, ServiceError>,
    ) {
        let phase = lobby.phase();
        self.lobby = Some(lobby);
        if self.cancelling {
            self.cancelling = false;
            self.cancel_lobby();
            return;
        }
        match result {
            Ok(Some(session)) => self.enter(session),
            Ok(None) => {
                if matches!(self.phase, Phase::Searching | Phase::Pending) {
                    self.phase = phase;
                }
            }
            Err(e) if polled => self.retry_later(RoomError::Service(e)),
            Err(e) => self.fail(RoomError::Service(e)),
        }
        self.dequeue();
    }
    fn cancel_lobby(&mut self) {
        if let Some(mut lobby) = self.lobby.take() {
            self.detach(async move {
                let result = lobby.cancel().await;
                Landing::Cancelled(lobby, result)
            });
        }
    }
    fn dequeue(&mut self) {
        if let Some(probe) = self.queued.take() {
            self.search(probe);
        }
    }
    /// Makes `session` the one match shown to the player.
    fn enter(&mut self, session: Session) {
        log::info!("[room] entering {}", session);
        self.phase = Phase::Active;
        self.error = None;
        self.origin = None;
        self.rematch = RematchState::None;
        self.submitting = false;
        self.snapshot = match session.snapshot() {
            Blob::Empty => GameSnapshot::default(),
            blob => blob.or_default(),
        };
        self.party = self.snapshot.party().or(self.party);
        if let Some(opponent) = session.opponent_of(self.local) {
            let cards = self.cards.clone();
            let rivalry = self.rivalry.clone();
            let local = self.local;
            self.detach(async move {
                Landing::OpponentRating(opponent, cards.fetch(opponent).await)
            });
            self.detach(async move {
                Landing::Tally(opponent, rivalry.tally(local, opponent).await)
            });
        }
        self.session = Some(session.clone());
        self.apply(session);
    }
    /// Folds a fresher copy of the current session into local state.
    fn apply(&mut self, session: Session) {
        if self.session.as_ref().is_none_or(|s| s.id != session.id) {
            return;
        }
        if !self.submitting && !session.blob.is_empty() {
            self.snapshot = session.snapshot().or_default();
        }
        let ended = session.is_ended();
        self.session = Some(session);
        if ended && self.phase == Phase::Active {
            self.finish();
        }
    }
    fn finish(&mut self) {
        let Some(id) = self.session.as_ref().map(|s| s.id) else {
            return;
        };
        log::info!("[room {}] match over", id);
        self.phase = Phase::Ended;
        self.origin = Some(id);
        self.rematch = RematchState::None;
        if let Some(ref mut lobby) = self.lobby {
            lobby.release();
        }
        self.settle();
    }
    /// Applies the local rating change and the shared head-to-head update
    /// for the ended match, each at most once.
    fn settle(&mut self) {
        let Some(session) = self.session.clone().filter(Session::is_ended) else {
            return;
        };
        let Some(opponent) = session.opponent_of(self.local) else {
            return;
        };
        let score = match session.outcome_of(self.local) {
            Outcome::Won => Score::Win,
            Outcome::Lost | Outcome::Quit => Score::Loss,
            Outcome::Tied => Score::Draw,
            Outcome::None => return,
        };
        if !self.ledger.is_rated(session.id) {
            let theirs = self.book.opponent(opponent);
            match self.ledger.rate(session.id, theirs, score, self.config.k) {
                Ok(Some(rating)) => {
                    self.book.set_local(rating);
                    let cards = self.cards.clone();
                    let local = self.local;
                    self.detach(async move {
                        Landing::Note(cards.publish(local, rating).await.map_err(RoomError::from))
                    });
                }
                Ok(None) => {}
                Err(e) => self.error = Some(format!("rating not saved: {}", e)),
            }
        }
        if !self.ledger.is_tallied(session.id) && self.tallying.insert(session.id) {
            let rivalry = self.rivalry.clone();
            let local = self.local;
            let id = session.id;
            self.detach(async move {
                Landing::Tallied(id, rivalry.record_result(id, local, opponent, score).await)
            });
        }
    }
    fn on_ticket(&mut self, origin: ID<Match>, ticket: Option<RematchTicket>) {
        if self.origin != Some(origin) || self.phase != Phase::Ended {
            return;
        }
        let Some(ticket) = ticket else {
            return;
        };
        self.rematch = match ticket.status() {
            RematchStatus::Pending if ticket.requester() == self.local => RematchState::Offered,
            RematchStatus::Pending => RematchState::Incoming,
            RematchStatus::Declined => RematchState::Declined,
            RematchStatus::Accepted => RematchState::Accepted,
        };
        if ticket.status() != RematchStatus::Accepted {
            return;
        }
        match (ticket.successor(), ticket.creator()) {
            (Some(id), Some(creator)) if creator != self.local => {
                if self.successor.claim(origin) {
                    let service = self.service.clone();
                    self.detach(async move {
                        Landing::Successor(origin, Successor::join(service.as_ref(), id).await)
                    });
                }
            }
            (None, Some(creator)) if creator == self.local => {
                if self.successor.claim(origin) {
                    let service = self.service.clone();
                    let negotiator = self.negotiator.clone();
                    self.detach(async move {
                        let result = Successor::create(service.as_ref(), &negotiator, origin).await;
                        Landing::Successor(origin, result)
                    });
                }
            }
            _ => {}
        }
    }
    fn on_successor(&mut self, origin: ID<Match>, result: Result<Session, RoomError>) {
        match result {
            Ok(session) if self.origin == Some(origin) && self.phase == Phase::Ended => {
                log::info!("[rematch {}] moving to {}", origin, session.id);
                let party = self.party;
                self.reset();
                self.party = party;
                self.phase = Phase::Pending;
                self.search(Probe::Adopt(session, party));
            }
            Ok(session) => {
                log::debug!("[rematch {}] ignoring late successor {}", origin, session.id)
            }
            Err(e) => {
                self.successor.forget(origin);
                self.fail(e);
            }
        }
    }
    /// Clears per-match state ahead of a new search.
    fn reset(&mut self) {
        self.session = None;
        self.snapshot = GameSnapshot::default();
        self.submitting = false;
        self.origin = None;
        self.rematch = RematchState::None;
        self.tally = Tally::default();
        self.opponent_online = None;
        self.error = None;
    }
    fn fail(&mut self, e: RoomError) {
        if e.is_unauthorized() {
            self.halt();
            return;
        }
        log::warn!("[room] {}", e);
        self.error = Some(e.to_string());
    }
    /// Poll failures stay out of the view; the next tick tries again.
    fn retry_later(&mut self, e: RoomError) {
        match e.is_unauthorized() {
            true => self.halt(),
            false => log::debug!("[room] poll failed, retrying: {}", e),
        }
    }
    /// Stops all polling after the service signs the player out.
    fn halt(&mut self) {
        if self.authorized {
            log::warn!("[room] signed out; polling stopped");
        }
        self.authorized = false;
        self.error = Some(ServiceError::Unauthorized.to_string());
    }
    fn opponent(&self) -> Option<ID<Player>> {
        self.session.as_ref().and_then(|s| s.opponent_of(self.local))
    }
    fn publish(&self) {
        let now = self.clock.now();
        let session = self.session.as_ref();
        let opponent = self.opponent();
        let live = self.phase == Phase::Active && session.is_some_and(|s| !s.blob.is_empty());
        let clocks = ByMark {
            x: self.remaining(Mark::X, now, live),
            o: self.remaining(Mark::O, now, live),
        };
        let view = SessionView {
            phase: self.phase,
            session: session.map(|s| s.id),
            party: self.party,
            seat: session.and_then(|s| s.seat_of(self.local)),
            opponent,
            snapshot: self.snapshot.clone(),
            my_turn: self.phase == Phase::Active
                && !self.submitting
                && session.is_some_and(|s| s.holds_turn(self.local)),
            clocks,
            outcome: session.map(|s| s.outcome_of(self.local)).unwrap_or_default(),
            rating: self.book.local(),
            opponent_rating: opponent
                .filter(|p| self.book.is_known(*p))
                .map(|p| self.book.opponent(p)),
            tally: self.tally,
            rematch: self.rematch,
            friend_requests: self.friend_requests.clone(),
            opponent_online: self.opponent_online,
            error: self.error.clone(),
            signed_out: !self.authorized,
        };
        self.view.send_if_modified(|current| {
            let changed = *current != view;
            if changed {
                *current = view;
            }
            changed
        });
    }
    fn remaining(&self, mark: Mark, now: Millis, live: bool) -> Millis {
        match live {
            true => self.snapshot.remaining(mark, now),
            false => self.snapshot.stamped(mark),
        }
    }
}
