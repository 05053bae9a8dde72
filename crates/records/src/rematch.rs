use super::*;
use duel_core::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RematchStatus {
    Pending,
    Accepted,
    Declined,
}

/// Shared negotiation state for the single rematch attempt of one ended match.
///
/// A second request from the other side flips Pending to Accepted and makes
/// that side the [`creator`](RematchTicket::creator) of the successor session.
/// Declined is terminal. Linking a successor consumes the ticket without
/// deleting it, so a later request still sees that the attempt was spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RematchTicket {
    origin: ID<Match>,
    requester: ID<Player>,
    #[serde(default)]
    responder: Option<ID<Player>>,
    status: RematchStatus,
    #[serde(default)]
    successor: Option<ID<Match>>,
    #[serde(default)]
    updated_at: Millis,
}

impl RematchTicket {
    pub fn key_for(origin: ID<Match>) -> String {
        format!("rematch:{}", origin)
    }
    pub fn origin(&self) -> ID<Match> {
        self.origin
    }
    pub fn requester(&self) -> ID<Player> {
        self.requester
    }
    pub fn responder(&self) -> Option<ID<Player>> {
        self.responder
    }
    pub fn status(&self) -> RematchStatus {
        self.status
    }
    pub fn successor(&self) -> Option<ID<Match>> {
        self.successor
    }
    pub fn updated_at(&self) -> Millis {
        self.updated_at
    }
    pub fn is_consumed(&self) -> bool {
        self.successor.is_some()
    }
    /// The side responsible for creating the successor session.
    pub fn creator(&self) -> Option<ID<Player>> {
        match self.status {
            RematchStatus::Accepted => self.responder,
            _ => None,
        }
    }
    /// An offer from someone other than `local` still awaiting an answer.
    pub fn is_incoming(&self, local: ID<Player>) -> bool {
        self.status == RematchStatus::Pending && self.requester != local
    }
}

impl Document for RematchTicket {
    fn key(&self) -> String {
        Self::key_for(self.origin)
    }
}

/// Pure transitions over the current ticket.
impl RematchTicket {
    fn request(
        current: Option<&Self>,
        origin: ID<Match>,
        local: ID<Player>,
        now: Millis,
    ) -> Step<Self> {
        match current {
            None => Step::Write(Self {
                origin,
                requester: local,
                responder: None,
                status: RematchStatus::Pending,
                successor: None,
                updated_at: now,
            }),
            Some(t) if t.is_incoming(local) => {
                Step::Write(t.answered(local, RematchStatus::Accepted, now))
            }
            Some(t) if t.status == RematchStatus::Pending => Step::Write(Self {
                updated_at: now,
                ..t.clone()
            }),
            Some(t) => Step::Done(t.clone()),
        }
    }
    fn respond(
        current: Option<&Self>,
        local: ID<Player>,
        status: RematchStatus,
        now: Millis,
    ) -> Step<Self> {
        match current {
            Some(t) if t.is_incoming(local) => Step::Write(t.answered(local, status, now)),
            Some(t) if t.status == status && t.responder == Some(local) => Step::Done(t.clone()),
            Some(t) => Step::Abort(SyncError::Rejected(format!(
                "rematch {} is {:?}",
                t.origin, t.status
            ))),
            None => Step::Abort(SyncError::Rejected("no rematch offer".to_string())),
        }
    }
    fn link(current: Option<&Self>, successor: ID<Match>) -> Step<Self> {
        match current {
            Some(t) if t.successor == Some(successor) => Step::Done(t.clone()),
            Some(t) if t.status == RematchStatus::Accepted && t.successor.is_none() => {
                Step::Write(Self {
                    successor: Some(successor),
                    ..t.clone()
                })
            }
            Some(t) => Step::Abort(SyncError::Rejected(format!(
                "rematch {} cannot take successor {}",
                t.origin, successor
            ))),
            None => Step::Abort(SyncError::Rejected("no rematch to link".to_string())),
        }
    }
    fn answered(&self, local: ID<Player>, status: RematchStatus, now: Millis) -> Self {
        Self {
            responder: Some(local),
            status,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Negotiates rematches through the shared store.
#[derive(Clone)]
pub struct Negotiator {
    records: Records,
    clock: Arc<dyn Clock>,
}

impl Negotiator {
    pub fn new(records: Records, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }
    /// Offers a rematch, or accepts the opponent's standing offer.
    /// The returned ticket names the successor's creator once accepted.
    pub async fn request(
        &self,
        origin: ID<Match>,
        local: ID<Player>,
    ) -> Result<RematchTicket, SyncError> {
        let now = self.clock.now();
        let ticket = self
            .records
            .reconcile(&RematchTicket::key_for(origin), |t| {
                RematchTicket::request(t, origin, local, now)
            })
            .await?;
        log::info!("[rematch {}] requested -> {:?}", origin, ticket.status());
        Ok(ticket)
    }
    pub async fn accept_incoming(
        &self,
        origin: ID<Match>,
        local: ID<Player>,
    ) -> Result<RematchTicket, SyncError> {
        self.respond(origin, local, RematchStatus::Accepted).await
    }
    pub async fn decline_incoming(
        &self,
        origin: ID<Match>,
        local: ID<Player>,
    ) -> Result<RematchTicket, SyncError> {
        self.respond(origin, local, RematchStatus::Declined).await
    }
    /// The opponent's unanswered offer for this match, if any.
    pub async fn incoming(
        &self,
        origin: ID<Match>,
        local: ID<Player>,
    ) -> Result<Option<RematchTicket>, StoreError> {
        Ok(self
            .ticket(origin)
            .await?
            .filter(|t| t.is_incoming(local)))
    }
    pub async fn ticket(&self, origin: ID<Match>) -> Result<Option<RematchTicket>, StoreError> {
        self.records.load(&RematchTicket::key_for(origin)).await
    }
    /// Consumes an accepted ticket by recording the successor session.
    pub async fn link(
        &self,
        origin: ID<Match>,
        successor: ID<Match>,
    ) -> Result<RematchTicket, SyncError> {
        let ticket = self
            .records
            .reconcile(&RematchTicket::key_for(origin), |t| RematchTicket::link(t, successor))
            .await?;
        log::info!("[rematch {}] linked successor {}", origin, successor);
        Ok(ticket)
    }
    async fn respond(
        &self,
        origin: ID<Match>,
        local: ID<Player>,
        status: RematchStatus,
    ) -> Result<RematchTicket, SyncError> {
        let now = self.clock.now();
        let ticket = self
            .records
            .reconcile(&RematchTicket::key_for(origin), |t| {
                RematchTicket::respond(t, local, status, now)
            })
            .await?;
        log::info!("[rematch {}] answered {:?}", origin, ticket.status());
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiator(store: &MemoryStore) -> Negotiator {
        Negotiator::new(
            Records::new(Arc::new(store.clone())),
            Arc::new(ManualClock::at(1_000)),
        )
    }

    #[tokio::test]
    async fn second_request_accepts() {
        let store = MemoryStore::default();
        let n = negotiator(&store);
        let (origin, alice, bob) = (ID::default(), ID::default(), ID::default());
        let t = n.request(origin, alice).await.unwrap();
        assert_eq!(t.status(), RematchStatus::Pending);
        assert_eq!(t.creator(), None);
        assert!(n.incoming(origin, bob).await.unwrap().is_some());
        assert!(n.incoming(origin, alice).await.unwrap().is_none());
        let t = n.request(origin, bob).await.unwrap();
        assert_eq!(t.status(), RematchStatus::Accepted);
        assert_eq!(t.creator(), Some(bob));
        assert!(n.incoming(origin, bob).await.unwrap().is_none());
    }
    #[tokio::test]
    async fn repeated_request_stays_pending() {
        let store = MemoryStore::default();
        let n = negotiator(&store);
        let (origin, alice) = (ID::default(), ID::default());
        n.request(origin, alice).await.unwrap();
        let t = n.request(origin, alice).await.unwrap();
        assert_eq!(t.status(), RematchStatus::Pending);
        assert_eq!(t.requester(), alice);
    }
    #[tokio::test]
    async fn concurrent_requests_accept_exactly_once() {
        let store = MemoryStore::default();
        let (a, b) = (negotiator(&store), negotiator(&store));
        let (origin, alice, bob) = (ID::default(), ID::default(), ID::default());
        let (ta, tb) = tokio::join!(a.request(origin, alice), b.request(origin, bob));
        let (ta, tb) = (ta.unwrap(), tb.unwrap());
        let accepted = [&ta, &tb]
            .iter()
            .filter(|t| t.status() == RematchStatus::Accepted)
            .count();
        assert_eq!(accepted, 1);
        let stored = a.ticket(origin).await.unwrap().unwrap();
        assert_eq!(stored.status(), RematchStatus::Accepted);
        assert_ne!(stored.creator(), Some(stored.requester()));
    }
    #[tokio::test]
    async fn decline_is_terminal() {
        let store = MemoryStore::default();
        let n = negotiator(&store);
        let (origin, alice, bob) = (ID::default(), ID::default(), ID::default());
        n.request(origin, alice).await.unwrap();
        assert!(n.decline_incoming(origin, alice).await.is_err());
        let t = n.decline_incoming(origin, bob).await.unwrap();
        assert_eq!(t.status(), RematchStatus::Declined);
        assert_eq!(n.decline_incoming(origin, bob).await.unwrap(), t);
        let again = n.request(origin, alice).await.unwrap();
        assert_eq!(again.status(), RematchStatus::Declined);
        assert!(n.accept_incoming(origin, bob).await.is_err());
    }
    #[tokio::test]
    async fn accept_requires_an_offer() {
        let store = MemoryStore::default();
        let n = negotiator(&store);
        let (origin, bob) = (ID::default(), ID::default());
        assert!(matches!(
            n.accept_incoming(origin, bob).await,
            Err(SyncError::Rejected(_))
        ));
    }
    #[tokio::test]
    async fn link_consumes_once() {
        let store = MemoryStore::default();
        let n = negotiator(&store);
        let (origin, alice, bob) = (ID::default(), ID::default(), ID::default());
        let (first, second) = (ID::default(), ID::default());
        n.request(origin, alice).await.unwrap();
        assert!(n.link(origin, first).await.is_err());
        n.accept_incoming(origin, bob).await.unwrap();
        let t = n.link(origin, first).await.unwrap();
        assert!(t.is_consumed());
        assert_eq!(n.link(origin, first).await.unwrap().successor(), Some(first));
        assert!(n.link(origin, second).await.is_err());
        let t = n.request(origin, alice).await.unwrap();
        assert_eq!(t.successor(), Some(first));
    }
}
