use super::*;
use duel_core::*;
use duel_lobby::*;
use duel_records::Negotiator;
use std::collections::HashSet;

/// Remembers which ended matches this device has already tried to follow
/// with a rematch session, so creation and joining happen at most once each.
#[derive(Debug, Default)]
pub struct Successor {
    attempted: HashSet<ID<Match>>,
}

impl Successor {
    /// True the first time it is called for `origin`.
    pub fn claim(&mut self, origin: ID<Match>) -> bool {
        self.attempted.insert(origin)
    }
    pub fn is_attempted(&self, origin: ID<Match>) -> bool {
        self.attempted.contains(&origin)
    }
    /// Releases a claim so a failed attempt can be retried on a later poll.
    pub fn forget(&mut self, origin: ID<Match>) {
        self.attempted.remove(&origin);
    }
}

impl Successor {
    /// Creates the successor session and consumes the ticket by linking it.
    /// A session that cannot be linked is removed again.
    pub async fn create(
        service: &dyn MatchService,
        negotiator: &Negotiator,
        origin: ID<Match>,
    ) -> Result<Session, RoomError> {
        let session = service.rematch(origin).await?;
        match negotiator.link(origin, session.id).await {
            Ok(_) => {
                log::info!("[rematch {}] created successor {}", origin, session.id);
                Ok(session)
            }
            Err(e) => {
                log::warn!("[rematch {}] could not link {}: {}", origin, session.id, e);
                if let Err(e) = service.remove(session.id).await {
                    log::warn!("[rematch {}] could not remove {}: {}", origin, session.id, e);
                }
                Err(e.into())
            }
        }
    }
    /// Accepts the invitation to a linked successor. Already-accepted
    /// invitations resolve from the listing instead.
    pub async fn join(service: &dyn MatchService, id: ID<Match>) -> Result<Session, RoomError> {
        match service.accept_invite(id).await {
            Ok(session) => {
                log::info!("[rematch] joined successor {}", id);
                Ok(session)
            }
            Err(ServiceError::Rejected(reason)) => service
                .sessions()
                .await?
                .into_iter()
                .find(|s| s.id == id)
                .ok_or_else(|| RoomError::Service(ServiceError::Rejected(reason))),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_records::MemoryStore;
    use duel_records::Records;
    use std::sync::Arc;

    #[test]
    fn claims_once() {
        let mut successor = Successor::default();
        let origin = ID::default();
        assert!(successor.claim(origin));
        assert!(!successor.claim(origin));
        assert!(successor.is_attempted(origin));
        successor.forget(origin);
        assert!(successor.claim(origin));
    }
    #[tokio::test]
    async fn created_successor_is_linked_and_joinable() {
        let clock = Arc::new(ManualClock::at(0));
        let hub = MatchHub::new(clock.clone());
        let (a, b) = (hub.client(ID::default()).await, hub.client(ID::default()).await);
        let origin = a.find(FindRequest::open()).await.unwrap();
        b.find(FindRequest::open()).await.unwrap();
        a.end_match(origin.id, Vec::new(), [Outcome::Tied; SEATS])
            .await
            .unwrap();
        let negotiator = Negotiator::new(Records::new(Arc::new(MemoryStore::default())), clock);
        negotiator.request(origin.id, a.local()).await.unwrap();
        negotiator.request(origin.id, b.local()).await.unwrap();
        let created = Successor::create(&b, &negotiator, origin.id).await.unwrap();
        let ticket = negotiator.ticket(origin.id).await.unwrap().unwrap();
        assert_eq!(ticket.successor(), Some(created.id));
        let joined = Successor::join(&a, created.id).await.unwrap();
        assert_eq!(joined.phase(), Phase::Active);
        let again = Successor::join(&a, created.id).await.unwrap();
        assert_eq!(again.id, created.id);
    }
    #[tokio::test]
    async fn unlinkable_successor_is_removed() {
        let clock = Arc::new(ManualClock::at(0));
        let hub = MatchHub::new(clock.clone());
        let (a, b) = (hub.client(ID::default()).await, hub.client(ID::default()).await);
        let origin = a.find(FindRequest::open()).await.unwrap();
        b.find(FindRequest::open()).await.unwrap();
        a.end_match(origin.id, Vec::new(), [Outcome::Tied; SEATS])
            .await
            .unwrap();
        let negotiator = Negotiator::new(Records::new(Arc::new(MemoryStore::default())), clock);
        negotiator.request(origin.id, a.local()).await.unwrap();
        assert!(Successor::create(&a, &negotiator, origin.id).await.is_err());
        assert_eq!(hub.sessions().await.len(), 1);
    }
}
