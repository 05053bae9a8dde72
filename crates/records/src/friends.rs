use super::*;
use duel_core::*;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A friend request, keyed by the ordered (sender, receiver) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    sender: ID<Player>,
    receiver: ID<Player>,
    status: FriendStatus,
    #[serde(default)]
    updated_at: Millis,
}

impl FriendRequest {
    pub fn key_for(sender: ID<Player>, receiver: ID<Player>) -> String {
        format!("friend:{}:{}", sender, receiver)
    }
    pub fn sender(&self) -> ID<Player> {
        self.sender
    }
    pub fn receiver(&self) -> ID<Player> {
        self.receiver
    }
    pub fn status(&self) -> FriendStatus {
        self.status
    }
}

impl Document for FriendRequest {
    fn key(&self) -> String {
        Self::key_for(self.sender, self.receiver)
    }
}

/// Senders who have ever asked `receiver`, so requests can be found
/// without a listing primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendInbox {
    receiver: ID<Player>,
    #[serde(default)]
    senders: BTreeSet<ID<Player>>,
}

impl FriendInbox {
    pub fn key_for(receiver: ID<Player>) -> String {
        format!("friend-inbox:{}", receiver)
    }
}

impl Document for FriendInbox {
    fn key(&self) -> String {
        Self::key_for(self.receiver)
    }
}

#[derive(Clone)]
pub struct Friends {
    records: Records,
    clock: Arc<dyn Clock>,
}

impl Friends {
    pub fn new(records: Records, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }
    /// Asks `receiver` to be friends. A request already pending is left alone;
    /// a rejected one is re-opened.
    pub async fn send_request(
        &self,
        local: ID<Player>,
        receiver: ID<Player>,
    ) -> Result<FriendRequest, SyncError> {
        if local == receiver {
            return Err(SyncError::Rejected("cannot befriend yourself".to_string()));
        }
        let now = self.clock.now();
        let key = FriendRequest::key_for(local, receiver);
        let request = self
            .records
            .reconcile(&key, |current: Option<&FriendRequest>| match current {
                Some(r) if r.status != FriendStatus::Rejected => Step::Done(r.clone()),
                _ => Step::Write(FriendRequest {
                    sender: local,
                    receiver,
                    status: FriendStatus::Pending,
                    updated_at: now,
                }),
            })
            .await?;
        let key = FriendInbox::key_for(receiver);
        self.records
            .reconcile(&key, |current: Option<&FriendInbox>| match current {
                Some(inbox) if inbox.senders.contains(&local) => Step::Done(inbox.clone()),
                Some(inbox) => {
                    let mut inbox = inbox.clone();
                    inbox.senders.insert(local);
                    Step::Write(inbox)
                }
                None => Step::Write(FriendInbox {
                    receiver,
                    senders: BTreeSet::from([local]),
                }),
            })
            .await?;
        log::info!("[friends] {} -> {} {:?}", local, receiver, request.status);
        Ok(request)
    }
    /// Answers a pending request from `sender` to `local`.
    pub async fn respond(
        &self,
        local: ID<Player>,
        sender: ID<Player>,
        accept: bool,
    ) -> Result<FriendRequest, SyncError> {
        let status = match accept {
            true => FriendStatus::Accepted,
            false => FriendStatus::Rejected,
        };
        let now = self.clock.now();
        let key = FriendRequest::key_for(sender, local);
        let request = self
            .records
            .reconcile(&key, |current: Option<&FriendRequest>| match current {
                Some(r) if r.status == FriendStatus::Pending => Step::Write(FriendRequest {
                    status,
                    updated_at: now,
                    ..r.clone()
                }),
                Some(r) if r.status == status => Step::Done(r.clone()),
                Some(r) => Step::Abort(SyncError::Rejected(format!(
                    "request from {} is {:?}",
                    sender, r.status
                ))),
                None => Step::Abort(SyncError::Rejected(format!("no request from {}", sender))),
            })
            .await?;
        log::info!("[friends] {} answered {} {:?}", local, sender, request.status);
        Ok(request)
    }
    /// Requests addressed to `local` that still await an answer.
    pub async fn incoming(&self, local: ID<Player>) -> Result<Vec<FriendRequest>, StoreError> {
        let Some(inbox) = self
            .records
            .load::<FriendInbox>(&FriendInbox::key_for(local))
            .await?
        else {
            return Ok(Vec::new());
        };
        let mut pending = Vec::new();
        for sender in inbox.senders {
            if let Some(request) = self
                .records
                .load::<FriendRequest>(&FriendRequest::key_for(sender, local))
                .await?
                .filter(|r| r.status == FriendStatus::Pending)
            {
                pending.push(request);
            }
        }
        Ok(pending)
    }
}
