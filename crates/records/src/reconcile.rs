use super::*;
use duel_core::CAS_ATTEMPTS;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of one pure transition over the current copy of a record.
#[derive(Debug)]
pub enum Step<T> {
    /// Conditionally write this value over the copy that was read.
    Write(T),
    /// The store already reflects the desired state.
    Done(T),
    /// The transition does not apply.
    Abort(SyncError),
}

/// Typed access to a [`RecordStore`].
///
/// All read-modify-write traffic goes through [`Records::reconcile`], which
/// re-reads and re-applies the step after every lost conditional write and
/// gives up with [`SyncError::RetryLimit`] once the attempt ceiling is spent.
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn RecordStore>,
    attempts: usize,
}

impl Records {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            attempts: CAS_ATTEMPTS,
        }
    }
    pub fn with_attempts(self, attempts: usize) -> Self {
        Self {
            attempts: attempts.max(1),
            ..self
        }
    }
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl Records {
    /// Reads a document. Unreadable records are reported as absent.
    pub async fn load<T: Document>(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|ref record| Self::decode(record)))
    }
    /// Unconditional write for single-writer keys.
    pub async fn upsert<T: Document>(&self, doc: &T) -> Result<(), StoreError> {
        let record = Self::encode(&doc.key(), doc)?;
        self.store.put(record, Expect::Any).await.map(|_| ())
    }
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await
    }
    /// Drives `step` against the stored copy of `key` until a write lands,
    /// the step reports the target state already holds, or attempts run out.
    /// The copy behind the last lost write is still read once more, since a
    /// peer may have written the target state itself.
    pub async fn reconcile<T, F>(&self, key: &str, mut step: F) -> Result<T, SyncError>
    where
        T: Document,
        F: FnMut(Option<&T>) -> Step<T> + Send,
    {
        let mut attempt = 0;
        loop {
            let (current, expect) = self.read::<T>(key).await?;
            let next = match step(current.as_ref()) {
                Step::Done(value) => return Ok(value),
                Step::Abort(e) => return Err(e),
                Step::Write(value) => value,
            };
            if attempt == self.attempts {
                log::warn!("[records] {} still contended after {} attempts", key, attempt);
                return Err(SyncError::RetryLimit {
                    key: key.to_string(),
                    attempts: self.attempts,
                });
            }
            attempt += 1;
            match self.store.put(Self::encode(key, &next)?, expect).await {
                Ok(_) => return Ok(next),
                Err(StoreError::Conflict(_)) => {
                    log::debug!("[records] conflict on {} (attempt {})", key, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Records {
    async fn read<T: Document>(&self, key: &str) -> Result<(Option<T>, Expect), StoreError> {
        Ok(match self.store.get(key).await? {
            None => (None, Expect::Absent),
            Some(ref record) => (Self::decode::<T>(record), Expect::Version(record.version())),
        })
    }
    fn encode<T: Document>(key: &str, doc: &T) -> Result<Record, StoreError> {
        match serde_json::to_value(doc) {
            Ok(Value::Object(fields)) => Ok(Record::new(key, fields)),
            Ok(_) => Err(StoreError::Malformed(format!("{} is not a field bag", key))),
            Err(e) => Err(StoreError::Malformed(format!("{}: {}", key, e))),
        }
    }
    fn decode<T: Document>(record: &Record) -> Option<T> {
        serde_json::from_value(Value::Object(record.fields().clone()))
            .inspect_err(|e| log::warn!("[records] unreadable {}: {}", record.key(), e))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        n: u32,
    }

    impl Document for Counter {
        fn key(&self) -> String {
            "counter".to_string()
        }
    }

    /// Loses every conditional write; during the last one a peer lands `peer`.
    struct Overtaken {
        inner: MemoryStore,
        losses: AtomicUsize,
        last: usize,
        peer: Counter,
    }

    #[async_trait::async_trait]
    impl RecordStore for Overtaken {
        async fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
            self.inner.get(key).await
        }
        async fn put(&self, record: Record, _: Expect) -> Result<Record, StoreError> {
            if self.losses.fetch_add(1, Ordering::SeqCst) + 1 == self.last {
                let peer = Records::encode("counter", &self.peer)?;
                self.inner.put(peer, Expect::Any).await?;
            }
            Err(StoreError::Conflict(record.key().to_string()))
        }
        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    fn at_least_one(current: Option<&Counter>) -> Step<Counter> {
        match current {
            Some(c) if c.n >= 1 => Step::Done(c.clone()),
            _ => Step::Write(Counter { n: 1 }),
        }
    }

    fn bump(current: Option<&Counter>) -> Step<Counter> {
        Step::Write(Counter {
            n: current.map(|c| c.n).unwrap_or_default() + 1,
        })
    }

    #[tokio::test]
    async fn writes_then_reads_back() {
        let records = Records::new(Arc::new(MemoryStore::default()));
        assert_eq!(records.load::<Counter>("counter").await.unwrap(), None);
        records.reconcile("counter", bump).await.unwrap();
        records.reconcile("counter", bump).await.unwrap();
        let counter = records.load::<Counter>("counter").await.unwrap();
        assert_eq!(counter, Some(Counter { n: 2 }));
    }
    #[tokio::test]
    async fn done_skips_the_write() {
        let store = MemoryStore::default();
        let records = Records::new(Arc::new(store.clone()));
        let out = records
            .reconcile("counter", |_: Option<&Counter>| Step::Done(Counter { n: 9 }))
            .await
            .unwrap();
        assert_eq!(out.n, 9);
        assert_eq!(store.len().await, 0);
    }
    #[tokio::test]
    async fn persistent_conflict_hits_the_ceiling() {
        let store = MemoryStore::default();
        store.contend(true).await;
        let records = Records::new(Arc::new(store)).with_attempts(CAS_ATTEMPTS);
        let err = records.reconcile("counter", bump).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::RetryLimit {
                key: "counter".to_string(),
                attempts: CAS_ATTEMPTS,
            }
        );
        assert!(err.is_retry_limit());
    }
    #[tokio::test]
    async fn peer_write_during_last_conflict_counts_as_success() {
        let store = Overtaken {
            inner: MemoryStore::default(),
            losses: AtomicUsize::new(0),
            last: CAS_ATTEMPTS,
            peer: Counter { n: 1 },
        };
        let records = Records::new(Arc::new(store));
        let out = records.reconcile("counter", at_least_one).await.unwrap();
        assert_eq!(out, Counter { n: 1 });
    }
    #[tokio::test]
    async fn transport_failure_is_not_a_retry_limit() {
        let store = MemoryStore::default();
        store.offline(true).await;
        let records = Records::new(Arc::new(store));
        let err = records.reconcile("counter", bump).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::Transport(_))));
    }
    #[tokio::test]
    async fn garbage_reads_as_absent_but_is_overwritten_conditionally() {
        let store = MemoryStore::default();
        let mut fields = serde_json::Map::new();
        fields.insert("n".to_string(), Value::String("seven".to_string()));
        store.put(Record::new("counter", fields), Expect::Any).await.unwrap();
        let records = Records::new(Arc::new(store));
        assert_eq!(records.load::<Counter>("counter").await.unwrap(), None);
        let out = records.reconcile("counter", bump).await.unwrap();
        assert_eq!(out.n, 1);
    }
}
