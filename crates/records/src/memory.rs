use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Shelf {
    records: HashMap<String, Record>,
    version: u64,
    contend: bool,
    offline: bool,
}

/// In-process [`RecordStore`] for tests and the demo binary.
///
/// Clones share one shelf. Every call yields to the scheduler before it
/// touches the shelf so that concurrent read-modify-write cycles interleave
/// the way they would against a remote store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shelf: Arc<Mutex<Shelf>>,
}

impl MemoryStore {
    /// While set, every conditional put loses as if another writer got there first.
    pub async fn contend(&self, on: bool) {
        self.shelf.lock().await.contend = on;
    }
    /// While set, every call fails with a transport error.
    pub async fn offline(&self, on: bool) {
        self.shelf.lock().await.offline = on;
    }
    pub async fn peek(&self, key: &str) -> Option<Record> {
        self.shelf.lock().await.records.get(key).cloned()
    }
    pub async fn len(&self) -> usize {
        self.shelf.lock().await.records.len()
    }
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl MemoryStore {
    async fn open(&self) -> Result<tokio::sync::MutexGuard<'_, Shelf>, StoreError> {
        tokio::task::yield_now().await;
        let shelf = self.shelf.lock().await;
        match shelf.offline {
            true => Err(StoreError::Transport("memory store offline".to_string())),
            false => Ok(shelf),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.open().await?.records.get(key).cloned())
    }
    async fn put(&self, record: Record, expect: Expect) -> Result<Record, StoreError> {
        let mut shelf = self.open().await?;
        let key = record.key().to_string();
        let contended = shelf.contend && expect != Expect::Any;
        if contended || !expect.admits(shelf.records.get(&key)) {
            log::trace!("[memory] rejected put {} expecting {}", key, expect);
            return Err(StoreError::Conflict(key));
        }
        shelf.version += 1;
        let stored = record.versioned(shelf.version);
        shelf.records.insert(key, stored.clone());
        Ok(stored)
    }
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.open().await?.records.remove(key);
        Ok(())
    }
}
