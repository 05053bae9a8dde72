use super::*;
use serde_json::Map;
use serde_json::Value;

/// One keyed entry in the shared store: an opaque field bag plus the
/// version the store assigned on its last write.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    key: String,
    version: u64,
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(key: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            key: key.into(),
            version: 0,
            fields,
        }
    }
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn version(&self) -> u64 {
        self.version
    }
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
    /// Stamps the version assigned by a store on write.
    pub fn versioned(self, version: u64) -> Self {
        Self { version, ..self }
    }
}

/// Precondition for a conditional put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Unconditional write.
    Any,
    /// Only if no record exists under the key.
    Absent,
    /// Only if the stored record still carries this version.
    Version(u64),
}

impl Expect {
    /// Whether a store holding `current` under the key satisfies this precondition.
    pub fn admits(&self, current: Option<&Record>) -> bool {
        match (self, current) {
            (Self::Any, _) => true,
            (Self::Absent, None) => true,
            (Self::Absent, Some(_)) => false,
            (Self::Version(_), None) => false,
            (Self::Version(v), Some(r)) => r.version() == *v,
        }
    }
}

impl std::fmt::Display for Expect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Absent => write!(f, "absent"),
            Self::Version(v) => write!(f, "v{}", v),
        }
    }
}

/// The shared eventually-consistent key-value store.
/// No transactions, no listing, no server-side logic.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Record>, StoreError>;
    /// Writes `record` if `expect` holds, returning the stored copy with its new version.
    async fn put(&self, record: Record, expect: Expect) -> Result<Record, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// A typed value stored as one record.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn key(&self) -> String;
}
