/// Errors reported by a record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional put lost to a concurrent write.
    Conflict(String),
    /// The store could not be reached or refused the call.
    Transport(String),
    /// A record's fields could not be mapped to or from a document.
    Malformed(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict(key) => write!(f, "write conflict on {}", key),
            Self::Transport(s) => write!(f, "record store unavailable: {}", s),
            Self::Malformed(s) => write!(f, "malformed record: {}", s),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from synchronization built on the store. All are non-fatal to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Every conditional write attempt lost to a concurrent writer.
    RetryLimit { key: String, attempts: usize },
    /// The requested transition does not apply to the record's current state.
    Rejected(String),
    Store(StoreError),
}

impl SyncError {
    pub fn is_retry_limit(&self) -> bool {
        matches!(self, Self::RetryLimit { .. })
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RetryLimit { key, attempts } => {
                write!(f, "gave up on {} after {} attempts", key, attempts)
            }
            Self::Rejected(s) => write!(f, "rejected: {}", s),
            Self::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncError {}
