use duel_codec::CodecError;
use duel_lobby::ServiceError;
use duel_records::StoreError;
use duel_records::SyncError;

/// Why a turn, resignation, or timeout was not submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    NotYourTurn,
    /// The session is not in play.
    NotActive,
    /// The side to move still has time.
    NotExpired,
    Illegal(CodecError),
    Service(ServiceError),
}

impl From<ServiceError> for SubmitError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

impl From<CodecError> for SubmitError {
    fn from(e: CodecError) -> Self {
        Self::Illegal(e)
    }
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotYourTurn => write!(f, "not your turn"),
            Self::NotActive => write!(f, "match is not in play"),
            Self::NotExpired => write!(f, "turn has not expired"),
            Self::Illegal(e) => write!(f, "{}", e),
            Self::Service(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Failures from background work that are reported on the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    Service(ServiceError),
    Store(StoreError),
    Sync(SyncError),
}

impl RoomError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Service(ServiceError::Unauthorized))
    }
}

impl From<ServiceError> for RoomError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

impl From<StoreError> for RoomError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<SyncError> for RoomError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service(e) => write!(f, "{}", e),
            Self::Store(e) => write!(f, "{}", e),
            Self::Sync(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RoomError {}
