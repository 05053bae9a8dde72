/// Failures reported by the match service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service could not be reached.
    Transport(String),
    /// The local player is no longer signed in.
    Unauthorized,
    NotFound(String),
    /// The call is not valid for the session's current state.
    Rejected(String),
}

impl ServiceError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(s) => write!(f, "match service unavailable: {}", s),
            Self::Unauthorized => write!(f, "not signed in"),
            Self::NotFound(s) => write!(f, "no such session: {}", s),
            Self::Rejected(s) => write!(f, "rejected: {}", s),
        }
    }
}

impl std::error::Error for ServiceError {}
