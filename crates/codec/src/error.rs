/// Errors that can occur while decoding or advancing game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The blob carried no bytes at all (session not bootstrapped yet).
    Empty,
    /// The blob was not a parseable snapshot.
    Malformed(String),
    /// The snapshot parsed but violates a state invariant.
    Inconsistent(String),
    /// A move was rejected by cell occupancy or turn order.
    IllegalMove(String),
    /// A party code string could not be parsed.
    InvalidCode(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty snapshot"),
            Self::Malformed(s) => write!(f, "malformed snapshot: {}", s),
            Self::Inconsistent(s) => write!(f, "inconsistent snapshot: {}", s),
            Self::IllegalMove(s) => write!(f, "illegal move: {}", s),
            Self::InvalidCode(s) => write!(f, "invalid party code: {}", s),
        }
    }
}

impl std::error::Error for CodecError {}
