use duel_core::Rating;

/// Result of a match from one side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    Win,
    Loss,
    Draw,
}

impl Score {
    pub fn value(self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Loss => 0.0,
            Self::Draw => 0.5,
        }
    }
    /// The same result seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Loss => Self::Win,
            Self::Draw => Self::Draw,
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Win => write!(f, "win"),
            Self::Loss => write!(f, "loss"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Elo rating math.
pub struct Elo;

impl Elo {
    /// Probability that a player rated `a` beats one rated `b`.
    pub fn expected(a: Rating, b: Rating) -> f64 {
        1.0 / (1.0 + 10f64.powf((b - a) as f64 / 400.0))
    }
    /// New rating for `a` after scoring `score` against `b`.
    pub fn updated(a: Rating, b: Rating, score: Score, k: f64) -> Rating {
        (a as f64 + k * (score.value() - Self::expected(a, b))).round() as Rating
    }
}
