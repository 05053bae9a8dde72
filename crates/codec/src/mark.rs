use duel_core::Seat;
use serde::Deserialize;
use serde::Serialize;

/// One of the two sides. Seat 0 always plays X and moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn from_seat(seat: Seat) -> Self {
        match seat % duel_core::SEATS {
            0 => Self::X,
            _ => Self::O,
        }
    }
    pub fn seat(self) -> Seat {
        match self {
            Self::X => 0,
            Self::O => 1,
        }
    }
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
    pub fn symbol(self) -> char {
        match self {
            Self::X => 'X',
            Self::O => 'O',
        }
    }
}

impl TryFrom<char> for Mark {
    type Error = char;
    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'X' => Ok(Self::X),
            'O' => Ok(Self::O),
            c => Err(c),
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A value held for each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByMark<T> {
    #[serde(default)]
    pub x: T,
    #[serde(default)]
    pub o: T,
}

impl<T> ByMark<T> {
    pub fn both(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            x: value.clone(),
            o: value,
        }
    }
}

impl<T> std::ops::Index<Mark> for ByMark<T> {
    type Output = T;
    fn index(&self, mark: Mark) -> &T {
        match mark {
            Mark::X => &self.x,
            Mark::O => &self.o,
        }
    }
}

impl<T> std::ops::IndexMut<Mark> for ByMark<T> {
    fn index_mut(&mut self, mark: Mark) -> &mut T {
        match mark {
            Mark::X => &mut self.x,
            Mark::O => &mut self.o,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn seats_bind_marks() {
        assert_eq!(Mark::from_seat(0), Mark::X);
        assert_eq!(Mark::from_seat(1), Mark::O);
        assert_eq!(Mark::X.seat(), 0);
        assert_eq!(Mark::O.other(), Mark::X);
    }
    #[test]
    fn by_mark_indexes() {
        let mut clocks = ByMark::both(10u64);
        clocks[Mark::O] = 0;
        assert_eq!(clocks[Mark::X], 10);
        assert_eq!(clocks[Mark::O], 0);
    }
}
