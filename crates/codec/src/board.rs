use super::*;
use duel_core::Cell;
use serde::Deserialize;
use serde::Serialize;

/// A single placement in the move log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    #[serde(rename = "c")]
    pub cell: Cell,
    #[serde(rename = "m")]
    pub mark: Mark,
}

impl Move {
    pub fn new(cell: Cell, mark: Mark) -> Self {
        Self { cell, mark }
    }
}

/// Square grid of optional marks in row-major order.
/// Serialized as `"<size>:<cells>"`, e.g. `"3:X.O......"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Board {
    size: u8,
    cells: Vec<Option<Mark>>,
}

impl Board {
    pub fn empty(size: u8) -> Self {
        Self {
            size,
            cells: vec![None; size as usize * size as usize],
        }
    }
    /// Rebuilds a board by replaying a move log from empty.
    pub fn replay(size: u8, moves: &[Move]) -> Result<Self, CodecError> {
        moves.iter().try_fold(Self::empty(size), |board, m| board.with(*m))
    }
    pub fn size(&self) -> u8 {
        self.size
    }
    pub fn cells(&self) -> &[Option<Mark>] {
        &self.cells
    }
    pub fn get(&self, cell: Cell) -> Option<Mark> {
        self.cells.get(cell as usize).copied().flatten()
    }
    pub fn is_free(&self, cell: Cell) -> bool {
        self.cells.get(cell as usize).is_some_and(Option::is_none)
    }
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
    /// Returns a copy with the move applied. Rejects occupied or out-of-range cells.
    pub fn with(&self, m: Move) -> Result<Self, CodecError> {
        if !self.is_free(m.cell) {
            return Err(CodecError::IllegalMove(format!("cell {} unavailable", m.cell)));
        }
        let mut next = self.clone();
        next.cells[m.cell as usize] = Some(m.mark);
        Ok(next)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty(duel_core::BOARD_SIZE)
    }
}

impl From<Board> for String {
    fn from(board: Board) -> Self {
        let cells = board
            .cells
            .iter()
            .map(|c| c.map(Mark::symbol).unwrap_or('.'))
            .collect::<String>();
        format!("{}:{}", board.size, cells)
    }
}

impl TryFrom<String> for Board {
    type Error = CodecError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        let (size, cells) = s
            .split_once(':')
            .ok_or_else(|| CodecError::Malformed(format!("board {:?}", s)))?;
        let size = size
            .parse::<u8>()
            .map_err(|_| CodecError::Malformed(format!("board size {:?}", size)))?;
        let cells = cells
            .chars()
            .map(|c| match c {
                '.' => Ok(None),
                c => Mark::try_from(c)
                    .map(Some)
                    .map_err(|c| CodecError::Malformed(format!("board cell {:?}", c))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        match cells.len() == size as usize * size as usize {
            true => Ok(Self { size, cells }),
            false => Err(CodecError::Malformed(format!("board of {} cells", cells.len()))),
        }
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.size.max(1) as usize) {
            let line = row
                .iter()
                .map(|c| c.map(Mark::symbol).unwrap_or('.'))
                .collect::<String>();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
