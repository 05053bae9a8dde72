use super::*;
use duel_core::Cell;
use serde::Deserialize;
use serde::Serialize;

/// Result of judging a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Open,
    Won { mark: Mark, line: Vec<Cell> },
    Drawn,
}

/// Board-rules collaborator. Decides whether a board is won or drawn.
/// The win-line algorithm lives outside this crate.
pub trait Referee: Send + Sync {
    fn judge(&self, board: &Board) -> Verdict;
}

/// Rules-derived game state: board, move log, and terminal outcome.
///
/// Invariants checked by [`Position::verify`]:
/// - the board equals a replay of the move log
/// - a winner or a draw excludes a live current player, and vice versa
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    #[serde(rename = "b")]
    board: Board,
    #[serde(rename = "l")]
    moves: Vec<Move>,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    current: Option<Mark>,
    #[serde(rename = "w", skip_serializing_if = "Option::is_none")]
    winner: Option<Mark>,
    #[serde(rename = "d")]
    draw: bool,
    #[serde(rename = "k", skip_serializing_if = "Option::is_none")]
    line: Option<Vec<Cell>>,
}

impl Default for Position {
    fn default() -> Self {
        Self::opening(duel_core::BOARD_SIZE)
    }
}

impl Position {
    /// Empty board with X to move.
    pub fn opening(size: u8) -> Self {
        Self {
            board: Board::empty(size),
            moves: Vec::new(),
            current: Some(Mark::X),
            winner: None,
            draw: false,
            line: None,
        }
    }
    pub fn board(&self) -> &Board {
        &self.board
    }
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }
    pub fn current(&self) -> Option<Mark> {
        self.current
    }
    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }
    pub fn is_draw(&self) -> bool {
        self.draw
    }
    pub fn winning_line(&self) -> Option<&[Cell]> {
        self.line.as_deref()
    }
    pub fn last(&self) -> Option<Move> {
        self.moves.last().copied()
    }
    pub fn is_over(&self) -> bool {
        self.winner.is_some() || self.draw
    }
    /// Places the current player's mark and asks the referee for the outcome.
    pub fn place(&self, cell: Cell, referee: &dyn Referee) -> Result<Self, CodecError> {
        let mark = self
            .current
            .ok_or_else(|| CodecError::IllegalMove("game is over".to_string()))?;
        let m = Move::new(cell, mark);
        let board = self.board.with(m)?;
        let mut moves = self.moves.clone();
        moves.push(m);
        let next = match referee.judge(&board) {
            Verdict::Open => Self {
                board,
                moves,
                current: Some(mark.other()),
                winner: None,
                draw: false,
                line: None,
            },
            Verdict::Won { mark, line } => Self {
                board,
                moves,
                current: None,
                winner: Some(mark),
                draw: false,
                line: Some(line),
            },
            Verdict::Drawn => Self {
                board,
                moves,
                current: None,
                winner: None,
                draw: true,
                line: None,
            },
        };
        Ok(next)
    }
    /// Hands the move to the other side without placing a mark.
    pub fn pass(&self) -> Self {
        Self {
            current: self.current.map(Mark::other),
            ..self.clone()
        }
    }
    pub fn verify(&self) -> Result<(), CodecError> {
        if Board::replay(self.board.size(), &self.moves)? != self.board {
            return Err(CodecError::Inconsistent("board diverges from move log".into()));
        }
        if self.winner.is_some() && self.draw {
            return Err(CodecError::Inconsistent("both won and drawn".into()));
        }
        match (self.current.is_some(), self.is_over()) {
            (true, true) => Err(CodecError::Inconsistent("live player in finished game".into())),
            (false, false) => Err(CodecError::Inconsistent("no player in live game".into())),
            _ => Ok(()),
        }
    }
}
