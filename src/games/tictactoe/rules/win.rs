//! Win detection logic for tic-tac-toe.

use super::super::{Board, Cell, Position, Symbol};
use tracing::instrument;

/// Three positions forming a row, column or diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Line {
    /// Positions in board order.
    pub positions: [Position; 3],
    /// Symbol occupying all three.
    pub symbol: Symbol,
}

impl Line {
    /// Board indices (0-8) of the line.
    pub fn indices(&self) -> [usize; 3] {
        self.positions.map(Position::to_index)
    }

    /// Whether `pos` is part of the line.
    pub fn contains(&self, pos: Position) -> bool {
        self.positions.contains(&pos)
    }
}

/// Rows, then columns, then diagonals. Earlier entries win ties.
const LINES: [[Position; 3]; 8] = [
    // Rows
    [Position::TopLeft, Position::TopCenter, Position::TopRight],
    [Position::MiddleLeft, Position::Center, Position::MiddleRight],
    [Position::BottomLeft, Position::BottomCenter, Position::BottomRight],
    // Columns
    [Position::TopLeft, Position::MiddleLeft, Position::BottomLeft],
    [Position::TopCenter, Position::Center, Position::BottomCenter],
    [Position::TopRight, Position::MiddleRight, Position::BottomRight],
    // Diagonals
    [Position::TopLeft, Position::Center, Position::BottomRight],
    [Position::TopRight, Position::Center, Position::BottomLeft],
];

/// Finds the first complete line on the board.
///
/// Boards supplied by a remote process may be in a state unreachable by
/// legal play, with several complete lines. The first one in [`LINES`]
/// order is returned.
#[instrument]
pub fn winning_line(board: &Board) -> Option<Line> {
    LINES.iter().find_map(|&positions| {
        let [a, b, c] = positions;
        match board.get(a) {
            Cell::Occupied(symbol) if board.get(b) == board.get(a) && board.get(c) == board.get(a) => {
                Some(Line { positions, symbol })
            }
            _ => None,
        }
    })
}

/// Returns the symbol holding a complete line, if any.
#[instrument]
pub fn check_winner(board: &Board) -> Option<Symbol> {
    winning_line(board).map(|line| line.symbol)
}
