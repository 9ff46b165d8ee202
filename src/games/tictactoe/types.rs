//! Core domain types for tic-tac-toe.

use super::Position;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Symbol a registered participant plays with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, strum::EnumString,
)]
pub enum Symbol {
    /// First registrant.
    X,
    /// Second registrant.
    O,
}

impl Symbol {
    /// Returns the other symbol.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Cell claimed by a symbol.
    Occupied(Symbol),
}

impl Cell {
    /// Returns the occupying symbol, if any.
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(symbol) => Some(symbol),
        }
    }
}

/// Error raised by board construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BoardError {
    /// Remote payload did not carry exactly nine cells.
    #[display("Board must have 9 cells, got {}", _0)]
    WrongLength(#[error(not(source))] usize),
    /// Cells never revert or change owner once claimed.
    #[display("{} is already occupied", _0)]
    Occupied(#[error(not(source))] Position),
}

/// 3x3 board, cells in row-major order (0-8).
///
/// On the wire a board is a JSON array of nine entries, each `"X"`, `"O"`
/// or `null`. Any other value is read as an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<String>>", into = "Vec<Option<String>>")]
pub struct Board {
    cells: [Cell; 9],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from nine optional symbols.
    pub fn from_symbols(symbols: [Option<Symbol>; 9]) -> Self {
        let mut cells = [Cell::Empty; 9];
        for (cell, symbol) in cells.iter_mut().zip(symbols) {
            if let Some(symbol) = symbol {
                *cell = Cell::Occupied(symbol);
            }
        }
        Self { cells }
    }

    /// Gets the cell at the given position.
    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.to_index()]
    }

    /// Checks if a cell is empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == Cell::Empty
    }

    /// Claims an empty cell for `symbol`.
    pub fn claim(&mut self, pos: Position, symbol: Symbol) -> Result<(), BoardError> {
        if !self.is_empty(pos) {
            return Err(BoardError::Occupied(pos));
        }
        self.cells[pos.to_index()] = Cell::Occupied(symbol);
        Ok(())
    }

    /// Returns all cells.
    pub fn cells(&self) -> &[Cell; 9] {
        &self.cells
    }

    /// Number of claimed cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| **c != Cell::Empty).count()
    }

    /// Formats the board as text, numbering empty cells 1-9.
    ///
    /// Cells on `highlight` are wrapped in brackets.
    pub fn display(&self, highlight: Option<&[Position; 3]>) -> String {
        let mut result = String::new();
        for pos in Position::ALL {
            let label = match self.get(pos) {
                Cell::Empty => pos.to_wire().to_string(),
                Cell::Occupied(symbol) => symbol.to_string(),
            };
            if highlight.is_some_and(|line| line.contains(&pos)) {
                result.push_str(&format!("[{}]", label));
            } else {
                result.push_str(&format!(" {} ", label));
            }
            match pos.to_index() % 3 {
                2 if pos.to_index() < 8 => result.push_str("\n---+---+---\n"),
                2 => {}
                _ => result.push('|'),
            }
        }
        result
    }
}

impl TryFrom<Vec<Option<String>>> for Board {
    type Error = BoardError;

    fn try_from(raw: Vec<Option<String>>) -> Result<Self, Self::Error> {
        if raw.len() != 9 {
            return Err(BoardError::WrongLength(raw.len()));
        }
        let mut cells = [Cell::Empty; 9];
        for (cell, value) in cells.iter_mut().zip(raw) {
            *cell = match value.as_deref() {
                Some("X") => Cell::Occupied(Symbol::X),
                Some("O") => Cell::Occupied(Symbol::O),
                _ => Cell::Empty,
            };
        }
        Ok(Self { cells })
    }
}

impl From<Board> for Vec<Option<String>> {
    fn from(board: Board) -> Self {
        board
            .cells
            .iter()
            .map(|cell| cell.symbol().map(|s| s.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_rejects_occupied_cell() {
        let mut board = Board::new();
        board.claim(Position::Center, Symbol::X).unwrap();
        assert_eq!(
            board.claim(Position::Center, Symbol::O),
            Err(BoardError::Occupied(Position::Center))
        );
        assert_eq!(board.get(Position::Center), Cell::Occupied(Symbol::X));
        assert_eq!(board.occupied(), 1);
    }

    #[test]
    fn test_wire_format() {
        let board: Board =
            serde_json::from_str(r#"["X", null, "O", "", null, null, null, null, "X"]"#).unwrap();
        assert_eq!(board.get(Position::TopLeft), Cell::Occupied(Symbol::X));
        assert_eq!(board.get(Position::TopRight), Cell::Occupied(Symbol::O));
        assert_eq!(board.get(Position::MiddleLeft), Cell::Empty);
        assert_eq!(board.occupied(), 3);

        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json[0], "X");
        assert!(json[3].is_null());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result: Result<Board, _> = serde_json::from_str(r#"["X", null]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_numbers_empty_cells() {
        let mut board = Board::new();
        board.claim(Position::TopLeft, Symbol::X).unwrap();
        let text = board.display(None);
        assert!(text.starts_with(" X | 2 | 3 "));
        assert!(text.ends_with(" 7 | 8 | 9 "));
    }
}
