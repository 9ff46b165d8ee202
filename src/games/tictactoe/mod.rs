//! Tic-tac-toe board model and outcome rules.

mod position;
mod rules;
mod types;

pub use position::Position;
pub use rules::{check_winner, is_draw, is_full, winning_line, Line};
pub use types::{Board, BoardError, Cell, Symbol};
