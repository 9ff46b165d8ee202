//! Outcome rules for tic-tac-toe.
//!
//! Pure functions over a [`Board`](super::Board) snapshot. They hold no
//! state so the highlight can be recomputed after every board change,
//! whether it came from a local move or a polled update.

mod draw;
mod win;

pub use draw::{is_draw, is_full};
pub use win::{check_winner, winning_line, Line};
