//! Game rules hosted by remote processes.

pub mod tictactoe;
