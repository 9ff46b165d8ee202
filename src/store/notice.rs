//! Messages surfaced to the player.

use super::{GameState, MatchPhase};
use derive_more::Display;

/// One-off message produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Notice {
    /// The local wallet was registered.
    #[display("Registered")]
    Registered,
    /// The bot opponent was registered.
    #[display("Bot registered")]
    BotRegistered,
    /// The local wallet won.
    #[display("Congrats, you won!")]
    YouWon,
    /// The local wallet played and lost.
    #[display("Sorry, you lost!")]
    YouLost,
    /// Someone else won; carries their symbol, or their identity if unknown.
    #[display("{} won!", _0)]
    OtherWon(String),
    /// The match was drawn.
    #[display("The game ended in a Draw!")]
    Draw,
}

/// Standing instruction for the player, derived from state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Prompt {
    /// No wallet connected.
    #[display("Connect to Play the Game!")]
    ConnectWallet,
    /// Registration open and the wallet is not registered.
    #[display("Register to play.")]
    Register,
    /// Registered, waiting for a second player.
    #[display("You have registered for the game. Waiting for opponent...")]
    WaitingForOpponent,
    /// The wallet's move.
    #[display("It's your turn.")]
    YourTurn,
    /// The opponent's move.
    #[display("It's your opponent turn.")]
    OpponentTurn,
    /// A match between other players is running.
    #[display("A match is in progress.")]
    Spectating,
}

impl Prompt {
    /// Prompt for `me` given the current state.
    pub fn for_state(state: &GameState, me: Option<&str>) -> Self {
        let Some(me) = me else {
            return Prompt::ConnectWallet;
        };
        let registered = state.players().contains(me);
        match (state.phase(), registered) {
            (MatchPhase::Registering, false) => Prompt::Register,
            (MatchPhase::Registering, true) => Prompt::WaitingForOpponent,
            (MatchPhase::Playing, false) => Prompt::Spectating,
            (MatchPhase::Playing, true) if state.is_turn_of(me) => Prompt::YourTurn,
            (MatchPhase::Playing, true) => Prompt::OpponentTurn,
        }
    }
}
