//! Game state transitions.
//!
//! All mutation of [`GameState`] goes through [`GameStore::apply`]. A
//! transition whose precondition does not hold is logged and ignored, which
//! also makes re-delivered outcome events harmless.

use super::{GameState, MatchPhase, Notice};
use crate::games::tictactoe::{Position, Symbol};
use crate::gateway::{ProcessId, RemoteEvent, StatePayload};
use tracing::{debug, info, instrument, warn};

/// A typed state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A participant was accepted with a symbol.
    Registered {
        /// Registered identity: the wallet, or the process id for the bot.
        player: String,
        /// Assigned symbol.
        symbol: Symbol,
    },
    /// A match started.
    Play {
        /// First player to move.
        current_player: String,
    },
    /// The turn moved.
    CurrentTurn {
        /// Player to move, from the message tags.
        current_player: Option<String>,
        /// Accompanying state; its fields win over the tags.
        state: Option<StatePayload>,
    },
    /// Optimistic fill for a move the local wallet submitted.
    MoveSubmitted {
        /// Submitting identity.
        player: String,
        /// Claimed cell.
        position: Position,
    },
    /// Match won.
    Winner {
        /// Winning identity.
        winner: String,
        /// Final state.
        state: Option<StatePayload>,
    },
    /// Match drawn.
    Draw {
        /// Final state.
        state: Option<StatePayload>,
    },
    /// Full remote state; replaces everything.
    Snapshot(StatePayload),
}

impl Transition {
    /// Maps a remote event onto a transition.
    ///
    /// `registrant` is who a registration reply refers to; events that are
    /// not actionable yield `None`.
    pub fn from_event(event: RemoteEvent, registrant: Option<&str>) -> Option<Self> {
        match event {
            RemoteEvent::Registered { symbol } => registrant.map(|player| Transition::Registered {
                player: player.to_string(),
                symbol,
            }),
            RemoteEvent::Play { current_player } => Some(Transition::Play { current_player }),
            RemoteEvent::CurrentTurn {
                current_player,
                state,
            } => Some(Transition::CurrentTurn {
                current_player,
                state,
            }),
            RemoteEvent::Winner { winner, state } => Some(Transition::Winner { winner, state }),
            RemoteEvent::Draw { state } => Some(Transition::Draw { state }),
            RemoteEvent::Unrecognized { .. } => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Transition::Registered { .. } => "Registered",
            Transition::Play { .. } => "Play",
            Transition::CurrentTurn { .. } => "CurrentTurn",
            Transition::MoveSubmitted { .. } => "MoveSubmitted",
            Transition::Winner { .. } => "Winner",
            Transition::Draw { .. } => "Draw",
            Transition::Snapshot(_) => "Snapshot",
        }
    }
}

/// Outcome of applying a transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applied {
    /// Whether the state differs from before.
    pub changed: bool,
    /// Message for the player, if any.
    pub notice: Option<Notice>,
}

/// Owner of a game's local state.
#[derive(Debug, Clone)]
pub struct GameStore {
    state: GameState,
    me: Option<String>,
    process: ProcessId,
}

impl GameStore {
    /// Creates an empty store for `process`, viewed by wallet `me`.
    #[instrument(skip_all, fields(process_id = %process))]
    pub fn new(process: ProcessId, me: Option<String>) -> Self {
        info!(me = ?me, "Creating game store");
        Self {
            state: GameState::new(),
            me,
            process,
        }
    }

    /// Current committed state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Local wallet identity.
    pub fn me(&self) -> Option<&str> {
        self.me.as_deref()
    }

    /// Game process address.
    pub fn process(&self) -> &ProcessId {
        &self.process
    }

    /// Applies a transition, keeping phase and registry consistent.
    #[instrument(skip(self, transition), fields(process_id = %self.process, transition = transition.name()))]
    pub fn apply(&mut self, transition: Transition) -> Applied {
        let before = self.state.clone();
        let notice = match transition {
            Transition::Registered { player, symbol } => self.registered(player, symbol),
            Transition::Play { current_player } => self.play(current_player),
            Transition::CurrentTurn {
                current_player,
                state,
            } => self.current_turn(current_player, state),
            Transition::MoveSubmitted { player, position } => self.move_submitted(&player, position),
            Transition::Winner { winner, state } => self.finished(Some(winner), state),
            Transition::Draw { state } => self.finished(None, state),
            Transition::Snapshot(payload) => {
                self.state = GameState::from_payload(payload);
                None
            }
        };
        self.state.settle_phase();
        debug_assert!(self.state.is_consistent());

        let changed = self.state != before;
        debug!(
            changed,
            phase = %self.state.phase(),
            players = self.state.players().len(),
            notice = ?notice,
            "Transition applied"
        );
        Applied { changed, notice }
    }

    fn registered(&mut self, player: String, symbol: Symbol) -> Option<Notice> {
        if *self.state.phase() != MatchPhase::Registering {
            warn!(player = %player, "Registration outside the registering phase");
            return None;
        }
        let is_bot = player == self.process.as_str();
        if let Err(e) = self.state.players_mut().insert(player.clone(), symbol) {
            warn!(player = %player, error = %e, "Registration not recorded");
            return None;
        }
        info!(player = %player, symbol = %symbol, "Player registered");
        Some(if is_bot {
            Notice::BotRegistered
        } else {
            Notice::Registered
        })
    }

    fn play(&mut self, current_player: String) -> Option<Notice> {
        if self.state.players().len() != 2 {
            warn!(players = self.state.players().len(), "Match start without two players");
            return None;
        }
        *self.state.board_mut() = Default::default();
        self.state.set_current_player(Some(current_player));
        self.state.set_winner(None);
        None
    }

    fn current_turn(
        &mut self,
        current_player: Option<String>,
        payload: Option<StatePayload>,
    ) -> Option<Notice> {
        if *self.state.phase() != MatchPhase::Playing {
            debug!("Turn update outside a match");
            return None;
        }
        if current_player.is_some() {
            self.state.set_current_player(current_player);
        }
        if let Some(payload) = payload {
            self.state.merge(payload);
        }
        None
    }

    fn move_submitted(&mut self, player: &str, position: Position) -> Option<Notice> {
        if !self.state.is_turn_of(player) {
            debug!(player, "Not this player's turn, skipping fill");
            return None;
        }
        let Some(symbol) = self.state.players().symbol_of(player) else {
            warn!(player, "Mover has no symbol");
            return None;
        };
        if let Err(e) = self.state.board_mut().claim(position, symbol) {
            debug!(error = %e, "Skipping fill");
        }
        None
    }

    fn finished(&mut self, winner: Option<String>, payload: Option<StatePayload>) -> Option<Notice> {
        if *self.state.phase() != MatchPhase::Playing {
            debug!("Outcome outside a match, already handled");
            return None;
        }
        let notice = match winner.as_deref() {
            Some(winner) => self.winner_notice(winner),
            None => Notice::Draw,
        };
        if let Some(payload) = payload {
            self.state.merge(payload);
        }
        self.state.set_winner(winner);
        self.state.players_mut().clear();
        self.state.set_current_player(None);
        info!(notice = %notice, "Match finished");
        Some(notice)
    }

    // Identities are compared verbatim: a win is "mine" only when the winner
    // equals the wallet address. A bot is just another registry key.
    fn winner_notice(&self, winner: &str) -> Notice {
        let players = self.state.players();
        match self.me.as_deref() {
            Some(me) if me == winner => Notice::YouWon,
            Some(me) if players.contains(me) => Notice::YouLost,
            _ => Notice::OtherWon(
                players
                    .symbol_of(winner)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| winner.to_string()),
            ),
        }
    }
}
