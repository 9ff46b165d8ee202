//! Client-local view of a remote game.

use crate::gateway::{ProcessId, StatePayload};
use crate::games::tictactoe::{winning_line, Board, Line, Symbol};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{instrument, warn};

/// Match phase as broadcast by the game process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum MatchPhase {
    /// Fewer than two players; the room accepts registrations.
    #[default]
    #[serde(rename = "REGISTER")]
    #[display("Registering")]
    Registering,
    /// Two players are taking turns.
    #[serde(rename = "PLAY")]
    #[display("Playing")]
    Playing,
}

/// Why a registration could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RegistryError {
    /// Both seats are taken.
    #[display("Registry already has 2 players")]
    Full,
    /// Another participant already plays this symbol.
    #[display("{} is already assigned", _0)]
    SymbolTaken(#[error(not(source))] Symbol),
}

/// Participants and their symbols. At most two, symbols disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<String, Symbol>,
}

impl PlayerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a remote map, dropping entries that would
    /// break the two-player, disjoint-symbol rule.
    #[instrument(skip(map))]
    pub fn from_remote(map: BTreeMap<String, Symbol>) -> Self {
        let mut registry = Self::new();
        for (player, symbol) in map {
            if let Err(e) = registry.insert(player.clone(), symbol) {
                warn!(player = %player, error = %e, "Dropping inconsistent remote player entry");
            }
        }
        registry
    }

    /// Records `player` with `symbol`. Re-recording the same pair is a no-op.
    pub fn insert(&mut self, player: String, symbol: Symbol) -> Result<(), RegistryError> {
        if self.players.get(&player) == Some(&symbol) {
            return Ok(());
        }
        if self
            .players
            .iter()
            .any(|(id, held)| *held == symbol && *id != player)
        {
            return Err(RegistryError::SymbolTaken(symbol));
        }
        if !self.players.contains_key(&player) && self.players.len() >= 2 {
            return Err(RegistryError::Full);
        }
        self.players.insert(player, symbol);
        Ok(())
    }

    /// Symbol of a participant.
    pub fn symbol_of(&self, player: &str) -> Option<Symbol> {
        self.players.get(player).copied()
    }

    /// Whether the participant is registered.
    pub fn contains(&self, player: &str) -> bool {
        self.players.contains_key(player)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Removes everyone.
    pub fn clear(&mut self) {
        self.players.clear();
    }

    /// Participants in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Symbol)> {
        self.players.iter().map(|(id, s)| (id.as_str(), *s))
    }
}

/// A row in the player roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// "You", "Bot", or the participant's address.
    pub label: String,
    /// Assigned symbol.
    pub symbol: Symbol,
    /// Whether this is the local wallet.
    pub is_me: bool,
}

/// Authoritative local view of a game process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct GameState {
    /// Board cells.
    board: Board,
    /// Registered participants.
    players: PlayerRegistry,
    /// Participant whose move is accepted; only set while playing.
    current_player: Option<String>,
    /// Match phase.
    phase: MatchPhase,
    /// Winner of the last finished match.
    winner: Option<String>,
}

impl GameState {
    /// Empty board, no players, registering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the whole state from a remote snapshot.
    ///
    /// The phase is derived from the registry; a payload claiming
    /// otherwise is logged and corrected.
    #[instrument(skip(payload))]
    pub fn from_payload(payload: StatePayload) -> Self {
        let mut state = Self::new();
        state.merge(payload.clone());
        state.settle_phase();
        if let Some(remote) = payload.state
            && remote != state.phase
        {
            warn!(remote = %remote, local = %state.phase, players = state.players.len(), "Remote phase contradicts player count");
        }
        state
    }

    /// Overwrites every field the payload carries.
    pub(crate) fn merge(&mut self, payload: StatePayload) {
        if let Some(board) = payload.board {
            self.board = board;
        }
        if let Some(current) = payload.current_player {
            self.current_player = non_empty(current);
        }
        if let Some(players) = payload.players {
            self.players = PlayerRegistry::from_remote(players);
        }
        if let Some(winner) = payload.winner {
            self.winner = non_empty(winner);
        }
    }

    /// Restores `Playing` iff two players are registered.
    pub(crate) fn settle_phase(&mut self) {
        self.phase = if self.players.len() == 2 {
            MatchPhase::Playing
        } else {
            MatchPhase::Registering
        };
        if self.phase != MatchPhase::Playing {
            self.current_player = None;
        }
    }

    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub(crate) fn players_mut(&mut self) -> &mut PlayerRegistry {
        &mut self.players
    }

    pub(crate) fn set_current_player(&mut self, player: Option<String>) {
        self.current_player = player.and_then(non_empty);
    }

    pub(crate) fn set_winner(&mut self, winner: Option<String>) {
        self.winner = winner.and_then(non_empty);
    }

    /// Whether the phase agrees with the registry size.
    pub fn is_consistent(&self) -> bool {
        (self.phase == MatchPhase::Playing) == (self.players.len() == 2)
    }

    /// Line to highlight, recomputed from the board.
    pub fn winning_line(&self) -> Option<Line> {
        winning_line(&self.board)
    }

    /// Whether it is `player`'s move.
    pub fn is_turn_of(&self, player: &str) -> bool {
        self.phase == MatchPhase::Playing && self.current_player.as_deref() == Some(player)
    }

    /// Roster rows for display.
    pub fn roster(&self, me: Option<&str>, process: &ProcessId) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|(id, symbol)| {
                let is_me = Some(id) == me;
                let label = if is_me {
                    "You".to_string()
                } else if id == process.as_str() {
                    "Bot".to_string()
                } else {
                    id.to_string()
                };
                RosterEntry { label, symbol, is_me }
            })
            .collect()
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
