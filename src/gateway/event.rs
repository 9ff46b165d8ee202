//! Remote events parsed from tagged messages.
//!
//! Every message coming back from a game process is read once, here, into a
//! closed [`RemoteEvent`]. Unknown discriminators become
//! [`RemoteEvent::Unrecognized`] so callers can log and skip them.

use super::TaggedMessage;
use crate::games::tictactoe::{Board, Symbol};
use crate::store::MatchPhase;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

const CURRENT_TURN_ACTIONS: [&str; 2] = ["Current-Turn", "CurrentTurn"];
const CURRENT_PLAYER_TAGS: [&str; 2] = ["Current-Player", "CurrentPlayer"];

/// Game state as serialized by the game process.
///
/// Every field is optional: turn and outcome messages carry partial state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatePayload {
    /// Board cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<Board>,
    /// Identity whose move is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<String>,
    /// Registered participants.
    #[serde(
        default,
        deserialize_with = "players_or_empty_table",
        skip_serializing_if = "Option::is_none"
    )]
    pub players: Option<BTreeMap<String, Symbol>>,
    /// Match phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MatchPhase>,
    /// Winner identity of the last finished match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl StatePayload {
    /// Parses a JSON state body.
    #[instrument(skip(data))]
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// Parses a body, treating empty or malformed data as absent.
    fn lenient(data: &str) -> Option<Self> {
        if data.trim().is_empty() {
            return None;
        }
        match Self::from_json(data) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable state payload");
                None
            }
        }
    }
}

/// An empty Lua table is encoded as `[]`, so an empty array is read as an
/// empty registry. A non-empty array is rejected.
fn players_or_empty_table<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, Symbol>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Players {
        Map(BTreeMap<String, Symbol>),
        Table(Vec<IgnoredAny>),
    }

    match Option::<Players>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Players::Map(map)) => Ok(Some(map)),
        Some(Players::Table(items)) if items.is_empty() => Ok(Some(BTreeMap::new())),
        Some(Players::Table(items)) => Err(serde::de::Error::invalid_length(
            items.len(),
            &"a map of players or an empty table",
        )),
    }
}

/// A state change announced by the game process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    /// Registration accepted with the assigned symbol.
    Registered {
        /// Assigned symbol.
        symbol: Symbol,
    },
    /// A new match started.
    Play {
        /// First player to move.
        current_player: String,
    },
    /// The turn passed to another player.
    CurrentTurn {
        /// Player now to move.
        current_player: Option<String>,
        /// Accompanying state.
        state: Option<StatePayload>,
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
    /// Discriminator missing or unknown.
    Unrecognized {
        /// The `Action` tag, if there was one.
        action: Option<String>,
    },
}

impl RemoteEvent {
    /// Reads a tagged message into an event.
    #[instrument(skip(message), fields(action = ?message.action()))]
    pub fn parse(message: &TaggedMessage) -> Self {
        let event = Self::parse_inner(message);
        if let RemoteEvent::Unrecognized { action } = &event {
            debug!(?action, "Unrecognized remote message");
        }
        event
    }

    fn parse_inner(message: &TaggedMessage) -> Self {
        if message.has_value("Registered") {
            return match message.tag("Symbol").map(Symbol::from_str) {
                Some(Ok(symbol)) => RemoteEvent::Registered { symbol },
                _ => {
                    warn!("Registration reply without a valid Symbol tag");
                    Self::unrecognized(message)
                }
            };
        }

        match message.action() {
            Some("Play") => match message.tag_any(&CURRENT_PLAYER_TAGS) {
                Some(player) => RemoteEvent::Play {
                    current_player: player.to_string(),
                },
                None => {
                    warn!("Play message without a current player");
                    Self::unrecognized(message)
                }
            },
            Some(action) if CURRENT_TURN_ACTIONS.contains(&action) => RemoteEvent::CurrentTurn {
                current_player: message.tag_any(&CURRENT_PLAYER_TAGS).map(str::to_string),
                state: StatePayload::lenient(&message.data),
            },
            Some("Winner") => match message.tag("Winner") {
                Some(winner) => RemoteEvent::Winner {
                    winner: winner.to_string(),
                    state: StatePayload::lenient(&message.data),
                },
                None => {
                    warn!("Winner message without a Winner tag");
                    Self::unrecognized(message)
                }
            },
            Some("Draw") => RemoteEvent::Draw {
                state: StatePayload::lenient(&message.data),
            },
            _ => Self::unrecognized(message),
        }
    }

    fn unrecognized(message: &TaggedMessage) -> Self {
        RemoteEvent::Unrecognized {
            action: message.action().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Tag;

    fn message(tags: &[(&str, &str)], data: &str) -> TaggedMessage {
        TaggedMessage::new(tags.iter().map(|(n, v)| Tag::new(*n, *v)).collect(), data)
    }

    #[test]
    fn test_registered_by_value() {
        let msg = message(&[("Action", "Registered"), ("Symbol", "O")], "");
        assert_eq!(RemoteEvent::parse(&msg), RemoteEvent::Registered { symbol: Symbol::O });
    }

    #[test]
    fn test_registered_without_symbol_is_unrecognized() {
        let msg = message(&[("Action", "Registered")], "");
        assert!(matches!(RemoteEvent::parse(&msg), RemoteEvent::Unrecognized { .. }));
    }

    #[test]
    fn test_current_turn_spellings() {
        for (action, tag) in [("Current-Turn", "Current-Player"), ("CurrentTurn", "CurrentPlayer")] {
            let msg = message(&[("Action", action), (tag, "abc")], "");
            assert_eq!(
                RemoteEvent::parse(&msg),
                RemoteEvent::CurrentTurn {
                    current_player: Some("abc".to_string()),
                    state: None
                }
            );
        }
    }

    #[test]
    fn test_winner_with_payload() {
        let data = r#"{"Board":["X","X","X",null,"O","O",null,null,null],"Winner":"abc"}"#;
        let msg = message(&[("Action", "Winner"), ("Winner", "abc")], data);
        let RemoteEvent::Winner { winner, state } = RemoteEvent::parse(&msg) else {
            panic!("expected winner");
        };
        assert_eq!(winner, "abc");
        let state = state.unwrap();
        assert_eq!(state.board.unwrap().occupied(), 5);
        assert_eq!(state.winner.as_deref(), Some("abc"));
    }

    #[test]
    fn test_malformed_payload_dropped() {
        let msg = message(&[("Action", "Draw")], "not json");
        assert_eq!(RemoteEvent::parse(&msg), RemoteEvent::Draw { state: None });
    }

    #[test]
    fn test_unknown_action() {
        let msg = message(&[("Action", "Eval")], "");
        assert_eq!(
            RemoteEvent::parse(&msg),
            RemoteEvent::Unrecognized {
                action: Some("Eval".to_string())
            }
        );
        assert_eq!(
            RemoteEvent::parse(&TaggedMessage::default()),
            RemoteEvent::Unrecognized { action: None }
        );
    }

    #[test]
    fn test_full_state_payload() {
        let data = r#"{
            "Board": [null,null,null,null,"X",null,null,null,null],
            "CurrentPlayer": "bob",
            "Players": {"alice": "X", "bob": "O"},
            "State": "PLAY",
            "Winner": ""
        }"#;
        let payload = StatePayload::from_json(data).unwrap();
        assert_eq!(payload.state, Some(MatchPhase::Playing));
        assert_eq!(payload.players.unwrap().len(), 2);
        assert_eq!(payload.current_player.as_deref(), Some("bob"));
    }

    #[test]
    fn test_empty_lua_table_is_empty_registry() {
        let data = r#"{"Board":[null,null,null,null,null,null,null,null,null],"Players":[],"State":"REGISTER"}"#;
        let payload = StatePayload::from_json(data).unwrap();
        assert_eq!(payload.players, Some(BTreeMap::new()));
        assert_eq!(payload.state, Some(MatchPhase::Registering));
    }

    #[test]
    fn test_winner_payload_with_empty_players_keeps_board() {
        let msg = TaggedMessage::new(
            vec![Tag::new("Action", "Winner"), Tag::new("Winner", "alice")],
            r#"{"Board":["X","X","X","O","O",null,null,null,null],"Players":[],"State":"REGISTER"}"#,
        );
        match RemoteEvent::parse(&msg) {
            RemoteEvent::Winner { winner, state } => {
                assert_eq!(winner, "alice");
                let state = state.unwrap();
                assert_eq!(state.board.unwrap().occupied(), 5);
                assert_eq!(state.players, Some(BTreeMap::new()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_players_list_with_entries_rejected() {
        assert!(StatePayload::from_json(r#"{"Players":["alice"]}"#).is_err());
    }

    #[test]
    fn test_null_players_is_absent() {
        let payload = StatePayload::from_json(r#"{"Players":null}"#).unwrap();
        assert_eq!(payload.players, None);
    }
}
