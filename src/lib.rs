//! ao_tictactoe - client for tic-tac-toe games hosted on ao processes
//!
//! A game is a remote process that owns the authoritative board. This
//! library keeps a local view of that game, sends signed actions to it and
//! folds the process's broadcast events back into the local view.
//!
//! # Architecture
//!
//! - **Games**: board types and the win/draw evaluator
//! - **Gateway**: the only path to the network (messenger, compute unit, GraphQL)
//! - **Store**: single-writer game state with typed transitions
//! - **Reconciler**: polling loop with an explicit start/stop lifecycle
//! - **Turns**: registration and move submission
//! - **Session**: one open game, tying the pieces together
//! - **Discovery / Provisioning**: the router process and new-game creation
//!
//! # Example
//!
//! ```no_run
//! use ao_tictactoe::{ClientConfig, GameSession, HttpGateway, Position, ProcessId};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::default();
//! let gateway = Arc::new(HttpGateway::new(&config)?);
//! let mut session =
//!     GameSession::open(gateway, config, ProcessId::from("game-process"), None).await?;
//! println!("{}", session.state().board().display(None));
//! session.close().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod discovery;
mod games;
mod gateway;
mod provision;
mod reconciler;
mod session;
mod store;
mod turn;

// Crate-level exports - Configuration
pub use config::{ClientConfig, ConfigError, PollMode, ENV_PREFIX};

// Crate-level exports - Game types (tic-tac-toe)
pub use games::tictactoe::{
    check_winner, is_draw, is_full, winning_line, Board, BoardError, Cell, Line, Position, Symbol,
};

// Crate-level exports - Remote action gateway
pub use gateway::{
    clean_error_output, Action, ActionResult, BridgeSigner, Cursor, DataItemDraft, Gateway,
    GatewayError, GatewayErrorKind, HttpGateway, ProcessId, QueryResult, RemoteEvent, ResultEdge,
    ResultNode, ResultsPage, ResultsQuery, SignedDataItem, Signer, SortOrder, SpawnRequest,
    StatePayload, Tag, TaggedMessage,
};

// Crate-level exports - Game state store
pub use store::{
    Applied, GameState, GameStore, MatchPhase, Notice, PlayerRegistry, Prompt, RegistryError,
    RosterEntry, SharedStore, Transition,
};

// Crate-level exports - Polling and turns
pub use reconciler::{read_game_state, Reconciler, ReconcilerHandle, TickOutcome};
pub use session::GameSession;
pub use turn::{TurnController, TurnError};

// Crate-level exports - Discovery and provisioning
pub use discovery::{Discovery, GameListing};
pub use provision::{
    Artifacts, Exhausted, HttpArtifacts, Manifest, Provisioner, ProvisioningError,
    ProvisioningErrorKind, RetryPolicy, DEFAULT_AOS_MODULE, DEFAULT_AOS_VERSION,
    LEGACY_AOS_MODULES,
};
