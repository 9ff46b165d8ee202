//! Turn controller: registration and move submission.
//!
//! Every action is validated against the store before it reaches the
//! gateway; invalid actions never produce a remote call.

use crate::games::tictactoe::Position;
use crate::gateway::{Action, ActionResult, Gateway, GatewayError, RemoteEvent, Signer};
use crate::store::{MatchPhase, Notice, SharedStore, Transition};
use derive_more::{Display, Error, From};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, instrument, warn};

/// Why an action was refused or failed.
#[derive(Debug, Clone, Display, Error, From)]
pub enum TurnError {
    /// No wallet is connected.
    #[display("Connect a wallet first")]
    NoWallet,
    /// Registration is closed while a match is running.
    #[display("Registration is closed during a match")]
    RegistrationClosed,
    /// The wallet is already registered.
    #[display("Already registered")]
    AlreadyRegistered,
    /// The wallet must register before adding a bot.
    #[display("Register before adding a bot")]
    NotRegistered,
    /// No match is being played.
    #[display("No match in progress")]
    NotPlaying,
    /// Another participant is to move.
    #[display("It's not your turn")]
    NotYourTurn,
    /// The cell is taken.
    #[display("{} is already occupied", _0)]
    CellOccupied(#[error(not(source))] Position),
    /// A move on this cell is still in flight.
    #[display("A move on {} is already pending", _0)]
    Pending(#[error(not(source))] Position),
    /// The remote call failed or was rejected.
    #[display("{}", _0)]
    #[from]
    Gateway(GatewayError),
}

impl TurnError {
    /// Message suitable for showing to the player.
    pub fn user_message(&self) -> String {
        match self {
            TurnError::Gateway(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Cells with a move in flight. Each cell blocks only itself.
#[derive(Debug, Default)]
struct PendingCells(Mutex<HashSet<Position>>);

struct PendingGuard<'a> {
    cells: &'a PendingCells,
    position: Position,
}

impl PendingCells {
    fn acquire(&self, position: Position) -> Result<PendingGuard<'_>, TurnError> {
        let mut cells = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !cells.insert(position) {
            return Err(TurnError::Pending(position));
        }
        Ok(PendingGuard {
            cells: self,
            position,
        })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.cells
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.position);
    }
}

/// Submits the local wallet's actions and applies their results.
#[derive(Debug)]
pub struct TurnController {
    gateway: Arc<dyn Gateway>,
    store: SharedStore,
    signer: Option<Arc<dyn Signer>>,
    pending: PendingCells,
}

impl TurnController {
    /// Creates a controller. `signer` is `None` when no wallet is connected.
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: SharedStore,
        signer: Option<Arc<dyn Signer>>,
    ) -> Self {
        Self {
            gateway,
            store,
            signer,
            pending: PendingCells::default(),
        }
    }

    fn signer(&self) -> Result<&Arc<dyn Signer>, TurnError> {
        self.signer.as_ref().ok_or(TurnError::NoWallet)
    }

    /// Registers the wallet for the next match.
    #[instrument(skip(self))]
    pub async fn register(&self) -> Result<Option<Notice>, TurnError> {
        let signer = self.signer()?;
        let me = signer.address().to_string();
        self.store.read(|s| {
            let state = s.state();
            if *state.phase() != MatchPhase::Registering {
                return Err(TurnError::RegistrationClosed);
            }
            if state.players().contains(&me) {
                return Err(TurnError::AlreadyRegistered);
            }
            Ok(())
        })?;

        let result = self.send(Action::new("Register"), signer.as_ref()).await?;
        let notice = self.fold_reply(&result, Some(&me));
        result.check()?;
        Ok(notice)
    }

    /// Registers the game process's bot as the opponent.
    #[instrument(skip(self))]
    pub async fn register_bot(&self) -> Result<Option<Notice>, TurnError> {
        let signer = self.signer()?;
        let me = signer.address().to_string();
        let process = self.store.read(|s| {
            let state = s.state();
            if *state.phase() != MatchPhase::Registering {
                return Err(TurnError::RegistrationClosed);
            }
            if !state.players().contains(&me) {
                return Err(TurnError::NotRegistered);
            }
            Ok(s.process().clone())
        })?;

        let result = self.send(Action::new("Register-Bot"), signer.as_ref()).await?;
        let notice = self.fold_reply(&result, Some(process.as_str()));
        result.check()?;
        Ok(notice)
    }

    /// Submits a move for the wallet.
    ///
    /// When the process replied with any message, the cell is filled
    /// locally before the reply and error output are looked at.
    #[instrument(skip(self), fields(position = position.to_wire()))]
    pub async fn submit_move(&self, position: Position) -> Result<Option<Notice>, TurnError> {
        let signer = self.signer()?;
        let me = signer.address().to_string();
        self.store.read(|s| {
            let state = s.state();
            if *state.phase() != MatchPhase::Playing {
                return Err(TurnError::NotPlaying);
            }
            if !state.is_turn_of(&me) {
                return Err(TurnError::NotYourTurn);
            }
            if !state.board().is_empty(position) {
                return Err(TurnError::CellOccupied(position));
            }
            Ok(())
        })?;
        let _pending = self.pending.acquire(position)?;

        let action = Action::new("Make-Move").with_tag("Position", position.to_wire().to_string());
        let result = self.send(action, signer.as_ref()).await?;

        let mut notice = None;
        if !result.messages.is_empty() {
            self.store.apply(Transition::MoveSubmitted {
                player: me.clone(),
                position,
            });
            notice = self.fold_reply(&result, None);
        }
        result.check()?;
        info!(position = %position, "Move accepted");
        Ok(notice)
    }

    async fn send(&self, action: Action, signer: &dyn Signer) -> Result<ActionResult, GatewayError> {
        let process = self.store.read(|s| s.process().clone());
        self.gateway.submit(&process, &action, signer).await
    }

    fn fold_reply(&self, result: &ActionResult, registrant: Option<&str>) -> Option<Notice> {
        let reply = result.reply()?;
        match Transition::from_event(RemoteEvent::parse(reply), registrant) {
            Some(transition) => self.store.apply(transition).notice,
            None => {
                if result.error_output.is_none() {
                    warn!(action = ?reply.action(), "Reply carried no recognized event");
                }
                None
            }
        }
    }
}
