//! Game session: one game process, its store, turns and polling.
//!
//! A session fetches a full snapshot before any polling starts, then keeps
//! at most one reconciler running for as long as polling is wanted.

use crate::config::{ClientConfig, PollMode};
use crate::games::tictactoe::Position;
use crate::gateway::{Gateway, GatewayError, ProcessId, Signer};
use crate::reconciler::{read_game_state, Reconciler, ReconcilerHandle};
use crate::store::{
    Applied, GameState, GameStore, MatchPhase, Notice, Prompt, RosterEntry, SharedStore,
    Transition,
};
use crate::turn::{TurnController, TurnError};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// A client's connection to one game process.
#[derive(Debug)]
pub struct GameSession {
    gateway: Arc<dyn Gateway>,
    store: SharedStore,
    turns: TurnController,
    config: ClientConfig,
    polling: Option<ReconcilerHandle>,
    parked: Option<Reconciler>,
    notices_tx: mpsc::UnboundedSender<Notice>,
    notices_rx: Option<mpsc::UnboundedReceiver<Notice>>,
}

impl GameSession {
    /// Opens a session on `process`.
    ///
    /// The initial snapshot is applied before the reconciler is started.
    #[instrument(skip(gateway, config, signer), fields(process_id = %process))]
    pub async fn open(
        gateway: Arc<dyn Gateway>,
        config: ClientConfig,
        process: ProcessId,
        signer: Option<Arc<dyn Signer>>,
    ) -> Result<Self, GatewayError> {
        let me = signer.as_ref().map(|s| s.address().to_string());
        let store = SharedStore::new(GameStore::new(process.clone(), me));

        let payload = read_game_state(gateway.as_ref(), &process).await?;
        store.apply(Transition::Snapshot(payload));

        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let mut reconciler = Reconciler::new(Arc::clone(&gateway), store.clone(), &config)
            .with_notices(notices_tx.clone());
        reconciler.prime().await?;

        let turns = TurnController::new(Arc::clone(&gateway), store.clone(), signer);
        let mut session = Self {
            gateway,
            store,
            turns,
            config,
            polling: None,
            parked: Some(reconciler),
            notices_tx,
            notices_rx: Some(notices_rx),
        };
        session.sync_polling().await;
        info!(phase = %session.state().phase(), "Session open");
        Ok(session)
    }

    /// Game process address.
    pub fn process(&self) -> ProcessId {
        self.store.read(|s| s.process().clone())
    }

    /// Local wallet identity, if connected.
    pub fn me(&self) -> Option<String> {
        self.store.read(|s| s.me().map(str::to_string))
    }

    /// Latest committed state.
    pub fn state(&self) -> GameState {
        self.store.snapshot()
    }

    /// Shared store handle.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Turn controller.
    pub fn turns(&self) -> &TurnController {
        &self.turns
    }

    /// Receives state changes.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.store.subscribe()
    }

    /// Takes the notice receiver. Returns `None` after the first call.
    pub fn take_notices(&mut self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notices_rx.take()
    }

    /// Standing prompt for the local wallet.
    pub fn prompt(&self) -> Prompt {
        self.store.read(|s| Prompt::for_state(s.state(), s.me()))
    }

    /// Roster rows for display.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.store
            .read(|s| s.state().roster(s.me(), s.process()))
    }

    /// Re-reads the full state and replaces the local copy.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<Applied, GatewayError> {
        let process = self.process();
        let payload = read_game_state(self.gateway.as_ref(), &process).await?;
        let applied = self.store.apply(Transition::Snapshot(payload));
        self.sync_polling().await;
        Ok(applied)
    }

    /// Registers the local wallet.
    pub async fn register(&mut self) -> Result<(), TurnError> {
        let notice = self.turns.register().await;
        self.after_action(notice).await
    }

    /// Registers the process's bot as the opponent.
    pub async fn register_bot(&mut self) -> Result<(), TurnError> {
        let notice = self.turns.register_bot().await;
        self.after_action(notice).await
    }

    /// Plays a move for the local wallet.
    pub async fn play(&mut self, position: Position) -> Result<(), TurnError> {
        let notice = self.turns.submit_move(position).await;
        self.after_action(notice).await
    }

    async fn after_action(&mut self, result: Result<Option<Notice>, TurnError>) -> Result<(), TurnError> {
        self.sync_polling().await;
        if let Some(notice) = result? {
            self.publish(notice);
        }
        Ok(())
    }

    fn publish(&self, notice: Notice) {
        if self.notices_tx.send(notice).is_err() {
            debug!("Notice receiver dropped");
        }
    }

    fn polling_wanted(&self) -> bool {
        match self.config.poll_mode() {
            PollMode::Snapshot => true,
            PollMode::Incremental => {
                self.store.read(|s| *s.state().phase()) == MatchPhase::Playing
            }
        }
    }

    /// Whether a reconciler task is running.
    pub fn is_polling(&self) -> bool {
        self.polling.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts or stops the reconciler to match the current phase.
    ///
    /// Never runs more than one reconciler; a stopped reconciler keeps its
    /// cursor and is reused on the next start.
    #[instrument(skip(self))]
    pub async fn sync_polling(&mut self) {
        if let Some(handle) = self.polling.take_if(|h| h.is_finished()) {
            self.park(handle).await;
        }
        let wanted = self.polling_wanted();
        match (wanted, self.polling.is_some()) {
            (true, false) => {
                let reconciler = self.parked.take().unwrap_or_else(|| {
                    Reconciler::new(Arc::clone(&self.gateway), self.store.clone(), &self.config)
                        .with_notices(self.notices_tx.clone())
                });
                self.polling = Some(reconciler.start());
            }
            (false, true) => {
                if let Some(handle) = self.polling.take() {
                    self.park(handle).await;
                }
            }
            _ => {}
        }
    }

    async fn park(&mut self, handle: ReconcilerHandle) {
        match handle.stop().await {
            Some(reconciler) => self.parked = Some(reconciler),
            None => warn!("Reconciler lost, next start begins without a cursor"),
        }
    }

    /// Stops polling.
    #[instrument(skip(self))]
    pub async fn close(mut self) {
        if let Some(handle) = self.polling.take() {
            self.park(handle).await;
        }
        info!("Session closed");
    }
}
