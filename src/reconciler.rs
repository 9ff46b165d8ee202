//! Polling reconciler.
//!
//! Folds remote progress into a [`SharedStore`] on a fixed interval. In
//! [`PollMode::Incremental`] it pages the process's result log and folds the
//! newest unseen entry carrying a recognized event, only while a match is
//! being played. In
//! [`PollMode::Snapshot`] it re-fetches the full game state on every tick.
//!
//! The cursor is owned by the reconciler and only moves when a newer entry
//! is seen, so a message is folded at most once.

use crate::config::{ClientConfig, PollMode};
use crate::gateway::{
    Action, Cursor, Gateway, GatewayError, ProcessId, RemoteEvent, ResultsQuery, SortOrder,
    StatePayload,
};
use crate::store::{Applied, MatchPhase, Notice, SharedStore, Transition};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Reads the full game state with a `Get-Game-State` query.
#[instrument(skip(gateway), fields(process_id = %process))]
pub async fn read_game_state(
    gateway: &dyn Gateway,
    process: &ProcessId,
) -> Result<StatePayload, GatewayError> {
    let result = gateway.query(process, &Action::new("Get-Game-State")).await?;
    let payload = StatePayload::from_json(result.first_data()?)?;
    debug!(phase = ?payload.state, "Read game state");
    Ok(payload)
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Polling is not wanted in the current phase.
    Inactive,
    /// Nothing newer than the cursor.
    NoNewResults,
    /// No unseen entry had anything to fold.
    Skipped,
    /// A transition was applied.
    Folded(Applied),
}

/// Polling state for one game process.
#[derive(Debug)]
pub struct Reconciler {
    gateway: Arc<dyn Gateway>,
    store: SharedStore,
    process: ProcessId,
    mode: PollMode,
    interval: Duration,
    page_size: usize,
    cursor: Option<Cursor>,
    notices: Option<mpsc::UnboundedSender<Notice>>,
}

impl Reconciler {
    /// Creates a reconciler with an empty cursor.
    pub fn new(gateway: Arc<dyn Gateway>, store: SharedStore, config: &ClientConfig) -> Self {
        let process = store.read(|s| s.process().clone());
        Self {
            gateway,
            store,
            process,
            mode: *config.poll_mode(),
            interval: config.poll_interval(),
            page_size: *config.page_size(),
            cursor: None,
            notices: None,
        }
    }

    /// Forwards notices produced by folded events.
    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<Notice>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Last observed position in the result log.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Polling mode.
    pub fn mode(&self) -> PollMode {
        self.mode
    }

    /// Whether polling is wanted in the store's current phase.
    pub fn is_active(&self) -> bool {
        match self.mode {
            PollMode::Snapshot => true,
            PollMode::Incremental => {
                self.store.read(|s| *s.state().phase()) == MatchPhase::Playing
            }
        }
    }

    /// Marks the newest existing log entry as seen without folding it.
    ///
    /// Used after a snapshot so that history already reflected in the
    /// snapshot is not replayed.
    #[instrument(skip(self), fields(process_id = %self.process))]
    pub async fn prime(&mut self) -> Result<(), GatewayError> {
        if self.mode != PollMode::Incremental || self.cursor.is_some() {
            return Ok(());
        }
        let query = ResultsQuery {
            from: None,
            limit: 1,
            sort: SortOrder::Descending,
        };
        let page = self.gateway.results(&self.process, &query).await?;
        if let Some(edge) = page.edges.into_iter().next() {
            debug!(cursor = %edge.cursor, "Primed cursor");
            self.cursor = Some(edge.cursor);
        }
        Ok(())
    }

    /// Performs one poll.
    #[instrument(skip(self), fields(process_id = %self.process, mode = %self.mode, cursor = ?self.cursor))]
    pub async fn tick(&mut self) -> Result<TickOutcome, GatewayError> {
        if !self.is_active() {
            return Ok(TickOutcome::Inactive);
        }
        let outcome = match self.mode {
            PollMode::Snapshot => {
                let payload = read_game_state(self.gateway.as_ref(), &self.process).await?;
                TickOutcome::Folded(self.store.apply(Transition::Snapshot(payload)))
            }
            PollMode::Incremental => self.fold_newest().await?,
        };
        if let TickOutcome::Folded(applied) = &outcome
            && let Some(notice) = &applied.notice
        {
            self.publish(notice.clone());
        }
        Ok(outcome)
    }

    async fn fold_newest(&mut self) -> Result<TickOutcome, GatewayError> {
        let query = ResultsQuery {
            from: self.cursor.clone(),
            limit: self.page_size,
            sort: SortOrder::Descending,
        };
        let page = self.gateway.results(&self.process, &query).await?;

        let unseen: Vec<_> = page
            .edges
            .into_iter()
            .take_while(|edge| Some(&edge.cursor) != self.cursor.as_ref())
            .collect();
        let Some(newest) = unseen.first() else {
            return Ok(TickOutcome::NoNewResults);
        };
        debug!(cursor = %newest.cursor, unseen = unseen.len(), "Advancing cursor");
        self.cursor = Some(newest.cursor.clone());

        // In a bot game the newest entry is usually the bot's own message;
        // the event to fold sits behind it.
        let transition = unseen.iter().find_map(|edge| {
            let message = edge.node.messages.last()?;
            let transition = Transition::from_event(RemoteEvent::parse(message), None);
            if transition.is_some() && edge.cursor != newest.cursor {
                debug!(cursor = %edge.cursor, "Folding older entry");
            }
            transition
        });
        match transition {
            Some(transition) => Ok(TickOutcome::Folded(self.store.apply(transition))),
            None => Ok(TickOutcome::Skipped),
        }
    }

    fn publish(&self, notice: Notice) {
        if let Some(tx) = &self.notices
            && tx.send(notice).is_err()
        {
            debug!("Notice receiver dropped");
        }
    }

    /// Runs the reconciler on its own task until stopped or inactive.
    ///
    /// The first poll happens one interval after start.
    #[instrument(skip(self), fields(process_id = %self.process, interval_ms = self.interval.as_millis() as u64))]
    pub fn start(mut self) -> ReconcilerHandle {
        info!("Starting reconciler");
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + self.interval,
                self.interval,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }
                let result = tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    result = self.tick() => result,
                };
                match result {
                    Ok(TickOutcome::Inactive) => {
                        info!("Match no longer in play, reconciler exiting");
                        break;
                    }
                    Ok(outcome) => debug!(?outcome, "Tick complete"),
                    // Next tick retries.
                    Err(e) => warn!(error = %e, "Reconciler tick failed"),
                }
                if !self.is_active() {
                    info!("Match no longer in play, reconciler exiting");
                    break;
                }
            }
            self
        });
        ReconcilerHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Handle to a running reconciler. Dropping it cancels the task.
#[derive(Debug)]
pub struct ReconcilerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Reconciler>,
}

impl ReconcilerHandle {
    /// Stops the task and returns the reconciler with its cursor.
    ///
    /// No tick folds anything after this returns.
    #[instrument(skip(self))]
    pub async fn stop(mut self) -> Option<Reconciler> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match (&mut self.task).await {
            Ok(reconciler) => {
                info!("Reconciler stopped");
                Some(reconciler)
            }
            Err(e) => {
                warn!(error = %e, "Reconciler task did not finish cleanly");
                None
            }
        }
    }

    /// Whether the task has exited on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.abort();
    }
}
