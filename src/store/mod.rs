//! Game state store.
//!
//! [`GameStore`] is the single writer of [`GameState`]. [`SharedStore`]
//! lets the turn controller and the reconciler share it, and publishes every
//! committed change on a watch channel so readers only ever see whole
//! states.

mod notice;
mod state;
mod transition;

pub use notice::{Notice, Prompt};
pub use state::{GameState, MatchPhase, PlayerRegistry, RegistryError, RosterEntry};
pub use transition::{Applied, GameStore, Transition};

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Cloneable handle to a [`GameStore`].
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<GameStore>>,
    published: watch::Sender<GameState>,
}

impl SharedStore {
    /// Wraps a store.
    pub fn new(store: GameStore) -> Self {
        let (published, _) = watch::channel(store.state().clone());
        Self {
            inner: Arc::new(Mutex::new(store)),
            published,
        }
    }

    /// Applies a transition and publishes the result if it changed anything.
    pub fn apply(&self, transition: Transition) -> Applied {
        let (applied, state) = {
            let mut store = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let applied = store.apply(transition);
            (applied, store.state().clone())
        };
        if applied.changed {
            self.published.send_replace(state);
        }
        applied
    }

    /// Copy of the latest committed state.
    pub fn snapshot(&self) -> GameState {
        self.read(|store| store.state().clone())
    }

    /// Reads through the store.
    pub fn read<R>(&self, f: impl FnOnce(&GameStore) -> R) -> R {
        let store = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&store)
    }

    /// Receives every committed state change.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.published.subscribe()
    }
}
