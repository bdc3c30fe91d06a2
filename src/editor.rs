//! Holder of the current editor state.
//!
//! One writer swaps in new snapshots; any number of readers take a snapshot and
//! keep working on it while the writer moves on.

use std::sync::{PoisonError, RwLock};

use crate::codec;
use crate::error::{PersistError, RestoreError};
use crate::node::EditorState;
use crate::store::StateStore;

/// Outcome of a successful [`Editor::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// Nothing was stored under the key; the current state was kept.
    Absent,
    /// The stored document replaced the current state.
    Loaded,
}

#[derive(Debug, Default)]
pub struct Editor {
    state: RwLock<EditorState>,
}

impl Editor {
    pub fn new(state: EditorState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// The current snapshot. Cheap: the tree itself is shared.
    pub fn editor_state(&self) -> EditorState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_editor_state(&self, state: EditorState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Replace the current state with the one stored under `key`.
    ///
    /// On any error the current state is left as it was.
    pub fn restore(&self, store: &dyn StateStore, key: &str) -> Result<Restored, RestoreError> {
        let Some(json) = store.load(key).inspect_err(|e| {
            tracing::warn!(key, error = %e, "Could not load stored editor state");
        })?
        else {
            tracing::info!(key, "No stored editor state");
            return Ok(Restored::Absent);
        };

        let state = codec::decode(&json).inspect_err(|e| {
            tracing::warn!(key, error = %e, "Stored editor state rejected");
        })?;
        self.set_editor_state(state);
        tracing::info!(key, "Restored editor state");
        Ok(Restored::Loaded)
    }

    /// Save the current snapshot under `key`.
    pub fn persist(&self, store: &dyn StateStore, key: &str) -> Result<(), PersistError> {
        let json = codec::encode(&self.editor_state())?;
        store.save(key, &json).inspect_err(|e| {
            tracing::warn!(key, error = %e, "Could not persist editor state");
        })?;
        tracing::info!(key, bytes = json.len(), "Persisted editor state");
        Ok(())
    }
}
