use std::sync::{Arc, Mutex, MutexGuard};

use super::orchestrator::RebaseTransition;
use super::state::{RebasePhase, RebaseState};
use crate::editor::DiffEditor;
use crate::infrastructure::PanelError;
use crate::rpc::{Backend, BackendMethod};
use crate::updates::BatchedUpdateCoordinator;

/// Shared rebase state plus the collaborators every rebase operation needs.
///
/// The state lock is never held across an `.await`: operations read what
/// they need, release, call the backend, then re-check the generation before
/// applying the response.
pub struct RebaseSession {
    pub(crate) backend: Arc<Backend>,
    pub(crate) editor: Arc<dyn DiffEditor>,
    updates: BatchedUpdateCoordinator,
    state: Mutex<RebaseState>,
}

impl RebaseSession {
    pub fn new(
        backend: Arc<Backend>,
        editor: Arc<dyn DiffEditor>,
        updates: BatchedUpdateCoordinator,
    ) -> Self {
        Self {
            backend,
            editor,
            updates,
            state: Mutex::new(RebaseState::default()),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn updates(&self) -> &BatchedUpdateCoordinator {
        &self.updates
    }

    fn lock(&self) -> MutexGuard<'_, RebaseState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> RebaseState {
        self.lock().clone()
    }

    pub fn phase(&self) -> RebasePhase {
        self.lock().phase
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn last_error(&self) -> Option<PanelError> {
        self.lock().last_error.clone()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&RebaseState) -> R) -> R {
        f(&self.lock())
    }

    /// Mutates the state and publishes the display fields as one batch.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut RebaseState) -> R) -> R {
        let (result, fields) = {
            let mut state = self.lock();
            let result = f(&mut state);
            (result, state.display_fields())
        };
        self.updates.schedule(fields);
        result
    }

    /// Like `with_state`, but only if nothing reset the state since
    /// `generation` was read.
    pub(crate) fn apply_if_current<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut RebaseState) -> R,
    ) -> Option<R> {
        let (result, fields) = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!(
                    "Discarding stale response (generation {} != {})",
                    generation,
                    state.generation
                );
                return None;
            }
            let result = f(&mut state);
            (result, state.display_fields())
        };
        self.updates.schedule(fields);
        Some(result)
    }

    /// Records `error` unless the state moved on, mapping to the matching
    /// transition.
    pub(crate) fn reject(&self, generation: u64, error: PanelError) -> RebaseTransition {
        tracing::error!("{}", error);
        let recorded = error.clone();
        match self.apply_if_current(generation, |state| state.last_error = Some(recorded)) {
            Some(()) => RebaseTransition::Rejected(error),
            None => RebaseTransition::Stale,
        }
    }

    /// Local precondition failure; always recorded.
    pub(crate) fn invalid(&self, message: &str) -> RebaseTransition {
        let error = PanelError::validation(message);
        tracing::warn!("{}", error);
        let recorded = error.clone();
        self.with_state(|state| state.last_error = Some(recorded));
        RebaseTransition::Rejected(error)
    }

    /// Mutating operations need a live backend that offers `method`.
    pub(crate) fn ensure_available(&self, method: BackendMethod) -> Result<(), RebaseTransition> {
        let error = if !self.backend.is_connected() {
            PanelError::transport(format!("cannot {} while disconnected", method))
        } else if !self.backend.methods().supports(method) {
            PanelError::unavailable(method.label())
        } else {
            return Ok(());
        };
        tracing::warn!("{}", error);
        let recorded = error.clone();
        self.with_state(|state| state.last_error = Some(recorded));
        Err(RebaseTransition::Unavailable(error))
    }
}
