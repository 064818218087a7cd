use std::fmt;

use super::conflicts::ConflictQueue;
use super::plan::{PlanEditError, RebaseAction, RebasePlan};
use super::session::RebaseSession;
use super::situation::SituationKind;
use super::state::RebasePhase;
use crate::history::RangeSelector;
use crate::infrastructure::PanelError;
use crate::rpc::{BackendMethod, RebaseRunReport};

const DEFAULT_COMMIT_MESSAGE: &str = "Rebase commit";

/// Outcome of one rebase operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RebaseTransition {
    Planned,
    Conflicted,
    Paused,
    AwaitingEditor,
    Completed,
    Aborted,
    Refreshed,
    Rejected(PanelError),
    /// The state was reset while the request was in flight.
    Stale,
    Unavailable(PanelError),
}

impl RebaseTransition {
    pub fn from_situation(kind: SituationKind) -> Self {
        match kind {
            SituationKind::NotRebasing => RebaseTransition::Completed,
            SituationKind::AwaitingEditorFile => RebaseTransition::AwaitingEditor,
            SituationKind::Conflicted => RebaseTransition::Conflicted,
            SituationKind::PausedAwaitingUser => RebaseTransition::Paused,
            SituationKind::InProgress => RebaseTransition::Refreshed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RebaseTransition::Rejected(_) | RebaseTransition::Unavailable(_)
        )
    }
}

impl fmt::Display for RebaseTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebaseTransition::Planned => f.write_str("plan ready"),
            RebaseTransition::Conflicted => f.write_str("stopped on conflicts"),
            RebaseTransition::Paused => f.write_str("paused for user"),
            RebaseTransition::AwaitingEditor => f.write_str("waiting for editor file"),
            RebaseTransition::Completed => f.write_str("rebase completed"),
            RebaseTransition::Aborted => f.write_str("rebase aborted"),
            RebaseTransition::Refreshed => f.write_str("state refreshed"),
            RebaseTransition::Rejected(e) => write!(f, "rejected: {}", e),
            RebaseTransition::Stale => f.write_str("superseded"),
            RebaseTransition::Unavailable(e) => write!(f, "unavailable: {}", e),
        }
    }
}

impl RebaseSession {
    pub async fn start_from_range(&self, range: &RangeSelector) -> RebaseTransition {
        self.start(range.from(), range.to()).await
    }

    /// Asks the backend for the commits between `from` and `to` and turns
    /// them into an editable plan.
    pub async fn start(&self, from: Option<&str>, to: Option<&str>) -> RebaseTransition {
        let (Some(from), Some(to)) = (
            from.filter(|h| !h.is_empty()),
            to.filter(|h| !h.is_empty()),
        ) else {
            return self.invalid("Select both a from and a to commit before starting a rebase");
        };
        if self.phase().is_active() {
            return self.invalid("A rebase is already underway");
        }
        if let Err(transition) = self.ensure_available(BackendMethod::StartInteractiveRebase) {
            return transition;
        }

        let generation = self.generation();
        tracing::info!("Starting interactive rebase {}..{}", from, to);
        match self.backend.start_interactive_rebase(from, to).await {
            Ok(steps) => {
                let range = (from.to_string(), to.to_string());
                let applied = self.apply_if_current(generation, |state| {
                    state.plan = RebasePlan::new(steps);
                    state.range = Some(range);
                    state.phase = RebasePhase::Planning;
                    state.last_error = None;
                    state.plan.len()
                });
                match applied {
                    Some(len) => {
                        tracing::info!("Rebase plan has {} step(s)", len);
                        RebaseTransition::Planned
                    }
                    None => RebaseTransition::Stale,
                }
            }
            Err(e) => self.reject(generation, e),
        }
    }

    pub fn set_step_action(&self, index: usize, action: RebaseAction) -> Result<(), PlanEditError> {
        self.with_state(|state| state.plan.set_action(index, action))
    }

    pub fn set_step_message(&self, index: usize, message: &str) -> Result<(), PlanEditError> {
        self.with_state(|state| state.plan.set_message(index, message))
    }

    pub fn move_step(&self, from: usize, to: usize) -> Result<(), PlanEditError> {
        self.with_state(|state| state.plan.move_step(from, to))
    }

    /// Sends the current plan.
    pub async fn execute(&self) -> RebaseTransition {
        if self.phase() != RebasePhase::Planning {
            return self.invalid("There is no rebase plan to execute");
        }
        if let Err(transition) = self.ensure_available(BackendMethod::ExecuteRebase) {
            return transition;
        }

        let (generation, steps) = self.with_state(|state| {
            state.phase = RebasePhase::Executing;
            state.last_error = None;
            (state.generation, state.plan.steps().to_vec())
        });
        tracing::info!("Executing rebase plan ({} step(s))", steps.len());

        match self.backend.execute_rebase(&steps).await {
            Ok(report) if report.has_conflicts() || report.success => {
                self.apply_run_report(generation, report).await
            }
            Ok(report) => {
                let error = failure_without_detail(BackendMethod::ExecuteRebase, &report);
                self.fail_execute(generation, error)
            }
            Err(e) => self.fail_execute(generation, e),
        }
    }

    fn fail_execute(&self, generation: u64, error: PanelError) -> RebaseTransition {
        let transition = self.reject(generation, error);
        self.apply_if_current(generation, |state| state.phase = RebasePhase::Planning);
        transition
    }

    /// Resumes a stopped rebase. A failure triggers one re-poll; if the
    /// backend turns out to be done, that counts as completion.
    pub async fn continue_rebase(&self) -> RebaseTransition {
        let previous = self.phase();
        if !previous.is_active() || previous.is_client_driven() {
            return self.invalid("There is no stopped rebase to continue");
        }
        if let Err(transition) = self.ensure_available(BackendMethod::ContinueRebase) {
            return transition;
        }

        let generation = self.with_state(|state| {
            state.phase = RebasePhase::Executing;
            state.generation
        });
        tracing::info!("Continuing rebase");

        let error = match self.backend.continue_rebase().await {
            Ok(report) if report.has_conflicts() || report.success => {
                return self.apply_run_report(generation, report).await;
            }
            Ok(report) => failure_without_detail(BackendMethod::ContinueRebase, &report),
            Err(e) => e,
        };

        tracing::warn!("Continue failed ({}), re-checking rebase status", error);
        let still_current = self
            .apply_if_current(generation, |state| state.phase = previous)
            .is_some();
        if !still_current {
            return RebaseTransition::Stale;
        }

        match self.poll().await {
            Some(SituationKind::NotRebasing) => {
                tracing::info!("Backend finished the rebase despite the error");
                RebaseTransition::Completed
            }
            _ => {
                let generation = self.generation();
                self.reject(generation, error)
            }
        }
    }

    /// Applies a conflict or success report from execute/continue.
    async fn apply_run_report(&self, generation: u64, report: RebaseRunReport) -> RebaseTransition {
        if report.has_conflicts() {
            tracing::info!("Rebase stopped on {} conflict(s)", report.conflicts.len());
            let applied = self.apply_if_current(generation, |state| {
                state.phase = RebasePhase::Conflicted;
                state.conflicts = ConflictQueue::from_files(report.conflicts);
                state.active_conflict = None;
                state.current_step = report.current_step;
                state.last_error = None;
            });
            if applied.is_none() {
                return RebaseTransition::Stale;
            }
            self.load_active_conflict(generation).await;
            return RebaseTransition::Conflicted;
        }

        if self
            .apply_if_current(generation, |state| state.reset())
            .is_none()
        {
            return RebaseTransition::Stale;
        }
        tracing::info!("Rebase step finished, checking for further stops");
        // 成功后后端可能停在 edit 步骤或等待编辑器文件
        match self.poll().await {
            Some(kind) => RebaseTransition::from_situation(kind),
            None => RebaseTransition::Completed,
        }
    }

    /// Resets locally first, then tells the backend. A backend failure is
    /// surfaced but the reset stands.
    pub async fn abort(&self) -> RebaseTransition {
        let generation = self.with_state(|state| {
            state.reset();
            state.generation
        });
        tracing::info!("Aborting rebase");

        let result = match self.backend.methods().resolve(BackendMethod::AbortRebase) {
            Ok(_) => self.backend.abort_rebase().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!("Backend abort failed: {}", e);
            self.apply_if_current(generation, |state| state.last_error = Some(e));
        }
        RebaseTransition::Aborted
    }

    /// Commits the staged changes at an edit stop.
    pub async fn commit_staged(&self, message: Option<&str>) -> RebaseTransition {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_COMMIT_MESSAGE);
        if !self.phase().is_active() {
            return self.invalid("There is no rebase stop to commit into");
        }
        if let Err(transition) = self.ensure_available(BackendMethod::CommitStaged) {
            return transition;
        }
        let generation = self.generation();
        match self.backend.commit_staged_changes(message).await {
            Ok(()) => self.refresh_after(generation).await,
            Err(e) => self.reject(generation, e),
        }
    }

    pub async fn amend_commit(&self) -> RebaseTransition {
        if !self.phase().is_active() {
            return self.invalid("There is no rebase stop to amend");
        }
        if let Err(transition) = self.ensure_available(BackendMethod::CommitAmend) {
            return transition;
        }
        let generation = self.generation();
        match self.backend.commit_amend().await {
            Ok(()) => self.refresh_after(generation).await,
            Err(e) => self.reject(generation, e),
        }
    }

    async fn refresh_after(&self, generation: u64) -> RebaseTransition {
        if self.generation() != generation {
            return RebaseTransition::Stale;
        }
        match self.poll().await {
            Some(kind) => RebaseTransition::from_situation(kind),
            None => RebaseTransition::Refreshed,
        }
    }
}

fn failure_without_detail(method: BackendMethod, report: &RebaseRunReport) -> PanelError {
    let message = report
        .error
        .clone()
        .unwrap_or_else(|| "operation reported failure".to_string());
    PanelError::backend(method.label(), message)
}
