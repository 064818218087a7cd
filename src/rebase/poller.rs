use chrono::Utc;

use super::conflicts::ConflictQueue;
use super::session::RebaseSession;
use super::situation::{classify, RebaseSituation, SituationKind};
use super::state::RebasePhase;
use crate::rpc::GitEditorRequest;

/// Work left over after the state was updated, done without the lock.
enum FollowUp {
    Nothing,
    FeedEditor(GitEditorRequest),
    LoadConflict,
}

impl RebaseSession {
    /// Re-reads the backend's rebase status and reconciles local state with
    /// it. Returns `None` when the status request failed or the state was
    /// reset meanwhile.
    pub async fn poll(&self) -> Option<SituationKind> {
        let generation = self.generation();

        let report = match self.backend.rebase_status().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Failed to get rebase status: {}", e);
                self.apply_if_current(generation, |state| {
                    state.last_error = Some(e);
                    state.last_polled_at = Some(Utc::now());
                });
                return None;
            }
        };

        let (status, raw_status) = tokio::join!(self.backend.status(), self.backend.raw_status());
        let status = status
            .map_err(|e| tracing::warn!("Failed to get git status: {}", e))
            .ok();
        let raw_status = raw_status.unwrap_or_else(|e| {
            tracing::warn!("Failed to get raw git status: {}", e);
            None
        });

        let situation = classify(&report, status.as_ref());
        let kind = situation.kind();
        tracing::debug!("Rebase status: {}", kind);

        let follow_up = self.apply_if_current(generation, |state| {
            let follow_up = match situation {
                RebaseSituation::NotRebasing => {
                    // Idle 状态本身就是"未在 rebase"，不需要重置
                    let settled = state.phase == RebasePhase::Idle;
                    if !settled && !state.phase.is_client_driven() {
                        tracing::info!("Backend is no longer rebasing, resetting");
                        state.reset();
                    }
                    FollowUp::Nothing
                }
                RebaseSituation::AwaitingEditorFile(request) => {
                    state.phase = RebasePhase::AwaitingEditorFile;
                    if state.editor_request.as_ref() == Some(&request) {
                        FollowUp::Nothing
                    } else {
                        tracing::info!("Backend is waiting for {}", request.file);
                        state.editor_request = Some(request.clone());
                        FollowUp::FeedEditor(request)
                    }
                }
                RebaseSituation::Conflicted(files) => {
                    state.phase = RebasePhase::Conflicted;
                    state.editor_request = None;
                    if state.conflicts.matches(&files) && state.active_conflict.is_some() {
                        FollowUp::Nothing
                    } else {
                        state.conflicts = ConflictQueue::from_files(files);
                        state.active_conflict = None;
                        FollowUp::LoadConflict
                    }
                }
                RebaseSituation::PausedAwaitingUser => {
                    state.phase = RebasePhase::PausedAwaitingUser;
                    state.editor_request = None;
                    state.conflicts.clear();
                    state.active_conflict = None;
                    FollowUp::Nothing
                }
                RebaseSituation::InProgress => {
                    state.phase = RebasePhase::InProgress;
                    state.editor_request = None;
                    FollowUp::Nothing
                }
            };

            state.git_status = status;
            state.raw_status = raw_status;
            state.todo_content = report.has_todo_content.then(|| report.todo_content.clone());
            state.last_situation = Some(kind);
            state.last_polled_at = Some(Utc::now());
            (follow_up, state.generation)
        });

        let (follow_up, generation) = follow_up?;
        match follow_up {
            FollowUp::Nothing => {}
            FollowUp::FeedEditor(request) => {
                self.editor.set_dual_content(&request.content, &request.content);
            }
            FollowUp::LoadConflict => {
                self.load_active_conflict(generation).await;
            }
        }
        Some(kind)
    }
}
