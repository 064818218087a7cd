// git 编辑器文件（rebase-todo、提交信息等）的交接
use super::orchestrator::RebaseTransition;
use super::session::RebaseSession;
use super::state::RebasePhase;
use crate::rpc::{BackendMethod, GitEditorRequest};

impl RebaseSession {
    /// While the backend waits on an editor file the panel shows only the
    /// editor.
    pub fn chrome_hidden(&self) -> bool {
        self.read(|state| state.chrome_hidden())
    }

    pub fn editor_request(&self) -> Option<GitEditorRequest> {
        self.read(|state| state.editor_request.clone())
    }

    /// Submits the editor's content for the pending file, then re-polls.
    pub async fn save_git_editor_file(&self) -> RebaseTransition {
        let pending = self.read(|state| {
            (state.phase == RebasePhase::AwaitingEditorFile)
                .then(|| state.editor_request.clone())
                .flatten()
                .map(|request| (state.generation, request))
        });
        let Some((generation, request)) = pending else {
            return self.invalid("The backend is not waiting for an editor file");
        };
        if let Err(transition) = self.ensure_available(BackendMethod::SaveGitEditorFile) {
            return transition;
        }

        let content = self.editor.current_content();
        tracing::info!("Saving {} ({})", request.file, request.file_kind().as_str());
        if let Err(e) = self.backend.save_git_editor_file(&request.kind, &content).await {
            return self.reject(generation, e);
        }

        let exited = self.apply_if_current(generation, |state| {
            state.editor_request = None;
            state.phase = RebasePhase::InProgress;
            state.last_error = None;
        });
        if exited.is_none() {
            return RebaseTransition::Stale;
        }
        self.poll().await;
        RebaseTransition::Refreshed
    }
}
