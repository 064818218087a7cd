use std::collections::HashMap;
use std::fmt;

use super::invoker::RpcInvoker;
use crate::infrastructure::PanelError;

/// Logical backend operations the panel depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendMethod {
    CommitHistory,
    ChangedFiles,
    FileContent,
    ConflictContent,
    RebaseStatus,
    Status,
    RawStatus,
    StartInteractiveRebase,
    ExecuteRebase,
    ContinueRebase,
    AbortRebase,
    ResolveConflict,
    SaveGitEditorFile,
    CommitStaged,
    CommitAmend,
}

impl BackendMethod {
    pub const ALL: [BackendMethod; 15] = [
        BackendMethod::CommitHistory,
        BackendMethod::ChangedFiles,
        BackendMethod::FileContent,
        BackendMethod::ConflictContent,
        BackendMethod::RebaseStatus,
        BackendMethod::Status,
        BackendMethod::RawStatus,
        BackendMethod::StartInteractiveRebase,
        BackendMethod::ExecuteRebase,
        BackendMethod::ContinueRebase,
        BackendMethod::AbortRebase,
        BackendMethod::ResolveConflict,
        BackendMethod::SaveGitEditorFile,
        BackendMethod::CommitStaged,
        BackendMethod::CommitAmend,
    ];

    /// 候选的远程方法名，按优先级排列
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            BackendMethod::CommitHistory => &[
                "Repo.get_commit_history",
                "RepoHistory.get_commit_history",
                "get_commit_history",
            ],
            BackendMethod::ChangedFiles => &[
                "Repo.get_changed_files",
                "RepoHistory.get_changed_files",
                "get_changed_files",
            ],
            BackendMethod::FileContent => &[
                "Repo.get_file_content_at_commit",
                "Repo.get_file_content",
                "get_file_content",
            ],
            BackendMethod::ConflictContent => &["Repo.get_conflict_content", "get_conflict_content"],
            BackendMethod::RebaseStatus => &["Repo.get_rebase_status", "get_rebase_status"],
            BackendMethod::Status => &["Repo.get_status", "get_status"],
            BackendMethod::RawStatus => &["Repo.get_raw_git_status", "get_raw_git_status"],
            BackendMethod::StartInteractiveRebase => &[
                "Repo.start_interactive_rebase",
                "start_interactive_rebase",
            ],
            BackendMethod::ExecuteRebase => &["Repo.execute_rebase", "execute_rebase"],
            BackendMethod::ContinueRebase => &["Repo.continue_rebase", "continue_rebase"],
            BackendMethod::AbortRebase => &["Repo.abort_rebase", "abort_rebase"],
            BackendMethod::ResolveConflict => &["Repo.resolve_conflict", "resolve_conflict"],
            BackendMethod::SaveGitEditorFile => &[
                "Repo.save_git_editor_file",
                "save_git_editor_file",
            ],
            BackendMethod::CommitStaged => &[
                "Repo.commit_staged_changes",
                "commit_staged_changes",
            ],
            BackendMethod::CommitAmend => &["Repo.commit_amend", "commit_amend"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BackendMethod::CommitHistory => "get commit history",
            BackendMethod::ChangedFiles => "get changed files",
            BackendMethod::FileContent => "get file content",
            BackendMethod::ConflictContent => "get conflict content",
            BackendMethod::RebaseStatus => "get rebase status",
            BackendMethod::Status => "get status",
            BackendMethod::RawStatus => "get raw status",
            BackendMethod::StartInteractiveRebase => "start interactive rebase",
            BackendMethod::ExecuteRebase => "execute rebase",
            BackendMethod::ContinueRebase => "continue rebase",
            BackendMethod::AbortRebase => "abort rebase",
            BackendMethod::ResolveConflict => "resolve conflict",
            BackendMethod::SaveGitEditorFile => "save git editor file",
            BackendMethod::CommitStaged => "commit staged changes",
            BackendMethod::CommitAmend => "commit amend",
        }
    }
}

impl fmt::Display for BackendMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed mapping from logical operation to the concrete remote name,
/// negotiated once when the connection becomes ready.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    resolved: HashMap<BackendMethod, String>,
}

impl MethodTable {
    /// 询问后端一次可用方法列表并生成方法表。
    ///
    /// 后端不支持列举时退回到每个操作的首选名称；连接失败直接返回错误。
    pub async fn negotiate(invoker: &dyn RpcInvoker) -> Result<Self, PanelError> {
        match invoker.list_methods().await {
            Ok(names) => {
                let table = Self::from_available(&names);
                let missing = table.missing();
                if !missing.is_empty() {
                    tracing::warn!(
                        "Backend is missing {} operation(s): {:?}",
                        missing.len(),
                        missing.iter().map(|m| m.label()).collect::<Vec<_>>()
                    );
                }
                Ok(table)
            }
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                tracing::warn!("Method listing unsupported ({}), assuming default names", e);
                Ok(Self::assume_defaults())
            }
        }
    }

    pub fn from_available(names: &[String]) -> Self {
        let mut resolved = HashMap::new();
        for method in BackendMethod::ALL {
            if let Some(name) = method
                .candidates()
                .iter()
                .find(|candidate| names.iter().any(|n| n == *candidate))
            {
                resolved.insert(method, name.to_string());
            }
        }
        Self { resolved }
    }

    pub fn assume_defaults() -> Self {
        let resolved = BackendMethod::ALL
            .iter()
            .filter_map(|m| m.candidates().first().map(|name| (*m, name.to_string())))
            .collect();
        Self { resolved }
    }

    pub fn resolve(&self, method: BackendMethod) -> Result<&str, PanelError> {
        self.resolved
            .get(&method)
            .map(String::as_str)
            .ok_or_else(|| PanelError::unavailable(method.label()))
    }

    pub fn supports(&self, method: BackendMethod) -> bool {
        self.resolved.contains_key(&method)
    }

    pub fn missing(&self) -> Vec<BackendMethod> {
        BackendMethod::ALL
            .iter()
            .copied()
            .filter(|m| !self.resolved.contains_key(m))
            .collect()
    }
}
