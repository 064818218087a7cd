// 后端响应的数据模型，缺失字段一律取默认值
use serde::{Deserialize, Serialize};

use crate::rebase::plan::RebaseStep;

/// Ephemeral file the backend's git process is waiting on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitEditorRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub file: String,
    pub content: String,
    pub description: String,
    pub instructions: String,
}

impl GitEditorRequest {
    pub fn file_kind(&self) -> EditorFileKind {
        EditorFileKind::parse(&self.kind)
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorFileKind {
    RebaseTodo,
    CommitMessage,
    MergeMessage,
    SquashMessage,
    TagMessage,
    Config,
    Other(String),
}

impl EditorFileKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "rebase_todo" => EditorFileKind::RebaseTodo,
            "commit_message" => EditorFileKind::CommitMessage,
            "merge_message" => EditorFileKind::MergeMessage,
            "squash_message" => EditorFileKind::SquashMessage,
            "tag_message" => EditorFileKind::TagMessage,
            "config" => EditorFileKind::Config,
            other => EditorFileKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EditorFileKind::RebaseTodo => "rebase_todo",
            EditorFileKind::CommitMessage => "commit_message",
            EditorFileKind::MergeMessage => "merge_message",
            EditorFileKind::SquashMessage => "squash_message",
            EditorFileKind::TagMessage => "tag_message",
            EditorFileKind::Config => "config",
            EditorFileKind::Other(kind) => kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorStatus {
    pub waiting_for_editor: bool,
    pub primary_file: Option<GitEditorRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebaseStatusReport {
    pub in_rebase: bool,
    pub rebase_type: Option<String>,
    pub has_todo_content: bool,
    pub todo_content: String,
    pub editor_status: EditorStatus,
}

impl RebaseStatusReport {
    pub fn is_interactive(&self) -> bool {
        self.rebase_type.as_deref() == Some("interactive")
    }

    /// 后端正在等待且内容非空的编辑器文件
    pub fn pending_editor_file(&self) -> Option<&GitEditorRequest> {
        if !self.editor_status.waiting_for_editor {
            return None;
        }
        self.editor_status
            .primary_file
            .as_ref()
            .filter(|request| request.has_content())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitStatus {
    pub branch: Option<String>,
    pub is_dirty: bool,
    pub modified_files: Vec<String>,
    pub staged_files: Vec<String>,
    pub untracked_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictContent {
    pub ours: String,
    pub theirs: String,
    pub merged: Option<String>,
}

/// Outcome of `execute rebase` / `continue rebase`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebaseRunReport {
    pub success: bool,
    pub conflicts: Vec<String>,
    #[serde(rename = "currentStep")]
    pub current_step: Option<u32>,
    pub error: Option<String>,
}

impl RebaseRunReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StartRebaseResponse {
    pub success: bool,
    pub commits: Vec<RebaseStep>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawStatusResponse {
    pub raw_status: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rebase_status_with_editor_file() {
        let report: RebaseStatusReport = serde_json::from_value(json!({
            "in_rebase": true,
            "rebase_type": "interactive",
            "has_todo_content": true,
            "todo_content": "pick abc123 first\n",
            "editor_status": {
                "waiting_for_editor": true,
                "primary_file": {
                    "type": "rebase_todo",
                    "file": "git-rebase-todo",
                    "path": "/repo/.git/rebase-merge/git-rebase-todo",
                    "content": "pick abc123 first\n",
                    "description": "Interactive Rebase Todo File",
                    "instructions": "Edit the rebase plan."
                },
                "all_files": [],
                "count": 1
            }
        }))
        .unwrap();

        assert!(report.is_interactive());
        let request = report.pending_editor_file().unwrap();
        assert_eq!(request.file_kind(), EditorFileKind::RebaseTodo);
        assert_eq!(request.file, "git-rebase-todo");
    }

    #[test]
    fn test_blank_editor_content_is_not_pending() {
        let report: RebaseStatusReport = serde_json::from_value(json!({
            "in_rebase": true,
            "rebase_type": "interactive",
            "editor_status": {
                "waiting_for_editor": true,
                "primary_file": {"type": "commit_message", "content": "   \n"}
            }
        }))
        .unwrap();
        assert!(report.pending_editor_file().is_none());
    }

    #[test]
    fn test_not_in_rebase_minimal_payload() {
        let report: RebaseStatusReport =
            serde_json::from_value(json!({"in_rebase": false, "editor_status": {}})).unwrap();
        assert!(!report.in_rebase);
        assert!(report.editor_status.primary_file.is_none());
    }

    #[test]
    fn test_run_report_with_conflicts() {
        let report: RebaseRunReport = serde_json::from_value(json!({
            "success": false,
            "conflicts": ["a.txt", "b.txt"],
            "currentStep": 1,
            "error": "Conflicts detected during rebase"
        }))
        .unwrap();
        assert!(report.has_conflicts());
        assert_eq!(report.current_step, Some(1));
    }

    #[test]
    fn test_unknown_editor_kind_is_preserved() {
        let kind = EditorFileKind::parse("notes");
        assert_eq!(kind, EditorFileKind::Other("notes".to_string()));
        assert_eq!(kind.as_str(), "notes");
    }
}
