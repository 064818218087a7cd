use serde::Serialize;
use std::fmt;

use crate::rpc::{GitEditorRequest, GitStatus, RebaseStatusReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SituationKind {
    NotRebasing,
    AwaitingEditorFile,
    Conflicted,
    PausedAwaitingUser,
    InProgress,
}

impl fmt::Display for SituationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SituationKind::NotRebasing => "not rebasing",
            SituationKind::AwaitingEditorFile => "waiting for editor file",
            SituationKind::Conflicted => "conflicted",
            SituationKind::PausedAwaitingUser => "paused",
            SituationKind::InProgress => "in progress",
        };
        f.write_str(text)
    }
}

/// What the backend is doing right now, derived fresh on every poll.
#[derive(Debug, Clone, PartialEq)]
pub enum RebaseSituation {
    NotRebasing,
    AwaitingEditorFile(GitEditorRequest),
    Conflicted(Vec<String>),
    PausedAwaitingUser,
    InProgress,
}

impl RebaseSituation {
    pub fn kind(&self) -> SituationKind {
        match self {
            RebaseSituation::NotRebasing => SituationKind::NotRebasing,
            RebaseSituation::AwaitingEditorFile(_) => SituationKind::AwaitingEditorFile,
            RebaseSituation::Conflicted(_) => SituationKind::Conflicted,
            RebaseSituation::PausedAwaitingUser => SituationKind::PausedAwaitingUser,
            RebaseSituation::InProgress => SituationKind::InProgress,
        }
    }
}

/// Classification order matters: an editor hand-off wins over the conflict
/// probe, which only applies to interactive rebases.
///
/// Without a structured status the probe has nothing to go on and the rebase
/// is treated as paused.
pub fn classify(report: &RebaseStatusReport, status: Option<&GitStatus>) -> RebaseSituation {
    if !report.in_rebase {
        return RebaseSituation::NotRebasing;
    }
    if let Some(request) = report.pending_editor_file() {
        return RebaseSituation::AwaitingEditorFile(request.clone());
    }
    if report.is_interactive() {
        return match status {
            Some(status) if !status.modified_files.is_empty() => {
                RebaseSituation::Conflicted(status.modified_files.clone())
            }
            _ => RebaseSituation::PausedAwaitingUser,
        };
    }
    RebaseSituation::InProgress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::EditorStatus;

    fn in_rebase(kind: Option<&str>) -> RebaseStatusReport {
        RebaseStatusReport {
            in_rebase: true,
            rebase_type: kind.map(str::to_string),
            ..Default::default()
        }
    }

    fn editor_request(content: &str) -> GitEditorRequest {
        GitEditorRequest {
            kind: "commit_message".to_string(),
            file: ".git/COMMIT_EDITMSG".to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_not_rebasing() {
        let report = RebaseStatusReport::default();
        assert_eq!(classify(&report, None), RebaseSituation::NotRebasing);
    }

    #[test]
    fn test_editor_file_wins() {
        let mut report = in_rebase(Some("interactive"));
        report.editor_status = EditorStatus {
            waiting_for_editor: true,
            primary_file: Some(editor_request("Squashed message")),
        };
        let status = GitStatus {
            modified_files: vec!["a.txt".to_string()],
            ..Default::default()
        };

        let situation = classify(&report, Some(&status));
        assert_eq!(situation.kind(), SituationKind::AwaitingEditorFile);
    }

    #[test]
    fn test_blank_editor_content_falls_through_to_probe() {
        let mut report = in_rebase(Some("interactive"));
        report.editor_status = EditorStatus {
            waiting_for_editor: true,
            primary_file: Some(editor_request("  \n ")),
        };
        assert_eq!(
            classify(&report, Some(&GitStatus::default())),
            RebaseSituation::PausedAwaitingUser
        );
    }

    #[test]
    fn test_conflict_probe() {
        let report = in_rebase(Some("interactive"));
        let status = GitStatus {
            modified_files: vec!["a.txt".to_string(), "b.txt".to_string()],
            ..Default::default()
        };
        assert_eq!(
            classify(&report, Some(&status)),
            RebaseSituation::Conflicted(vec!["a.txt".to_string(), "b.txt".to_string()])
        );
        assert_eq!(classify(&report, None), RebaseSituation::PausedAwaitingUser);
    }

    #[test]
    fn test_non_interactive_is_in_progress() {
        assert_eq!(
            classify(&in_rebase(Some("merge")), None),
            RebaseSituation::InProgress
        );
        assert_eq!(classify(&in_rebase(None), None), RebaseSituation::InProgress);
    }
}
