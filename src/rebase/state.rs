use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

use super::conflicts::ConflictQueue;
use super::plan::RebasePlan;
use super::situation::SituationKind;
use crate::infrastructure::PanelError;
use crate::rpc::{ConflictContent, GitEditorRequest, GitStatus};
use crate::updates::FieldUpdates;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebasePhase {
    #[default]
    Idle,
    Planning,
    Executing,
    Conflicted,
    PausedAwaitingUser,
    AwaitingEditorFile,
    InProgress,
}

impl RebasePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RebasePhase::Idle => "idle",
            RebasePhase::Planning => "planning",
            RebasePhase::Executing => "executing",
            RebasePhase::Conflicted => "conflicted",
            RebasePhase::PausedAwaitingUser => "paused_awaiting_user",
            RebasePhase::AwaitingEditorFile => "awaiting_editor_file",
            RebasePhase::InProgress => "in_progress",
        }
    }

    pub fn is_active(self) -> bool {
        self != RebasePhase::Idle
    }

    /// Phases that exist only on this side; the backend has no rebase for
    /// them yet.
    pub fn is_client_driven(self) -> bool {
        matches!(self, RebasePhase::Planning | RebasePhase::Executing)
    }
}

impl fmt::Display for RebasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the rebase view shows. Reset wholesale when a rebase ends.
#[derive(Debug, Clone, Default)]
pub struct RebaseState {
    pub phase: RebasePhase,
    pub plan: RebasePlan,
    pub range: Option<(String, String)>,
    pub conflicts: ConflictQueue,
    pub active_conflict: Option<ConflictContent>,
    pub editor_request: Option<GitEditorRequest>,
    pub current_step: Option<u32>,
    pub todo_content: Option<String>,
    pub git_status: Option<GitStatus>,
    pub raw_status: Option<String>,
    pub last_situation: Option<SituationKind>,
    pub last_error: Option<PanelError>,
    pub last_polled_at: Option<DateTime<Utc>>,
    /// 每次重置递增，旧请求的响应据此丢弃
    pub generation: u64,
}

impl RebaseState {
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn chrome_hidden(&self) -> bool {
        self.phase == RebasePhase::AwaitingEditorFile
    }

    pub fn display_fields(&self) -> FieldUpdates {
        let mut fields = FieldUpdates::new();
        fields.insert("rebase.phase".into(), json!(self.phase.as_str()));
        fields.insert(
            "rebase.plan".into(),
            serde_json::to_value(self.plan.steps()).unwrap_or(Value::Null),
        );
        fields.insert(
            "rebase.conflicts".into(),
            json!(self.conflicts.files().collect::<Vec<_>>()),
        );
        fields.insert("rebase.active_file".into(), json!(self.conflicts.active()));
        fields.insert(
            "rebase.editor_file".into(),
            json!(self.editor_request.as_ref().map(|r| r.file.as_str())),
        );
        fields.insert("rebase.chrome_hidden".into(), json!(self.chrome_hidden()));
        fields.insert("rebase.current_step".into(), json!(self.current_step));
        fields.insert(
            "rebase.git_status".into(),
            serde_json::to_value(&self.git_status).unwrap_or(Value::Null),
        );
        fields.insert("rebase.raw_status".into(), json!(self.raw_status));
        fields.insert(
            "rebase.error".into(),
            json!(self.last_error.as_ref().map(ToString::to_string)),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebase::plan::RebaseStep;

    #[test]
    fn test_reset_bumps_generation_and_clears() {
        let mut state = RebaseState {
            phase: RebasePhase::Conflicted,
            plan: RebasePlan::new(vec![RebaseStep::new("abc", "msg")]),
            conflicts: ConflictQueue::from_files(vec!["a.txt".to_string()]),
            last_error: Some(PanelError::transport("down")),
            generation: 3,
            ..Default::default()
        };

        state.reset();
        assert_eq!(state.generation, 4);
        assert_eq!(state.phase, RebasePhase::Idle);
        assert!(state.plan.is_empty());
        assert!(state.conflicts.is_empty());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_display_fields() {
        let state = RebaseState {
            phase: RebasePhase::AwaitingEditorFile,
            conflicts: ConflictQueue::from_files(vec!["a.txt".to_string(), "b.txt".to_string()]),
            ..Default::default()
        };
        let fields = state.display_fields();
        assert_eq!(fields["rebase.phase"], json!("awaiting_editor_file"));
        assert_eq!(fields["rebase.chrome_hidden"], json!(true));
        assert_eq!(fields["rebase.active_file"], json!("a.txt"));
        assert_eq!(fields["rebase.error"], Value::Null);
    }
}
