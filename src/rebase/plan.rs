use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebaseAction {
    #[default]
    Pick,
    Drop,
    Squash,
    Edit,
}

impl RebaseAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RebaseAction::Pick => "pick",
            RebaseAction::Drop => "drop",
            RebaseAction::Squash => "squash",
            RebaseAction::Edit => "edit",
        }
    }

    pub fn parse(action: &str) -> Option<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "pick" | "p" => Some(RebaseAction::Pick),
            "drop" | "d" => Some(RebaseAction::Drop),
            "squash" | "s" => Some(RebaseAction::Squash),
            "edit" | "e" => Some(RebaseAction::Edit),
            _ => None,
        }
    }
}

impl fmt::Display for RebaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计划中的一步，身份由 hash 决定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebaseStep {
    pub hash: String,
    pub message: String,
    pub action: RebaseAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl RebaseStep {
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanEditError {
    #[error("Step index {index} is out of range (plan has {len} steps)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("The first step cannot be squashed")]
    SquashOnFirstStep,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebasePlan {
    steps: Vec<RebaseStep>,
}

impl RebasePlan {
    pub fn new(steps: Vec<RebaseStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[RebaseStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn step_mut(&mut self, index: usize) -> Result<&mut RebaseStep, PlanEditError> {
        let len = self.steps.len();
        self.steps
            .get_mut(index)
            .ok_or(PlanEditError::IndexOutOfRange { index, len })
    }

    pub fn set_action(&mut self, index: usize, action: RebaseAction) -> Result<(), PlanEditError> {
        if index == 0 && action == RebaseAction::Squash {
            return Err(PlanEditError::SquashOnFirstStep);
        }
        self.step_mut(index)?.action = action;
        Ok(())
    }

    pub fn set_message(
        &mut self,
        index: usize,
        message: impl Into<String>,
    ) -> Result<(), PlanEditError> {
        self.step_mut(index)?.message = message.into();
        Ok(())
    }

    /// Moves a step, keeping its hash, message and action intact.
    ///
    /// Moving a squash step to the front is allowed here; the backend has the
    /// final word on whether the resulting plan runs.
    pub fn move_step(&mut self, from: usize, to: usize) -> Result<(), PlanEditError> {
        let len = self.steps.len();
        if from >= len {
            return Err(PlanEditError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(PlanEditError::IndexOutOfRange { index: to, len });
        }
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        Ok(())
    }

    /// git-rebase-todo 格式，drop 的步骤直接省略
    pub fn to_todo_text(&self) -> String {
        let mut text = String::new();
        for step in self.steps.iter().filter(|s| s.action != RebaseAction::Drop) {
            let message = step.message.split_whitespace().collect::<Vec<_>>().join(" ");
            text.push_str(&format!("{} {} {}\n", step.action, step.hash, message));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> RebasePlan {
        RebasePlan::new(vec![
            RebaseStep::new("aaa1111", "first"),
            RebaseStep::new("bbb2222", "second"),
            RebaseStep::new("ccc3333", "third"),
        ])
    }

    #[test]
    fn test_squash_rejected_on_first_step() {
        let mut plan = sample_plan();
        assert_eq!(
            plan.set_action(0, RebaseAction::Squash),
            Err(PlanEditError::SquashOnFirstStep)
        );
        assert_eq!(plan.steps()[0].action, RebaseAction::Pick);

        plan.set_action(1, RebaseAction::Squash).unwrap();
        assert_eq!(plan.steps()[1].action, RebaseAction::Squash);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut plan = sample_plan();
        assert_eq!(
            plan.set_message(3, "nope"),
            Err(PlanEditError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert!(plan.move_step(0, 5).is_err());
    }

    #[test]
    fn test_move_preserves_identity() {
        let mut plan = sample_plan();
        plan.set_action(2, RebaseAction::Edit).unwrap();
        plan.move_step(2, 0).unwrap();

        let hashes: Vec<_> = plan.steps().iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(hashes, vec!["ccc3333", "aaa1111", "bbb2222"]);
        assert_eq!(plan.steps()[0].action, RebaseAction::Edit);
        assert_eq!(plan.steps()[0].message, "third");
    }

    #[test]
    fn test_todo_text_omits_drops_and_flattens_messages() {
        let mut plan = sample_plan();
        plan.set_action(1, RebaseAction::Drop).unwrap();
        plan.set_message(2, "third\n\nwith body").unwrap();

        assert_eq!(
            plan.to_todo_text(),
            "pick aaa1111 first\npick ccc3333 third with body\n"
        );
    }

    #[test]
    fn test_step_wire_format() {
        let step: RebaseStep = serde_json::from_value(serde_json::json!({
            "hash": "abc1234def",
            "message": "Fix bug",
            "author": "Alice",
            "date": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(step.action, RebaseAction::Pick);
        assert_eq!(step.short_hash(), "abc1234");

        let value = serde_json::to_value(RebaseStep {
            action: RebaseAction::Squash,
            ..RebaseStep::new("abc", "msg")
        })
        .unwrap();
        assert_eq!(value["action"], "squash");
        assert!(value.get("author").is_none());
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(RebaseAction::parse("S"), Some(RebaseAction::Squash));
        assert_eq!(RebaseAction::parse("drop"), Some(RebaseAction::Drop));
        assert_eq!(RebaseAction::parse("reword"), None);
    }
}
