use std::collections::BTreeMap;

use super::models::Commit;

/// Two-sided from/to selection over a newest-first commit sequence.
///
/// Whenever both ends are set and present in the sequence, `from` is never
/// newer than `to` (its index is greater than or equal to `to`'s).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSelector {
    from: Option<String>,
    to: Option<String>,
}

fn index_of(commits: &[Commit], hash: &str) -> Option<usize> {
    commits.iter().position(|c| c.hash == hash)
}

impl RangeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    pub fn clear(&mut self) {
        self.from = None;
        self.to = None;
    }

    fn ordered(commits: &[Commit], from: &str, to: &str) -> bool {
        match (index_of(commits, from), index_of(commits, to)) {
            (Some(from_idx), Some(to_idx)) => from_idx >= to_idx,
            _ => true,
        }
    }

    /// Returns `false` and leaves the selection untouched when `hash` is
    /// newer than the current `to`.
    pub fn select_from(&mut self, commits: &[Commit], hash: &str) -> bool {
        if hash.is_empty() {
            self.from = None;
            return true;
        }
        if let Some(to) = &self.to {
            if !Self::ordered(commits, hash, to) {
                tracing::debug!("Rejected from={} (newer than to={})", hash, to);
                return false;
            }
        }
        self.from = Some(hash.to_string());
        true
    }

    /// Always takes `hash`; returns `true` when `from` had to be cleared.
    pub fn select_to(&mut self, commits: &[Commit], hash: &str) -> bool {
        if hash.is_empty() {
            self.to = None;
            return false;
        }
        self.to = Some(hash.to_string());
        let violates = self
            .from
            .as_deref()
            .is_some_and(|from| !Self::ordered(commits, from, hash));
        if violates {
            tracing::debug!("Cleared from (older side) after to={}", hash);
            self.from = None;
        }
        violates
    }

    /// Commits strictly newer than `to`.
    pub fn disabled_for_from<'a>(&self, commits: &'a [Commit]) -> Vec<&'a str> {
        let Some(to_idx) = self.to.as_deref().and_then(|to| index_of(commits, to)) else {
            return Vec::new();
        };
        commits[..to_idx].iter().map(|c| c.hash.as_str()).collect()
    }

    /// Commits strictly older than `from`.
    pub fn disabled_for_to<'a>(&self, commits: &'a [Commit]) -> Vec<&'a str> {
        let Some(from_idx) = self.from.as_deref().and_then(|from| index_of(commits, from)) else {
            return Vec::new();
        };
        commits[from_idx + 1..]
            .iter()
            .map(|c| c.hash.as_str())
            .collect()
    }

    pub fn disabled_branches_for_from(&self, commits: &[Commit]) -> Vec<String> {
        let Some(to_idx) = self.to.as_deref().and_then(|to| index_of(commits, to)) else {
            return Vec::new();
        };
        fully_disabled_branches(commits, |idx| idx < to_idx)
    }

    pub fn disabled_branches_for_to(&self, commits: &[Commit]) -> Vec<String> {
        let Some(from_idx) = self.from.as_deref().and_then(|from| index_of(commits, from)) else {
            return Vec::new();
        };
        fully_disabled_branches(commits, |idx| idx > from_idx)
    }
}

/// 某分支的全部提交都被禁用时，整个分支才算禁用
fn fully_disabled_branches(commits: &[Commit], disabled: impl Fn(usize) -> bool) -> Vec<String> {
    let mut branches: BTreeMap<&str, bool> = BTreeMap::new();
    for (idx, commit) in commits.iter().enumerate() {
        if let Some(branch) = commit.branch.as_deref() {
            let entry = branches.entry(branch).or_insert(true);
            *entry = *entry && disabled(idx);
        }
    }
    branches
        .into_iter()
        .filter(|(_, all_disabled)| *all_disabled)
        .map(|(branch, _)| branch.to_string())
        .collect()
}
