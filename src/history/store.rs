use std::collections::HashSet;

use super::models::Commit;
use crate::infrastructure::PanelError;

/// Newest-first commit list with paging bookkeeping.
///
/// The store only ever appends or replaces the whole list; it never reorders.
#[derive(Debug, Clone, Default)]
pub struct CommitStore {
    commits: Vec<Commit>,
    known: HashSet<String>,
    /// 后端累计返回的条数（含重复），作为下一页的 skip
    offset: usize,
    has_more: bool,
    error: Option<PanelError>,
}

impl CommitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn set_has_more(&mut self, has_more: bool) {
        self.has_more = has_more;
    }

    pub fn error(&self) -> Option<&PanelError> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: PanelError) {
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.known.contains(hash)
    }

    pub fn position(&self, hash: &str) -> Option<usize> {
        if !self.contains(hash) {
            return None;
        }
        self.commits.iter().position(|c| c.hash == hash)
    }

    pub fn replace_first_page(&mut self, commits: Vec<Commit>) {
        let returned = commits.len();
        self.commits.clear();
        self.known.clear();
        self.offset = 0;
        self.push_unique(commits);
        self.offset = returned;
        self.error = None;
    }

    /// Appends a page, skipping hashes already present. Returns how many
    /// commits were actually added.
    pub fn append_page(&mut self, commits: Vec<Commit>) -> usize {
        self.offset += commits.len();
        self.error = None;
        self.push_unique(commits)
    }

    fn push_unique(&mut self, commits: Vec<Commit>) -> usize {
        let before = self.commits.len();
        for commit in commits {
            if self.known.insert(commit.hash.clone()) {
                self.commits.push(commit);
            }
        }
        self.commits.len() - before
    }
}
