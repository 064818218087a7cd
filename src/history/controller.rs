use serde_json::{json, Value};
use std::sync::Arc;

use super::decoder::{CommitDecoder, JsonCommitDecoder};
use super::models::Commit;
use super::range::RangeSelector;
use super::store::CommitStore;
use crate::infrastructure::PanelError;
use crate::rpc::Backend;
use crate::updates::BatchedUpdateCoordinator;

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    Loaded { appended: usize },
    Exhausted,
    Failed,
}

/// History view state: paged commits plus the from/to selection.
///
/// Owned and driven through `&mut self`, so two loads can never overlap.
pub struct HistoryController {
    backend: Arc<Backend>,
    decoder: Box<dyn CommitDecoder>,
    store: CommitStore,
    range: RangeSelector,
    page_size: usize,
    branch: Option<String>,
    updates: Option<BatchedUpdateCoordinator>,
}

impl HistoryController {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self {
            backend,
            decoder: Box::new(JsonCommitDecoder),
            store: CommitStore::new(),
            range: RangeSelector::new(),
            page_size: DEFAULT_PAGE_SIZE,
            branch: None,
            updates: None,
        }
    }

    pub fn with_decoder(mut self, decoder: Box<dyn CommitDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch.filter(|b| !b.is_empty());
        self
    }

    pub fn with_updates(mut self, updates: BatchedUpdateCoordinator) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn commits(&self) -> &[Commit] {
        self.store.commits()
    }

    pub fn store(&self) -> &CommitStore {
        &self.store
    }

    pub fn range(&self) -> &RangeSelector {
        &self.range
    }

    pub fn has_more(&self) -> bool {
        self.store.has_more()
    }

    pub fn error(&self) -> Option<&PanelError> {
        self.store.error()
    }

    async fn fetch(&self, skip: usize) -> Result<Vec<Commit>, PanelError> {
        let raw = self
            .backend
            .commit_history(self.page_size, self.branch.as_deref(), skip)
            .await?;
        self.decoder.decode(raw)
    }

    pub async fn load_first_page(&mut self, page_size: usize) -> PageLoad {
        self.page_size = page_size.max(1);

        // 失败时保留已加载的提交和选区
        let outcome = match self.fetch(0).await {
            Ok(commits) => {
                let returned = commits.len();
                self.store.replace_first_page(commits);
                self.range.clear();
                self.select_defaults(returned);
                tracing::info!("Loaded {} commit(s)", self.store.len());
                if self.store.is_empty() {
                    PageLoad::Exhausted
                } else {
                    PageLoad::Loaded {
                        appended: self.store.len(),
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load commit history: {}", e);
                self.store.set_error(e);
                PageLoad::Failed
            }
        };
        self.publish();
        outcome
    }

    /// 新的提交默认选中：to 为最新，from 为次新
    fn select_defaults(&mut self, returned: usize) {
        let commits = self.store.commits();
        match commits {
            [] => self.store.set_has_more(false),
            [only] => {
                let hash = only.hash.clone();
                self.range.select_to(self.store.commits(), &hash);
                self.range.select_from(self.store.commits(), &hash);
                self.store.set_has_more(false);
            }
            [newest, second, ..] => {
                let (to, from) = (newest.hash.clone(), second.hash.clone());
                self.range.select_to(self.store.commits(), &to);
                self.range.select_from(self.store.commits(), &from);
                self.store.set_has_more(returned == self.page_size);
            }
        }
    }

    pub async fn load_next_page(&mut self) -> PageLoad {
        if !self.store.has_more() {
            return PageLoad::Exhausted;
        }

        let outcome = match self.fetch(self.store.offset()).await {
            Ok(commits) => {
                let returned = commits.len();
                let appended = self.store.append_page(commits);
                if returned == 0 || appended < self.page_size {
                    self.store.set_has_more(false);
                }
                tracing::debug!(
                    "History page: {} returned, {} new, has_more={}",
                    returned,
                    appended,
                    self.store.has_more()
                );
                if appended == 0 {
                    PageLoad::Exhausted
                } else {
                    PageLoad::Loaded { appended }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load more history: {}", e);
                self.store.set_error(e);
                PageLoad::Failed
            }
        };
        self.publish();
        outcome
    }

    pub fn select_from(&mut self, hash: &str) -> bool {
        let accepted = self.range.select_from(self.store.commits(), hash);
        if accepted {
            self.publish();
        }
        accepted
    }

    pub fn select_to(&mut self, hash: &str) -> bool {
        let cleared = self.range.select_to(self.store.commits(), hash);
        self.publish();
        cleared
    }

    pub fn clear_range(&mut self) {
        self.range.clear();
        self.publish();
    }

    pub fn disabled_for_from(&self) -> Vec<&str> {
        self.range.disabled_for_from(self.store.commits())
    }

    pub fn disabled_for_to(&self) -> Vec<&str> {
        self.range.disabled_for_to(self.store.commits())
    }

    pub fn disabled_branches_for_from(&self) -> Vec<String> {
        self.range.disabled_branches_for_from(self.store.commits())
    }

    pub fn disabled_branches_for_to(&self) -> Vec<String> {
        self.range.disabled_branches_for_to(self.store.commits())
    }

    fn publish(&self) {
        let Some(updates) = &self.updates else {
            return;
        };
        let error = self
            .store
            .error()
            .map(|e| Value::String(e.to_string()))
            .unwrap_or(Value::Null);
        updates.schedule([
            ("history.commit_count", json!(self.store.len())),
            ("history.has_more", json!(self.store.has_more())),
            ("history.error", error),
            ("range.from", json!(self.range.from())),
            ("range.to", json!(self.range.to())),
        ]);
    }
}
