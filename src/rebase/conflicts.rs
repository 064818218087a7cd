use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use super::orchestrator::RebaseTransition;
use super::session::RebaseSession;
use super::state::RebasePhase;
use crate::rpc::{BackendMethod, ConflictContent};

/// Unresolved paths in the order the backend reported them. The first one is
/// the active conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictQueue {
    files: VecDeque<String>,
}

impl ConflictQueue {
    pub fn from_files(files: Vec<String>) -> Self {
        let mut queue = VecDeque::with_capacity(files.len());
        for file in files {
            if !file.is_empty() && !queue.contains(&file) {
                queue.push_back(file);
            }
        }
        Self { files: queue }
    }

    pub fn active(&self) -> Option<&str> {
        self.files.front().map(String::as_str)
    }

    pub fn pop_active(&mut self) -> Option<String> {
        self.files.pop_front()
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// 与后端报告的文件列表一致（顺序相同）
    pub fn matches(&self, files: &[String]) -> bool {
        *self == Self::from_files(files.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    Ours,
    Theirs,
    /// Whatever the user left in the editor.
    Manual,
}

impl FromStr for ConflictResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ours" => Ok(ConflictResolution::Ours),
            "theirs" => Ok(ConflictResolution::Theirs),
            "manual" => Ok(ConflictResolution::Manual),
            other => Err(format!("unknown resolution '{}'", other)),
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConflictResolution::Ours => "ours",
            ConflictResolution::Theirs => "theirs",
            ConflictResolution::Manual => "manual",
        };
        f.write_str(text)
    }
}

impl RebaseSession {
    /// Fetches the active file's sides and shows them in the editor.
    pub(crate) async fn load_active_conflict(&self, generation: u64) -> bool {
        let Some(path) = self.read(|state| state.conflicts.active().map(str::to_string)) else {
            return false;
        };

        match self.backend.conflict_content(&path).await {
            Ok(content) => {
                let shown = content.clone();
                let applied = self.apply_if_current(generation, |state| {
                    if state.conflicts.active() == Some(path.as_str()) {
                        state.active_conflict = Some(content);
                        true
                    } else {
                        false
                    }
                });
                if applied != Some(true) {
                    return false;
                }
                let working = shown.merged.as_deref().unwrap_or(&shown.theirs);
                self.editor.set_dual_content(&shown.ours, working);
                tracing::debug!("Loaded conflict {}", path);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load conflict content for {}: {}", path, e);
                self.apply_if_current(generation, |state| state.last_error = Some(e));
                false
            }
        }
    }

    /// Resolves the active conflict. Once the queue is empty the rebase is
    /// continued.
    pub async fn resolve(&self, resolution: ConflictResolution) -> RebaseTransition {
        let current = self.read(|state| {
            (state.phase == RebasePhase::Conflicted)
                .then(|| state.conflicts.active().map(str::to_string))
                .flatten()
                .map(|path| (state.generation, path, state.active_conflict.clone()))
        });
        let Some((generation, path, loaded)) = current else {
            return self.invalid("There is no conflict to resolve");
        };
        if let Err(transition) = self.ensure_available(BackendMethod::ResolveConflict) {
            return transition;
        }

        let content = match resolution {
            ConflictResolution::Manual => self.editor.current_content(),
            ConflictResolution::Ours | ConflictResolution::Theirs => {
                let sides = match loaded {
                    Some(sides) => sides,
                    None => match self.fetch_conflict(&path).await {
                        Ok(sides) => sides,
                        Err(transition) => return transition,
                    },
                };
                if resolution == ConflictResolution::Ours {
                    sides.ours
                } else {
                    sides.theirs
                }
            }
        };

        tracing::info!("Resolving {} with {}", path, resolution);
        if let Err(e) = self.backend.resolve_conflict(&path, &content).await {
            return self.reject(generation, e);
        }

        let remaining = self.apply_if_current(generation, |state| {
            if state.conflicts.active() == Some(path.as_str()) {
                state.conflicts.pop_active();
            }
            state.active_conflict = None;
            state.last_error = None;
            state.conflicts.len()
        });

        match remaining {
            None => RebaseTransition::Stale,
            Some(0) => {
                tracing::info!("All conflicts resolved");
                self.continue_rebase().await
            }
            Some(_) => {
                self.load_active_conflict(generation).await;
                RebaseTransition::Conflicted
            }
        }
    }

    async fn fetch_conflict(&self, path: &str) -> Result<ConflictContent, RebaseTransition> {
        let generation = self.generation();
        self.backend
            .conflict_content(path)
            .await
            .map_err(|e| self.reject(generation, e))
    }
}
