// 区间对比：变更文件列表与单文件两侧内容
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use super::range::RangeSelector;
use crate::editor::DiffEditor;
use crate::infrastructure::PanelError;
use crate::rpc::Backend;

/// Versions that move with the working tree and must not be cached.
const VOLATILE_VERSIONS: &[&str] = &["HEAD", "working"];

pub const DEFAULT_CACHE_SIZE: usize = 64;

/// File contents keyed by `path:version`. Only immutable (hash) versions
/// are stored.
pub struct FileContentCache {
    entries: Mutex<LruCache<String, String>>,
}

impl FileContentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cache_key(path: &str, version: &str) -> String {
        format!("{}:{}", version, path)
    }

    fn is_cacheable(version: &str) -> bool {
        !VOLATILE_VERSIONS.contains(&version)
    }

    pub fn get(&self, path: &str, version: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&Self::cache_key(path, version)).cloned()
    }

    pub fn put(&self, path: &str, version: &str, content: String) {
        if !Self::is_cacheable(version) {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(Self::cache_key(path, version), content);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub from_version: String,
    pub to_version: String,
    pub original: String,
    pub modified: String,
}

impl FileDiff {
    pub fn is_unchanged(&self) -> bool {
        self.original == self.modified
    }
}

pub struct DiffComparison {
    backend: Arc<Backend>,
    editor: Arc<dyn DiffEditor>,
    cache: FileContentCache,
}

impl DiffComparison {
    pub fn new(backend: Arc<Backend>, editor: Arc<dyn DiffEditor>) -> Self {
        Self::with_cache_size(backend, editor, DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(
        backend: Arc<Backend>,
        editor: Arc<dyn DiffEditor>,
        cache_size: usize,
    ) -> Self {
        Self {
            backend,
            editor,
            cache: FileContentCache::new(cache_size),
        }
    }

    pub fn cache(&self) -> &FileContentCache {
        &self.cache
    }

    fn endpoints(range: &RangeSelector) -> Result<(String, String), PanelError> {
        match (range.from(), range.to()) {
            (Some(from), Some(to)) => Ok((from.to_string(), to.to_string())),
            _ => Err(PanelError::validation(
                "Select both a from and a to commit first",
            )),
        }
    }

    pub async fn changed_files(&self, range: &RangeSelector) -> Result<Vec<String>, PanelError> {
        let (from, to) = Self::endpoints(range)?;
        let files = self.backend.changed_files(&from, &to).await?;
        tracing::debug!("{} file(s) changed between {} and {}", files.len(), from, to);
        Ok(files)
    }

    async fn content(&self, path: &str, version: &str) -> Result<String, PanelError> {
        if let Some(cached) = self.cache.get(path, version) {
            return Ok(cached);
        }
        let content = self.backend.file_content(path, version).await?;
        self.cache.put(path, version, content.clone());
        Ok(content)
    }

    /// Loads both sides of `path` for the current range into the editor.
    pub async fn open_file(&self, range: &RangeSelector, path: &str) -> Result<FileDiff, PanelError> {
        let (from, to) = Self::endpoints(range)?;
        let (original, modified) =
            tokio::try_join!(self.content(path, &from), self.content(path, &to))?;

        self.editor.set_dual_content(&original, &modified);
        Ok(FileDiff {
            path: path.to_string(),
            from_version: from,
            to_version: to,
            original,
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatile_versions_not_cached() {
        let cache = FileContentCache::new(4);
        cache.put("a.txt", "working", "draft".to_string());
        cache.put("a.txt", "HEAD", "head".to_string());
        assert!(cache.is_empty());

        cache.put("a.txt", "abc123", "v1".to_string());
        assert_eq!(cache.get("a.txt", "abc123").as_deref(), Some("v1"));
        assert_eq!(cache.get("b.txt", "abc123"), None);
    }

    #[test]
    fn test_cache_evicts_least_recent() {
        let cache = FileContentCache::new(2);
        cache.put("a", "h1", "1".to_string());
        cache.put("b", "h1", "2".to_string());
        cache.get("a", "h1");
        cache.put("c", "h1", "3".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b", "h1").is_none());
        assert!(cache.get("a", "h1").is_some());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = FileContentCache::new(0);
        cache.put("a", "h1", "1".to_string());
        assert_eq!(cache.len(), 1);
    }
}
