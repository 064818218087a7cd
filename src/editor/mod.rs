// 编辑器组件的抽象
use std::sync::{Mutex, MutexGuard};

/// The text/diff widget the panel drives.
///
/// Implementations must tolerate being fed content from any task; the panel
/// never holds its own locks while calling in.
pub trait DiffEditor: Send + Sync {
    fn selected_text(&self) -> Option<String>;

    /// Left side is the older/"ours" text, right side the newer/"theirs" text.
    fn set_dual_content(&self, original: &str, modified: &str);

    /// 当前可编辑的内容（右侧）
    fn current_content(&self) -> String;
}

#[derive(Debug, Default)]
struct Buffers {
    original: String,
    modified: String,
    selection: Option<(usize, usize)>,
    loads: usize,
}

/// In-memory editor used by the CLI and tests.
#[derive(Debug, Default)]
pub struct BufferEditor {
    buffers: Mutex<Buffers>,
}

impl BufferEditor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buffers> {
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the editable side, as a user typing would.
    pub fn set_current(&self, content: impl Into<String>) {
        let mut buffers = self.lock();
        buffers.modified = content.into();
        buffers.selection = None;
    }

    /// Byte range into the editable side; out-of-range selections are ignored.
    pub fn select(&self, start: usize, end: usize) {
        let mut buffers = self.lock();
        if start <= end && buffers.modified.get(start..end).is_some() {
            buffers.selection = Some((start, end));
        }
    }

    pub fn original_content(&self) -> String {
        self.lock().original.clone()
    }

    /// 被 `set_dual_content` 写入的次数
    pub fn load_count(&self) -> usize {
        self.lock().loads
    }
}

impl DiffEditor for BufferEditor {
    fn selected_text(&self) -> Option<String> {
        let buffers = self.lock();
        let (start, end) = buffers.selection?;
        buffers.modified.get(start..end).map(str::to_string)
    }

    fn set_dual_content(&self, original: &str, modified: &str) {
        let mut buffers = self.lock();
        buffers.original = original.to_string();
        buffers.modified = modified.to_string();
        buffers.selection = None;
        buffers.loads += 1;
    }

    fn current_content(&self) -> String {
        self.lock().modified.clone()
    }
}
