use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// 一批字段更新，键为展示字段名
pub type FieldUpdates = BTreeMap<String, Value>;

/// Coalesces field writes into one downstream notification per tick.
///
/// `schedule` only grows the pending buffer while a flush is outstanding, so
/// however many components write during one tick the presentation layer sees
/// a single batch.
///
/// The flush runs as a spawned task, so the one-batch-per-tick guarantee
/// holds on a `current_thread` runtime only. On a multi-thread runtime a
/// worker may flush while another task is halfway through its writes.
#[derive(Clone)]
pub struct BatchedUpdateCoordinator {
    shared: Arc<Shared>,
}

struct Shared {
    pending: Mutex<Pending>,
    sender: mpsc::UnboundedSender<FieldUpdates>,
}

#[derive(Default)]
struct Pending {
    buffer: FieldUpdates,
    flush_scheduled: bool,
    snapshot: FieldUpdates,
    notifications: u64,
}

impl BatchedUpdateCoordinator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FieldUpdates>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let coordinator = Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(Pending::default()),
                sender,
            }),
        };
        (coordinator, receiver)
    }

    /// 没有订阅者的协调器，仍然维护快照
    pub fn detached() -> Self {
        Self::new().0
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn schedule<I, K>(&self, updates: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let needs_flush = {
            let mut pending = self.lock();
            pending
                .buffer
                .extend(updates.into_iter().map(|(key, value)| (key.into(), value)));
            if pending.flush_scheduled || pending.buffer.is_empty() {
                false
            } else {
                pending.flush_scheduled = true;
                true
            }
        };

        if !needs_flush {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let coordinator = self.clone();
                handle.spawn(async move {
                    tokio::task::yield_now().await;
                    coordinator.flush();
                });
            }
            Err(_) => {
                self.flush();
            }
        }
    }

    /// Applies everything buffered in one pass and emits one notification.
    pub fn flush(&self) -> Option<FieldUpdates> {
        let batch = {
            let mut pending = self.lock();
            pending.flush_scheduled = false;
            if pending.buffer.is_empty() {
                return None;
            }
            let batch = std::mem::take(&mut pending.buffer);
            for (key, value) in &batch {
                pending.snapshot.insert(key.clone(), value.clone());
            }
            pending.notifications += 1;
            batch
        };

        tracing::debug!("Flushing {} field update(s)", batch.len());
        if self.shared.sender.send(batch.clone()).is_err() {
            tracing::trace!("No listener for field updates");
        }
        Some(batch)
    }

    pub fn snapshot(&self) -> FieldUpdates {
        self.lock().snapshot.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().snapshot.get(key).cloned()
    }

    pub fn notification_count(&self) -> u64 {
        self.lock().notifications
    }

    pub fn has_pending(&self) -> bool {
        self.lock().flush_scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_schedules_coalesce_into_one_notification() {
        let (coordinator, mut rx) = BatchedUpdateCoordinator::new();

        coordinator.schedule([("phase", json!("executing")), ("error", json!(null))]);
        coordinator.schedule([("phase", json!("conflicted"))]);
        coordinator.schedule([("conflicts", json!(["a.txt"]))]);
        assert!(coordinator.has_pending());

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch["phase"], json!("conflicted"));
        assert_eq!(batch["conflicts"], json!(["a.txt"]));

        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(coordinator.notification_count(), 1);
        assert!(!coordinator.has_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_writer_still_gets_one_batch() {
        let (coordinator, mut rx) = BatchedUpdateCoordinator::new();

        coordinator.schedule([("rebase.phase", json!("executing"))]);
        std::thread::sleep(std::time::Duration::from_millis(20));
        coordinator.schedule([("rebase.plan", json!([]))]);
        std::thread::sleep(std::time::Duration::from_millis(20));
        coordinator.schedule([("rebase.phase", json!("conflicted"))]);

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch["rebase.phase"], json!("conflicted"));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(coordinator.notification_count(), 1);
    }

    #[tokio::test]
    async fn test_later_ticks_get_their_own_batch() {
        let (coordinator, mut rx) = BatchedUpdateCoordinator::new();

        coordinator.schedule([("phase", json!("planning"))]);
        let first = rx.recv().await.unwrap();
        coordinator.schedule([("phase", json!("idle"))]);
        let second = rx.recv().await.unwrap();

        assert_eq!(first["phase"], json!("planning"));
        assert_eq!(second["phase"], json!("idle"));
        assert_eq!(coordinator.notification_count(), 2);
        assert_eq!(coordinator.get("phase"), Some(json!("idle")));
    }

    #[test]
    fn test_flushes_synchronously_without_runtime() {
        let (coordinator, mut rx) = BatchedUpdateCoordinator::new();
        coordinator.schedule([("raw_status", json!("On branch main"))]);

        let batch = rx.try_recv().unwrap();
        assert_eq!(batch["raw_status"], json!("On branch main"));
        assert!(!coordinator.has_pending());
    }

    #[test]
    fn test_empty_schedule_does_not_notify() {
        let (coordinator, mut rx) = BatchedUpdateCoordinator::new();
        coordinator.schedule(Vec::<(String, Value)>::new());
        assert!(rx.try_recv().is_err());
        assert_eq!(coordinator.notification_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_accumulates_across_batches() {
        let coordinator = BatchedUpdateCoordinator::detached();
        coordinator.schedule([("a", json!(1))]);
        coordinator.flush();
        coordinator.schedule([("b", json!(2)), ("a", json!(3))]);
        coordinator.flush();

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot["a"], json!(3));
        assert_eq!(snapshot["b"], json!(2));
    }
}
