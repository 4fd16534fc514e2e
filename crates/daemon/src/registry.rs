//! Task registry
//!
//! Tracks every adapter task started by the daemon so finished ones can be
//! pruned and the process can wait for the rest before exiting.

use crate::adapters::AdapterKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A running (or finished, not yet pruned) adapter
#[derive(Debug)]
pub struct AdapterTask {
    pub device_path: PathBuf,
    pub kind: AdapterKind,
    handle: JoinHandle<()>,
}

impl AdapterTask {
    pub fn new(device_path: PathBuf, kind: AdapterKind, handle: JoinHandle<()>) -> Self {
        Self {
            device_path,
            kind,
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Shared list of adapter tasks
///
/// Cloning yields another handle to the same list.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<Vec<AdapterTask>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AdapterTask>> {
        // A panic while holding the lock leaves the Vec itself intact
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register(&self, task: AdapterTask) {
        debug!(
            "Registered {} adapter for {}",
            task.kind,
            task.device_path.display()
        );
        self.lock().push(task);
    }

    /// Drop tasks that have finished; returns how many were removed
    pub fn prune(&self) -> usize {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(AdapterTask::is_running);
        before - tasks.len()
    }

    /// True when a live task is reading `path`
    pub fn is_active(&self, path: &Path) -> bool {
        self.lock()
            .iter()
            .any(|t| t.device_path == path && t.is_running())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for every registered task, including ones registered while waiting
    pub async fn join_all(&self) {
        loop {
            let batch: Vec<AdapterTask> = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return;
            }
            for task in batch {
                if let Err(e) = task.handle.await {
                    warn!(
                        "{} adapter for {} ended abnormally: {}",
                        task.kind,
                        task.device_path.display(),
                        e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn task(path: &str, handle: JoinHandle<()>) -> AdapterTask {
        AdapterTask::new(PathBuf::from(path), AdapterKind::Keyboard, handle)
    }

    #[tokio::test]
    async fn test_prune_removes_finished() {
        let registry = TaskRegistry::new();
        let (tx, rx) = oneshot::channel::<()>();

        let done = tokio::spawn(async {});
        let pending = tokio::spawn(async move {
            let _ = rx.await;
        });
        registry.register(task("/dev/input/event1", done));
        registry.register(task("/dev/input/event2", pending));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_active(Path::new("/dev/input/event2")));
        assert!(!registry.is_active(Path::new("/dev/input/event1")));

        tx.send(()).unwrap();
        registry.join_all().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_join_all_waits_for_late_registrations() {
        let registry = TaskRegistry::new();
        let inner = registry.clone();

        let spawner = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            inner.register(task(
                "/dev/bus/usb/001/004",
                tokio::spawn(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }),
            ));
        });
        registry.register(task("spawner", spawner));

        registry.join_all().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_join_all_survives_panicking_task() {
        let registry = TaskRegistry::new();
        registry.register(task("/dev/input/event3", tokio::spawn(async { panic!("boom") })));
        registry.join_all().await;
        assert!(registry.is_empty());
    }
}
