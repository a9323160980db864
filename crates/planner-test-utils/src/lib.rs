//! Shared test utilities for planner integration tests.
//!
//! Provides throwaway file stores rooted in a temporary directory, stores
//! that fail or pause on demand, and a few prebuilt task collections.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use planner_core::{MemoryStore, SessionKey, TaskCollection, TaskStore};
use planner_store::{FileStore, StoreConfig};

/// A [`FileStore`] in its own temporary directory.
///
/// The directory is removed when the value is dropped, so keep it alive
/// for the duration of the test.
pub struct TempStore {
    pub store: FileStore,
    pub dir: TempDir,
}

/// Create a file store rooted in a fresh temporary directory.
pub fn temp_store() -> TempStore {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = FileStore::new(StoreConfig::new(dir.path()));
    TempStore { store, dir }
}

/// Shorthand for a valid session key.
pub fn key(user: &str, session: &str) -> SessionKey {
    SessionKey::new(user, session).expect("test session key should be valid")
}

/// Two top-level tasks, the first with one subtask:
///
/// ```text
/// - [ ] 1: Main Task 1
///   - [ ] 1.1: Subtask 1.1
/// - [ ] 2: Main Task 2
/// ```
pub fn sample_collection() -> TaskCollection {
    let mut tasks = TaskCollection::new();
    tasks.add_task("Main Task 1").expect("add_task");
    tasks.add_task("Main Task 2").expect("add_task");
    tasks.add_subtask("1", "Subtask 1.1").expect("add_subtask");
    tasks
}

/// A three-level tree with mixed states:
///
/// ```text
/// 1    Design         completed
/// 1.1  Sketch         completed
/// 1.2  Review         failed
/// 1.2.1 Fix notes     in_progress
/// 2    Build          pending
/// 2.1  Code           completed
/// ```
pub fn mixed_state_collection() -> TaskCollection {
    let mut tasks = TaskCollection::new();
    tasks.add_task("Design").expect("add_task");
    tasks.add_task("Build").expect("add_task");
    tasks.add_subtask("1", "Sketch").expect("add_subtask");
    tasks.add_subtask("1", "Review").expect("add_subtask");
    tasks.add_subtask("1.2", "Fix notes").expect("add_subtask");
    tasks.add_subtask("2", "Code").expect("add_subtask");
    for (id, state) in [
        ("1", "completed"),
        ("1.1", "completed"),
        ("1.2", "failed"),
        ("1.2.1", "in_progress"),
        ("2.1", "completed"),
    ] {
        tasks.update_task_state(id, state).expect("update_task_state");
    }
    tasks
}

/// A [`TaskStore`] that reads from an inner [`MemoryStore`] but rejects
/// every save once `fail_after` saves have succeeded.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_after: usize,
    saves: AtomicUsize,
}

impl FlakyStore {
    /// A store whose saves always fail.
    pub fn failing() -> Self {
        Self::fail_after(0)
    }

    /// A store that accepts `n` saves, then fails every later one.
    pub fn fail_after(n: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_after: n,
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of saves that were accepted.
    pub fn accepted_saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst).min(self.fail_after)
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<TaskCollection>> {
        self.inner.load(key).await
    }

    async fn save(&self, key: &SessionKey, tasks: &TaskCollection) -> Result<()> {
        let attempt = self.saves.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.fail_after {
            bail!("simulated write failure for {key}");
        }
        self.inner.save(key, tasks).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        self.inner.list_sessions(user_id).await
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        self.inner.list_users().await
    }
}

/// A [`TaskStore`] over a [`MemoryStore`] whose next load or save can be
/// held until the test releases it, or whose next load can fail.
///
/// A held call signals [`GatedStore::wait_entered`] and then blocks until
/// [`GatedStore::release`] is called.
#[derive(Debug, Default)]
pub struct GatedStore {
    inner: MemoryStore,
    hold_load: AtomicBool,
    hold_save: AtomicBool,
    fail_load: AtomicBool,
    entered: Notify,
    released: Notify,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold_next_load(&self) {
        self.hold_load.store(true, Ordering::SeqCst);
    }

    pub fn hold_next_save(&self) {
        self.hold_save.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_load(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }

    /// Wait until a held call has started.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held call continue.
    pub fn release(&self) {
        self.released.notify_one();
    }

    async fn gate(&self, flag: &AtomicBool) {
        if flag.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }
    }
}

#[async_trait]
impl TaskStore for GatedStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<TaskCollection>> {
        if self.fail_load.swap(false, Ordering::SeqCst) {
            bail!("simulated read failure for {key}");
        }
        self.gate(&self.hold_load).await;
        self.inner.load(key).await
    }

    async fn save(&self, key: &SessionKey, tasks: &TaskCollection) -> Result<()> {
        self.gate(&self.hold_save).await;
        self.inner.save(key, tasks).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        self.inner.list_sessions(user_id).await
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        self.inner.list_users().await
    }
}
