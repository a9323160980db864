//! Session manager: the explicit map from (user, session) to a loaded
//! task collection.
//!
//! Collections are loaded from the [`TaskStore`] on first use and kept in
//! memory afterwards. Each key has its own lock, so requests for one
//! session run one at a time while different sessions proceed in parallel.
//! The shared map is only locked long enough to find or insert a key's
//! slot; loading and saving happen under the per-key lock alone.
//!
//! A mutating call works on a copy of the collection, saves the copy, and
//! only then replaces the cached collection. If the operation or the save
//! fails, the cached collection is exactly what it was before the call.
//!
//! Loaded sessions stay cached for the lifetime of the manager. Nothing is
//! evicted automatically; [`SessionManager::evict`] and
//! [`SessionManager::delete_session`] release one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::collection::{TaskCollection, TaskSummary};
use crate::error::PlanError;
use crate::render::TaskNode;
use crate::store::{SessionKey, TaskStore};

/// Per-key cache entry.
#[derive(Debug, Default)]
enum Slot {
    #[default]
    Unloaded,
    Loaded(TaskCollection),
    /// Removed from the map by `evict` or `delete_session`. Callers that
    /// were already waiting on it go back to the map for a fresh slot.
    Retired,
}

impl Slot {
    fn loaded_mut(&mut self) -> Option<&mut TaskCollection> {
        match self {
            Slot::Loaded(tasks) => Some(tasks),
            _ => None,
        }
    }
}

type Session = Arc<Mutex<Slot>>;

/// Keyed cache of task collections in front of a [`TaskStore`].
pub struct SessionManager<S> {
    store: S,
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl<S: TaskStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of sessions currently held in memory.
    pub async fn cached_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Lock the key's live slot, creating an unloaded one if needed.
    ///
    /// The map lock is released before waiting on the slot.
    async fn slot(&self, key: &SessionKey) -> OwnedMutexGuard<Slot> {
        loop {
            let session = {
                let mut sessions = self.sessions.lock().await;
                Arc::clone(sessions.entry(key.clone()).or_default())
            };
            let slot = session.lock_owned().await;
            if !matches!(*slot, Slot::Retired) {
                return slot;
            }
            debug!(%key, "session retired while waiting, retrying");
        }
    }

    /// Lock the key's collection, loading it from the store on first use.
    ///
    /// A failed load leaves the slot unloaded so the next call tries again.
    async fn lock(
        &self,
        key: &SessionKey,
    ) -> Result<OwnedMappedMutexGuard<Slot, TaskCollection>, PlanError> {
        loop {
            let mut slot = self.slot(key).await;
            if matches!(*slot, Slot::Unloaded) {
                let tasks = match self.store.load(key).await? {
                    Some(tasks) => {
                        debug!(%key, count = tasks.task_count(), "loaded task collection");
                        tasks
                    }
                    None => {
                        debug!(%key, "no stored task collection, starting empty");
                        TaskCollection::new()
                    }
                };
                *slot = Slot::Loaded(tasks);
            }
            if let Ok(tasks) = OwnedMutexGuard::try_map(slot, Slot::loaded_mut) {
                return Ok(tasks);
            }
        }
    }

    /// Remove the slot from the map and mark it retired.
    ///
    /// The caller holds the slot lock; the map is locked second.
    async fn retire(&self, key: &SessionKey, mut slot: OwnedMutexGuard<Slot>) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(key)
            .is_some_and(|live| Arc::ptr_eq(live, OwnedMutexGuard::mutex(&slot)))
        {
            sessions.remove(key);
        }
        *slot = Slot::Retired;
    }

    /// Run a read-only operation against the session's collection.
    pub async fn read<T>(
        &self,
        key: &SessionKey,
        op: impl FnOnce(&TaskCollection) -> Result<T, PlanError>,
    ) -> Result<T, PlanError> {
        let tasks = self.lock(key).await?;
        op(&tasks)
    }

    /// Run a mutating operation and persist the result.
    ///
    /// Nothing is saved and the cache is untouched when `op` fails; when the
    /// save fails, the storage error is returned and the cache is untouched.
    pub async fn mutate<T>(
        &self,
        key: &SessionKey,
        name: &'static str,
        op: impl FnOnce(&mut TaskCollection) -> Result<T, PlanError>,
    ) -> Result<T, PlanError> {
        let mut current = self.lock(key).await?;

        let mut working = current.clone();
        let output = match op(&mut working) {
            Ok(output) => output,
            Err(e) => {
                debug!(%key, op = name, kind = %e.kind(), "operation rejected: {e}");
                return Err(e);
            }
        };

        if let Err(e) = self.store.save(key, &working).await {
            warn!(%key, op = name, "failed to save task collection: {e:#}");
            return Err(PlanError::Storage(e));
        }

        *current = working;
        info!(%key, op = name, "task collection saved");
        Ok(output)
    }

    // -----------------------------------------------------------------------
    // Facade operations
    // -----------------------------------------------------------------------

    pub async fn add_task(
        &self,
        key: &SessionKey,
        description: &str,
    ) -> Result<TaskSummary, PlanError> {
        self.mutate(key, "add_task", |tasks| tasks.add_task(description))
            .await
    }

    pub async fn add_subtask(
        &self,
        key: &SessionKey,
        parent_id: &str,
        description: &str,
    ) -> Result<TaskSummary, PlanError> {
        self.mutate(key, "add_subtask", |tasks| {
            tasks.add_subtask(parent_id, description)
        })
        .await
    }

    pub async fn get_task(&self, key: &SessionKey, id: &str) -> Result<TaskSummary, PlanError> {
        self.read(key, |tasks| tasks.get_task(id)).await
    }

    pub async fn get_tasks(
        &self,
        key: &SessionKey,
        state_filter: Option<&str>,
    ) -> Result<Vec<TaskSummary>, PlanError> {
        self.read(key, |tasks| tasks.get_tasks(state_filter)).await
    }

    pub async fn update_task_state(
        &self,
        key: &SessionKey,
        id: &str,
        state: &str,
    ) -> Result<TaskSummary, PlanError> {
        self.mutate(key, "update_task_state", |tasks| {
            tasks.update_task_state(id, state)
        })
        .await
    }

    pub async fn delete_task(&self, key: &SessionKey, id: &str) -> Result<String, PlanError> {
        self.mutate(key, "delete_task", |tasks| tasks.delete_task(id))
            .await
    }

    /// Markdown rendering of the session's collection.
    pub async fn render(&self, key: &SessionKey) -> Result<String, PlanError> {
        self.read(key, |tasks| Ok(tasks.to_markdown())).await
    }

    pub async fn tree(&self, key: &SessionKey) -> Result<Vec<TaskNode>, PlanError> {
        self.read(key, |tasks| Ok(tasks.tree())).await
    }

    // -----------------------------------------------------------------------
    // Session administration
    // -----------------------------------------------------------------------

    /// Delete the session's stored data and drop it from the cache.
    ///
    /// Returns `false` if nothing was stored. The stored document is not
    /// loaded first, so an unreadable one can still be deleted.
    pub async fn delete_session(&self, key: &SessionKey) -> Result<bool, PlanError> {
        let slot = self.slot(key).await;
        let deleted = self.store.delete(key).await?;
        self.retire(key, slot).await;
        info!(%key, deleted, "session deleted");
        Ok(deleted)
    }

    /// Forget the cached collection; the next call reloads it from the store.
    ///
    /// Waits for any in-flight request on the session to finish first.
    /// Returns `false` if the session was not cached.
    pub async fn evict(&self, key: &SessionKey) -> bool {
        let session = match self.sessions.lock().await.get(key) {
            Some(session) => Arc::clone(session),
            None => return false,
        };
        let slot = session.lock_owned().await;
        if matches!(*slot, Slot::Retired) {
            return false;
        }
        self.retire(key, slot).await;
        debug!(%key, "session evicted");
        true
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>, PlanError> {
        SessionKey::validate_user_id(user_id)?;
        Ok(self.store.list_sessions(user_id).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<String>, PlanError> {
        Ok(self.store.list_users().await?)
    }
}

impl<S> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}
