//! The `TaskStore` trait -- persistence interface for task collections.
//!
//! A store holds one serialized [`TaskCollection`] per [`SessionKey`]. The
//! file-backed implementation lives in `planner-store`; [`MemoryStore`]
//! here keeps everything in process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::collection::TaskCollection;
use crate::error::PlanError;

/// Identifies one task collection: the owning user and their session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    user_id: String,
    session_id: String,
}

impl SessionKey {
    /// Build a key.
    ///
    /// Both parts must be non-blank and usable as a single path component
    /// (no separators, NUL, `.` or `..`), since stores may lay sessions out
    /// on disk by key.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Result<Self, PlanError> {
        let user_id = user_id.into();
        let session_id = session_id.into();
        check_component("user id", &user_id)?;
        check_component("session id", &session_id)?;
        Ok(Self {
            user_id,
            session_id,
        })
    }

    /// Check a user ID on its own, for operations that span sessions.
    pub fn validate_user_id(user_id: &str) -> Result<(), PlanError> {
        check_component("user id", user_id)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

fn check_component(what: &str, value: &str) -> Result<(), PlanError> {
    if value.trim().is_empty() {
        return Err(PlanError::InvalidInput(format!("{what} must not be empty")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(PlanError::InvalidInput(format!(
            "{what} {value:?} contains a path separator or reserved name"
        )));
    }
    Ok(())
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.session_id)
    }
}

/// Persistence for task collections, keyed by [`SessionKey`].
///
/// Implementations treat a collection as an opaque document: `save`
/// replaces whatever was stored under the key.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load the collection for `key`, or `None` when nothing is stored.
    async fn load(&self, key: &SessionKey) -> Result<Option<TaskCollection>>;

    /// Replace the stored collection for `key`.
    async fn save(&self, key: &SessionKey, tasks: &TaskCollection) -> Result<()>;

    /// Remove the stored collection. Returns `false` if there was none.
    async fn delete(&self, key: &SessionKey) -> Result<bool>;

    /// Session IDs with stored data for `user_id`, sorted.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>>;

    /// User IDs with at least one stored session, sorted.
    async fn list_users(&self) -> Result<Vec<String>>;
}

// Compile-time assertion: TaskStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TaskStore) {}
};

#[async_trait]
impl<T: TaskStore + ?Sized> TaskStore for std::sync::Arc<T> {
    async fn load(&self, key: &SessionKey) -> Result<Option<TaskCollection>> {
        (**self).load(key).await
    }

    async fn save(&self, key: &SessionKey, tasks: &TaskCollection) -> Result<()> {
        (**self).save(key, tasks).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool> {
        (**self).delete(key).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        (**self).list_sessions(user_id).await
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        (**self).list_users().await
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A [`TaskStore`] that keeps collections in a map. Nothing survives the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<SessionKey, TaskCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<SessionKey, TaskCollection>>> {
        self.collections
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<TaskCollection>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn save(&self, key: &SessionKey, tasks: &TaskCollection) -> Result<()> {
        self.lock()?.insert(key.clone(), tasks.clone());
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        let mut sessions: Vec<String> = self
            .lock()?
            .keys()
            .filter(|k| k.user_id() == user_id)
            .map(|k| k.session_id().to_string())
            .collect();
        sessions.sort();
        Ok(sessions)
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        let mut users: Vec<String> = self
            .lock()?
            .keys()
            .map(|k| k.user_id().to_string())
            .collect();
        users.sort();
        users.dedup();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(user: &str, session: &str) -> SessionKey {
        SessionKey::new(user, session).unwrap()
    }

    #[test]
    fn session_key_rejects_blank_parts() {
        assert!(matches!(
            SessionKey::new("", "s"),
            Err(PlanError::InvalidInput(_))
        ));
        assert!(matches!(
            SessionKey::new("u", "  "),
            Err(PlanError::InvalidInput(_))
        ));
        assert_eq!(key("alice", "s1").to_string(), "alice/s1");
    }

    #[test]
    fn session_key_rejects_path_like_parts() {
        for bad in ["..", ".", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(SessionKey::new(bad, "s"), Err(PlanError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
            assert!(SessionKey::new("u", bad).is_err());
        }
        assert!(SessionKey::new("user.name", "session-1").is_ok());
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        let k = key("alice", "s1");
        assert!(store.load(&k).await.unwrap().is_none());

        let mut tasks = TaskCollection::new();
        tasks.add_task("Stored").unwrap();
        store.save(&k, &tasks).await.unwrap();

        assert_eq!(store.load(&k).await.unwrap(), Some(tasks));
        assert!(store.delete(&k).await.unwrap());
        assert!(!store.delete(&k).await.unwrap());
    }

    #[tokio::test]
    async fn memory_store_lists_sorted() {
        let store = MemoryStore::new();
        let empty = TaskCollection::new();
        store.save(&key("bob", "b"), &empty).await.unwrap();
        store.save(&key("bob", "a"), &empty).await.unwrap();
        store.save(&key("alice", "x"), &empty).await.unwrap();

        assert_eq!(store.list_sessions("bob").await.unwrap(), ["a", "b"]);
        assert!(store.list_sessions("carol").await.unwrap().is_empty());
        assert_eq!(store.list_users().await.unwrap(), ["alice", "bob"]);
    }
}
