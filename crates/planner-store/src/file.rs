//! JSON file storage.
//!
//! Each session is one pretty-printed document at
//! `<data_dir>/<user_id>/<session_id>/task_list.json`:
//!
//! ```json
//! { "tasks": [ { "description": "...", "state": "pending", "subtasks": { "tasks": [] } } ] }
//! ```
//!
//! IDs are not written; they are recomputed from array position on load.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use planner_core::{SessionKey, TaskCollection, TaskStore};

use crate::config::{StoreConfig, task_file_in};

/// A [`TaskStore`] backed by one JSON file per session.
#[derive(Debug, Clone)]
pub struct FileStore {
    config: StoreConfig,
}

impl FileStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Create the data directory if it does not exist yet.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir).await.with_context(|| {
            format!(
                "failed to create data directory {}",
                config.data_dir.display()
            )
        })?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Subdirectories of `dir` as `(name, path)`, sorted by name. A missing
    /// `dir` yields an empty list; non-UTF-8 names are skipped.
    async fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", dir.display()));
            }
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("failed to read {}", dir.display()))?
        {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                dirs.push((name, entry.path()));
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Sessions under a user directory that hold a task file.
    async fn sessions_in(user_dir: &Path) -> Result<Vec<String>> {
        let mut sessions = Vec::new();
        for (name, path) in Self::subdirs(user_dir).await? {
            if fs::try_exists(task_file_in(&path)).await? {
                sessions.push(name);
            }
        }
        Ok(sessions)
    }
}

#[async_trait]
impl TaskStore for FileStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<TaskCollection>> {
        let path = self.config.task_file(key);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let tasks: TaskCollection = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(%key, path = %path.display(), "task collection loaded");
        Ok(Some(tasks))
    }

    async fn save(&self, key: &SessionKey, tasks: &TaskCollection) -> Result<()> {
        let dir = self.config.session_dir(key);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create session directory {}", dir.display()))?;

        let contents =
            serde_json::to_string_pretty(tasks).context("failed to serialize task collection")?;

        // Write beside the target and rename so readers never see a
        // half-written document.
        let path = task_file_in(&dir);
        let tmp = dir.join(format!(".{}.{}.tmp", StoreConfig::TASK_FILE, std::process::id()));
        fs::write(&tmp, contents)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to move {} into place", path.display()))?;

        debug!(%key, path = %path.display(), "task collection written");
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool> {
        let path = self.config.task_file(key);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to delete {}", path.display()));
            }
        }

        // Best effort: only succeeds if the session directory is now empty.
        let _ = fs::remove_dir(self.config.session_dir(key)).await;
        Ok(true)
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        SessionKey::validate_user_id(user_id)?;
        Self::sessions_in(&self.config.user_dir(user_id)).await
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        let mut users = Vec::new();
        for (name, path) in Self::subdirs(&self.config.data_dir).await? {
            if !Self::sessions_in(&path).await?.is_empty() {
                users.push(name);
            }
        }
        Ok(users)
    }
}
