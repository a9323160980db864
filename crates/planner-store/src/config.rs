use std::env;
use std::path::{Path, PathBuf};

use planner_core::SessionKey;

/// Storage configuration.
///
/// Reads from the `PLANNER_DATA_DIR` environment variable, falling back to
/// `$XDG_DATA_HOME/planner` (or `~/.local/share/planner`) when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root directory holding one subdirectory per user.
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Environment variable that overrides the data directory.
    pub const ENV_VAR: &str = "PLANNER_DATA_DIR";

    /// File name of the serialized collection inside a session directory.
    pub const TASK_FILE: &str = "task_list.json";

    /// Build a config from the environment.
    ///
    /// Priority: `PLANNER_DATA_DIR` env var, then [`Self::default_data_dir`].
    pub fn from_env() -> Self {
        let data_dir = env::var_os(Self::ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_data_dir);
        Self { data_dir }
    }

    /// Build a config from an explicit directory (useful for tests and CLI flags).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Default data directory, XDG layout on every platform.
    pub fn default_data_dir() -> PathBuf {
        if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("planner");
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local")
            .join("share")
            .join("planner")
    }

    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(user_id)
    }

    /// `<data_dir>/<user_id>/<session_id>`
    pub fn session_dir(&self, key: &SessionKey) -> PathBuf {
        self.user_dir(key.user_id()).join(key.session_id())
    }

    /// `<data_dir>/<user_id>/<session_id>/task_list.json`
    pub fn task_file(&self, key: &SessionKey) -> PathBuf {
        task_file_in(&self.session_dir(key))
    }
}

pub(crate) fn task_file_in(session_dir: &Path) -> PathBuf {
    session_dir.join(StoreConfig::TASK_FILE)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
