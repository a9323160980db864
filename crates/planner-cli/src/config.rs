//! Configuration file management for planner.
//!
//! Provides a TOML-based config file at `~/.config/planner/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use planner_store::StoreConfig;

pub const DEFAULT_USER: &str = "default_user";
pub const DEFAULT_SESSION: &str = "default_session";
pub const DEFAULT_SERVER_NAME: &str = "PlanningServer";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the planner config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/planner` or `~/.config/planner`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("planner");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("planner")
}

/// Return the path to the planner config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`. A missing file is `None`; an
/// unreadable or malformed one is an error.
pub fn load_config_from(path: &Path) -> Result<Option<ConfigFile>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read config file at {}", path.display()));
        }
    };
    let config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Load the config file from its default location.
pub fn load_config() -> Result<Option<ConfigFile>> {
    load_config_from(&config_path())
}

/// Serialize and write the config file to `path`, creating parent dirs as
/// needed. Sets file permissions to 0600 on Unix.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line, all optional.
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub data_dir: Option<&'a Path>,
    pub user: Option<&'a str>,
    pub session: Option<&'a str>,
    pub host: Option<&'a str>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PlannerConfig {
    pub store_config: StoreConfig,
    pub user: String,
    pub session: String,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl PlannerConfig {
    /// Resolve configuration from the default config file.
    pub fn resolve(overrides: &Overrides<'_>) -> Result<Self> {
        let file = load_config()?;
        Self::resolve_with(overrides, file.unwrap_or_default())
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - Data dir: `--data-dir` > `PLANNER_DATA_DIR` > `storage.data_dir` > XDG data dir
    /// - User / session: `--user` / `--session` > `PLANNER_USER` / `PLANNER_SESSION`
    ///   > `session.*` > `default_user` / `default_session`
    /// - Host / port: `--bind` / `--port` > `PLANNER_HOST` / `PLANNER_PORT`
    ///   > `server.*` > `127.0.0.1:9000`
    pub fn resolve_with(overrides: &Overrides<'_>, file: ConfigFile) -> Result<Self> {
        let data_dir = match overrides.data_dir {
            Some(dir) => dir.to_path_buf(),
            None => match std::env::var_os(StoreConfig::ENV_VAR) {
                Some(dir) => PathBuf::from(dir),
                None => file
                    .storage
                    .data_dir
                    .unwrap_or_else(StoreConfig::default_data_dir),
            },
        };

        let user = pick(overrides.user, "PLANNER_USER", file.session.user, DEFAULT_USER);
        let session = pick(
            overrides.session,
            "PLANNER_SESSION",
            file.session.session,
            DEFAULT_SESSION,
        );
        let host = pick(overrides.host, "PLANNER_HOST", file.server.host, DEFAULT_HOST);

        let port = if let Some(port) = overrides.port {
            port
        } else if let Ok(port) = std::env::var("PLANNER_PORT") {
            port.parse::<u16>()
                .with_context(|| format!("PLANNER_PORT is not a valid port: {port:?}"))?
        } else {
            file.server.port.unwrap_or(DEFAULT_PORT)
        };

        Ok(Self {
            store_config: StoreConfig::new(data_dir),
            user,
            session,
            server: ServerConfig {
                name: file
                    .server
                    .name
                    .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
                host,
                port,
            },
        })
    }
}

fn pick(flag: Option<&str>, env_var: &str, file: Option<String>, default: &str) -> String {
    if let Some(value) = flag {
        value.to_string()
    } else if let Ok(value) = std::env::var(env_var) {
        value
    } else {
        file.unwrap_or_else(|| default.to_string())
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    const ENV_VARS: [&str; 5] = [
        "PLANNER_DATA_DIR",
        "PLANNER_USER",
        "PLANNER_SESSION",
        "PLANNER_HOST",
        "PLANNER_PORT",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    fn sample_file() -> ConfigFile {
        ConfigFile {
            storage: StorageSection {
                data_dir: Some(PathBuf::from("/from/file")),
            },
            server: ServerSection {
                name: Some("FileServer".to_string()),
                host: Some("0.0.0.0".to_string()),
                port: Some(7000),
            },
            session: SessionSection {
                user: Some("file-user".to_string()),
                session: Some("file-session".to_string()),
            },
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("planner").join("config.toml");

        save_config_to(&path, &sample_file()).unwrap();
        let loaded = load_config_from(&path).unwrap().expect("config exists");

        assert_eq!(loaded.storage.data_dir, Some(PathBuf::from("/from/file")));
        assert_eq!(loaded.server.port, Some(7000));
        assert_eq!(loaded.session.user.as_deref(), Some("file-user"));
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_config_to(&path, &ConfigFile::default()).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn missing_config_is_none_and_partial_config_parses() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        assert!(load_config_from(&path).unwrap().is_none());

        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        let loaded = load_config_from(&path).unwrap().unwrap();
        assert_eq!(loaded.server.port, Some(9100));
        assert!(loaded.storage.data_dir.is_none());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"), "{err:#}");
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        clear_env();

        let config = PlannerConfig::resolve_with(&Overrides::default(), ConfigFile::default())
            .unwrap();
        assert_eq!(config.user, DEFAULT_USER);
        assert_eq!(config.session, DEFAULT_SESSION);
        assert_eq!(
            config.server,
            ServerConfig {
                name: DEFAULT_SERVER_NAME.to_string(),
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            }
        );
        assert_eq!(config.store_config.data_dir, StoreConfig::default_data_dir());
    }

    #[test]
    fn resolve_config_file_overrides_defaults() {
        let _lock = lock_env();
        clear_env();

        let config = PlannerConfig::resolve_with(&Overrides::default(), sample_file()).unwrap();
        assert_eq!(config.store_config.data_dir, PathBuf::from("/from/file"));
        assert_eq!(config.user, "file-user");
        assert_eq!(config.session, "file-session");
        assert_eq!(config.server.name, "FileServer");
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn resolve_env_var_overrides_config_file() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var("PLANNER_DATA_DIR", "/from/env") };
        unsafe { std::env::set_var("PLANNER_USER", "env-user") };
        unsafe { std::env::set_var("PLANNER_PORT", "9300") };

        let config = PlannerConfig::resolve_with(&Overrides::default(), sample_file()).unwrap();
        clear_env();

        assert_eq!(config.store_config.data_dir, PathBuf::from("/from/env"));
        assert_eq!(config.user, "env-user");
        assert_eq!(config.session, "file-session");
        assert_eq!(config.server.port, 9300);
    }

    #[test]
    fn resolve_cli_flag_overrides_all() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var("PLANNER_USER", "env-user") };
        unsafe { std::env::set_var("PLANNER_HOST", "10.0.0.1") };

        let overrides = Overrides {
            data_dir: Some(Path::new("/from/cli")),
            user: Some("cli-user"),
            session: Some("cli-session"),
            host: Some("::1"),
            port: Some(9400),
        };
        let config = PlannerConfig::resolve_with(&overrides, sample_file()).unwrap();
        clear_env();

        assert_eq!(config.store_config.data_dir, PathBuf::from("/from/cli"));
        assert_eq!(config.user, "cli-user");
        assert_eq!(config.session, "cli-session");
        assert_eq!(config.server.host, "::1");
        assert_eq!(config.server.port, 9400);
    }

    #[test]
    fn resolve_rejects_bad_port_env() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var("PLANNER_PORT", "ninety") };
        let result = PlannerConfig::resolve_with(&Overrides::default(), ConfigFile::default());
        clear_env();

        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("PLANNER_PORT"), "unexpected error: {msg}");
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("planner/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
