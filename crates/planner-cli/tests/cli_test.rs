//! End-to-end tests for the `planner` binary.
//!
//! Each test runs the compiled binary against its own temporary data and
//! config directories, so no real user config is read.

use std::process::{Command, Output};

use tempfile::TempDir;

struct Env {
    data: TempDir,
    config: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            data: TempDir::new().unwrap(),
            config: TempDir::new().unwrap(),
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_planner"))
            .arg("--data-dir")
            .arg(self.data.path())
            .args(args)
            .env("XDG_CONFIG_HOME", self.config.path())
            .env_remove("PLANNER_DATA_DIR")
            .env_remove("PLANNER_USER")
            .env_remove("PLANNER_SESSION")
            .env("RUST_LOG", "warn")
            .output()
            .expect("failed to run planner binary")
    }

    fn stdout(&self, args: &[&str]) -> String {
        let out = self.run(args);
        assert!(
            out.status.success(),
            "planner {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).unwrap()
    }
}

#[test]
fn add_show_delete_walkthrough() {
    let env = Env::new();

    assert_eq!(env.stdout(&["add", "Main Task 1"]), "Added task 1: Main Task 1\n");
    env.stdout(&["add", "Main Task 2"]);
    assert_eq!(
        env.stdout(&["subtask", "1", "Subtask 1.1"]),
        "Added task 1.1: Subtask 1.1\n"
    );

    assert_eq!(
        env.stdout(&["show"]),
        "# Task List\n\n- [ ] 1: Main Task 1\n  - [ ] 1.1: Subtask 1.1\n- [ ] 2: Main Task 2\n"
    );

    env.stdout(&["delete", "1"]);
    assert_eq!(env.stdout(&["show"]), "# Task List\n\n- [ ] 1: Main Task 2\n");

    let file = env
        .data
        .path()
        .join("default_user/default_session/task_list.json");
    assert!(file.exists(), "expected {}", file.display());
}

#[test]
fn update_and_list_json() {
    let env = Env::new();
    env.stdout(&["add", "Design"]);
    env.stdout(&["add", "--parent", "1", "Sketch"]);
    env.stdout(&["update", "1.1", "completed"]);

    let out = env.stdout(&["list", "--state", "completed", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], "1.1");
    assert_eq!(json[0]["state"], "completed");
}

#[test]
fn errors_exit_nonzero() {
    let env = Env::new();
    env.stdout(&["add", "Only"]);

    let out = env.run(&["get", "5"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not found"));

    let out = env.run(&["update", "1", "done"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid task state"));
}

#[test]
fn sessions_users_and_clear() {
    let env = Env::new();
    env.stdout(&["--user", "alice", "--session", "b", "add", "x"]);
    env.stdout(&["--user", "alice", "--session", "a", "add", "y"]);
    env.stdout(&["--user", "bob", "add", "z"]);

    assert_eq!(env.stdout(&["--user", "alice", "sessions"]), "a\nb\n");
    assert_eq!(env.stdout(&["users"]), "alice\nbob\n");

    assert_eq!(
        env.stdout(&["--user", "alice", "--session", "a", "clear"]),
        "Cleared session alice/a.\n"
    );
    assert_eq!(env.stdout(&["--user", "alice", "sessions"]), "b\n");
}

#[test]
fn init_writes_config_once() {
    let env = Env::new();
    let out = env.stdout(&["--user", "carol", "init"]);
    assert!(out.starts_with("Config written to"), "{out}");

    let path = env.config.path().join("planner/config.toml");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("user = \"carol\""), "{contents}");

    assert!(!env.run(&["init"]).status.success());
    assert!(env.run(&["init", "--force"]).status.success());
}
