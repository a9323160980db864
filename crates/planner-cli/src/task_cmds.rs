//! CLI handlers for the task subcommands.
//!
//! Implements:
//! - `planner add <description> [--parent <id>]`
//! - `planner subtask <parent-id> <description>`
//! - `planner show`
//! - `planner list [--state <state>] [--json]`
//! - `planner get <id>`
//! - `planner update <id> <state>`
//! - `planner delete <id>`

use anyhow::{Context, Result};

use planner_core::{SessionKey, SessionManager, TaskStore, TaskSummary};

// -----------------------------------------------------------------------
// planner add / subtask
// -----------------------------------------------------------------------

pub async fn cmd_add<S: TaskStore>(
    sessions: &SessionManager<S>,
    key: &SessionKey,
    description: &str,
    parent: Option<&str>,
) -> Result<()> {
    let task = match parent {
        Some(parent) => sessions.add_subtask(key, parent, description).await?,
        None => sessions.add_task(key, description).await?,
    };
    println!("Added task {}: {}", task.id, task.description);
    Ok(())
}

// -----------------------------------------------------------------------
// planner show
// -----------------------------------------------------------------------

/// Print the markdown rendering of the session's tasks.
pub async fn cmd_show<S: TaskStore>(sessions: &SessionManager<S>, key: &SessionKey) -> Result<()> {
    print!("{}", sessions.render(key).await?);
    Ok(())
}

// -----------------------------------------------------------------------
// planner list
// -----------------------------------------------------------------------

pub async fn cmd_list<S: TaskStore>(
    sessions: &SessionManager<S>,
    key: &SessionKey,
    state: Option<&str>,
    json: bool,
) -> Result<()> {
    let tasks = sessions.get_tasks(key, state).await?;

    if json {
        let out = serde_json::to_string_pretty(&tasks).context("failed to serialize tasks")?;
        println!("{out}");
        return Ok(());
    }

    if tasks.is_empty() {
        match state {
            Some(state) => println!("No {state} tasks in {key}."),
            None => println!("No tasks in {key}. Use `planner add <description>` to add one."),
        }
        return Ok(());
    }

    print!("{}", format_table(&tasks));
    Ok(())
}

/// Render summaries as an aligned three-column table.
fn format_table(tasks: &[TaskSummary]) -> String {
    let id_w = tasks.iter().map(|t| t.id.len()).max().unwrap_or(2).max(2);
    let state_w = "in_progress".len();

    let mut out = format!("{:<id_w$}  {:<state_w$}  DESCRIPTION\n", "ID", "STATE");
    out.push_str(&format!("{}  {}  {}\n", "-".repeat(id_w), "-".repeat(state_w), "-".repeat(11)));
    for task in tasks {
        out.push_str(&format!(
            "{:<id_w$}  {:<state_w$}  {}\n",
            task.id,
            task.state.as_str(),
            task.description
        ));
    }
    out
}

// -----------------------------------------------------------------------
// planner get / update / delete
// -----------------------------------------------------------------------

pub async fn cmd_get<S: TaskStore>(
    sessions: &SessionManager<S>,
    key: &SessionKey,
    id: &str,
) -> Result<()> {
    let task = sessions.get_task(key, id).await?;
    println!("  ID:          {}", task.id);
    println!("  State:       {}", task.state);
    println!("  Description: {}", task.description);
    Ok(())
}

pub async fn cmd_update<S: TaskStore>(
    sessions: &SessionManager<S>,
    key: &SessionKey,
    id: &str,
    state: &str,
) -> Result<()> {
    let task = sessions.update_task_state(key, id, state).await?;
    println!("Task {} is now {}.", task.id, task.state);
    Ok(())
}

pub async fn cmd_delete<S: TaskStore>(
    sessions: &SessionManager<S>,
    key: &SessionKey,
    id: &str,
) -> Result<()> {
    let deleted = sessions.delete_task(key, id).await?;
    println!("Deleted task {deleted} and its subtasks. Later tasks were renumbered.");
    Ok(())
}
