//! CLI handlers for session administration: `sessions`, `users`, `clear`.

use anyhow::Result;

use planner_core::{SessionKey, SessionManager, TaskStore};

/// List the sessions that have stored tasks for `user_id`.
pub async fn cmd_sessions<S: TaskStore>(sessions: &SessionManager<S>, user_id: &str) -> Result<()> {
    let names = sessions.list_sessions(user_id).await?;
    if names.is_empty() {
        println!("No sessions found for {user_id}.");
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub async fn cmd_users<S: TaskStore>(sessions: &SessionManager<S>) -> Result<()> {
    let users = sessions.list_users().await?;
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }
    for user in users {
        println!("{user}");
    }
    Ok(())
}

/// Delete every task stored for one session.
pub async fn cmd_clear<S: TaskStore>(sessions: &SessionManager<S>, key: &SessionKey) -> Result<()> {
    if sessions.delete_session(key).await? {
        println!("Cleared session {key}.");
    } else {
        println!("Nothing stored for {key}.");
    }
    Ok(())
}
