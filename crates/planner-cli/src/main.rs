mod config;
mod serve_cmd;
mod session_cmds;
mod task_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use planner_core::{SessionKey, SessionManager};
use planner_store::FileStore;

use config::{Overrides, PlannerConfig};

#[derive(Parser)]
#[command(name = "planner", about = "Hierarchical task lists for agent planning")]
struct Cli {
    /// Data directory (overrides PLANNER_DATA_DIR env var)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// User ID (overrides PLANNER_USER env var)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Session ID (overrides PLANNER_SESSION env var)
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a planner config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Add a top-level task, or a subtask with --parent
    Add {
        /// Task description
        description: String,
        /// Parent task ID (e.g. 1.2)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Add a subtask under an existing task
    Subtask {
        /// Parent task ID (e.g. 1.2)
        parent_id: String,
        /// Task description
        description: String,
    },
    /// Print the task list as markdown
    Show,
    /// List tasks in depth-first order
    List {
        /// Only tasks in this state: pending, in_progress, completed, failed
        #[arg(long)]
        state: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one task
    Get {
        /// Task ID (e.g. 1.2)
        id: String,
    },
    /// Change a task's state
    Update {
        /// Task ID (e.g. 1.2)
        id: String,
        /// New state: pending, in_progress, completed, failed
        state: String,
    },
    /// Delete a task and its subtasks
    Delete {
        /// Task ID (e.g. 1.2)
        id: String,
    },
    /// List the current user's sessions with stored tasks
    Sessions,
    /// List users with stored tasks
    Users,
    /// Delete all tasks stored for the current session
    Clear,
    /// Run the HTTP tool server
    Serve {
        /// Address to bind (overrides PLANNER_HOST env var)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides PLANNER_PORT env var)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Execute the `planner init` command: write the config file.
fn cmd_init(resolved: &PlannerConfig, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        storage: config::StorageSection {
            data_dir: Some(resolved.store_config.data_dir.clone()),
        },
        server: config::ServerSection {
            name: Some(resolved.server.name.clone()),
            host: Some(resolved.server.host.clone()),
            port: Some(resolved.server.port),
        },
        session: config::SessionSection {
            user: Some(resolved.user.clone()),
            session: Some(resolved.session.clone()),
        },
    };

    config::save_config_to(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  storage.data_dir = {}", resolved.store_config.data_dir.display());
    println!("  session.user     = {}", resolved.user);
    println!("  session.session  = {}", resolved.session);
    println!(
        "  server           = {} on {}:{}",
        resolved.server.name, resolved.server.host, resolved.server.port
    );

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (bind, port) = match &cli.command {
        Commands::Serve { bind, port } => (bind.as_deref(), *port),
        _ => (None, None),
    };
    let resolved = PlannerConfig::resolve(&Overrides {
        data_dir: cli.data_dir.as_deref(),
        user: cli.user.as_deref(),
        session: cli.session.as_deref(),
        host: bind,
        port,
    })?;

    match &cli.command {
        Commands::Init { force } => return cmd_init(&resolved, *force),
        Commands::Serve { .. } => return serve_cmd::run_serve(&resolved).await,
        _ => {}
    }

    let sessions = SessionManager::new(FileStore::new(resolved.store_config.clone()));
    let key = SessionKey::new(resolved.user.as_str(), resolved.session.as_str())?;

    match cli.command {
        Commands::Add {
            description,
            parent,
        } => {
            task_cmds::cmd_add(&sessions, &key, &description, parent.as_deref()).await?;
        }
        Commands::Subtask {
            parent_id,
            description,
        } => {
            task_cmds::cmd_add(&sessions, &key, &description, Some(parent_id.as_str())).await?;
        }
        Commands::Show => task_cmds::cmd_show(&sessions, &key).await?,
        Commands::List { state, json } => {
            task_cmds::cmd_list(&sessions, &key, state.as_deref(), json).await?;
        }
        Commands::Get { id } => task_cmds::cmd_get(&sessions, &key, &id).await?,
        Commands::Update { id, state } => {
            task_cmds::cmd_update(&sessions, &key, &id, &state).await?;
        }
        Commands::Delete { id } => task_cmds::cmd_delete(&sessions, &key, &id).await?,
        Commands::Sessions => session_cmds::cmd_sessions(&sessions, key.user_id()).await?,
        Commands::Users => session_cmds::cmd_users(&sessions).await?,
        Commands::Clear => session_cmds::cmd_clear(&sessions, &key).await?,
        Commands::Init { .. } | Commands::Serve { .. } => {}
    }

    Ok(())
}
