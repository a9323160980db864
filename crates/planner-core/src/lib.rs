//! Hierarchical task lists with position-derived dotted IDs.
//!
//! The tree itself ([`Task`], [`TaskList`], [`TaskCollection`]) is plain
//! synchronous data. [`SessionManager`] puts a per-(user, session) cache and
//! lock in front of a [`TaskStore`] and persists after every mutation.

pub mod collection;
pub mod error;
pub mod path;
pub mod render;
pub mod session;
pub mod state;
pub mod store;
pub mod task;
pub mod task_list;

pub use collection::{TaskCollection, TaskSummary};
pub use error::{ErrorKind, PlanError};
pub use path::TaskPath;
pub use render::TaskNode;
pub use session::SessionManager;
pub use state::{TaskState, TaskStateParseError};
pub use store::{MemoryStore, SessionKey, TaskStore};
pub use task::Task;
pub use task_list::{TaskList, Tasks};
