//! The per-session task collection and the operations callers invoke on it.
//!
//! Every operation takes and returns dotted IDs as strings. String inputs
//! (IDs, state names) are validated here, once, before the tree is touched.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::path::TaskPath;
use crate::render::{self, TaskNode};
use crate::state::TaskState;
use crate::task::Task;
use crate::task_list::{TaskList, Tasks};

/// A task as reported to callers: its current ID plus its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: String,
    pub description: String,
    pub state: TaskState,
}

impl TaskSummary {
    pub fn new(id: &TaskPath, task: &Task) -> Self {
        Self {
            id: id.to_string(),
            description: task.description().to_string(),
            state: task.state(),
        }
    }
}

/// Root task list of one (user, session).
///
/// Serializes as `{"tasks": [...]}`, the same shape as any nested list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskCollection {
    root: TaskList,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &TaskList {
        &self.root
    }

    /// Number of tasks at every depth.
    pub fn task_count(&self) -> usize {
        self.root.get_all(None).count()
    }

    /// Append a top-level task.
    pub fn add_task(&mut self, description: &str) -> Result<TaskSummary, PlanError> {
        let id = self.root.add_task(description, None)?;
        self.summary(&id)
    }

    /// Append a task under `parent_id`.
    pub fn add_subtask(
        &mut self,
        parent_id: &str,
        description: &str,
    ) -> Result<TaskSummary, PlanError> {
        let parent: TaskPath = parent_id.parse()?;
        let id = self.root.add_task(description, Some(&parent))?;
        self.summary(&id)
    }

    pub fn get_task(&self, id: &str) -> Result<TaskSummary, PlanError> {
        let path: TaskPath = id.parse()?;
        self.summary(&path)
    }

    /// Every task in depth-first order, optionally restricted to one state.
    pub fn get_tasks(&self, state_filter: Option<&str>) -> Result<Vec<TaskSummary>, PlanError> {
        let filter = state_filter.map(str::parse::<TaskState>).transpose()?;
        Ok(self
            .tasks(filter)
            .map(|(path, task)| TaskSummary::new(&path, task))
            .collect())
    }

    /// Typed, lazy form of [`Self::get_tasks`].
    pub fn tasks(&self, state_filter: Option<TaskState>) -> Tasks<'_> {
        self.root.get_all(state_filter)
    }

    /// Set the state of one task. The state string is checked before the
    /// ID is resolved.
    pub fn update_task_state(&mut self, id: &str, state: &str) -> Result<TaskSummary, PlanError> {
        let state: TaskState = state.parse()?;
        let path: TaskPath = id.parse()?;
        let task = self.root.get_by_id_mut(&path)?;
        task.set_state(state);
        Ok(TaskSummary::new(&path, task))
    }

    /// Delete a task and its subtree. Returns the ID that was deleted.
    pub fn delete_task(&mut self, id: &str) -> Result<String, PlanError> {
        let path: TaskPath = id.parse()?;
        self.root.delete(&path)?;
        Ok(path.to_string())
    }

    /// Markdown rendering with the `# Task List` heading.
    pub fn to_markdown(&self) -> String {
        render::markdown(&self.root)
    }

    pub fn tree(&self) -> Vec<TaskNode> {
        render::tree(&self.root)
    }

    fn summary(&self, path: &TaskPath) -> Result<TaskSummary, PlanError> {
        let task = self.root.get_by_id(path)?;
        Ok(TaskSummary::new(path, task))
    }
}

impl From<TaskList> for TaskCollection {
    fn from(root: TaskList) -> Self {
        Self { root }
    }
}
