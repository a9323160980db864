use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PlanError;
use crate::path::TaskPath;
use crate::state::TaskState;
use crate::task_list::TaskList;

/// A single node of the task tree.
///
/// A task owns its children outright. It carries no identifier: its dotted
/// ID is whatever its current position in the tree says it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    description: String,
    #[serde(default)]
    state: TaskState,
    #[serde(default, deserialize_with = "null_as_empty")]
    subtasks: TaskList,
}

impl Task {
    /// Create a `pending` task with no subtasks.
    ///
    /// Fails with `InvalidInput` when the description is empty or blank, or
    /// contains a control character other than tab. A description is always
    /// a single rendered line.
    pub fn new(description: impl Into<String>) -> Result<Self, PlanError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(PlanError::InvalidInput(
                "task description must not be empty".to_string(),
            ));
        }
        if let Some(c) = description.chars().find(|&c| c.is_control() && c != '\t') {
            return Err(PlanError::InvalidInput(format!(
                "task description must not contain control character {c:?}"
            )));
        }
        Ok(Self {
            description,
            state: TaskState::Pending,
            subtasks: TaskList::new(),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn subtasks(&self) -> &TaskList {
        &self.subtasks
    }

    pub fn subtasks_mut(&mut self) -> &mut TaskList {
        &mut self.subtasks
    }

    /// Replace the state. Parent and children are left alone.
    pub fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    pub fn mark_in_progress(&mut self) {
        self.set_state(TaskState::InProgress);
    }

    pub fn mark_completed(&mut self) {
        self.set_state(TaskState::Completed);
    }

    pub fn mark_failed(&mut self) {
        self.set_state(TaskState::Failed);
    }

    /// Render this task (without children) as a checklist line.
    ///
    /// Line breaks in descriptions read from hand-edited documents are
    /// flattened to spaces.
    pub fn render(&self, id: &TaskPath) -> String {
        let checkbox = if self.state.is_checked() { 'x' } else { ' ' };
        let description = self.description.replace(['\r', '\n'], " ");
        format!("- [{checkbox}] {id}: {description}")
    }
}

/// Stored documents may carry `"subtasks": null` for leaf tasks.
fn null_as_empty<'de, D>(deserializer: D) -> Result<TaskList, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TaskList>::deserialize(deserializer)?.unwrap_or_default())
}
