//! Ordered sibling collections and the tree operations built on them.
//!
//! Every structural operation resolves and validates its target before it
//! touches the tree, so a failed call leaves the list exactly as it was.
//! IDs are derived from position on every read; removing an entry shifts
//! the IDs of all later siblings and their descendants with no bookkeeping.

use std::iter::Enumerate;
use std::slice;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::path::TaskPath;
use crate::state::TaskState;
use crate::task::Task;

/// The tasks at one nesting level, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    tasks: Vec<Task>,
}

impl TaskList {
    /// Deepest nesting `add_task` will create below a list. Each level costs
    /// three levels of JSON nesting in the stored document, and this keeps
    /// the deepest tree well inside `serde_json`'s 128-level parse limit.
    pub const MAX_DEPTH: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Direct children, in sibling order.
    pub fn iter(&self) -> slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    /// The task at a 1-based position on this level.
    pub fn get(&self, index: usize) -> Option<&Task> {
        index.checked_sub(1).and_then(|i| self.tasks.get(i))
    }

    /// Add a task at this level, or under `parent` when given.
    ///
    /// Returns the new task's path relative to this list. The description
    /// is validated first, then the parent is resolved, then the new depth
    /// is checked against [`Self::MAX_DEPTH`]; any failure leaves the list
    /// untouched.
    pub fn add_task(
        &mut self,
        description: &str,
        parent: Option<&TaskPath>,
    ) -> Result<TaskPath, PlanError> {
        let task = Task::new(description)?;
        match parent {
            None => Ok(TaskPath::root().child(self.push(task))),
            Some(parent) => {
                let parent_task = self.get_by_id_mut(parent)?;
                if parent.depth() >= Self::MAX_DEPTH {
                    return Err(PlanError::InvalidInput(format!(
                        "task {parent} is at the maximum nesting depth of {}",
                        Self::MAX_DEPTH
                    )));
                }
                let index = parent_task.subtasks_mut().push(task);
                Ok(parent.child(index))
            }
        }
    }

    fn push(&mut self, task: Task) -> usize {
        self.tasks.push(task);
        self.tasks.len()
    }

    /// Resolve a path relative to this list.
    pub fn get_by_id(&self, path: &TaskPath) -> Result<&Task, PlanError> {
        self.locate(path.segments())
            .ok_or_else(|| PlanError::not_found(path))
    }

    pub fn get_by_id_mut(&mut self, path: &TaskPath) -> Result<&mut Task, PlanError> {
        self.locate_mut(path.segments())
            .ok_or_else(|| PlanError::not_found(path))
    }

    fn locate(&self, segments: &[usize]) -> Option<&Task> {
        let (&first, rest) = segments.split_first()?;
        let task = self.get(first)?;
        if rest.is_empty() {
            Some(task)
        } else {
            task.subtasks().locate(rest)
        }
    }

    fn locate_mut(&mut self, segments: &[usize]) -> Option<&mut Task> {
        let (&first, rest) = segments.split_first()?;
        let task = self.tasks.get_mut(first.checked_sub(1)?)?;
        if rest.is_empty() {
            Some(task)
        } else {
            task.subtasks_mut().locate_mut(rest)
        }
    }

    /// The list that holds the children of `segments` (this list itself for
    /// the empty prefix).
    fn level_mut(&mut self, segments: &[usize]) -> Option<&mut TaskList> {
        if segments.is_empty() {
            return Some(self);
        }
        self.locate_mut(segments).map(Task::subtasks_mut)
    }

    /// Depth-first, pre-order walk over every task below this list.
    ///
    /// With a filter, only tasks in that state are yielded, but the walk
    /// still descends through tasks that do not match.
    pub fn get_all(&self, state_filter: Option<TaskState>) -> Tasks<'_> {
        Tasks::new(self, TaskPath::root(), state_filter)
    }

    /// Remove the task at `path` together with its whole subtree.
    ///
    /// Later siblings move up one position. Returns the removed task.
    pub fn delete(&mut self, path: &TaskPath) -> Result<Task, PlanError> {
        let (&index, parent) = path
            .segments()
            .split_last()
            .ok_or_else(|| PlanError::not_found(path))?;

        let level = self
            .level_mut(parent)
            .ok_or_else(|| PlanError::not_found(path))?;

        if index == 0 || index > level.tasks.len() {
            return Err(PlanError::not_found(path));
        }

        Ok(level.tasks.remove(index - 1))
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Depth-first iterator
// ---------------------------------------------------------------------------

struct Frame<'a> {
    prefix: TaskPath,
    children: Enumerate<slice::Iter<'a, Task>>,
}

/// Lazy pre-order walk produced by [`TaskList::get_all`].
///
/// Each item pairs the task with its path, computed from position at the
/// moment it is yielded.
pub struct Tasks<'a> {
    stack: Vec<Frame<'a>>,
    state_filter: Option<TaskState>,
}

impl<'a> Tasks<'a> {
    pub(crate) fn new(list: &'a TaskList, prefix: TaskPath, state_filter: Option<TaskState>) -> Self {
        Self {
            stack: vec![Frame {
                prefix,
                children: list.tasks.iter().enumerate(),
            }],
            state_filter,
        }
    }
}

impl<'a> Iterator for Tasks<'a> {
    type Item = (TaskPath, &'a Task);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some((i, task)) = frame.children.next() else {
                self.stack.pop();
                continue;
            };

            let path = frame.prefix.child(i + 1);
            if !task.subtasks().is_empty() {
                self.stack.push(Frame {
                    prefix: path.clone(),
                    children: task.subtasks().tasks.iter().enumerate(),
                });
            }

            if self.state_filter.is_none_or(|state| task.state() == state) {
                return Some((path, task));
            }
        }
    }
}
