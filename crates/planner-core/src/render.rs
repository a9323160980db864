//! Textual and structured views of a task tree.

use serde::{Deserialize, Serialize};

use crate::path::TaskPath;
use crate::state::TaskState;
use crate::task_list::TaskList;

/// Heading placed once above the root list by [`markdown`].
pub const HEADING: &str = "# Task List";

const INDENT: &str = "  ";

impl TaskList {
    /// Render this list depth-first, one checklist line per task.
    ///
    /// Each nesting level adds two spaces on top of `indent_level`. IDs are
    /// relative to this list. An empty list renders as an empty string.
    pub fn render(&self, indent_level: usize) -> String {
        let mut out = String::new();
        render_level(self, &TaskPath::root(), indent_level, &mut out);
        out
    }
}

fn render_level(list: &TaskList, prefix: &TaskPath, depth: usize, out: &mut String) {
    for (i, task) in list.iter().enumerate() {
        let id = prefix.child(i + 1);
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push_str(&task.render(&id));
        out.push('\n');
        render_level(task.subtasks(), &id, depth + 1, out);
    }
}

/// Render a root list as a markdown document: the heading, a blank line,
/// then the tasks.
pub fn markdown(root: &TaskList) -> String {
    format!("{HEADING}\n\n{}", root.render(0))
}

/// Nested, serializable snapshot of a task and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    pub description: String,
    pub state: TaskState,
    pub subtasks: Vec<TaskNode>,
}

/// Build the structured view of a root list.
pub fn tree(root: &TaskList) -> Vec<TaskNode> {
    tree_level(root, &TaskPath::root())
}

fn tree_level(list: &TaskList, prefix: &TaskPath) -> Vec<TaskNode> {
    list.iter()
        .enumerate()
        .map(|(i, task)| {
            let id = prefix.child(i + 1);
            TaskNode {
                id: id.to_string(),
                description: task.description().to_string(),
                state: task.state(),
                subtasks: tree_level(task.subtasks(), &id),
            }
        })
        .collect()
}
