//! Integration tests for the task tree: positional IDs, renumbering after
//! deletes, state filtering, and the persisted document shape.

use planner_core::{PlanError, TaskCollection, TaskPath, TaskState};
use planner_test_utils::{mixed_state_collection, sample_collection};

fn ids(tasks: &TaskCollection) -> Vec<String> {
    tasks.tasks(None).map(|(id, _)| id.to_string()).collect()
}

// ===========================================================================
// Walkthrough
// ===========================================================================

#[test]
fn walkthrough_renders_and_renumbers() {
    let mut tasks = sample_collection();
    assert_eq!(
        tasks.to_markdown(),
        "# Task List\n\n- [ ] 1: Main Task 1\n  - [ ] 1.1: Subtask 1.1\n- [ ] 2: Main Task 2\n"
    );

    assert_eq!(tasks.delete_task("1").unwrap(), "1");
    assert_eq!(tasks.to_markdown(), "# Task List\n\n- [ ] 1: Main Task 2\n");

    // The old subtask ID is gone along with its parent.
    assert!(matches!(
        tasks.get_task("1.1"),
        Err(PlanError::NotFound(_))
    ));
}

#[test]
fn empty_collection_renders_heading_only() {
    assert_eq!(TaskCollection::new().to_markdown(), "# Task List\n\n");
}

#[test]
fn completed_tasks_are_checked() {
    let tasks = mixed_state_collection();
    let md = tasks.to_markdown();
    assert!(md.contains("- [x] 1: Design\n"), "{md}");
    assert!(md.contains("    - [ ] 1.2.1: Fix notes\n"), "{md}");
    // Failed is not done.
    assert!(md.contains("  - [ ] 1.2: Review\n"), "{md}");
}

// ===========================================================================
// Positional IDs
// ===========================================================================

#[test]
fn every_reported_id_resolves_to_its_task() {
    let tasks = mixed_state_collection();
    for (id, task) in tasks.tasks(None) {
        let found = tasks.get_task(&id.to_string()).unwrap();
        assert_eq!(found.description, task.description());
        assert_eq!(found.id, id.to_string());
    }
    assert_eq!(ids(&tasks), ["1", "1.1", "1.2", "1.2.1", "2", "2.1"]);
}

#[test]
fn deleting_first_of_ten_shifts_every_id() {
    let mut tasks = TaskCollection::new();
    for i in 1..=10 {
        tasks.add_task(&format!("Task {i}")).unwrap();
    }
    tasks.delete_task("1").unwrap();

    assert_eq!(tasks.task_count(), 9);
    for i in 1..=9 {
        let task = tasks.get_task(&i.to_string()).unwrap();
        assert_eq!(task.description, format!("Task {}", i + 1));
    }
    assert!(matches!(tasks.get_task("10"), Err(PlanError::NotFound(_))));
}

#[test]
fn deleting_middle_subtask_renumbers_siblings_and_descendants() {
    let mut tasks = TaskCollection::new();
    tasks.add_task("Parent").unwrap();
    for name in ["a", "b", "c"] {
        tasks.add_subtask("1", name).unwrap();
    }
    tasks.add_subtask("1.3", "c-child").unwrap();

    tasks.delete_task("1.2").unwrap();

    assert_eq!(ids(&tasks), ["1", "1.1", "1.2", "1.2.1"]);
    assert_eq!(tasks.get_task("1.2").unwrap().description, "c");
    assert_eq!(tasks.get_task("1.2.1").unwrap().description, "c-child");
}

#[test]
fn malformed_ids_are_not_found() {
    let mut tasks = sample_collection();
    for bad in ["", "0", "1.0", "a", "1..1", "1.", ".1", "-1", " 1", "99", "1.1.1"] {
        assert!(
            matches!(tasks.get_task(bad), Err(PlanError::NotFound(_))),
            "{bad:?} should be not found"
        );
        assert!(matches!(
            tasks.delete_task(bad),
            Err(PlanError::NotFound(_))
        ));
    }
    assert_eq!(tasks.task_count(), 3);
}

#[test]
fn leading_zeros_are_normalized() {
    let tasks = sample_collection();
    assert_eq!(tasks.get_task("01.001").unwrap().id, "1.1");
    assert_eq!("002".parse::<TaskPath>().unwrap().to_string(), "2");
}

// ===========================================================================
// Validation order and failures
// ===========================================================================

#[test]
fn failed_operations_leave_tree_unchanged() {
    let mut tasks = sample_collection();
    let before = tasks.clone();

    assert!(matches!(
        tasks.add_task("   "),
        Err(PlanError::InvalidInput(_))
    ));
    assert!(matches!(
        tasks.add_subtask("7", "orphan"),
        Err(PlanError::NotFound(_))
    ));
    assert!(matches!(
        tasks.update_task_state("1", "done"),
        Err(PlanError::InvalidState(_))
    ));

    assert_eq!(tasks, before);
}

#[test]
fn blank_description_wins_over_missing_parent() {
    let mut tasks = TaskCollection::new();
    assert!(matches!(
        tasks.add_subtask("5", ""),
        Err(PlanError::InvalidInput(_))
    ));
}

#[test]
fn bad_state_wins_over_missing_task() {
    let mut tasks = TaskCollection::new();
    assert!(matches!(
        tasks.update_task_state("5", "finished"),
        Err(PlanError::InvalidState(_))
    ));
}

// ===========================================================================
// Filtering
// ===========================================================================

#[test]
fn filter_reaches_nested_tasks_under_non_matching_parents() {
    let tasks = mixed_state_collection();

    let completed: Vec<String> = tasks
        .get_tasks(Some("completed"))
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(completed, ["1", "1.1", "2.1"]);

    let in_progress = tasks.get_tasks(Some("in_progress")).unwrap();
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].id, "1.2.1");

    let pending = tasks.get_tasks(Some("pending")).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].description, "Build");
}

#[test]
fn unfiltered_listing_is_preorder() {
    let tasks = mixed_state_collection();
    let all = tasks.get_tasks(None).unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(all[0].id, "1");
    assert_eq!(all[5].id, "2.1");
}

#[test]
fn unknown_filter_is_invalid_state() {
    let tasks = sample_collection();
    assert!(matches!(
        tasks.get_tasks(Some("blocked")),
        Err(PlanError::InvalidState(_))
    ));
}

#[test]
fn typed_filter_matches_string_filter() {
    let tasks = mixed_state_collection();
    let typed: Vec<String> = tasks
        .tasks(Some(TaskState::Failed))
        .map(|(id, _)| id.to_string())
        .collect();
    assert_eq!(typed, ["1.2"]);
}

// ===========================================================================
// Persisted shape
// ===========================================================================

#[test]
fn serialized_document_has_no_ids() {
    let tasks = sample_collection();
    let json = serde_json::to_value(&tasks).unwrap();

    let first = &json["tasks"][0];
    assert_eq!(first["description"], "Main Task 1");
    assert_eq!(first["state"], "pending");
    assert!(first.get("id").is_none());
    assert_eq!(
        first["subtasks"]["tasks"][0]["description"],
        "Subtask 1.1"
    );
}

#[test]
fn reloaded_document_renders_identically() {
    let tasks = mixed_state_collection();
    let json = serde_json::to_string(&tasks).unwrap();
    let reloaded: TaskCollection = serde_json::from_str(&json).unwrap();

    assert_eq!(reloaded, tasks);
    assert_eq!(reloaded.to_markdown(), tasks.to_markdown());
}

#[test]
fn null_or_missing_subtasks_load_as_empty() {
    let json = r#"{"tasks": [
        {"description": "A", "state": "completed", "subtasks": null},
        {"description": "B"}
    ]}"#;
    let tasks: TaskCollection = serde_json::from_str(json).unwrap();

    assert_eq!(
        tasks.to_markdown(),
        "# Task List\n\n- [x] 1: A\n- [ ] 2: B\n"
    );
}
