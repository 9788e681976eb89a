//! A three-task chain (A -> B -> C) advances one task at a time, gated on
//! each task's completion predicate rather than the mere passage of a tick.

use autopilot_core::task::TaskId;
use autopilot_core::task_state::TaskStatus;
use autopilot_core::test_support::linear_chain_config;
use autopilot_engine::done_checker::check_done_conditions;
use autopilot_engine::orchestrator::{dispatch_next_task, TaskStates};

#[test]
fn chain_advances_only_after_each_predicate_is_met() {
    let config = linear_chain_config();
    let mut states = TaskStates::new();
    let project_dir = tempfile::tempdir().unwrap();

    let (task, prompt) = dispatch_next_task(&config.tasks, &mut states, 1_000, None, None).unwrap();
    assert_eq!(task.unwrap().id.as_str(), "A");
    assert!(prompt.unwrap().contains("Do task A"));

    let a_done_when = config.tasks[0].done_when.as_ref();
    let result = check_done_conditions(a_done_when, project_dir.path(), 1);
    assert!(!result.passed, "A.out hasn't been written yet");

    // A second dispatch with A still current must not advance past it.
    let (task, _) = dispatch_next_task(&config.tasks, &mut states, 1_050, None, None).unwrap();
    assert!(task.is_none(), "B depends on A, which hasn't completed");

    std::fs::write(project_dir.path().join("A.out"), "built").unwrap();
    let result = check_done_conditions(a_done_when, project_dir.path(), 1);
    assert!(result.passed);

    let (task, prompt) = dispatch_next_task(
        &config.tasks,
        &mut states,
        1_100,
        Some(&TaskId::from("A")),
        Some(&result.summary),
    )
    .unwrap();
    assert_eq!(task.unwrap().id.as_str(), "B");
    assert!(prompt.unwrap().contains(&result.summary));
    assert_eq!(states[&TaskId::from("A")].status, TaskStatus::Completed);
    assert_eq!(states[&TaskId::from("B")].status, TaskStatus::Running);

    let (task, _) = dispatch_next_task(&config.tasks, &mut states, 1_200, Some(&TaskId::from("B")), None).unwrap();
    assert_eq!(task.unwrap().id.as_str(), "C");
    assert_eq!(states[&TaskId::from("B")].status, TaskStatus::Completed);
}
