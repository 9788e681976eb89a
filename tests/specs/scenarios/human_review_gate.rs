//! A task flagged `requires_human_review` parks in `Blocked` with no prompt
//! sent, and only proceeds once an operator approves it.

use autopilot_core::task::{Task, TaskConfig, TaskId};
use autopilot_core::task_state::TaskStatus;
use autopilot_engine::orchestrator::{approve_task, dispatch_next_task, TaskStates};

fn gated_config() -> TaskConfig {
    TaskConfig {
        tasks: vec![
            Task::builder().id("prep").name("Prep work").prompt("Set things up.").build(),
            Task::builder()
                .id("ship")
                .name("Ship to production")
                .prompt("Deploy the release.")
                .depends_on(vec![TaskId::from("prep")])
                .requires_human_review(true)
                .build(),
        ],
        ..Default::default()
    }
}

#[test]
fn review_gated_task_waits_for_approval_before_dispatching() {
    let config = gated_config();
    let mut states = TaskStates::new();

    let (task, prompt) = dispatch_next_task(&config.tasks, &mut states, 1_000, None, None).unwrap();
    assert_eq!(task.unwrap().id.as_str(), "prep");
    assert!(prompt.is_some());

    let (task, prompt) =
        dispatch_next_task(&config.tasks, &mut states, 1_100, Some(&TaskId::from("prep")), None).unwrap();
    assert_eq!(task.unwrap().id.as_str(), "ship");
    assert!(prompt.is_none(), "a review-gated task must not be sent to the agent");
    assert_eq!(states[&TaskId::from("ship")].status, TaskStatus::Blocked);

    // Dispatching again while still blocked must not re-dispatch or advance.
    let (task, _) = dispatch_next_task(&config.tasks, &mut states, 1_200, None, None).unwrap();
    assert!(task.is_none());

    assert!(approve_task(&TaskId::from("ship"), &mut states));
    assert_eq!(states[&TaskId::from("ship")].status, TaskStatus::Pending);

    let (task, prompt) = dispatch_next_task(&config.tasks, &mut states, 1_300, None, None).unwrap();
    assert_eq!(task.unwrap().id.as_str(), "ship");
    assert!(prompt.unwrap().contains("Deploy the release"));
    assert_eq!(states[&TaskId::from("ship")].status, TaskStatus::Running);
}
