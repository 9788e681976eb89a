//! A manifest with a circular dependency is rejected at dispatch time rather
//! than silently stalling with no ready tasks.

use autopilot_core::test_support::cyclic_config;
use autopilot_engine::error::OrchestratorError;
use autopilot_engine::orchestrator::{detect_cyclic_dependencies, dispatch_next_task, TaskStates};

#[test]
fn mutual_dependency_is_detected_and_named_in_the_cycle() {
    let config = cyclic_config();
    let cycle = detect_cyclic_dependencies(&config.tasks).expect("A <-> B should be flagged");
    assert!(cycle.iter().any(|id| id.as_str() == "A"));
    assert!(cycle.iter().any(|id| id.as_str() == "B"));
}

#[test]
fn dispatch_refuses_to_run_against_a_cyclic_manifest() {
    let config = cyclic_config();
    let mut states = TaskStates::new();

    let result = dispatch_next_task(&config.tasks, &mut states, 1_000, None, None);
    match result {
        Err(OrchestratorError::CyclicDependency(path)) => {
            assert!(path.contains("->"));
        }
        other => panic!("expected a cyclic dependency error, got {other:?}"),
    }
    assert!(states.is_empty(), "no task state should advance on a rejected dispatch");
}
