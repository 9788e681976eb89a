//! Three consecutive ticks producing the same agent output (by content hash)
//! trip loop detection and flip the project into the error lifecycle rather
//! than dispatching a fourth identical attempt.

use autopilot_core::ProjectLifecycle;
use autopilot_storage::GlobalState;

const LOOP_DETECTION_THRESHOLD: u32 = 3;
const LOOP_HASH_PREFIX_CHARS: usize = 500;

/// Mirrors the tick driver's loop bookkeeping: hash the last assistant
/// message and bump `loop_count` when it repeats.
fn record_output(state: &mut GlobalState, dir_key: &str, message: &str) -> u32 {
    let prefix: String = message.chars().take(LOOP_HASH_PREFIX_CHARS).collect();
    let hash = format!("{:x}", md5::compute(prefix.as_bytes()));
    let proj_state = state.project_state_mut(dir_key);
    if proj_state.last_output_hash.as_deref() == Some(hash.as_str()) {
        proj_state.loop_count += 1;
    } else {
        proj_state.loop_count = 1;
        proj_state.last_output_hash = Some(hash);
    }
    proj_state.loop_count
}

#[test]
fn repeated_identical_output_trips_loop_detection_on_the_third_occurrence() {
    let mut state = GlobalState::default();
    let dir_key = "/projects/stuck-repo";
    let mut lifecycle = ProjectLifecycle::Running;

    let same_message = "I've completed the task. Let me verify the result once more.";

    for tick in 1..=2 {
        let loop_count = record_output(&mut state, dir_key, same_message);
        assert_eq!(loop_count, tick);
        assert!(loop_count < LOOP_DETECTION_THRESHOLD);
    }

    let loop_count = record_output(&mut state, dir_key, same_message);
    assert_eq!(loop_count, 3);
    assert!(loop_count >= LOOP_DETECTION_THRESHOLD);
    lifecycle = ProjectLifecycle::Error;

    assert_eq!(lifecycle, ProjectLifecycle::Error);
    assert_eq!(state.project_state_mut(dir_key).loop_count, 3);
}

#[test]
fn alternating_output_never_trips_loop_detection() {
    let mut state = GlobalState::default();
    let dir_key = "/projects/making-progress";

    let messages = [
        "Starting work on the auth module.",
        "Added the login handler, running tests now.",
        "Tests pass, moving to the next task.",
    ];

    let mut last_count = 0;
    for message in messages {
        last_count = record_output(&mut state, dir_key, message);
    }
    assert_eq!(last_count, 1, "distinct output should never accumulate a loop count");
}
