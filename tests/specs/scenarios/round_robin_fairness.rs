//! Round-robin scheduling orders schedulable projects by how long ago they
//! were last sent to, and filters out anything still inside its cooldown.

use autopilot_core::Project;
use autopilot_engine::scheduler::{schedule_projects, SchedulingStrategy};
use autopilot_storage::GlobalState;
use std::path::PathBuf;

const COOLDOWN_SECS: u64 = 30;
const NOW: u64 = 1_000;

#[test]
fn cooled_down_projects_come_before_recently_sent_ones_and_the_rest_are_filtered() {
    let recently_sent = Project::minimal("recently-sent", PathBuf::from("/p1"));
    let long_idle = Project::minimal("long-idle", PathBuf::from("/p2"));
    let never_sent = Project::minimal("never-sent", PathBuf::from("/p3"));

    let mut state = GlobalState::default();
    state.project_state_mut("/p1").last_send_at = Some(NOW - 10);
    state.project_state_mut("/p2").last_send_at = Some(NOW - 60);

    let result = schedule_projects(
        &[recently_sent, long_idle, never_sent],
        &|_| true,
        &mut state,
        SchedulingStrategy::RoundRobin,
        COOLDOWN_SECS,
        50,
        "2026-07-26",
        NOW,
    );

    let names: Vec<&str> = result.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["never-sent", "long-idle"], "recently-sent is still inside its cooldown");
}

#[test]
fn projects_without_a_live_session_are_never_scheduled() {
    let with_session = Project::minimal("with-session", PathBuf::from("/a"));
    let without_session = Project::minimal("without-session", PathBuf::from("/b"));
    let mut state = GlobalState::default();

    let result = schedule_projects(
        &[with_session, without_session],
        &|dir| dir == std::path::Path::new("/a"),
        &mut state,
        SchedulingStrategy::RoundRobin,
        COOLDOWN_SECS,
        50,
        "2026-07-26",
        NOW,
    );

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].name, "with-session");
}
