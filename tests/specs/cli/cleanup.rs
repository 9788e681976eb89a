//! `autopilot cleanup` against a config with no stale state entries reports
//! zero removals and exits successfully.

use crate::prelude::*;

#[test]
fn cleanup_with_no_stale_entries_passes() {
    let project = Project::empty();
    project.configure("");

    project
        .autopilot()
        .args(&["cleanup"])
        .passes()
        .stdout_has("removed 0");
}
