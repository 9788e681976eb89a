//! A tick against a config with no registered projects aborts with a
//! non-zero exit code rather than silently doing nothing.

use crate::prelude::*;

#[test]
fn tick_with_no_projects_fails() {
    let project = Project::empty();
    // No config.yaml written at all: load_config falls back to a default,
    // empty Config, which the tick driver treats as fatal.
    project
        .autopilot()
        .args(&["tick"])
        .fails()
        .stdout_lacks("considered=");
}
