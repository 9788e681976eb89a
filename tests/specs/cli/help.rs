//! `autopilot --help` smoke test.

use crate::prelude::*;

#[test]
fn help_lists_subcommands() {
    cli().args(&["--help"]).passes().stdout_has("tick").stdout_has("status");
}
