//! Behavioral specifications for the autopilot workspace.
//!
//! `cli/` drives the `autopilot` binary black-box, for the paths that don't
//! depend on a transport binary or real session transcripts. `scenarios/`
//! exercises the tick engine's quantified invariants directly against the
//! orchestrator/scheduler/done-checker APIs — the literal end-to-end cases
//! from the design notes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli/help.rs"]
mod cli_help;
#[path = "specs/cli/tick_errors.rs"]
mod cli_tick_errors;
#[path = "specs/cli/cleanup.rs"]
mod cli_cleanup;

#[path = "specs/scenarios/linear_dag_advance.rs"]
mod scenario_linear_dag_advance;
#[path = "specs/scenarios/predicate_rejection.rs"]
mod scenario_predicate_rejection;
#[path = "specs/scenarios/loop_kill.rs"]
mod scenario_loop_kill;
#[path = "specs/scenarios/round_robin_fairness.rs"]
mod scenario_round_robin_fairness;
#[path = "specs/scenarios/human_review_gate.rs"]
mod scenario_human_review_gate;
#[path = "specs/scenarios/cycle_detection.rs"]
mod scenario_cycle_detection;
