//! A completion claim that doesn't meet its `done_when` predicate is
//! rejected with a diagnostic explaining which check failed, and leaves the
//! task's state untouched.

use autopilot_core::task::{DoneWhen, FileCheck};
use autopilot_engine::done_checker::{check_done_conditions, format_done_result};

#[test]
fn undersized_output_file_is_rejected_with_a_size_diagnostic() {
    let project_dir = tempfile::tempdir().unwrap();
    std::fs::write(project_dir.path().join("app.js"), vec![b'x'; 50]).unwrap();

    let done_when = DoneWhen {
        files: vec![FileCheck {
            path: "app.js".into(),
            min_size: Some(100),
            contains: vec![],
        }],
        files_glob: vec![],
        commands: vec![],
    };

    let result = check_done_conditions(Some(&done_when), project_dir.path(), 1);
    assert!(!result.passed);

    let report = format_done_result(&result);
    assert!(report.contains("50 bytes < required 100 bytes"), "{report}");

    let failed = result.failed_items();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].description, "file: app.js");
}
