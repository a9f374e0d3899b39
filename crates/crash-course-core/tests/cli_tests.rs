#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use crash_course::load_plan_from_json;
use predicates::str::contains as str_contains;
use tempfile::NamedTempFile;

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.write_stdin(script.to_string()).assert()
}

const PHYSICS: &str = "add 1 Thermodynamics 10 10 2025\nadd 2 Optics 5 5 2023\nadd 3 Waves 0 0\n";

#[test]
fn cli_generates_a_plan_for_the_default_window() {
    run_cli(&format!("{PHYSICS}plan\nquit\n"))
        .success()
        .stdout(str_contains("Plan generated ("))
        .stdout(str_contains("Day 1 - 2025-03-01"))
        .stdout(str_contains("Day 3 - 2025-03-03"))
        .stdout(str_contains("Thermodynamics"));
}

#[test]
fn cli_reports_plan_errors_without_topics() {
    run_cli("plan\nquit\n")
        .success()
        .stdout(str_contains("Plan error: no topics to schedule"));
}

#[test]
fn cli_reports_metadata_validation_errors() {
    run_cli("meta dates 2025-01-10 2025-01-05\nmeta days 0\nquit\n")
        .success()
        .stdout(str_contains("Start date must be before the exam date."))
        .stdout(str_contains("A crash course needs at least one study day."));
}

#[test]
fn cli_delete_command_removes_topic() {
    run_cli("add 1 Limits 4 6\nadd 2 Derivatives 8 10\ndelete 2\ndelete 9\nquit\n")
        .success()
        .stdout(str_contains("Deleted topic 2."))
        .stdout(str_contains("Topic 9 not found."));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().to_string();
    let script = format!(
        "add 1 Kinematics 4 6\nsave json {path}\nadd 2 Scratch 1 1\nload json {path}\nshow\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Syllabus saved to"));
    assert!(output.contains("Syllabus loaded from"));
    let after_reload = output
        .split("Syllabus loaded from")
        .last()
        .unwrap_or_default();
    assert!(after_reload.contains("Kinematics"), "{after_reload}");
    assert!(
        !after_reload.contains("Scratch"),
        "scratch topic should not survive the reload:\n{after_reload}"
    );
}

#[test]
fn cli_exports_the_last_plan() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().to_string();
    run_cli(&format!("export plan {path}\n{PHYSICS}plan\nexport plan {path}\nquit\n"))
        .success()
        .stdout(str_contains("No plan generated yet. Run 'plan' first."))
        .stdout(str_contains("Plan exported to"));

    let plan = load_plan_from_json(tmp.path()).expect("exported plan");
    assert_eq!(plan.days.len(), 3);
    assert_eq!(plan.minutes_for(3), 30);
}

#[test]
fn cli_rejects_unknown_commands() {
    run_cli("frobnicate\nquit\n")
        .success()
        .stdout(str_contains("Unknown command. Type 'help'."));
}

#[test]
fn cli_exits_cleanly_on_end_of_input() {
    run_cli("add 1 Limits 4 6\n").success();
}

#[test]
fn cli_rejects_malformed_prerequisite_ids() {
    let assert = run_cli(
        "add 1 Limits 4 6\nadd 2 Derivatives 8 10\nprereq 2 1;x\nprereq 2 1\nquit\n",
    )
    .success()
    .stdout(str_contains("Invalid prerequisite id 'x'"));
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert_eq!(output.matches("Prerequisites set.").count(), 1);
}

#[test]
fn cli_rejects_more_study_days_than_the_window_holds() {
    run_cli("meta days 9\nquit\n")
        .success()
        .stdout(str_contains("Only 3 day(s) fit before the exam date."));
}
