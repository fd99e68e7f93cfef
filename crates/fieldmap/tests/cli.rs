mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn writes_report_for_survey() {
    let dir = tempfile::tempdir().unwrap();
    let survey = dir.path().join("survey.json");
    let config = dir.path().join("config.json");
    let output = dir.path().join("report.json");
    common::survey().write_json(&survey).unwrap();
    common::config().write_json(&config).unwrap();

    Command::cargo_bin("fieldmap")
        .unwrap()
        .arg("--survey")
        .arg(&survey)
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let report = fieldmap::FieldMapReport::load_json(&output).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert!(report.groups.iter().any(|g| g.id == "100" && g.num_plants == 6));
    assert_eq!(report.stats.single.detected, 1);
}

#[test]
fn missing_survey_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("fieldmap")
        .unwrap()
        .arg("--survey")
        .arg(dir.path().join("absent.json"))
        .arg("--output")
        .arg(dir.path().join("report.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn survey_without_rows_fails_with_topology_error() {
    let dir = tempfile::tempdir().unwrap();
    let survey = dir.path().join("survey.json");
    fieldmap::FieldSurvey::default().write_json(&survey).unwrap();

    Command::cargo_bin("fieldmap")
        .unwrap()
        .arg("--survey")
        .arg(&survey)
        .arg("--output")
        .arg(dir.path().join("report.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no row codes found"));
    assert!(!dir.path().join("report.json").exists());
}

#[test]
fn requires_survey_argument() {
    Command::cargo_bin("fieldmap")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--survey"));
}
