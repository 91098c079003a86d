//! CLI tests that spawn the digester binary.

use std::fs;
use std::process::Command;

use chrono::NaiveDate;
use digester::core::period::compute_period;
use digester::core::types::RunStatus;
use digester::exit_codes;
use digester::io::client::API_KEY_ENV;
use digester::io::run_log::load_run_log;
use digester::test_support::{TestProject, valid_document};

fn digester() -> Command {
    Command::new(env!("CARGO_BIN_EXE_digester"))
}

#[test]
fn period_prints_descriptor_json() {
    let output = digester()
        .args(["period", "--today", "2026-10-19"])
        .output()
        .expect("digester period");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["filename"], "2026-week-42.md");
    assert_eq!(json["week_number"], 42);
    assert_eq!(json["pub_date"], "2026-10-19");
}

#[test]
fn validate_accepts_a_valid_digest() {
    let project = TestProject::new();
    let period = compute_period(NaiveDate::from_ymd_opt(2026, 10, 18).expect("date"));
    let path = project.add_digest("2026-week-41.md", &valid_document(&period));

    let status = digester()
        .arg("validate")
        .arg(&path)
        .args(["--today", "2026-10-18"])
        .status()
        .expect("digester validate");

    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn validate_reports_header_errors() {
    let project = TestProject::new();
    let period = compute_period(NaiveDate::from_ymd_opt(2026, 10, 18).expect("date"));
    let document = valid_document(&period).replace("year: 2026", "year: 2025");
    let path = project.add_digest("2026-week-41.md", &document);

    let output = digester()
        .arg("validate")
        .arg(&path)
        .args(["--today", "2026-10-18"])
        .output()
        .expect("digester validate");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("year mismatch: expected 2026, got 2025"));
}

#[test]
fn run_without_api_key_fails_and_logs() {
    let project = TestProject::new();

    let status = digester()
        .arg("--root")
        .arg(project.root())
        .args(["run", "--today", "2026-10-18", "--no-escalate"])
        .env_remove(API_KEY_ENV)
        .status()
        .expect("digester run");

    assert_eq!(status.code(), Some(exit_codes::FAILED));
    let logs = project.run_logs();
    assert_eq!(logs.len(), 1);
    let log = load_run_log(&logs[0]).expect("log");
    assert_eq!(log.status, RunStatus::FailedNoApiKey);
}

#[test]
fn select_image_prints_least_recently_used() {
    let project = TestProject::new();
    project.add_image("a.svg");
    project.add_image("b.svg");
    project.add_digest(
        "2026-week-41.md",
        "---\ntitle: t\nimage: /images/digests/a.svg\ndraft: false\n---\n",
    );

    let output = digester()
        .arg("--root")
        .arg(project.root())
        .arg("select-image")
        .output()
        .expect("digester select-image");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "/images/digests/b.svg"
    );
}

#[test]
fn invalid_config_is_rejected() {
    let project = TestProject::new();
    fs::write(project.root().join("digester.toml"), "max_turns = 0\n").expect("write config");

    let output = digester()
        .arg("--root")
        .arg(project.root())
        .args(["period", "--today", "2026-10-18"])
        .output()
        .expect("digester period");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_turns must be > 0"));
}
