//! End-to-end runs of the digest pipeline against scripted collaborators.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use digester::core::period::{PeriodDescriptor, compute_period};
use digester::core::types::{RunPhase, RunStatus};
use digester::core::verdict::VerdictLabel;
use digester::io::client::CallError;
use digester::io::escalation::Escalator;
use digester::io::run_log::load_run_log;
use digester::run::{RunContext, RunOutcome, record_missing_api_key, run_digest};
use digester::test_support::{
    RecordingEscalator, RecordingSleeper, ScriptedClient, TestProject, final_response,
    paused_response, search_block, valid_document,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).expect("date")
}

fn period() -> PeriodDescriptor {
    compute_period(today())
}

struct Harness {
    project: TestProject,
    sleeper: RecordingSleeper,
    escalator: RecordingEscalator,
}

impl Harness {
    fn new() -> Self {
        Self {
            project: TestProject::new(),
            sleeper: RecordingSleeper::default(),
            escalator: RecordingEscalator::default(),
        }
    }

    fn run(&self, client: &ScriptedClient) -> RunOutcome {
        let ctx = RunContext {
            root: self.project.root(),
            config: &self.project.config,
            client,
            sleeper: &self.sleeper,
            escalator: &self.escalator,
        };
        run_digest(&ctx, today()).expect("run")
    }
}

/// Records how many run logs existed each time an issue was opened.
struct LogCountingEscalator {
    logs_dir: PathBuf,
    counts: RefCell<Vec<usize>>,
}

impl Escalator for LogCountingEscalator {
    fn open_issue(&self, _title: &str, _body: &str) {
        let count = fs::read_dir(&self.logs_dir).map_or(0, |entries| entries.count());
        self.counts.borrow_mut().push(count);
    }
}

#[test]
fn successful_run_saves_digest_with_image_and_log() {
    let harness = Harness::new();
    harness.project.add_image("b.svg");
    harness.project.add_image("a.svg");
    let client = ScriptedClient::new(vec![
        Ok(final_response(&valid_document(&period()))),
        Ok(final_response("APPROVED")),
    ]);

    let outcome = harness.run(&client);

    assert_eq!(outcome.status, RunStatus::Success);
    let path = outcome.document_path.expect("document path");
    assert_eq!(path, harness.project.digests_dir().join("2026-week-41.md"));
    let saved = fs::read_to_string(&path).expect("read digest");
    assert!(saved.contains("image: /images/digests/a.svg\ndraft: false\n"));
    assert!(saved.ends_with("Body text.\n"));

    assert_eq!(harness.sleeper.sleeps(), vec![Duration::from_secs(1)]);
    assert!(harness.escalator.issues().is_empty());

    let log = load_run_log(&outcome.log_path).expect("log");
    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.phase, RunPhase::Done);
    assert_eq!(log.period, Some(period()));
    assert_eq!(log.review_verdict, Some(VerdictLabel::Approved));
    assert_eq!(log.research_turns, Some(1));
    assert!(log.usage.research.is_some());
    assert!(log.usage.review.is_some());
    assert_eq!(log.image.as_deref(), Some("/images/digests/a.svg"));
    assert!(log.pre_review_errors.is_empty());
    assert!(log.elapsed_seconds.is_some());
    assert_eq!(harness.project.run_logs(), vec![outcome.log_path]);
}

#[test]
fn review_correction_repairs_a_flawed_draft() {
    let harness = Harness::new();
    let flawed = valid_document(&period()).replace("draft: false", "draft: true");
    let client = ScriptedClient::new(vec![
        Ok(paused_response(vec![search_block("ai security news")])),
        Ok(final_response(&format!("Here is the digest:\n{flawed}"))),
        Ok(final_response(&format!(
            "CORRECTED\n```markdown\n{}```",
            valid_document(&period())
        ))),
    ]);

    let outcome = harness.run(&client);

    assert_eq!(outcome.status, RunStatus::Success);
    let log = load_run_log(&outcome.log_path).expect("log");
    assert_eq!(log.research_turns, Some(2));
    assert_eq!(log.preamble_stripped_chars, Some(20));
    assert_eq!(log.review_verdict, Some(VerdictLabel::Corrected));
    assert_eq!(
        log.pre_review_errors,
        vec!["draft must be false, got true".to_string()]
    );
    // One turn cooldown plus the review cooldown.
    assert_eq!(harness.sleeper.sleeps().len(), 2);

    let saved = fs::read_to_string(outcome.document_path.expect("path")).expect("read");
    assert!(saved.contains("draft: false"));
    assert!(!saved.contains("image:"));
}

#[test]
fn post_review_validation_failure_saves_nothing_and_escalates_once() {
    let harness = Harness::new();
    let document = valid_document(&period());
    let broken = document.replace("weekNumber: 41", "weekNumber: 40");
    let client = ScriptedClient::new(vec![
        Ok(final_response(&document)),
        Ok(final_response(&format!("CORRECTED\n{broken}"))),
    ]);

    let outcome = harness.run(&client);

    assert_eq!(outcome.status, RunStatus::FailedValidation);
    assert!(outcome.document_path.is_none());
    assert!(!harness.project.digests_dir().join("2026-week-41.md").exists());

    let issues = harness.escalator.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].0, "[Agent] Digest validation failed — Week 41, 2026");
    assert!(issues[0].1.contains("weekNumber mismatch: expected 41, got 40"));
    assert!(issues[0].1.contains("October 05 – October 11, 2026"));

    let log = load_run_log(&outcome.log_path).expect("log");
    assert_eq!(log.status, RunStatus::FailedValidation);
    assert_eq!(log.phase, RunPhase::Reviewed);
    assert_eq!(
        log.validation_errors,
        vec!["weekNumber mismatch: expected 41, got 40".to_string()]
    );
}

#[test]
fn client_error_is_recorded_and_escalated() {
    let harness = Harness::new();
    let client = ScriptedClient::new(vec![Err(CallError::from_status(401, "invalid x-api-key"))]);

    let outcome = harness.run(&client);

    assert_eq!(outcome.status, RunStatus::FailedException);
    assert!(outcome.document_path.is_none());

    let issues = harness.escalator.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].0, "[Agent] Digest generation failed — 2026-week-41.md");
    assert!(issues[0].1.contains("invalid x-api-key"));

    let log = load_run_log(&outcome.log_path).expect("log");
    assert_eq!(log.status, RunStatus::FailedException);
    assert_eq!(log.phase, RunPhase::PeriodComputed);
    let error = log.error.expect("error");
    assert!(error.contains("research pass"));
    assert!(error.contains("HTTP 401"));
    assert!(log.traceback.is_some());
}

#[test]
fn rate_limits_are_retried_with_backoff() {
    let harness = Harness::new();
    let client = ScriptedClient::new(vec![
        Err(CallError::from_status(429, "slow down")),
        Ok(final_response(&valid_document(&period()))),
        Ok(final_response("APPROVED")),
    ]);

    let outcome = harness.run(&client);

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::from_secs(60), Duration::from_secs(1)]
    );
}

#[test]
fn existing_digest_is_skipped_every_time() {
    let harness = Harness::new();
    let existing = harness
        .project
        .add_digest("2026-week-41.md", "hand-edited digest\n");
    let client = ScriptedClient::new(Vec::new());

    for _ in 0..2 {
        let outcome = harness.run(&client);
        assert_eq!(outcome.status, RunStatus::SkippedExists);
        let log = load_run_log(&outcome.log_path).expect("log");
        assert_eq!(log.status, RunStatus::SkippedExists);
        assert_eq!(log.phase, RunPhase::SkippedExisting);
    }

    assert_eq!(client.calls(), 0);
    assert!(harness.escalator.issues().is_empty());
    assert_eq!(
        fs::read_to_string(existing).expect("read"),
        "hand-edited digest\n"
    );
}

#[test]
fn missing_api_key_is_logged() {
    let project = TestProject::new();
    let outcome = record_missing_api_key(project.root(), &project.config).expect("record");

    assert_eq!(outcome.status, RunStatus::FailedNoApiKey);
    let log = load_run_log(&outcome.log_path).expect("log");
    assert_eq!(log.status, RunStatus::FailedNoApiKey);
    assert!(log.period.is_none());
}

#[test]
fn run_log_is_written_before_escalating() {
    let project = TestProject::new();
    let sleeper = RecordingSleeper::default();
    let escalator = LogCountingEscalator {
        logs_dir: project.logs_dir(),
        counts: RefCell::new(Vec::new()),
    };
    let document = valid_document(&period());
    let broken = document.replace("draft: false", "draft: true");
    let client = ScriptedClient::new(vec![
        Ok(final_response(&document)),
        Ok(final_response(&format!("CORRECTED\n{broken}"))),
        Err(CallError::from_status(400, "bad request")),
    ]);
    let ctx = RunContext {
        root: project.root(),
        config: &project.config,
        client: &client,
        sleeper: &sleeper,
        escalator: &escalator,
    };

    let first = run_digest(&ctx, today()).expect("run");
    assert_eq!(first.status, RunStatus::FailedValidation);
    assert_eq!(*escalator.counts.borrow(), vec![1]);

    // Move past the first log's timestamp so the second run gets its own file.
    std::thread::sleep(Duration::from_millis(1_100));
    let second = run_digest(&ctx, today()).expect("run");
    assert_eq!(second.status, RunStatus::FailedException);
    assert_eq!(*escalator.counts.borrow(), vec![1, 2]);
}

#[test]
fn unreadable_image_store_saves_digest_without_image() {
    let harness = Harness::new();
    let images_dir = harness.project.root().join(&harness.project.config.paths.images_dir);
    fs::create_dir_all(images_dir.parent().expect("images parent")).expect("mkdir");
    fs::write(&images_dir, "not a directory").expect("write");
    let client = ScriptedClient::new(vec![
        Ok(final_response(&valid_document(&period()))),
        Ok(final_response("APPROVED")),
    ]);

    let outcome = harness.run(&client);

    assert_eq!(outcome.status, RunStatus::Success);
    let saved = fs::read_to_string(outcome.document_path.expect("path")).expect("read");
    assert!(!saved.contains("image:"));
    let log = load_run_log(&outcome.log_path).expect("log");
    assert!(log.image.is_none());
    assert_eq!(log.phase, RunPhase::Done);
}
