//! Orchestration for a single `digester run`.
//!
//! Every run ends with exactly one run log on disk, whatever happened in
//! between. Failures that need a human open an issue through the escalator.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing::{error, info, instrument, warn};

use crate::core::frontmatter::inject_image;
use crate::core::period::{PeriodDescriptor, compute_period};
use crate::core::schema::validate_header;
use crate::core::types::{RunPhase, RunStatus};
use crate::images::select_image;
use crate::io::asset_store::AssetStore;
use crate::io::client::MessagesClient;
use crate::io::config::DigestConfig;
use crate::io::documents::DocumentStore;
use crate::io::escalation::Escalator;
use crate::io::prompt::PromptEngine;
use crate::io::retry::Sleeper;
use crate::io::run_log::{RunLog, write_run_log};
use crate::research::run_research_pass;
use crate::review::run_review_pass;

/// Collaborators and settings for one run.
pub struct RunContext<'a, C: ?Sized, S: ?Sized, X: ?Sized> {
    /// Project root; configured relative paths resolve against it.
    pub root: &'a Path,
    pub config: &'a DigestConfig,
    pub client: &'a C,
    pub sleeper: &'a S,
    pub escalator: &'a X,
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub period: Option<PeriodDescriptor>,
    /// Saved digest, only on success.
    pub document_path: Option<PathBuf>,
    pub log_path: PathBuf,
}

/// Generate, review, validate and save the digest for the week before `today`.
///
/// Only failing to persist the run log is returned as an error; every other
/// failure is reflected in the outcome's status.
#[instrument(skip_all, fields(today = %today, root = %ctx.root.display()))]
pub fn run_digest<C, S, X>(ctx: &RunContext<'_, C, S, X>, today: NaiveDate) -> Result<RunOutcome>
where
    C: MessagesClient + ?Sized,
    S: Sleeper + ?Sized,
    X: Escalator + ?Sized,
{
    let mut log = RunLog::new(&ctx.config.model, Utc::now());

    let status = match execute(ctx, today, &mut log) {
        Ok(status) => status,
        Err(err) => {
            error!(err = %format!("{err:#}"), phase = ?log.phase, "digest run failed");
            log.error = Some(format!("{err:#}"));
            log.traceback = Some(format!("{err:?}"));
            RunStatus::FailedException
        }
    };

    if status == RunStatus::Success {
        log.phase = RunPhase::Done;
    }
    log.finish(status, Utc::now());
    let log_path = persist_log(ctx.root, ctx.config, &log)?;
    info!(
        status = ?status,
        elapsed_seconds = log.elapsed_seconds,
        log = %log_path.display(),
        "run finished"
    );
    // The log is on disk before the escalator gets a chance to block.
    escalate(ctx.escalator, &log);
    Ok(RunOutcome {
        status,
        period: log.period,
        document_path: log.document_path,
        log_path,
    })
}

/// Record a run that could not start because no API key is configured.
pub fn record_missing_api_key(root: &Path, config: &DigestConfig) -> Result<RunOutcome> {
    error!("no API key configured, not starting run");
    let mut log = RunLog::new(&config.model, Utc::now());
    log.finish(RunStatus::FailedNoApiKey, Utc::now());
    let log_path = persist_log(root, config, &log)?;
    Ok(RunOutcome {
        status: RunStatus::FailedNoApiKey,
        period: None,
        document_path: None,
        log_path,
    })
}

fn persist_log(root: &Path, config: &DigestConfig, log: &RunLog) -> Result<PathBuf> {
    write_run_log(&root.join(&config.paths.logs_dir), log).context("persist run log")
}

fn execute<C, S, X>(
    ctx: &RunContext<'_, C, S, X>,
    today: NaiveDate,
    log: &mut RunLog,
) -> Result<RunStatus>
where
    C: MessagesClient + ?Sized,
    S: Sleeper + ?Sized,
    X: Escalator + ?Sized,
{
    let config = ctx.config;
    let period = compute_period(today);
    info!(
        week = period.week_number,
        year = period.year,
        range = %period.date_range,
        filename = %period.filename,
        "computed reporting period"
    );
    log.period = Some(period.clone());
    log.phase = RunPhase::PeriodComputed;

    let documents = DocumentStore::new(ctx.root.join(&config.paths.digests_dir));
    if documents.exists(&period.filename) {
        info!(
            path = %documents.path_for(&period.filename).display(),
            "digest already exists, skipping"
        );
        log.phase = RunPhase::SkippedExisting;
        return Ok(RunStatus::SkippedExists);
    }

    let prompts = PromptEngine::with_overrides(&ctx.root.join(&config.paths.prompts_dir))?;
    let system_prompt = prompts.render_system(&period)?;
    let research = run_research_pass(ctx.client, ctx.sleeper, config, &system_prompt)
        .context("research pass")?;
    log.usage.research = Some(research.usage);
    log.research_turns = Some(research.turns);
    log.preamble_stripped_chars = Some(research.preamble_stripped);
    log.phase = RunPhase::Generated;

    let pre_review_errors = validate_header(&research.document, &period);
    if !pre_review_errors.is_empty() {
        warn!(errors = ?pre_review_errors, "header errors before review");
    }
    log.pre_review_errors = pre_review_errors;
    log.phase = RunPhase::PreValidated;

    info!(delay_secs = config.turn_delay_secs, "cooling down before review");
    ctx.sleeper.sleep(config.turn_delay());
    let review = run_review_pass(
        ctx.client,
        ctx.sleeper,
        config,
        &prompts,
        &research.document,
    )
    .context("review pass")?;
    log.usage.review = Some(review.usage);
    log.review_verdict = Some(review.verdict.label());
    log.phase = RunPhase::Reviewed;

    let errors = validate_header(&review.document, &period);
    if !errors.is_empty() {
        error!(errors = ?errors, "header validation failed after review");
        log.validation_errors = errors;
        return Ok(RunStatus::FailedValidation);
    }
    log.phase = RunPhase::PostValidated;

    let assets = AssetStore::new(ctx.root.join(&config.paths.images_dir), &config.images);
    let selected = select_image(&assets, &documents, &config.images.url_prefix)
        .unwrap_or_else(|err| {
            warn!(err = %format!("{err:#}"), "could not select header image");
            None
        });
    let document = match selected {
        Some(image) => {
            info!(image = %image, "selected header image");
            let document = inject_image(&review.document, &image);
            log.image = Some(image);
            document
        }
        None => {
            warn!(dir = %assets.dir().display(), "no header images available");
            review.document
        }
    };
    log.phase = RunPhase::ImageSelected;

    let path = documents.save(&period.filename, &document)?;
    log.document_path = Some(path);
    log.phase = RunPhase::Saved;
    Ok(RunStatus::Success)
}

/// Open an issue for runs that need a human.
fn escalate<X: Escalator + ?Sized>(escalator: &X, log: &RunLog) {
    match log.status {
        RunStatus::FailedValidation => {
            let Some(period) = &log.period else {
                return;
            };
            escalator.open_issue(
                &format!(
                    "[Agent] Digest validation failed — Week {}, {}",
                    period.week_number, period.year
                ),
                &validation_issue_body(period, &log.validation_errors),
            );
        }
        RunStatus::FailedException => {
            let target = log
                .period
                .as_ref()
                .map_or("unknown", |period| period.filename.as_str());
            escalator.open_issue(
                &format!("[Agent] Digest generation failed — {target}"),
                &format!(
                    "The research agent encountered an unhandled error.\n\n\
                     **Error:** `{}`\n\n\
                     **Traceback:**\n```\n{}\n```",
                    log.error.as_deref().unwrap_or_default(),
                    log.traceback.as_deref().unwrap_or_default()
                ),
            );
        }
        _ => {}
    }
}

fn validation_issue_body(period: &PeriodDescriptor, errors: &[String]) -> String {
    let listing =
        serde_json::to_string_pretty(errors).unwrap_or_else(|_| format!("{errors:?}"));
    format!(
        "The research agent produced a digest that failed validation after self-review.\n\n\
         **Errors:**\n```\n{listing}\n```\n\n\
         **Week:** {}, {}\n\
         **Date range:** {}",
        period.week_number, period.year, period.date_range
    )
}
