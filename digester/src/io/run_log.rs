//! Per-run JSON log, the durable record of every run's outcome.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::period::PeriodDescriptor;
use crate::core::types::{RunPhase, RunStatus, Usage};
use crate::core::verdict::VerdictLabel;

/// Token usage per pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Usage>,
}

/// Run log written to `<logs_dir>/run-<timestamp>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub status: RunStatus,
    /// Last phase the run reached.
    pub phase: RunPhase,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub model: String,
    pub period: Option<PeriodDescriptor>,
    pub usage: PhaseUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_turns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble_stripped_chars: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_review_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_verdict: Option<VerdictLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    pub elapsed_seconds: Option<f64>,
}

impl RunLog {
    pub fn new(model: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Unknown,
            phase: RunPhase::Init,
            started_at,
            finished_at: None,
            model: model.to_string(),
            period: None,
            usage: PhaseUsage::default(),
            research_turns: None,
            preamble_stripped_chars: None,
            pre_review_errors: Vec::new(),
            review_verdict: None,
            validation_errors: Vec::new(),
            image: None,
            document_path: None,
            error: None,
            traceback: None,
            elapsed_seconds: None,
        }
    }

    /// Stamp the terminal status and timing.
    pub fn finish(&mut self, status: RunStatus, finished_at: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(finished_at);
        let elapsed_ms = (finished_at - self.started_at).num_milliseconds().max(0);
        // One decimal place, like the console summary.
        self.elapsed_seconds = Some((elapsed_ms as f64 / 100.0).round() / 10.0);
    }
}

/// Log file path for a run started at `started_at`.
pub fn run_log_path(logs_dir: &Path, started_at: DateTime<Utc>) -> PathBuf {
    logs_dir.join(format!("run-{}.json", started_at.format("%Y%m%dT%H%M%SZ")))
}

/// Atomically write the run log (temp file + rename). Returns its path.
pub fn write_run_log(logs_dir: &Path, log: &RunLog) -> Result<PathBuf> {
    let path = run_log_path(logs_dir, log.started_at);
    debug!(path = %path.display(), status = ?log.status, "writing run log");
    let mut buf = serde_json::to_string_pretty(log).context("serialize run log")?;
    buf.push('\n');
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("create directory {}", logs_dir.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp run log {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("replace run log {}", path.display()))?;
    Ok(path)
}

pub fn load_run_log(path: &Path) -> Result<RunLog> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run log {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse run log {}", path.display()))
}
