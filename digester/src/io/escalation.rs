//! Failure escalation by opening a tracker issue.

use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::io::config::EscalationConfig;
use crate::io::process::run_command_with_timeout;

const OUTPUT_LIMIT_BYTES: usize = 16 * 1024;

/// Opens an issue describing a failed run.
///
/// Implementations never fail: escalation problems are logged and dropped so
/// they cannot mask the run's own outcome.
pub trait Escalator {
    fn open_issue(&self, title: &str, body: &str);
}

/// Opens issues with the `gh` command line tool.
#[derive(Debug, Clone)]
pub struct GhIssueEscalator {
    program: String,
    label: String,
    timeout: Duration,
}

impl GhIssueEscalator {
    pub fn new(config: &EscalationConfig) -> Self {
        Self {
            program: "gh".to_string(),
            label: config.label.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Use a different executable in place of `gh`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, title: &str, body: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["issue", "create", "--title", title, "--body", body, "--label"])
            .arg(&self.label);
        cmd
    }
}

impl Escalator for GhIssueEscalator {
    #[instrument(skip_all, fields(title = %title))]
    fn open_issue(&self, title: &str, body: &str) {
        let output = match run_command_with_timeout(
            self.command(title, body),
            self.timeout,
            OUTPUT_LIMIT_BYTES,
        ) {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "could not open issue");
                return;
            }
        };
        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "issue creation timed out");
        } else if !output.status.success() {
            warn!(
                exit_code = ?output.status.code(),
                stderr = %output.stderr_lossy(),
                "issue creation failed"
            );
        } else {
            info!(url = %output.stdout_lossy(), "opened issue");
        }
    }
}

/// Escalator used when escalation is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEscalator;

impl Escalator for NoopEscalator {
    fn open_issue(&self, title: &str, _body: &str) {
        info!(title, "escalation disabled, not opening issue");
    }
}

impl<E: Escalator + ?Sized> Escalator for &E {
    fn open_issue(&self, title: &str, body: &str) {
        (**self).open_issue(title, body);
    }
}
