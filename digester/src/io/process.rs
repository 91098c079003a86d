//! Child process execution with a timeout and bounded output capture.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Run a command, killing it after `timeout`.
///
/// Pipes are drained on reader threads while the child runs. At most
/// `output_limit_bytes` of each stream is kept; the rest is counted and dropped.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|err| {
        error!(err = %err, "failed to spawn command");
        anyhow!(err).context("spawn command")
    })?;

    let stdout = spawn_drain(child.stdout.take(), output_limit_bytes, "stdout")?;
    let stderr = spawn_drain(child.stderr.take(), output_limit_bytes, "stderr")?;

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            (child.wait().context("wait command after kill")?, true)
        }
    };

    let stdout = stdout.finish().context("join stdout")?;
    let stderr = stderr.finish().context("join stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "output truncated"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout: stdout.kept,
        stderr: stderr.kept,
        stdout_truncated: stdout.dropped,
        stderr_truncated: stderr.dropped,
        timed_out,
    })
}

/// Bytes read from one pipe.
struct Drained {
    kept: Vec<u8>,
    dropped: usize,
}

struct DrainHandle(thread::JoinHandle<Result<Drained>>);

impl DrainHandle {
    fn finish(self) -> Result<Drained> {
        self.0
            .join()
            .map_err(|_| anyhow!("output reader thread panicked"))?
    }
}

fn spawn_drain<R>(pipe: Option<R>, limit: usize, name: &str) -> Result<DrainHandle>
where
    R: Read + Send + 'static,
{
    let pipe = pipe.ok_or_else(|| anyhow!("{name} was not piped"))?;
    Ok(DrainHandle(thread::spawn(move || drain(pipe, limit))))
}

fn drain<R: Read>(mut reader: R, limit: usize) -> Result<Drained> {
    let mut out = Drained {
        kept: Vec::new(),
        dropped: 0,
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(out);
        }
        let keep = n.min(limit.saturating_sub(out.kept.len()));
        out.kept.extend_from_slice(&chunk[..keep]);
        out.dropped += n - keep;
    }
}
