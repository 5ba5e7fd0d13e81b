use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::domain::CancelToken;
use crate::error::PipelineError;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub enum TranscodeOutcome {
    Success,
    Cancelled,
}

/// Spawns and supervises a single transcoder child process, observing a
/// [`CancelToken`] at each poll interval while the child runs.
pub struct TranscodeRunner {
    binary: String,
    active_pid: Arc<AtomicU32>,
}

impl TranscodeRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        TranscodeRunner {
            binary: binary.into(),
            active_pid: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The OS pid of the currently running child, if any. Lets the caller
    /// correlate a `skip<key>` cancellation to the specific process it
    /// should terminate rather than matching by command-line substring.
    pub fn active_pid(&self) -> Option<u32> {
        match self.active_pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Runs the transcoder with `args`, writing its output to `output_path`.
    /// Returns `Ok(Success)` when the process exits 0 and `output_path`
    /// exists with nonzero size; `Ok(Cancelled)` if the token fired before
    /// exit; otherwise a [`PipelineError::TranscodeFailed`] carrying a
    /// truncated stderr excerpt.
    pub async fn run(
        &self,
        args: &[String],
        output_path: &Path,
        cancel: &CancelToken,
    ) -> Result<TranscodeOutcome, PipelineError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| PipelineError::Other(anyhow::anyhow!("failed to spawn {}: {err}", self.binary)))?;

        if let Some(pid) = child.id() {
            self.active_pid.store(pid, Ordering::SeqCst);
        }

        // Drained on a background task rather than after `child.wait()`
        // returns: a chatty child would otherwise fill the stderr pipe and
        // stall waiting for a reader that only shows up at exit.
        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf).await;
                buf
            })
        });

        let outcome = loop {
            if cancel.is_cancelled() {
                warn!(binary = %self.binary, "transcode cancelled, terminating child");
                let _ = child.kill().await;
                break TranscodeOutcome::Cancelled;
            }

            match tokio::time::timeout(CANCEL_POLL_INTERVAL, child.wait()).await {
                Ok(Ok(status)) => {
                    self.active_pid.store(0, Ordering::SeqCst);
                    let stderr_output = match stderr_task {
                        Some(task) => task.await.unwrap_or_default(),
                        None => String::new(),
                    };

                    if status.success() && output_exists_nonempty(output_path) {
                        info!(output = %output_path.display(), "transcode succeeded");
                        return Ok(TranscodeOutcome::Success);
                    }
                    return Err(PipelineError::TranscodeFailed {
                        stderr_excerpt: crate::error::truncate_chars(&stderr_output, 3500).to_string(),
                    });
                }
                Ok(Err(err)) => {
                    self.active_pid.store(0, Ordering::SeqCst);
                    return Err(PipelineError::Other(anyhow::anyhow!("waiting for child failed: {err}")));
                }
                Err(_timeout) => continue,
            }
        };

        self.active_pid.store(0, Ordering::SeqCst);
        Ok(outcome)
    }
}

fn output_exists_nonempty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_script(body: &str) -> Vec<String> {
        vec!["-c".to_string(), body.to_string()]
    }

    #[tokio::test]
    async fn success_requires_nonempty_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.bin");
        let runner = TranscodeRunner::new("sh");
        let cancel = CancelToken::new();
        let args = sh_script(&format!("printf hi > {}", output.display()));
        let outcome = runner.run(&args, &output, &cancel).await.unwrap();
        assert!(matches!(outcome, TranscodeOutcome::Success));
    }

    #[tokio::test]
    async fn nonzero_exit_is_transcode_failed_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing.bin");
        let runner = TranscodeRunner::new("sh");
        let cancel = CancelToken::new();
        let args = sh_script("echo boom 1>&2; exit 1");
        let err = runner.run(&args, &output, &cancel).await.unwrap_err();
        match err {
            PipelineError::TranscodeFailed { stderr_excerpt } => assert!(stderr_excerpt.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_before_exit_is_observed() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("never.bin");
        let runner = TranscodeRunner::new("sh");
        let cancel = CancelToken::new();
        let args = sh_script("sleep 5");
        cancel.cancel();
        let outcome = runner.run(&args, &output, &cancel).await.unwrap();
        assert!(matches!(outcome, TranscodeOutcome::Cancelled));
    }
}
