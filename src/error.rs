//! Discriminated error types for the job pipeline.
//!
//! The original bot used exceptions as control flow, catching broadly at the
//! worker level. Here every stage returns a typed `Result` and the worker
//! only needs to match on [`PipelineError`] to decide how to report and clean
//! up, per the taxonomy in the design doc.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal startup configuration error. Any variant here aborts the process
/// with exit code 1 after logging at `error!` (the spec's `CRITICAL`).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for environment variable {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Reasons a job submission is rejected without mutating any state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("queue is full (max {max})")]
    QueueFull { max: usize },
    #[error("already in the queue")]
    Duplicate,
}

/// Stage-level pipeline failures. Stages 1-3 are fatal to the job; stage 4
/// failures are swallowed by the caller and never constructed as this type
/// escaping the artifact generator; stage 5 surfaces; stage 6 is logged only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid path: {0}")]
    PathInvalid(PathBuf),

    #[error("file too large: {actual_mb:.2} MB > {limit_mb} MB")]
    SizeExceeded { actual_mb: f64, limit_mb: u64 },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("compression error\n{stderr_excerpt}")]
    TranscodeFailed { stderr_excerpt: String },

    #[error("cancelled")]
    Cancelled,

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// User-facing message, truncated the way the original bot truncates
    /// ffmpeg stderr to roughly 3,500 bytes.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::TranscodeFailed { stderr_excerpt } => {
                format!("COMPRESSION ERROR\n{}", truncate_chars(stderr_excerpt, 3500))
            }
            other => other.to_string(),
        }
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
