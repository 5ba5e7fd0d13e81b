//! Chat transport boundary.
//!
//! The concrete chat platform (whichever messenger fronts the engine) lives
//! outside this crate entirely. Everything the pipeline needs from it —
//! sending/editing a status message, downloading an attachment, uploading a
//! result — is expressed here as a trait plus a couple of opaque handles, so
//! the worker loop and pipeline stages never import a platform SDK directly.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of a status-message edit, structured so the Progress Reporter can
/// apply the flood-wait/no-op rules itself instead of treating every failure
/// the same way.
#[derive(Debug, Error)]
pub enum EditStatusError {
    /// The platform asked the caller to back off for `retry_after` before
    /// trying again (a Telegram-style `FLOOD_WAIT_N`, an HTTP `Retry-After`,
    /// etc).
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    /// The edit would have been a no-op (identical text), or the message no
    /// longer exists to edit. Neither is worth logging or retrying.
    #[error("edit was a no-op or the message is gone")]
    Swallowed,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// An opaque reference to a single chat message the pipeline owns and edits
/// in place for progress reporting. Cloneable and cheap: concrete
/// implementations typically wrap a `(chat_id, message_id)` pair behind an
/// `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusHandle(pub String);

impl fmt::Display for StatusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the pipeline asks of the surrounding chat platform.
///
/// Implementations are expected to be internally retrying/rate-limit-aware
/// (the spec's flood-wait handling); this trait's contract is "eventually
/// succeeds or returns `Err`", not "succeeds on the first call".
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Posts a new status message, returning a handle the caller edits for
    /// the remainder of the job.
    async fn send_status(&self, chat_id: i64, text: &str) -> anyhow::Result<StatusHandle>;

    /// Replaces the text of a previously sent status message. Implementations
    /// should report a no-op edit or a since-deleted message as
    /// [`EditStatusError::Swallowed`], and a platform rate limit as
    /// [`EditStatusError::RateLimited`], since the Progress Reporter handles
    /// both of those specially rather than treating them as hard failures.
    async fn edit_status(&self, handle: &StatusHandle, text: &str) -> Result<(), EditStatusError>;

    /// Downloads the file backing an `Upload` payload to `dest`.
    async fn download_to(&self, locator: &str, dest: &Path) -> anyhow::Result<u64>;

    /// Uploads `path` as a document/video to the job's origin chat, replying
    /// to the status message where supported. `thumbnail` is attached as the
    /// video's cover image when the platform supports it; implementations
    /// that don't may ignore it.
    async fn upload_file(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
        thumbnail: Option<&Path>,
        reply_to: Option<&StatusHandle>,
    ) -> anyhow::Result<()>;

    /// Deletes a status message once a job is fully wrapped up (success or
    /// failure report already sent as a separate message).
    async fn delete_status(&self, handle: &StatusHandle) -> anyhow::Result<()>;
}
