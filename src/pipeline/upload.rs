use std::path::Path;

use tracing::{info, warn};

use crate::artifacts::Artifacts;
use crate::error::PipelineError;
use crate::transport::{ChatTransport, StatusHandle};

/// Uploads the compressed output, then the preview reel and screenshots as
/// follow-up messages, matching `upload_compressed_file`'s ordering. Preview
/// and screenshot files are removed once sent (or once sending fails) since
/// they live in the managed `encode/` tree and would otherwise wait for the
/// hourly sweeper.
pub async fn upload_result(
    transport: &dyn ChatTransport,
    chat_id: i64,
    output_path: &Path,
    caption: &str,
    reply_to: Option<&StatusHandle>,
    artifacts: &Artifacts,
) -> Result<(), PipelineError> {
    transport
        .upload_file(chat_id, output_path, caption, artifacts.thumbnail.as_deref(), reply_to)
        .await
        .map_err(|err| PipelineError::UploadFailed(err.to_string()))?;
    if let Some(thumbnail) = &artifacts.thumbnail {
        let _ = tokio::fs::remove_file(thumbnail).await;
    }

    if let Some(preview) = &artifacts.preview {
        if let Err(err) = transport.upload_file(chat_id, preview, "Video Preview", None, None).await {
            warn!(%err, "preview upload failed");
        }
        let _ = tokio::fs::remove_file(preview).await;
    }

    for screenshot in &artifacts.screenshots {
        if let Err(err) = transport.upload_file(chat_id, screenshot, "Screenshot", None, None).await {
            warn!(%err, "screenshot upload failed");
        }
    }
    for screenshot in &artifacts.screenshots {
        let _ = tokio::fs::remove_file(screenshot).await;
    }

    info!(output = %output_path.display(), "upload complete");
    Ok(())
}
