use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use super::probe::probe_duration_secs;
use crate::command_builder::build_frame_extract_args;
use crate::settings::ThumbnailSettings;

const MAX_DIMENSION: u32 = 320;

/// Produces a Telegram-sized thumbnail (`working_dir/thumb.jpg`).
///
/// If a custom URL is configured, it is fetched first; any failure there
/// (network error, non-200 status) falls through to auto-generation from the
/// video itself rather than giving up on a thumbnail entirely.
pub async fn generate_thumbnail(
    video_path: &Path,
    working_dir: &Path,
    settings: &ThumbnailSettings,
) -> Option<PathBuf> {
    let thumb_path = working_dir.join("thumb.jpg");

    if !settings.custom_url.is_empty() {
        match fetch_custom_thumbnail(&settings.custom_url, &thumb_path).await {
            Ok(()) => {
                info!(path = %thumb_path.display(), "custom thumbnail downloaded");
                return Some(thumb_path);
            }
            Err(err) => warn!(%err, "custom thumbnail download failed, falling back to auto-generation"),
        }
    }

    if !settings.auto_generate && settings.custom_url.is_empty() {
        return None;
    }

    let duration = match probe_duration_secs(video_path).await {
        Ok(d) => d,
        Err(err) => {
            warn!(%err, "failed to probe duration for thumbnail");
            return None;
        }
    };

    let timestamp = (settings.timestamp_secs as f64).min((duration - 1.0).max(0.0));
    let args = build_frame_extract_args(video_path, &thumb_path, timestamp, MAX_DIMENSION, MAX_DIMENSION);

    match Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
    {
        Ok(output) if output.status.success() && thumb_path.exists() => {
            info!(path = %thumb_path.display(), "thumbnail generated");
            Some(thumb_path)
        }
        Ok(output) => {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "thumbnail generation failed"
            );
            None
        }
        Err(err) => {
            warn!(%err, "failed to spawn ffmpeg for thumbnail");
            None
        }
    }
}

async fn fetch_custom_thumbnail(url: &str, dest: &Path) -> anyhow::Result<()> {
    let bytes = reqwest::get(url).await?.error_for_status()?.bytes().await?;
    tokio::fs::write(dest, &bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_and_no_custom_url_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ThumbnailSettings {
            custom_url: String::new(),
            auto_generate: false,
            timestamp_secs: 10,
        };
        let result = generate_thumbnail(Path::new("missing.mp4"), dir.path(), &settings).await;
        assert!(result.is_none());
    }
}
