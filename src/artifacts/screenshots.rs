use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use super::probe::probe_duration_secs;
use crate::command_builder::build_frame_extract_args;
use crate::settings::PreviewSettings;

const SCREENSHOT_WIDTH: u32 = 1280;
const SCREENSHOT_HEIGHT: u32 = 720;

/// Generates `screenshot_count` stills, one from the middle of each of
/// `screenshot_count` equal slices of the middle 90% of the source,
/// matching `generate_screenshots` in the original bot.
pub async fn generate_screenshots(video_path: &Path, working_dir: &Path, settings: &PreviewSettings) -> Vec<PathBuf> {
    let count = settings.screenshot_count.max(1) as usize;

    let duration = match probe_duration_secs(video_path).await {
        Ok(d) => d,
        Err(err) => {
            warn!(%err, "failed to probe duration for screenshots");
            return Vec::new();
        }
    };

    let (start_offset, usable_duration) = {
        let start = duration * 0.05;
        let end = duration * 0.95;
        let usable = end - start;
        if usable <= 0.0 { (0.0, duration) } else { (start, usable) }
    };

    let interval = usable_duration / count as f64;
    let encode_dir = working_dir.join("encode");
    if tokio::fs::create_dir_all(&encode_dir).await.is_err() {
        return Vec::new();
    }

    let mut screenshots = Vec::new();
    for i in 0..count {
        let timestamp = start_offset + interval * i as f64 + interval / 2.0;
        let path = encode_dir.join(format!("screenshot_{}.jpg", i + 1));
        let args = build_frame_extract_args(video_path, &path, timestamp, SCREENSHOT_WIDTH, SCREENSHOT_HEIGHT);

        let result = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() && path.exists() => {
                info!(path = %path.display(), "screenshot generated");
                screenshots.push(path);
            }
            Ok(output) => warn!(
                index = i,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "screenshot generation failed"
            ),
            Err(err) => warn!(%err, index = i, "failed to spawn ffmpeg for screenshot"),
        }
    }

    screenshots
}
