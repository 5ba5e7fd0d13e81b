use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use super::probe::probe_duration_secs;
use crate::command_builder::{build_clip_extract_args, build_concat_args};
use crate::settings::PreviewSettings;

/// Generates a stitched preview reel from 3-8 clips spread across the
/// middle 90% of the source, matching `generate_preview` in the original
/// bot. Every intermediate clip and the concat manifest are removed before
/// returning, on every exit path.
pub async fn generate_preview(
    video_path: &Path,
    working_dir: &Path,
    settings: &PreviewSettings,
) -> Option<PathBuf> {
    let stem = video_path.file_stem()?.to_string_lossy().into_owned();
    let preview_output = working_dir.join("encode").join(format!("{stem}_preview.mp4"));
    let temp_dir = working_dir.join("temp").join("preview_clips");

    if tokio::fs::create_dir_all(&temp_dir).await.is_err() {
        return None;
    }

    let duration = match probe_duration_secs(video_path).await {
        Ok(d) => d,
        Err(err) => {
            warn!(%err, "failed to probe duration for preview");
            let _ = tokio::fs::remove_dir_all(&temp_dir).await;
            return None;
        }
    };

    let num_clips = ((duration / 120.0).floor() as i64).clamp(3, 8) as usize;
    let clip_duration = settings.preview_duration_secs as f64 / num_clips as f64;

    let usable_duration = duration * 0.9;
    let start_offset = duration * 0.05;

    let mut clip_starts = Vec::with_capacity(num_clips);
    for i in 0..num_clips {
        let position = if num_clips > 1 {
            start_offset + (i as f64 * usable_duration / (num_clips - 1) as f64)
        } else {
            start_offset + usable_duration / 2.0
        };
        clip_starts.push(position.min(duration - clip_duration - 1.0).max(0.0));
    }

    let mut clip_files = Vec::new();
    for (i, start) in clip_starts.iter().enumerate() {
        let clip_path = temp_dir.join(format!("clip_{i:02}.mp4"));
        let args = build_clip_extract_args(video_path, &clip_path, *start, clip_duration, settings.preview_quality_crf);
        let result = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;
        match result {
            Ok(output) if output.status.success() && clip_path.exists() => {
                clip_files.push(clip_path);
            }
            Ok(output) => warn!(
                clip = i,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "preview clip generation failed"
            ),
            Err(err) => warn!(%err, clip = i, "failed to spawn ffmpeg for preview clip"),
        }
    }

    if clip_files.is_empty() {
        let _ = tokio::fs::remove_dir_all(&temp_dir).await;
        return None;
    }

    let concat_list = temp_dir.join("concat_list.txt");
    let manifest = clip_files
        .iter()
        .map(|p| format!("file '{}'\n", p.canonicalize().unwrap_or_else(|_| p.clone()).display()))
        .collect::<String>();
    if tokio::fs::write(&concat_list, manifest).await.is_err() {
        let _ = tokio::fs::remove_dir_all(&temp_dir).await;
        return None;
    }

    if let Some(parent) = preview_output.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    let concat_args = build_concat_args(&concat_list, &preview_output);
    let result = Command::new("ffmpeg")
        .args(&concat_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let _ = tokio::fs::remove_dir_all(&temp_dir).await;

    match result {
        Ok(output) if output.status.success() && preview_output.exists() => {
            info!(path = %preview_output.display(), "preview reel generated");
            Some(preview_output)
        }
        Ok(output) => {
            warn!(stderr = %String::from_utf8_lossy(&output.stderr), "preview concat failed");
            None
        }
        Err(err) => {
            warn!(%err, "failed to spawn ffmpeg for preview concat");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_source_video_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PreviewSettings::default();
        let result = generate_preview(Path::new("/nonexistent/source.mp4"), dir.path(), &settings).await;
        assert!(result.is_none());
    }
}
