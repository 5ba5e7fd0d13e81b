//! Pipeline Controller: drives one Job through prepare → download →
//! transcode → artifacts → upload → report → cleanup.

mod download;
pub mod report;
mod upload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{info, warn};

use crate::artifacts::{self, Artifacts};
use crate::callback_registry::{CallbackRegistry, SkipPayload};
use crate::command_builder::{self, TranscodeOptions};
use crate::config::AppConfig;
use crate::domain::{Job, JobPayload, RunStats};
use crate::error::PipelineError;
use crate::guard::PathGuard;
use crate::progress::{ProgressReporter, human_bytes};
use crate::queue::Queue;
use crate::settings::SettingsStore;
use crate::transcode::{TranscodeOutcome, TranscodeRunner};
use crate::transport::ChatTransport;

pub struct PipelineContext {
    pub config: Arc<AppConfig>,
    pub settings: Arc<SettingsStore>,
    pub queue: Arc<Queue>,
    pub callbacks: Arc<CallbackRegistry>,
    pub reporter: Arc<ProgressReporter>,
    pub transcoder: Arc<TranscodeRunner>,
    pub guard: Arc<PathGuard>,
    pub transport: Arc<dyn ChatTransport>,
    pub http: reqwest::Client,
}

/// Renders the configured filename template, matching the original's
/// `{original_name}`/`{preset}`/`{resolution}`/`{codec}`/`{date}`/`{time}`
/// placeholders.
fn render_filename(template: &str, original_stem: &str, preset: &str, scale_height: i32, codec: &str) -> String {
    let resolution = if scale_height > 0 {
        format!("{scale_height}p")
    } else {
        "source".to_string()
    };
    let codec_label = codec.replace("_nvenc", "").replace("lib", "");
    let now = Local::now();
    let rendered = template
        .replace("{original_name}", original_stem)
        .replace("{preset}", preset)
        .replace("{resolution}", &resolution)
        .replace("{codec}", &codec_label)
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{time}", &now.format("%H-%M-%S").to_string());
    rendered
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Runs `job` to completion. Always clears the job's queue slot on return,
/// regardless of outcome.
pub async fn run_job(ctx: &PipelineContext, job: Job) {
    let result = run_job_inner(ctx, &job).await;
    ctx.queue.finish(&job.dedupe_key);
    ctx.reporter.forget(&job.origin.status);

    if let Err(err) = result {
        warn!(seq = job.seq, %err, "job failed");
        let _ = ctx
            .transport
            .edit_status(&job.origin.status, &err.user_message())
            .await;
    }
}

async fn run_job_inner(ctx: &PipelineContext, job: &Job) -> Result<(), PipelineError> {
    let user_id = job.origin.user_id;
    ctx.guard.ensure_managed_dirs().await.map_err(|e| PipelineError::Other(e.into()))?;

    // 1. Prepare (Upload's destination is known up front; a Link's is only
    // settled once the response headers, possibly carrying a
    // Content-Disposition filename, arrive in the Download stage below).
    let mut input_path = match &job.payload {
        JobPayload::Upload { suggested_name, .. } => {
            let path = ctx.guard.managed_dir("downloads").join(download::sanitize_filename(
                suggested_name.as_deref().unwrap_or("upload.bin"),
            ));
            if !ctx.guard.validate_path(&path) {
                return Err(PipelineError::PathInvalid(path));
            }
            path
        }
        JobPayload::Link { .. } => PathBuf::new(),
    };

    // 2. Download
    let download_started = Instant::now();
    let downloaded_bytes = match &job.payload {
        JobPayload::Upload { locator, .. } => {
            download::download_upload(ctx.transport.as_ref(), locator, &input_path).await?
        }
        JobPayload::Link { url, suggested_name } => {
            let (resolved_path, bytes) = download::download_link(
                &ctx.http,
                url,
                &ctx.guard.managed_dir("downloads"),
                suggested_name.as_deref(),
                ctx.config.max_file_size_mib,
                &ctx.reporter,
                ctx.transport.as_ref(),
                &job.origin.status,
                ctx.settings.engine().label(),
                ctx.guard.as_ref(),
            )
            .await?;
            input_path = resolved_path;
            bytes
        }
    };
    let download_ms = download_started.elapsed().as_millis() as u64;

    // 3. Transcode
    let mut profile = ctx.settings.active_profile(Some(user_id));
    profile.apply_overrides(&job.overrides);

    let output_settings = ctx.settings.output_settings();
    let original_stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let active_preset_label = if profile.is_hardware_codec() { "custom" } else { profile.speed_preset.as_str() };
    let filename = render_filename(
        &output_settings.filename_template,
        &original_stem,
        active_preset_label,
        profile.scale_height,
        &profile.codec,
    );
    let output_path = ctx.guard.managed_dir("encode").join(format!("{filename}.mp4"));
    if !ctx.guard.validate_path(&output_path) {
        return Err(PipelineError::PathInvalid(output_path));
    }
    tokio::fs::create_dir_all(ctx.guard.managed_dir("encode"))
        .await
        .map_err(|e| PipelineError::Other(e.into()))?;

    let skip_key = ctx.callbacks.register(SkipPayload {
        output_path: output_path.display().to_string(),
        input_path: input_path.display().to_string(),
        job_seq: job.seq,
    });
    info!(seq = job.seq, skip_key, "transcode starting");

    let advanced = ctx.settings.advanced_settings();
    let watermark_enabled = ctx.settings.watermark_enabled(Some(user_id));
    let opts = TranscodeOptions {
        engine: ctx.settings.engine(),
        watermark_enabled,
        watermark_text: &advanced.watermark_text,
        watermark_position: &advanced.watermark_position,
    };
    let args = command_builder::build_transcode_args(&profile, &input_path, &output_path, &opts);

    let transcode_started = Instant::now();
    let outcome = ctx.transcoder.run(&args, &output_path, &job.cancel).await;
    let compress_ms = transcode_started.elapsed().as_millis() as u64;
    ctx.callbacks.forget(&skip_key);

    match outcome {
        Ok(TranscodeOutcome::Success) => {}
        Ok(TranscodeOutcome::Cancelled) => {
            // A user-initiated cancel drops both the downloaded input and the
            // partial output, independent of `auto_delete_original`.
            cleanup(ctx, &input_path, &output_path, true).await;
            return Err(PipelineError::Cancelled);
        }
        Err(err) => {
            cleanup(ctx, &input_path, &output_path, false).await;
            return Err(err);
        }
    }

    // 4. Artifacts (best-effort)
    let preview_settings = ctx.settings.preview_settings();
    let thumbnail_settings = ctx.settings.thumbnail_settings();
    let mut generated = Artifacts::default();
    generated.thumbnail = artifacts::generate_thumbnail(&output_path, &ctx.guard.managed_dir("encode"), &thumbnail_settings).await;
    if preview_settings.enable_video_preview {
        generated.preview = artifacts::generate_preview(&output_path, &ctx.config.working_dir, &preview_settings).await;
    }
    if preview_settings.enable_screenshots {
        generated.screenshots = artifacts::generate_screenshots(&output_path, &ctx.config.working_dir, &preview_settings).await;
    }

    // 5. Upload
    let upload_started = Instant::now();
    let duration = artifacts::probe_duration_secs(&output_path).await.ok();
    let caption = match duration {
        Some(secs) => format!("{filename}.mp4\nDuration: {}:{:02}", secs as u64 / 60, secs as u64 % 60),
        None => format!("{filename}.mp4"),
    };
    upload::upload_result(
        ctx.transport.as_ref(),
        job.origin.chat_id,
        &output_path,
        &caption,
        Some(&job.origin.status),
        &generated,
    )
    .await?;
    let upload_ms = upload_started.elapsed().as_millis() as u64;

    // 6. Report (non-fatal)
    let compressed_bytes = tokio::fs::metadata(&output_path).await.map(|m| m.len()).unwrap_or(0);
    let links = report::build_media_info_links(
        &ctx.http,
        &ctx.config.telegraph_api,
        "",
        &input_path,
        &output_path,
    )
    .await;

    let stats = RunStats {
        original_bytes: downloaded_bytes,
        compressed_bytes,
        download_ms,
        compress_ms,
        upload_ms,
        engine_label: ctx.settings.engine().label().to_string(),
    };
    let summary = render_summary(&stats, &links);
    if let Err(err) = ctx.transport.send_status(job.origin.chat_id, &summary).await {
        warn!(%err, "failed to send completion report");
    }

    // 7. Cleanup
    cleanup(ctx, &input_path, &output_path, output_settings.auto_delete_original).await;

    Ok(())
}

fn render_summary(stats: &RunStats, links: &report::MediaInfoLinks) -> String {
    let mut text = format!(
        "COMPRESSION COMPLETE\n\nOriginal: {}\nCompressed: {} ({:.2}% reduction)\n\nDownload: {}ms\nCompress: {}ms\nUpload: {}ms\nEngine: {}\n",
        human_bytes(stats.original_bytes as f64),
        human_bytes(stats.compressed_bytes as f64),
        stats.reduction_percent(),
        stats.download_ms,
        stats.compress_ms,
        stats.upload_ms,
        stats.engine_label,
    );
    if let (Some(before), Some(after)) = (&links.before_url, &links.after_url) {
        text.push_str(&format!("\nMediaInfo: before={before} after={after}\n"));
    }
    text
}

/// Deletes the output file unconditionally, and the original input only
/// when `auto_delete_original` is set, exactly as the original's `finally`
/// block does. Both deletions are gated by [`PathGuard::validate_path`].
async fn cleanup(ctx: &PipelineContext, input_path: &PathBuf, output_path: &PathBuf, delete_original: bool) {
    if output_path.exists() && ctx.guard.validate_path(output_path) {
        let _ = tokio::fs::remove_file(output_path).await;
    }
    if delete_original && input_path.exists() && ctx.guard.validate_path(input_path) {
        let _ = tokio::fs::remove_file(input_path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_filename_substitutes_placeholders_and_strips_unsafe_chars() {
        let name = render_filename("{original_name} [{resolution} {codec}]", "clip", "balanced", 1080, "libx264");
        assert_eq!(name, "clip [1080p x264]");
    }

    #[test]
    fn render_filename_uses_source_for_disabled_scale() {
        let name = render_filename("{resolution}", "clip", "balanced", -1, "libx264");
        assert_eq!(name, "source");
    }
}
