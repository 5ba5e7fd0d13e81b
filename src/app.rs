//! Application wiring: assembles every long-lived service into a single
//! [`PipelineContext`] the worker loop and chat-event handlers share.
//!
//! Grounded in `alchemist`'s `run()` (config → hardware detection → shared
//! state → background task spawn), adapted to this engine's settings/queue
//! split rather than a single database.

use std::sync::Arc;

use tracing::info;

use crate::callback_registry::CallbackRegistry;
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::guard::PathGuard;
use crate::pipeline::PipelineContext;
use crate::progress::ProgressReporter;
use crate::queue::Queue;
use crate::settings::SettingsStore;
use crate::transcode::TranscodeRunner;
use crate::transport::ChatTransport;

/// Sent on every outbound download request; some hosts reject bare
/// `reqwest` clients with no `User-Agent` at all.
const DOWNLOAD_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Builds the shared [`PipelineContext`] for a process run: loads
/// configuration from the environment, loads (or initializes) settings,
/// probes for a hardware encoder, and ensures the managed directory tree
/// exists before anything else touches the filesystem.
pub async fn bootstrap(
    transport: Arc<dyn ChatTransport>,
) -> Result<Arc<PipelineContext>, ConfigError> {
    let config = Arc::new(AppConfig::from_env()?);

    let guard = Arc::new(PathGuard::new(config.working_dir.clone()));
    guard
        .ensure_managed_dirs()
        .await
        .map_err(|_| ConfigError::Invalid {
            name: "working_dir",
            value: config.working_dir.display().to_string(),
        })?;

    let settings = Arc::new(SettingsStore::load(&config.working_dir).map_err(|_| {
        ConfigError::Invalid {
            name: "settings_path",
            value: config.working_dir.display().to_string(),
        }
    })?);

    let engine = crate::settings::detect_engine(config.enable_hardware_acceleration).await;
    settings.set_engine(engine);
    info!(engine = engine.label(), "hardware engine selected");

    let http = reqwest::Client::builder()
        .user_agent(DOWNLOAD_USER_AGENT)
        .build()
        .map_err(|_| ConfigError::Invalid { name: "http_client", value: DOWNLOAD_USER_AGENT.to_string() })?;

    let ctx = PipelineContext {
        config: config.clone(),
        settings,
        queue: Arc::new(Queue::new(config.max_queue_size)),
        callbacks: Arc::new(CallbackRegistry::new()),
        reporter: Arc::new(ProgressReporter::new(std::time::Duration::from_secs(
            config.progress_update_interval_secs,
        ))),
        transcoder: Arc::new(TranscodeRunner::new("ffmpeg")),
        guard,
        transport,
        http,
    };

    info!(
        working_dir = %ctx.config.working_dir.display(),
        filename_template = %ctx.config.filename_template,
        default_codec = %ctx.config.default_codec,
        default_preset = %ctx.config.default_preset,
        default_qp = ctx.config.default_qp,
        default_scale_height = ctx.config.default_scale_height,
        "application configured"
    );

    Ok(Arc::new(ctx))
}
