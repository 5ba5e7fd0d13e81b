//! Startup configuration, loaded once from the environment.
//!
//! Mirrors `bot/config.py`: a handful of required credentials, a pile of
//! defaulted tuning knobs, and an up-front hardware probe.

use std::path::PathBuf;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_id: i64,
    pub api_hash: String,
    pub bot_token: String,
    pub owner_ids: Vec<i64>,

    pub max_file_size_mib: u64,
    pub max_queue_size: usize,
    pub filename_template: String,
    pub auto_delete_original: bool,
    pub enable_hardware_acceleration: bool,
    pub progress_update_interval_secs: u64,

    pub default_codec: String,
    pub default_preset: String,
    pub default_qp: u32,
    pub default_scale_height: i32,
    pub default_fps: u32,
    pub default_audio_bitrate: String,

    pub watermark_text: String,
    pub watermark_position: String,

    pub enable_video_preview: bool,
    pub enable_screenshots: bool,
    pub screenshot_count: u32,

    pub thumbnail_url: String,
    pub telegraph_api: String,
    pub max_retries: u32,

    pub working_dir: PathBuf,
}

fn env_string(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn env_default(key: &'static str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_default<T: std::str::FromStr>(
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name: key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_bool_default(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name: key, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Parses `AppConfig` from the process environment. A missing required
    /// variable or an unparsable value for a defaulted one is a fatal
    /// `ConfigError` (the spec's `ConfigMissing` kind).
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_id: i64 = env_string("APP_ID")?
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "APP_ID",
                value: "non-integer".to_string(),
            })?;
        let api_hash = env_string("API_HASH")?;
        let bot_token = env_string("BOT_TOKEN")?;
        let owner_raw = env_string("OWNER")?;
        let owner_ids: Vec<i64> = owner_raw
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();

        Ok(AppConfig {
            app_id,
            api_hash,
            bot_token,
            owner_ids,
            max_file_size_mib: env_parse_default("MAX_FILE_SIZE", 4000)?,
            max_queue_size: env_parse_default("MAX_QUEUE_SIZE", 15)?,
            filename_template: env_default(
                "FILENAME_TEMPLATE",
                "{original_name} [{resolution} {codec}]",
            ),
            auto_delete_original: env_bool_default("AUTO_DELETE_ORIGINAL", false)?,
            enable_hardware_acceleration: env_bool_default(
                "ENABLE_HARDWARE_ACCELERATION",
                true,
            )?,
            progress_update_interval_secs: env_parse_default("PROGRESS_UPDATE_INTERVAL", 5)?,
            default_codec: env_default("V_CODEC", "libx264"),
            default_preset: env_default("V_PRESET", "medium"),
            default_qp: env_parse_default("V_QP", 26)?,
            default_scale_height: env_parse_default("V_SCALE", 1080)?,
            default_fps: env_parse_default("V_FPS", 30)?,
            default_audio_bitrate: env_default("A_BITRATE", "192k"),
            watermark_text: env_default("WATERMARK_TEXT", "Compressed by Bot"),
            watermark_position: env_default("WATERMARK_POSITION", "bottom-right"),
            enable_video_preview: env_bool_default("ENABLE_VIDEO_PREVIEW", true)?,
            enable_screenshots: env_bool_default("ENABLE_SCREENSHOTS", true)?,
            screenshot_count: env_parse_default("SCREENSHOT_COUNT", 5)?,
            thumbnail_url: env_default(
                "THUMBNAIL",
                "https://graph.org/file/75ee20ec8d8c8bba84f02.jpg",
            ),
            telegraph_api: env_default("TELEGRAPH_API", "https://api.telegra.ph"),
            max_retries: env_parse_default("MAX_RETRIES", 3)?,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        })
    }

    pub fn is_owner(&self, user_id: i64) -> bool {
        self.owner_ids.contains(&user_id)
    }
}
