use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::EncodeProfile;

/// The codec/preset/qp/scale identity of a named preset. Everything else an
/// `EncodeProfile` needs (container profile/level, fps, audio bitrate,
/// hardware toggle) comes from `custom_compression`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetCore {
    pub codec: String,
    pub speed_preset: String,
    pub quality_qp: u32,
    pub scale_height: i32,
}

pub fn default_presets() -> BTreeMap<String, PresetCore> {
    let entries: [(&str, &str, &str, u32, i32); 8] = [
        ("ultra_fast", "libx264", "ultrafast", 35, 720),
        ("fast", "libx264", "fast", 28, 1080),
        ("balanced", "libx264", "medium", 26, 1080),
        ("quality", "libx264", "slow", 22, 1080),
        ("high_quality", "libx264", "veryslow", 18, 1080),
        ("nvidia_fast", "h264_nvenc", "p1", 28, 1080),
        ("nvidia_balanced", "h264_nvenc", "p3", 26, 1080),
        ("nvidia_quality", "h264_nvenc", "p6", 22, 1080),
    ];
    entries
        .into_iter()
        .map(|(name, codec, preset, qp, scale)| {
            (
                name.to_string(),
                PresetCore {
                    codec: codec.to_string(),
                    speed_preset: preset.to_string(),
                    quality_qp: qp,
                    scale_height: scale,
                },
            )
        })
        .collect()
}

pub fn preset_description(name: &str) -> String {
    match name {
        "ultra_fast" => "Ultra Fast - fastest compression, larger file size".to_string(),
        "fast" => "Fast - quick compression, good quality".to_string(),
        "balanced" => "Balanced - good balance of speed and quality".to_string(),
        "quality" => "Quality - better quality, slower compression".to_string(),
        "high_quality" => "High Quality - best quality, slowest compression".to_string(),
        "nvidia_fast" => "NVIDIA Fast - hardware accelerated, fast".to_string(),
        "nvidia_balanced" => "NVIDIA Balanced - hardware accelerated, balanced".to_string(),
        "nvidia_quality" => "NVIDIA Quality - hardware accelerated, high quality".to_string(),
        "custom" => "Custom - user-defined settings".to_string(),
        other => format!("{other}"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub filename_template: String,
    pub auto_delete_original: bool,
    pub max_file_size: u64,
    pub max_queue_size: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            filename_template: "{original_name} [{resolution} {codec}]".to_string(),
            auto_delete_original: false,
            max_file_size: 4000,
            max_queue_size: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    pub enable_screenshots: bool,
    pub screenshot_count: u32,
    pub enable_video_preview: bool,
    /// Total duration, in seconds, of the stitched preview reel.
    pub preview_duration_secs: u32,
    /// CRF used for preview/screenshot clips (a software x264 value
    /// regardless of the active transcode codec).
    pub preview_quality_crf: u32,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        PreviewSettings {
            enable_screenshots: true,
            screenshot_count: 5,
            enable_video_preview: true,
            preview_duration_secs: 10,
            preview_quality_crf: 28,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    pub watermark_enabled: bool,
    pub watermark_text: String,
    pub watermark_position: String,
    pub progress_update_interval: u64,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        AdvancedSettings {
            watermark_enabled: false,
            watermark_text: "Compressed by Bot".to_string(),
            watermark_position: "bottom-right".to_string(),
            progress_update_interval: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailSettings {
    pub custom_url: String,
    pub auto_generate: bool,
    /// Preferred capture point, in seconds from the start of the video.
    pub timestamp_secs: u32,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        ThumbnailSettings {
            custom_url: String::new(),
            auto_generate: true,
            timestamp_secs: 10,
        }
    }
}

/// The full global settings document, persisted to `bot_settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDocument {
    pub compression_presets: BTreeMap<String, PresetCore>,
    pub active_preset: String,
    pub custom_compression: EncodeProfile,
    pub output: OutputSettings,
    pub preview: PreviewSettings,
    pub advanced: AdvancedSettings,
    pub thumbnail: ThumbnailSettings,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        SettingsDocument {
            compression_presets: default_presets(),
            active_preset: "balanced".to_string(),
            custom_compression: EncodeProfile {
                codec: "libx264".to_string(),
                speed_preset: "medium".to_string(),
                profile: "high".to_string(),
                level: "4.0".to_string(),
                quality_qp: 26,
                scale_height: 1080,
                fps: 30,
                audio_bitrate: "192k".to_string(),
                hardware_accel_enabled: false,
            },
            output: OutputSettings::default(),
            preview: PreviewSettings::default(),
            advanced: AdvancedSettings::default(),
            thumbnail: ThumbnailSettings::default(),
        }
    }
}

impl SettingsDocument {
    /// Deep-merges a loaded document over defaults so a settings file from
    /// an older version still picks up newly introduced fields. Presets
    /// loaded from disk are merged by name; anything missing falls back to
    /// the built-in table rather than disappearing.
    pub fn merged_with_defaults(loaded: SettingsDocument) -> SettingsDocument {
        let mut merged = SettingsDocument::default();
        for (name, preset) in loaded.compression_presets {
            merged.compression_presets.insert(name, preset);
        }
        merged.active_preset = loaded.active_preset;
        merged.custom_compression = loaded.custom_compression;
        merged.output = loaded.output;
        merged.preview = loaded.preview;
        merged.advanced = loaded.advanced;
        merged.thumbnail = loaded.thumbnail;
        merged
    }
}

/// Sparse per-user layer. Only `active_preset` is overridden per-user in
/// practice; everything else falls through to the global document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserOverrides {
    pub active_preset: Option<String>,
    pub custom_compression: Option<EncodeProfile>,
    pub watermark_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_presets_include_balanced_fallback() {
        let presets = default_presets();
        assert!(presets.contains_key("balanced"));
        assert_eq!(presets["balanced"].codec, "libx264");
    }

    #[test]
    fn merged_with_defaults_keeps_loaded_active_preset() {
        let mut loaded = SettingsDocument::default();
        loaded.active_preset = "quality".to_string();
        loaded.compression_presets.remove("nvidia_fast");
        let merged = SettingsDocument::merged_with_defaults(loaded);
        assert_eq!(merged.active_preset, "quality");
        assert!(merged.compression_presets.contains_key("nvidia_fast"));
    }
}
