use serde::{Deserialize, Serialize};

/// A coherent set of video/audio encoding parameters, either a preset entry
/// or the resolved `custom_compression` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EncodeProfile {
    pub codec: String,
    pub speed_preset: String,
    pub profile: String,
    pub level: String,
    pub quality_qp: u32,
    /// Target scale height; `-1` and `0` both disable scaling.
    pub scale_height: i32,
    pub fps: u32,
    pub audio_bitrate: String,
    pub hardware_accel_enabled: bool,
}

impl EncodeProfile {
    pub fn is_hardware_codec(&self) -> bool {
        self.codec.ends_with("_nvenc")
    }

    pub fn scaling_enabled(&self) -> bool {
        self.scale_height != -1 && self.scale_height != 0
    }

    /// Applies ad-hoc `(key, value)` overrides from `/custom`, coercing
    /// numeric fields and ignoring unknown keys. Invalid values are dropped
    /// silently so a typo in one override never aborts the whole job.
    pub fn apply_overrides(&mut self, overrides: &[(String, String)]) {
        for (key, value) in overrides {
            match key.as_str() {
                "codec" | "v_codec" => self.codec = value.clone(),
                "preset" | "v_preset" => self.speed_preset = value.clone(),
                "profile" | "v_profile" => self.profile = value.clone(),
                "level" | "v_level" => self.level = value.clone(),
                "qp" | "v_qp" => {
                    if let Ok(v) = value.parse() {
                        self.quality_qp = v;
                    }
                }
                "scale" | "v_scale" => {
                    if let Ok(v) = value.parse() {
                        self.scale_height = v;
                    }
                }
                "fps" | "v_fps" => {
                    if let Ok(v) = value.parse() {
                        self.fps = v;
                    }
                }
                "audio" | "a_bitrate" => self.audio_bitrate = value.clone(),
                "hwaccel" => {
                    if let Ok(v) = value.parse() {
                        self.hardware_accel_enabled = v;
                    }
                }
                _ => {}
            }
        }
    }
}
