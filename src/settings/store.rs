use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Result;
use tracing::{info, warn};

use crate::domain::EncodeProfile;

use super::hardware::EngineKind;
use super::io::{read_json_file, write_json_file};
use super::types::{SettingsDocument, UserOverrides, preset_description};

/// Global + per-user layered settings, backed by two JSON files under the
/// working directory. Every mutation is persisted immediately, mirroring
/// the original bot's save-on-write behavior rather than batching writes.
pub struct SettingsStore {
    global_path: PathBuf,
    user_path: PathBuf,
    global: RwLock<SettingsDocument>,
    users: RwLock<HashMap<i64, UserOverrides>>,
    engine: RwLock<EngineKind>,
}

impl SettingsStore {
    pub fn load(working_dir: &Path) -> Result<Self> {
        let global_path = working_dir.join("bot_settings.json");
        let user_path = working_dir.join("user_settings.json");

        let global = if global_path.exists() {
            match read_json_file::<SettingsDocument>(&global_path) {
                Ok(loaded) => SettingsDocument::merged_with_defaults(loaded),
                Err(err) => {
                    warn!(path = %global_path.display(), %err, "corrupt settings file, resetting to defaults");
                    let doc = SettingsDocument::default();
                    write_json_file(&global_path, &doc)?;
                    doc
                }
            }
        } else {
            let doc = SettingsDocument::default();
            write_json_file(&global_path, &doc)?;
            doc
        };

        let users: HashMap<i64, UserOverrides> = if user_path.exists() {
            match read_json_file::<HashMap<String, UserOverrides>>(&user_path) {
                Ok(raw) => raw
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<i64>().ok().map(|id| (id, v)))
                    .collect(),
                Err(err) => {
                    warn!(path = %user_path.display(), %err, "corrupt user settings file, resetting to empty");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        info!(presets = global.compression_presets.len(), "settings loaded");

        Ok(SettingsStore {
            global_path,
            user_path,
            global: RwLock::new(global),
            users: RwLock::new(users),
            engine: RwLock::new(EngineKind::Cpu),
        })
    }

    pub fn set_engine(&self, engine: EngineKind) {
        *self.engine.write().unwrap() = engine;
    }

    pub fn engine(&self) -> EngineKind {
        *self.engine.read().unwrap()
    }

    fn save_global(&self) -> Result<()> {
        write_json_file(&self.global_path, &*self.global.read().unwrap())
    }

    fn save_users(&self) -> Result<()> {
        let users = self.users.read().unwrap();
        let as_strings: HashMap<String, &UserOverrides> =
            users.iter().map(|(id, v)| (id.to_string(), v)).collect();
        write_json_file(&self.user_path, &as_strings)
    }

    /// Sets the active preset. Validates the name exists (or is the
    /// `"custom"` sentinel) before persisting; an unknown name is rejected
    /// rather than silently falling back, unlike `active_profile`'s
    /// leniency at read time.
    pub fn set_active_preset(&self, preset_name: &str, user_id: Option<i64>) -> Result<bool> {
        let known = preset_name == "custom"
            || self
                .global
                .read()
                .unwrap()
                .compression_presets
                .contains_key(preset_name);
        if !known {
            return Ok(false);
        }
        match user_id {
            Some(id) => {
                let mut users = self.users.write().unwrap();
                users.entry(id).or_default().active_preset = Some(preset_name.to_string());
                drop(users);
                self.save_users()?;
            }
            None => {
                self.global.write().unwrap().active_preset = preset_name.to_string();
                self.save_global()?;
            }
        }
        Ok(true)
    }

    fn effective_active_preset(&self, user_id: Option<i64>) -> String {
        if let Some(id) = user_id {
            if let Some(over) = self.users.read().unwrap().get(&id) {
                if let Some(preset) = &over.active_preset {
                    return preset.clone();
                }
            }
        }
        self.global.read().unwrap().active_preset.clone()
    }

    fn effective_custom_compression(&self, user_id: Option<i64>) -> EncodeProfile {
        if let Some(id) = user_id {
            if let Some(over) = self.users.read().unwrap().get(&id) {
                if let Some(custom) = &over.custom_compression {
                    return custom.clone();
                }
            }
        }
        self.global.read().unwrap().custom_compression.clone()
    }

    /// Resolves the effective `EncodeProfile` for a user (or the process-
    /// global default when `user_id` is `None`). `"custom"` returns
    /// `custom_compression` verbatim; a named preset returns that preset's
    /// codec/speed-preset/qp/scale with the remaining fields (container
    /// profile, level, fps, audio bitrate, hardware toggle) filled in from
    /// `custom_compression`. An unrecognized preset name falls back to
    /// `balanced`.
    pub fn active_profile(&self, user_id: Option<i64>) -> EncodeProfile {
        let active_preset = self.effective_active_preset(user_id);
        let custom = self.effective_custom_compression(user_id);

        if active_preset == "custom" {
            return custom;
        }

        let global = self.global.read().unwrap();
        let core = global
            .compression_presets
            .get(&active_preset)
            .or_else(|| global.compression_presets.get("balanced"))
            .cloned();
        drop(global);

        match core {
            Some(core) => EncodeProfile {
                codec: core.codec,
                speed_preset: core.speed_preset,
                quality_qp: core.quality_qp,
                scale_height: core.scale_height,
                profile: custom.profile,
                level: custom.level,
                fps: custom.fps,
                audio_bitrate: custom.audio_bitrate,
                hardware_accel_enabled: custom.hardware_accel_enabled,
            },
            None => custom,
        }
    }

    /// Human-readable preset menu, omitting `nvidia_*` entries when the
    /// detected engine isn't NVIDIA.
    pub fn available_presets(&self) -> BTreeMap<String, String> {
        let engine = self.engine();
        let global = self.global.read().unwrap();
        let mut out: BTreeMap<String, String> = global
            .compression_presets
            .keys()
            .filter(|name| engine == EngineKind::Nvidia || !name.starts_with("nvidia"))
            .map(|name| (name.clone(), preset_description(name)))
            .collect();
        out.insert("custom".to_string(), preset_description("custom"));
        out
    }

    pub fn set_watermark_enabled(&self, enabled: bool, user_id: Option<i64>) -> Result<()> {
        match user_id {
            Some(id) => {
                let mut users = self.users.write().unwrap();
                users.entry(id).or_default().watermark_enabled = Some(enabled);
                drop(users);
                self.save_users()?;
            }
            None => {
                self.global.write().unwrap().advanced.watermark_enabled = enabled;
                self.save_global()?;
            }
        }
        Ok(())
    }

    pub fn watermark_enabled(&self, user_id: Option<i64>) -> bool {
        if let Some(id) = user_id {
            if let Some(over) = self.users.read().unwrap().get(&id) {
                if let Some(v) = over.watermark_enabled {
                    return v;
                }
            }
        }
        self.global.read().unwrap().advanced.watermark_enabled
    }

    pub fn output_settings(&self) -> super::types::OutputSettings {
        self.global.read().unwrap().output.clone()
    }

    pub fn preview_settings(&self) -> super::types::PreviewSettings {
        self.global.read().unwrap().preview.clone()
    }

    pub fn advanced_settings(&self) -> super::types::AdvancedSettings {
        self.global.read().unwrap().advanced.clone()
    }

    pub fn thumbnail_settings(&self) -> super::types::ThumbnailSettings {
        self.global.read().unwrap().thumbnail.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path()).unwrap();
        std::mem::forget(dir);
        store
    }

    #[test]
    fn active_profile_matches_preset_identity_for_every_preset() {
        let store = store();
        let names: Vec<String> = store
            .global
            .read()
            .unwrap()
            .compression_presets
            .keys()
            .cloned()
            .collect();
        for name in names {
            store.set_active_preset(&name, None).unwrap();
            let profile = store.active_profile(None);
            let core = store
                .global
                .read()
                .unwrap()
                .compression_presets
                .get(&name)
                .unwrap()
                .clone();
            assert_eq!(profile.codec, core.codec);
            assert_eq!(profile.speed_preset, core.speed_preset);
            assert_eq!(profile.quality_qp, core.quality_qp);
            assert_eq!(profile.scale_height, core.scale_height);
        }
    }

    #[test]
    fn custom_preset_returns_custom_compression_verbatim() {
        let store = store();
        store.set_active_preset("custom", None).unwrap();
        let profile = store.active_profile(None);
        let custom = store.global.read().unwrap().custom_compression.clone();
        assert_eq!(profile, custom);
    }

    #[test]
    fn unknown_preset_is_rejected_without_mutating_state() {
        let store = store();
        let before = store.global.read().unwrap().active_preset.clone();
        let applied = store.set_active_preset("does-not-exist", None).unwrap();
        assert!(!applied);
        assert_eq!(store.global.read().unwrap().active_preset, before);
    }

    #[test]
    fn user_override_does_not_affect_global_default() {
        let store = store();
        store.set_active_preset("quality", Some(42)).unwrap();
        assert_eq!(store.effective_active_preset(Some(42)), "quality");
        assert_eq!(store.effective_active_preset(None), "balanced");
    }

    #[test]
    fn available_presets_omit_nvidia_without_hardware() {
        let store = store();
        store.set_engine(EngineKind::Cpu);
        let presets = store.available_presets();
        assert!(!presets.keys().any(|k| k.starts_with("nvidia")));
        store.set_engine(EngineKind::Nvidia);
        let presets = store.available_presets();
        assert!(presets.contains_key("nvidia_balanced"));
    }

    #[test]
    fn corrupt_global_settings_file_resets_to_defaults_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bot_settings.json"), "{not valid json").unwrap();
        let store = SettingsStore::load(dir.path()).unwrap();
        assert_eq!(store.effective_active_preset(None), "balanced");
    }

    #[test]
    fn corrupt_user_settings_file_resets_to_empty_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("user_settings.json"), "not json at all").unwrap();
        let store = SettingsStore::load(dir.path()).unwrap();
        assert_eq!(store.effective_active_preset(Some(7)), store.effective_active_preset(None));
    }
}
