//! Command Dispatch: classifies inbound chat events into commands, video
//! uploads, and callback-button payloads, and enforces owner-only
//! authorization ahead of anything else touching the queue or settings.

use crate::callback_registry::CallbackRegistry;
use crate::config::AppConfig;
use crate::queue::Queue;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Link { url: String, filename: Option<String> },
    ToggleUploadMode,
    Watermark,
    Custom { overrides: Vec<(String, String)> },
    Settings,
    Status,
    Usage,
    Debug,
    Test,
    /// `/start`, `/ping`, `/help` — informational, handled outside the core.
    OutOfScope,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackPayload {
    Stats(String),
    Skip(String),
    Preset(String),
    SettingsSection(String),
    SetCodec(String),
    SetResolution(i32),
    SetAudio(String),
    SetWatermarkPos(String),
    ConfirmReset,
    Unknown(String),
}

/// A raw chat-platform event, independent of which messenger fronts the
/// engine. Constructing one is the transport-specific adapter's job.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Text {
        user_id: i64,
        chat_id: i64,
        text: String,
    },
    Video {
        user_id: i64,
        chat_id: i64,
        mime_type: String,
        locator: String,
        suggested_name: Option<String>,
        size: Option<u64>,
    },
    Callback {
        user_id: i64,
        chat_id: i64,
        data: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Command {
        user_id: i64,
        chat_id: i64,
        command: Command,
    },
    VideoUpload {
        user_id: i64,
        chat_id: i64,
        locator: String,
        suggested_name: Option<String>,
        size: Option<u64>,
    },
    Callback {
        user_id: i64,
        chat_id: i64,
        payload: CallbackPayload,
    },
    /// A non-owner sender issued an explicit command; reply with a denial.
    DeniedExplicit { chat_id: i64 },
    /// A non-owner sender sent media or a callback; drop without a reply.
    Ignored,
    /// Media whose MIME type wasn't `video/*`, or text that wasn't a command.
    Unrecognized,
}

/// Classifies `event` and checks it against `config.owner_ids`. This is the
/// single entry point worker/handler code should call.
pub fn dispatch(config: &AppConfig, event: &InboundEvent) -> Dispatched {
    match event {
        InboundEvent::Text { user_id, chat_id, text } => match parse_command(text) {
            Some(command) => {
                if config.is_owner(*user_id) {
                    Dispatched::Command { user_id: *user_id, chat_id: *chat_id, command }
                } else {
                    Dispatched::DeniedExplicit { chat_id: *chat_id }
                }
            }
            None => Dispatched::Unrecognized,
        },
        InboundEvent::Video { user_id, chat_id, mime_type, locator, suggested_name, size } => {
            if !mime_type.starts_with("video/") {
                return Dispatched::Unrecognized;
            }
            if !config.is_owner(*user_id) {
                return Dispatched::Ignored;
            }
            Dispatched::VideoUpload {
                user_id: *user_id,
                chat_id: *chat_id,
                locator: locator.clone(),
                suggested_name: suggested_name.clone(),
                size: *size,
            }
        }
        InboundEvent::Callback { user_id, chat_id, data } => {
            if !config.is_owner(*user_id) {
                return Dispatched::Ignored;
            }
            Dispatched::Callback {
                user_id: *user_id,
                chat_id: *chat_id,
                payload: parse_callback(data),
            }
        }
    }
}

/// Resolves a `skip<key>` callback's opaque key through `callbacks` and, if
/// it still points at a live job, cancels it in `queue`. Returns `false` for
/// a non-`Skip` payload, an unresolvable key, or a job that already finished
/// on its own. The key is forgotten either way once resolved, since a
/// `skip<key>` button is single-use.
pub fn handle_skip(callbacks: &CallbackRegistry, queue: &Queue, payload: &CallbackPayload) -> bool {
    let CallbackPayload::Skip(key) = payload else {
        return false;
    };
    let Some(skip_payload) = callbacks.resolve(key) else {
        return false;
    };
    callbacks.forget(key);
    queue.cancel(skip_payload.job_seq)
}

/// Parses a text command. Returns `None` for anything that isn't a
/// recognized slash command (plain chat text among them).
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    match head {
        "/link" => {
            let url = rest.first()?.to_string();
            let filename = rest.get(1).map(|s| s.to_string());
            Some(Command::Link { url, filename })
        }
        "/toggle_upload_mode" => Some(Command::ToggleUploadMode),
        "/watermark" => Some(Command::Watermark),
        "/custom" => Some(Command::Custom { overrides: parse_overrides(&rest) }),
        "/settings" => Some(Command::Settings),
        "/status" => Some(Command::Status),
        "/usage" => Some(Command::Usage),
        "/debug" => Some(Command::Debug),
        "/test" => Some(Command::Test),
        "/start" | "/ping" | "/help" => Some(Command::OutOfScope),
        _ => None,
    }
}

/// Parses `-k v -k2 v2 ...` pairs from `/custom`'s trailing arguments.
/// A dangling flag with no following value is dropped.
fn parse_overrides(args: &[&str]) -> Vec<(String, String)> {
    let mut overrides = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if let Some(key) = args[i].strip_prefix('-') {
            if let Some(value) = args.get(i + 1) {
                overrides.push((key.to_string(), value.to_string()));
                i += 2;
                continue;
            }
        }
        i += 1;
    }
    overrides
}

/// Parses a callback-query payload string into its typed form.
pub fn parse_callback(data: &str) -> CallbackPayload {
    if let Some(key) = data.strip_prefix("stats") {
        return CallbackPayload::Stats(key.to_string());
    }
    if let Some(key) = data.strip_prefix("skip") {
        return CallbackPayload::Skip(key.to_string());
    }
    if let Some(name) = data.strip_prefix("preset_") {
        return CallbackPayload::Preset(name.to_string());
    }
    if let Some(section) = data.strip_prefix("settings_") {
        return CallbackPayload::SettingsSection(section.to_string());
    }
    if let Some(name) = data.strip_prefix("set_codec_") {
        return CallbackPayload::SetCodec(name.to_string());
    }
    if let Some(n) = data.strip_prefix("set_resolution_") {
        if let Ok(n) = n.parse() {
            return CallbackPayload::SetResolution(n);
        }
    }
    if let Some(br) = data.strip_prefix("set_audio_") {
        return CallbackPayload::SetAudio(br.to_string());
    }
    if let Some(pos) = data.strip_prefix("set_watermark_pos_") {
        return CallbackPayload::SetWatermarkPos(pos.to_string());
    }
    if data == "confirm_reset" {
        return CallbackPayload::ConfirmReset;
    }
    CallbackPayload::Unknown(data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(owners: Vec<i64>) -> AppConfig {
        AppConfig {
            app_id: 1,
            api_hash: "hash".to_string(),
            bot_token: "token".to_string(),
            owner_ids: owners,
            max_file_size_mib: 4000,
            max_queue_size: 15,
            filename_template: "{original_name}".to_string(),
            auto_delete_original: false,
            enable_hardware_acceleration: true,
            progress_update_interval_secs: 5,
            default_codec: "libx264".to_string(),
            default_preset: "medium".to_string(),
            default_qp: 26,
            default_scale_height: 1080,
            default_fps: 30,
            default_audio_bitrate: "192k".to_string(),
            watermark_text: "x".to_string(),
            watermark_position: "bottom-right".to_string(),
            enable_video_preview: true,
            enable_screenshots: true,
            screenshot_count: 5,
            thumbnail_url: String::new(),
            telegraph_api: "https://api.telegra.ph".to_string(),
            max_retries: 3,
            working_dir: std::path::PathBuf::from("."),
        }
    }

    #[test]
    fn parses_link_command_with_optional_filename() {
        assert_eq!(
            parse_command("/link https://x/y.mp4 clip.mp4"),
            Some(Command::Link {
                url: "https://x/y.mp4".to_string(),
                filename: Some("clip.mp4".to_string())
            })
        );
        assert_eq!(
            parse_command("/link https://x/y.mp4"),
            Some(Command::Link { url: "https://x/y.mp4".to_string(), filename: None })
        );
    }

    #[test]
    fn parses_custom_overrides_and_drops_dangling_flag() {
        let command = parse_command("/custom -codec h264_nvenc -qp 30 -dangling").unwrap();
        assert_eq!(
            command,
            Command::Custom {
                overrides: vec![
                    ("codec".to_string(), "h264_nvenc".to_string()),
                    ("qp".to_string(), "30".to_string()),
                ]
            }
        );
    }

    #[test]
    fn unrecognized_text_is_none() {
        assert!(parse_command("just chatting").is_none());
    }

    #[test]
    fn owner_command_is_dispatched() {
        let config = config(vec![100]);
        let event = InboundEvent::Text { user_id: 100, chat_id: 1, text: "/status".to_string() };
        assert!(matches!(
            dispatch(&config, &event),
            Dispatched::Command { command: Command::Status, .. }
        ));
    }

    #[test]
    fn non_owner_command_is_denied_explicitly() {
        let config = config(vec![100]);
        let event = InboundEvent::Text { user_id: 999, chat_id: 1, text: "/status".to_string() };
        assert_eq!(dispatch(&config, &event), Dispatched::DeniedExplicit { chat_id: 1 });
    }

    #[test]
    fn non_owner_media_is_silently_ignored() {
        let config = config(vec![100]);
        let event = InboundEvent::Video {
            user_id: 999,
            chat_id: 1,
            mime_type: "video/mp4".to_string(),
            locator: "doc1".to_string(),
            suggested_name: None,
            size: None,
        };
        assert_eq!(dispatch(&config, &event), Dispatched::Ignored);
    }

    #[test]
    fn non_video_media_is_unrecognized_regardless_of_owner() {
        let config = config(vec![100]);
        let event = InboundEvent::Video {
            user_id: 100,
            chat_id: 1,
            mime_type: "image/png".to_string(),
            locator: "doc1".to_string(),
            suggested_name: None,
            size: None,
        };
        assert_eq!(dispatch(&config, &event), Dispatched::Unrecognized);
    }

    fn queue_job(seq: crate::domain::JobSeq, key: &str) -> crate::domain::Job {
        use crate::domain::{CancelToken, JobOrigin, JobPayload};
        use crate::transport::StatusHandle;

        crate::domain::Job {
            seq,
            dedupe_key: key.to_string(),
            payload: JobPayload::Link { url: key.to_string(), suggested_name: None },
            origin: JobOrigin { user_id: 1, chat_id: 1, status: StatusHandle("h".to_string()) },
            cancel: CancelToken::new(),
            overrides: Vec::new(),
        }
    }

    #[test]
    fn handle_skip_cancels_the_resolved_job() {
        use crate::callback_registry::SkipPayload;

        let callbacks = CallbackRegistry::new();
        let queue = Queue::new(10);
        queue.enqueue(queue_job(1, "a")).unwrap();
        let running = queue.take_next().unwrap();

        let key = callbacks.register(SkipPayload {
            output_path: "encode/a.mp4".to_string(),
            input_path: "downloads/a.mp4".to_string(),
            job_seq: 1,
        });

        assert!(handle_skip(&callbacks, &queue, &CallbackPayload::Skip(key.clone())));
        assert!(running.cancel.is_cancelled());
        assert!(callbacks.resolve(&key).is_none());
    }

    #[test]
    fn handle_skip_rejects_unresolvable_key_and_non_skip_payloads() {
        let callbacks = CallbackRegistry::new();
        let queue = Queue::new(10);
        assert!(!handle_skip(&callbacks, &queue, &CallbackPayload::Skip("404".to_string())));
        assert!(!handle_skip(&callbacks, &queue, &CallbackPayload::ConfirmReset));
    }

    #[test]
    fn callback_payload_round_trips() {
        assert_eq!(parse_callback("stats42"), CallbackPayload::Stats("42".to_string()));
        assert_eq!(parse_callback("skip7"), CallbackPayload::Skip("7".to_string()));
        assert_eq!(parse_callback("preset_balanced"), CallbackPayload::Preset("balanced".to_string()));
        assert_eq!(parse_callback("set_resolution_1080"), CallbackPayload::SetResolution(1080));
        assert_eq!(parse_callback("confirm_reset"), CallbackPayload::ConfirmReset);
        assert_eq!(parse_callback("garbage"), CallbackPayload::Unknown("garbage".to_string()));
    }
}
