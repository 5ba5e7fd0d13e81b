//! Deterministic ffmpeg argv construction.
//!
//! Every function here returns a `Vec<String>` ready to hand to
//! `tokio::process::Command::args` — never a joined shell string, and never
//! run through `sh -c`. Building a single flat vector of strings mirrors the
//! argv style of the teacher's own ffmpeg-args builder.

pub mod filters;

use std::path::Path;

use crate::domain::EncodeProfile;
use crate::settings::EngineKind;

/// Everything [`build_transcode_args`] needs besides the profile and paths.
#[derive(Debug, Clone)]
pub struct TranscodeOptions<'a> {
    pub engine: EngineKind,
    pub watermark_enabled: bool,
    pub watermark_text: &'a str,
    pub watermark_position: &'a str,
}

/// Builds the argv for the primary compression pass: `ffmpeg -y -hide_banner
/// -loglevel error ... -i <input> ... -c:v <codec> ... <output>`.
///
/// Quality is expressed as `-crf` for software codecs and `-cq` for NVENC
/// codecs, matching how each encoder actually interprets a single "quality"
/// knob.
pub fn build_transcode_args(
    profile: &EncodeProfile,
    input: &Path,
    output: &Path,
    opts: &TranscodeOptions<'_>,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];

    let hardware_active =
        opts.engine == EngineKind::Nvidia && profile.hardware_accel_enabled && profile.is_hardware_codec();

    if hardware_active {
        args.push("-hwaccel".to_string());
        args.push("cuda".to_string());
        args.push("-hwaccel_output_format".to_string());
        args.push("cuda".to_string());
    }

    args.push("-i".to_string());
    args.push(input.to_string_lossy().into_owned());

    let mut filters = Vec::new();
    if profile.scaling_enabled() {
        if hardware_active {
            filters.push(format!("scale_cuda=-2:{}", profile.scale_height));
        } else {
            filters.push(format!(
                "scale=-2:{}:force_original_aspect_ratio=decrease",
                profile.scale_height
            ));
        }
    }

    if let Some(watermark) =
        filters::watermark_filter(opts.watermark_enabled, opts.watermark_text, opts.watermark_position)
    {
        if hardware_active {
            filters.push(format!("hwdownload,format=nv12,{watermark},hwupload_cuda"));
        } else {
            filters.push(watermark);
        }
    }

    if !filters.is_empty() {
        args.push("-vf".to_string());
        args.push(filters.join(","));
    }

    args.push("-c:v".to_string());
    args.push(profile.codec.clone());
    args.push("-preset".to_string());
    args.push(profile.speed_preset.clone());
    args.push("-profile:v".to_string());
    args.push(profile.profile.clone());
    args.push("-level:v".to_string());
    args.push(profile.level.clone());
    args.push(if profile.is_hardware_codec() { "-cq".to_string() } else { "-crf".to_string() });
    args.push(profile.quality_qp.to_string());
    args.push("-r".to_string());
    args.push(profile.fps.to_string());
    args.push("-c:a".to_string());
    args.push("aac".to_string());
    args.push("-b:a".to_string());
    args.push(profile.audio_bitrate.clone());
    args.push("-movflags".to_string());
    args.push("+faststart".to_string());
    args.push(output.to_string_lossy().into_owned());

    args
}

/// Builds the argv for a single preview clip extraction, scaled down to 720
/// on the long edge and carrying AAC 128k audio: `ffmpeg -y -ss <t> -i
/// <input> -t <duration> -vf scale=... -c:v libx264 -crf <q> -preset veryfast
/// -c:a aac -b:a 128k <output>`.
pub fn build_clip_extract_args(
    input: &Path,
    output: &Path,
    start_secs: f64,
    duration_secs: f64,
    quality_crf: u32,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        format!("{start_secs:.2}"),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-t".to_string(),
        format!("{duration_secs:.2}"),
        "-vf".to_string(),
        "scale=-2:720:force_original_aspect_ratio=decrease".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-crf".to_string(),
        quality_crf.to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Builds the argv for the concat-demuxer pass that stitches preview clips
/// together without re-encoding.
pub fn build_concat_args(concat_list: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        concat_list.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Builds the argv for a single-frame still (used by both screenshots and
/// the thumbnail), scaled to fit within `width`x`height` preserving aspect
/// ratio (pass equal values for a square bound, as the thumbnail does).
pub fn build_frame_extract_args(
    input: &Path,
    output: &Path,
    timestamp_secs: f64,
    width: u32,
    height: u32,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        format!("{timestamp_secs:.2}"),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vframes".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        format!("scale={width}:{height}:force_original_aspect_ratio=decrease"),
        "-q:v".to_string(),
        "2".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn profile() -> EncodeProfile {
        EncodeProfile {
            codec: "libx264".to_string(),
            speed_preset: "medium".to_string(),
            profile: "high".to_string(),
            level: "4.0".to_string(),
            quality_qp: 26,
            scale_height: 1080,
            fps: 30,
            audio_bitrate: "192k".to_string(),
            hardware_accel_enabled: false,
        }
    }

    #[test]
    fn software_codec_uses_crf_not_cq() {
        let opts = TranscodeOptions {
            engine: EngineKind::Cpu,
            watermark_enabled: false,
            watermark_text: "",
            watermark_position: "bottom-right",
        };
        let args = build_transcode_args(&profile(), &PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"), &opts);
        assert!(args.iter().any(|a| a == "-crf"));
        assert!(!args.iter().any(|a| a == "-cq"));
        assert!(!args.iter().any(|a| a == "-hwaccel"));
    }

    #[test]
    fn nvenc_with_hardware_engine_adds_hwaccel_and_cq() {
        let mut p = profile();
        p.codec = "h264_nvenc".to_string();
        p.hardware_accel_enabled = true;
        let opts = TranscodeOptions {
            engine: EngineKind::Nvidia,
            watermark_enabled: false,
            watermark_text: "",
            watermark_position: "bottom-right",
        };
        let args = build_transcode_args(&p, &PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"), &opts);
        assert!(args.iter().any(|a| a == "-hwaccel"));
        assert!(args.iter().any(|a| a == "-cq"));
        assert!(args.iter().any(|a| a == "scale_cuda=-2:1080"));
    }

    #[test]
    fn scale_height_disabled_omits_scale_filter() {
        let mut p = profile();
        p.scale_height = -1;
        let opts = TranscodeOptions {
            engine: EngineKind::Cpu,
            watermark_enabled: false,
            watermark_text: "",
            watermark_position: "bottom-right",
        };
        let args = build_transcode_args(&p, &PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"), &opts);
        assert!(!args.iter().any(|a| a == "-vf"));
    }

    #[test]
    fn watermark_on_hardware_path_wraps_hwdownload_hwupload() {
        let mut p = profile();
        p.codec = "h264_nvenc".to_string();
        p.hardware_accel_enabled = true;
        let opts = TranscodeOptions {
            engine: EngineKind::Nvidia,
            watermark_enabled: true,
            watermark_text: "hi",
            watermark_position: "center",
        };
        let args = build_transcode_args(&p, &PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"), &opts);
        let vf_index = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf_index + 1].contains("hwdownload"));
        assert!(args[vf_index + 1].contains("hwupload_cuda"));
    }

    #[test]
    fn no_argument_ever_contains_the_whole_command_as_one_string() {
        let opts = TranscodeOptions {
            engine: EngineKind::Cpu,
            watermark_enabled: false,
            watermark_text: "",
            watermark_position: "bottom-right",
        };
        let args = build_transcode_args(&profile(), &PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"), &opts);
        assert!(args.iter().all(|a| !a.contains("ffmpeg")));
    }

    #[test]
    fn clip_extract_args_scale_to_720_and_keep_aac_audio() {
        let args = build_clip_extract_args(&PathBuf::from("in.mp4"), &PathBuf::from("clip.mp4"), 5.0, 10.0, 28);
        assert!(!args.iter().any(|a| a == "-an"));
        let vf_index = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf_index + 1].contains("720"));
        let ca_index = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[ca_index + 1], "aac");
        let ba_index = args.iter().position(|a| a == "-b:a").unwrap();
        assert_eq!(args[ba_index + 1], "128k");
    }
}
