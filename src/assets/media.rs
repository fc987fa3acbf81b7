use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::error::{TypeBytesError, TypeBytesResult};

/// Sound choice meaning "leave the video silent".
pub const NO_SOUND: &str = "No Sound";

/// Typing sound files the sound directory is expected to carry.
pub const SOUND_CHOICES: &[&str] = &[
    "Mediumspeed Typing.mp3",
    "Speed Typing.mp3",
    "Bass Typing.mp3",
    "Bay Typing.mp3",
    "Crack Typing.mp3",
    "Deep Sence Typing.mp3",
    "Flacking Typing.mp3",
    "Flaw Typing.mp3",
    "Focused Typing.mp3",
    "K55 Typing.mp3",
    "Laptop Typing.mp3",
    "NDC Typing.mp3",
    "RedMECH Typing.mp3",
    "Smooth Typing.mp3",
    "Stop Tpying.mp3",
];

#[derive(Clone, Debug)]
pub struct MediaInfo {
    pub source_path: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_sec: f64,
    pub has_video: bool,
    pub has_audio: bool,
}

pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> TypeBytesResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub fn probe_media(source_path: &Path) -> TypeBytesResult<MediaInfo> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| TypeBytesError::encode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(TypeBytesError::encode(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let mut info = parse_probe_json(&out.stdout)?;
    info.source_path = source_path.to_path_buf();
    Ok(info)
}

fn parse_probe_json(bytes: &[u8]) -> TypeBytesResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| TypeBytesError::serde(format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video.and_then(|v| v.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    Ok(MediaInfo {
        source_path: PathBuf::new(),
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        duration_sec,
        has_video: video.is_some(),
        has_audio,
    })
}
