//! Post-processing stages. Each stage reads one MP4 and writes another with a single `ffmpeg`
//! run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::assets::media::{ensure_parent_dir, probe_media};
use crate::foundation::error::{TypeBytesError, TypeBytesResult};

pub const PLAIN_VIDEO: &str = "typed_code_video.mp4";
pub const SPEED_VIDEO: &str = "speed_adjusted_video.mp4";
pub const SOUND_VIDEO: &str = "typed_code_video_with_sound.mp4";
pub const CUSTOM_AUDIO_VIDEO: &str = "typed_code_video_with_custom_audio.mp4";
pub const ENHANCED_PREFIX: &str = "enhanced_";

pub const ENHANCE_HEIGHT: u32 = 720;
pub const ENHANCE_GAIN: f32 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Encode,
    Speed,
    Sound,
    CustomAudio,
    Enhance,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Encode => "encode",
            Self::Speed => "speed",
            Self::Sound => "sound",
            Self::CustomAudio => "custom-audio",
            Self::Enhance => "enhance",
        })
    }
}

/// Playback speed multiplier chosen by label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VideoSpeed {
    #[default]
    X1,
    X1_25,
    X1_5,
    X1_75,
    X2,
}

impl VideoSpeed {
    pub const ALL: [VideoSpeed; 5] = [
        VideoSpeed::X1,
        VideoSpeed::X1_25,
        VideoSpeed::X1_5,
        VideoSpeed::X1_75,
        VideoSpeed::X2,
    ];

    pub fn factor(self) -> f64 {
        match self {
            Self::X1 => 1.0,
            Self::X1_25 => 1.25,
            Self::X1_5 => 1.5,
            Self::X1_75 => 1.75,
            Self::X2 => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::X1 => "1x",
            Self::X1_25 => "1.25x",
            Self::X1_5 => "1.5x",
            Self::X1_75 => "1.75x",
            Self::X2 => "2x",
        }
    }

    /// Unknown labels play at normal speed.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for VideoSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for VideoSpeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for VideoSpeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_label(&s))
    }
}

/// `enhanced_<file name>` next to `path`.
pub fn enhanced_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{ENHANCED_PREFIX}{name}"))
}

fn speed_args(input: &Path, output: &Path, factor: f64) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input.into());
    args.extend(
        [
            "-filter:v".to_owned(),
            format!("setpts=PTS/{factor}"),
            "-an".to_owned(),
            "-c:v".to_owned(),
            "libx264".to_owned(),
            "-pix_fmt".to_owned(),
            "yuv420p".to_owned(),
            "-movflags".to_owned(),
            "+faststart".to_owned(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

fn loop_audio_args(video: &Path, audio: &Path, output: &Path, duration_sec: f64) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(video.into());
    args.extend(["-stream_loop", "-1", "-i"].into_iter().map(OsString::from));
    args.push(audio.into());
    args.extend(
        [
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac",
        ]
        .into_iter()
        .map(OsString::from),
    );
    if duration_sec > 0.0 {
        args.push("-t".into());
        args.push(format!("{duration_sec:.3}").into());
    } else {
        args.push("-shortest".into());
    }
    args.extend(["-movflags", "+faststart"].into_iter().map(OsString::from));
    args.push(output.into());
    args
}

fn enhance_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input.into());
    args.extend(
        [
            "-vf".to_owned(),
            format!(
                "scale=-2:{ENHANCE_HEIGHT},colorchannelmixer=rr={g}:gg={g}:bb={g}",
                g = ENHANCE_GAIN
            ),
            "-c:v".to_owned(),
            "libx264".to_owned(),
            "-pix_fmt".to_owned(),
            "yuv420p".to_owned(),
            "-c:a".to_owned(),
            "copy".to_owned(),
            "-movflags".to_owned(),
            "+faststart".to_owned(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

fn run_ffmpeg(stage: Stage, args: &[OsString], output: &Path) -> TypeBytesResult<()> {
    ensure_parent_dir(output)?;
    let out = Command::new("ffmpeg").args(args).output().map_err(|e| {
        TypeBytesError::encode(format!(
            "{stage} stage: failed to spawn ffmpeg (is it installed and on PATH?): {e}"
        ))
    })?;
    if !out.status.success() {
        return Err(TypeBytesError::encode(format!(
            "{stage} stage: ffmpeg exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

#[tracing::instrument(skip_all, fields(factor = speed.factor()))]
pub fn change_speed(input: &Path, output: &Path, speed: VideoSpeed) -> TypeBytesResult<()> {
    run_ffmpeg(Stage::Speed, &speed_args(input, output, speed.factor()), output)
}

/// Mux `audio` onto `video`, looping or cutting it to the video's duration.
#[tracing::instrument(skip_all, fields(audio = %audio.display()))]
pub fn add_looped_audio(
    stage: Stage,
    video: &Path,
    audio: &Path,
    output: &Path,
) -> TypeBytesResult<()> {
    if !audio.is_file() {
        return Err(TypeBytesError::validation(format!(
            "audio file '{}' does not exist",
            audio.display()
        )));
    }
    let info = probe_media(video)?;
    tracing::debug!(duration_sec = info.duration_sec, "looping audio to video duration");
    run_ffmpeg(
        stage,
        &loop_audio_args(video, audio, output, info.duration_sec),
        output,
    )
}

#[tracing::instrument(skip_all)]
pub fn enhance(input: &Path, output: &Path) -> TypeBytesResult<()> {
    run_ffmpeg(Stage::Enhance, &enhance_args(input, output), output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(args: &[OsString]) -> String {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn speed_labels_round_trip_and_default() {
        for s in VideoSpeed::ALL {
            assert_eq!(VideoSpeed::from_label(s.label()), s);
        }
        assert_eq!(VideoSpeed::from_label("1.0"), VideoSpeed::X1);
        assert_eq!(VideoSpeed::from_label("3x"), VideoSpeed::X1);
        assert_eq!(VideoSpeed::from_label("2X"), VideoSpeed::X2);
        assert_eq!(VideoSpeed::X1_75.factor(), 1.75);
    }

    #[test]
    fn speed_deserializes_leniently() {
        let s: VideoSpeed = serde_json::from_str("\"1.5x\"").unwrap();
        assert_eq!(s, VideoSpeed::X1_5);
        let s: VideoSpeed = serde_json::from_str("\"fast\"").unwrap();
        assert_eq!(s, VideoSpeed::X1);
    }

    #[test]
    fn enhanced_path_prefixes_file_name() {
        assert_eq!(
            enhanced_path(Path::new("out/typed_code_video_with_sound.mp4")),
            PathBuf::from("out/enhanced_typed_code_video_with_sound.mp4")
        );
    }

    #[test]
    fn speed_args_scale_timestamps() {
        let args = speed_args(Path::new("a.mp4"), Path::new("b.mp4"), 2.0);
        let s = joined(&args);
        assert!(s.contains("-i a.mp4"));
        assert!(s.contains("setpts=PTS/2"));
        assert!(s.ends_with("b.mp4"));
    }

    #[test]
    fn loop_audio_args_loop_input_and_cut_to_duration() {
        let args = loop_audio_args(
            Path::new("v.mp4"),
            Path::new("Speed Typing.mp3"),
            Path::new("o.mp4"),
            2.5,
        );
        let s = joined(&args);
        assert!(s.contains("-stream_loop -1 -i Speed Typing.mp3"));
        assert!(s.contains("-t 2.500"));
        assert!(!s.contains("-shortest"));

        let s = joined(&loop_audio_args(
            Path::new("v.mp4"),
            Path::new("a.mp3"),
            Path::new("o.mp4"),
            0.0,
        ));
        assert!(s.contains("-shortest"));
    }

    #[test]
    fn enhance_args_scale_and_brighten() {
        let s = joined(&enhance_args(Path::new("a.mp4"), Path::new("enhanced_a.mp4")));
        assert!(s.contains("scale=-2:720"));
        assert!(s.contains("colorchannelmixer=rr=1.2:gg=1.2:bb=1.2"));
    }

    #[test]
    fn missing_audio_is_a_validation_error() {
        let err = add_looped_audio(
            Stage::Sound,
            Path::new("target/none.mp4"),
            Path::new("target/definitely-missing.mp3"),
            Path::new("target/out.mp4"),
        )
        .unwrap_err();
        assert!(matches!(err, TypeBytesError::Validation(_)));
    }
}
