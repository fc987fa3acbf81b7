use std::path::{Path, PathBuf};

use crate::{
    assets::{
        color::ColorDef,
        font::DEFAULT_FONT,
        media::NO_SOUND,
    },
    foundation::core::Canvas,
    foundation::error::{TypeBytesError, TypeBytesResult},
    layout::WrapMode,
    post::VideoSpeed,
    typing::TypingParams,
};

pub const DEFAULT_FPS: u32 = 10;
pub const DEFAULT_LINE_SPACING: f32 = 1.5;
pub const DEFAULT_FONT_SIZE: f32 = 18.0;
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 400;

pub const LINE_SPACING_CHOICES: &[f32] = &[1.0, 1.15, 1.5, 2.0, 2.5, 3.0];
pub const WIDTH_CHOICES: &[u32] = &[400, 800, 1024, 1280, 1920];
pub const HEIGHT_CHOICES: &[u32] = &[400, 720, 1080, 1440, 2160];

/// One typing-video request. Everything except `text` has a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TypingJob {
    pub text: String,
    #[serde(default)]
    pub format: WrapMode,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_audio: Option<PathBuf>,
    #[serde(default = "ColorDef::black")]
    pub background: ColorDef,
    #[serde(default = "ColorDef::white")]
    pub text_color: ColorDef,
    #[serde(default)]
    pub enhance: bool,
    #[serde(default)]
    pub speed: VideoSpeed,
}

fn default_line_spacing() -> f32 {
    DEFAULT_LINE_SPACING
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_font() -> String {
    DEFAULT_FONT.to_owned()
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_sound() -> String {
    NO_SOUND.to_owned()
}

impl TypingJob {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: WrapMode::default(),
            line_spacing: DEFAULT_LINE_SPACING,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            font: default_font(),
            font_size: DEFAULT_FONT_SIZE,
            fps: DEFAULT_FPS,
            sound: default_sound(),
            custom_audio: None,
            background: ColorDef::black(),
            text_color: ColorDef::white(),
            enhance: false,
            speed: VideoSpeed::default(),
        }
    }

    pub fn from_json_str(s: &str) -> TypeBytesResult<Self> {
        serde_json::from_str(s).map_err(|e| TypeBytesError::serde(format!("parse job JSON: {e}")))
    }

    pub fn from_path(path: &Path) -> TypeBytesResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            TypeBytesError::validation(format!("read job file '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether a typing sound from the sound directory should be muxed in.
    pub fn wants_sound(&self) -> bool {
        let s = self.sound.trim();
        !s.is_empty() && s != NO_SOUND
    }

    pub fn validate(&self) -> TypeBytesResult<()> {
        self.canvas().validate()?;
        if self.fps == 0 {
            return Err(TypeBytesError::validation("fps must be non-zero"));
        }
        if self.font.trim().is_empty() {
            return Err(TypeBytesError::validation("font name must be non-empty"));
        }
        self.to_params().validate()
    }

    /// Renderer parameters for this job.
    pub fn to_params(&self) -> TypingParams {
        TypingParams {
            wrap_mode: self.format,
            line_spacing: self.line_spacing,
            canvas: self.canvas(),
            font_size: self.font_size,
            background: self.background.rgba(),
            text_color: self.text_color.rgba(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    #[test]
    fn minimal_job_takes_form_defaults() {
        let job = TypingJob::from_json_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(job, TypingJob::new("hello"));
        assert_eq!(job.format, WrapMode::Paragraph);
        assert_eq!(job.font, "SourceCodePro-Black.ttf");
        assert_eq!(job.fps, 10);
        assert!(!job.wants_sound());
        assert_eq!(job.speed, VideoSpeed::X1);
        assert_eq!(job.to_params().background, Rgba8::opaque(0, 0, 0));
        assert_eq!(job.to_params().text_color, Rgba8::opaque(255, 255, 255));
        job.validate().unwrap();
    }

    #[test]
    fn full_job_parses() {
        let job = TypingJob::from_json_str(
            r##"{
                "text": "fn main() {}",
                "format": "Programming",
                "line_spacing": 2.0,
                "width": 1280,
                "height": 720,
                "font": "FiraCode-Bold.ttf",
                "font_size": 24,
                "sound": "Speed Typing.mp3",
                "background": "darkblue",
                "text_color": "#ffcc00",
                "enhance": true,
                "speed": "1.75x"
            }"##,
        )
        .unwrap();
        assert_eq!(job.format, WrapMode::Programming);
        assert_eq!(job.canvas(), Canvas { width: 1280, height: 720 });
        assert!(job.wants_sound());
        assert!(job.enhance);
        assert_eq!(job.speed, VideoSpeed::X1_75);
        assert_eq!(job.text_color.rgba(), Rgba8::opaque(0xff, 0xcc, 0x00));
    }

    #[test]
    fn missing_text_is_a_serde_error() {
        let err = TypingJob::from_json_str(r#"{"width": 800}"#).unwrap_err();
        assert!(matches!(err, TypeBytesError::Serde(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut job = TypingJob::new("x");
        job.fps = 0;
        assert!(job.validate().is_err());

        let mut job = TypingJob::new("x");
        job.line_spacing = -1.0;
        assert!(job.validate().is_err());

        let mut job = TypingJob::new("x");
        job.width = 30;
        assert!(job.validate().is_err());
    }

    #[test]
    fn form_choices_are_valid_canvases() {
        for &w in WIDTH_CHOICES {
            for &h in HEIGHT_CHOICES {
                Canvas { width: w, height: h }.validate().unwrap();
            }
        }
        assert!(LINE_SPACING_CHOICES.contains(&DEFAULT_LINE_SPACING));
    }
}
