#![forbid(unsafe_code)]

pub mod foundation {
    pub mod core;
    pub mod error;
}

pub mod assets;
pub mod encode_ffmpeg;
pub mod job;
pub mod layout;
pub mod pipeline;
pub mod post;
pub mod render;
pub mod typing;

pub use assets::{AssetDir, color::ColorDef, font::FontSource, media::MediaInfo};
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder, default_mp4_config};
pub use foundation::core::{Canvas, FrameIndex, MARGIN_PX, Rgba8};
pub use foundation::error::{TypeBytesError, TypeBytesResult};
pub use job::TypingJob;
pub use layout::{FrameLayout, PlacedLine, WrapMode, fit_font_size};
pub use pipeline::{PipelineOpts, PipelineOutput, StageOutput, create_typing_video};
pub use post::{Stage, VideoSpeed};
pub use render::{BackendKind, FrameRGBA, FrameStyle, TextBackend, cpu::CpuBackend, create_backend};
pub use typing::{TypingFrame, TypingParams, TypingRenderer};
