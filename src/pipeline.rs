use std::path::{Path, PathBuf};

use crate::{
    assets::{AssetDir, font::FontSource, media::is_ffprobe_on_path},
    encode_ffmpeg::{FfmpegEncoder, default_mp4_config},
    foundation::error::{TypeBytesError, TypeBytesResult},
    job::TypingJob,
    post::{self, Stage},
    render::{BackendKind, TextBackend, create_backend},
    typing::{TypingFrame, TypingRenderer},
};

/// Where the pipeline reads assets from and writes stage files to.
#[derive(Clone, Debug)]
pub struct PipelineOpts {
    pub out_dir: PathBuf,
    pub font_dir: PathBuf,
    pub sound_dir: PathBuf,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            font_dir: PathBuf::from("fonts"),
            sound_dir: PathBuf::from("type-sounds"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StageOutput {
    pub stage: Stage,
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// File written by the last stage that ran.
    pub final_path: PathBuf,
    pub stages: Vec<StageOutput>,
    pub frames: u64,
    pub font_size: f32,
}

/// Load the job's font from `font_dir` and build a text backend for it.
pub fn load_backend(job: &TypingJob, font_dir: &Path) -> TypeBytesResult<Box<dyn TextBackend>> {
    let font = FontSource::load(&AssetDir::new(font_dir), &job.font)?;
    create_backend(BackendKind::Cpu, &font)
}

/// Render frame `index` of `job` without encoding anything.
pub fn render_single_frame(
    job: &TypingJob,
    font_dir: &Path,
    index: usize,
) -> TypeBytesResult<TypingFrame> {
    job.validate()?;
    let backend = load_backend(job, font_dir)?;
    let mut renderer = TypingRenderer::new(backend, job.text.as_str(), job.to_params())?;
    renderer.render_frame(index)
}

/// Type `job.text` frame by frame into an MP4 at `out_path`.
///
/// Frames are streamed into `ffmpeg` as they are rendered. Returns the number of frames written
/// and the fitted font size.
#[tracing::instrument(skip_all, fields(out = %out_path.display()))]
pub fn encode_typing_video<B: TextBackend>(
    backend: B,
    job: &TypingJob,
    out_path: &Path,
) -> TypeBytesResult<(u64, f32)> {
    if job.text.is_empty() {
        return Err(TypeBytesError::validation(
            "text must be non-empty to produce a video",
        ));
    }

    let params = job.to_params();
    let mut renderer = TypingRenderer::new(backend, job.text.as_str(), params.clone())?;
    let cfg = default_mp4_config(out_path, params.canvas.width, params.canvas.height, job.fps);
    let mut encoder = FfmpegEncoder::new(cfg, params.background.to_array())?;

    for frame in renderer.frames() {
        encoder.encode_frame(&frame?.image)?;
    }
    let frames = encoder.frames_written();
    encoder.finish()?;

    tracing::info!(frames, font_size = renderer.font_size(), "typing video encoded");
    Ok((frames, renderer.font_size()))
}

/// Run every stage `job` asks for, in order, and return the last file produced.
#[tracing::instrument(skip_all, fields(chars = job.text.chars().count()))]
pub fn create_typing_video(job: &TypingJob, opts: &PipelineOpts) -> TypeBytesResult<PipelineOutput> {
    job.validate()?;
    if job.text.is_empty() {
        return Err(TypeBytesError::validation(
            "text must be non-empty to produce a video",
        ));
    }

    let sounds = AssetDir::new(&opts.sound_dir);
    let sound_path = if job.wants_sound() {
        Some(sounds.resolve(&job.sound)?)
    } else {
        None
    };
    for audio in sound_path.iter().chain(job.custom_audio.as_ref()) {
        if !audio.is_file() {
            return Err(TypeBytesError::validation(format!(
                "audio file '{}' does not exist",
                audio.display()
            )));
        }
    }
    if (sound_path.is_some() || job.custom_audio.is_some()) && !is_ffprobe_on_path() {
        return Err(TypeBytesError::encode(
            "ffprobe is required to add audio, but was not found on PATH",
        ));
    }

    let backend = load_backend(job, &opts.font_dir)?;

    let mut stages = Vec::new();
    let plain = opts.out_dir.join(post::PLAIN_VIDEO);
    let (frames, font_size) = encode_typing_video(backend, job, &plain)?;
    stages.push(StageOutput {
        stage: Stage::Encode,
        path: plain.clone(),
    });

    let speed = opts.out_dir.join(post::SPEED_VIDEO);
    post::change_speed(&plain, &speed, job.speed)?;
    tracing::info!(speed = %job.speed, out = %speed.display(), "speed stage done");
    stages.push(StageOutput {
        stage: Stage::Speed,
        path: speed.clone(),
    });
    let mut current = speed;

    if let Some(sound) = sound_path {
        let out = opts.out_dir.join(post::SOUND_VIDEO);
        post::add_looped_audio(Stage::Sound, &current, &sound, &out)?;
        tracing::info!(sound = %job.sound, out = %out.display(), "sound stage done");
        stages.push(StageOutput {
            stage: Stage::Sound,
            path: out.clone(),
        });
        current = out;
    }

    if let Some(audio) = &job.custom_audio {
        let out = opts.out_dir.join(post::CUSTOM_AUDIO_VIDEO);
        post::add_looped_audio(Stage::CustomAudio, &current, audio, &out)?;
        tracing::info!(audio = %audio.display(), out = %out.display(), "custom audio stage done");
        stages.push(StageOutput {
            stage: Stage::CustomAudio,
            path: out.clone(),
        });
        current = out;
    }

    if job.enhance {
        let out = post::enhanced_path(&current);
        post::enhance(&current, &out)?;
        tracing::info!(out = %out.display(), "enhance stage done");
        stages.push(StageOutput {
            stage: Stage::Enhance,
            path: out.clone(),
        });
        current = out;
    }

    Ok(PipelineOutput {
        final_path: current,
        stages,
        frames,
        font_size,
    })
}
