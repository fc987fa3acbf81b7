use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use sha2::Digest as _;
use tracing_subscriber::EnvFilter;

use typebytes::{
    AssetDir, ColorDef, FontSource, PipelineOpts, TypingJob, VideoSpeed, WrapMode,
    assets::{
        font::{DEFAULT_FONT, FONT_CHOICES},
        media::{NO_SOUND, SOUND_CHOICES},
        text::TextLayoutEngine,
    },
};

#[derive(Parser, Debug)]
#[command(name = "typebytes", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a typing video (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
    /// Render a single typing frame as a PNG.
    Frame(FrameArgs),
    /// List the known fonts and typing sounds and whether each file is present.
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Job JSON file. Flags given alongside it override its fields.
    #[arg(long = "in", conflicts_with_all = ["text", "text_file"])]
    in_path: Option<PathBuf>,

    /// Text to type.
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,

    /// Read the text to type from a file.
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// `paragraph` (reflow to width) or `programming` (keep line breaks).
    #[arg(long)]
    format: Option<WrapMode>,

    #[arg(long)]
    line_spacing: Option<f32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Font file name inside the font directory.
    #[arg(long)]
    font: Option<String>,

    #[arg(long)]
    font_size: Option<f32>,

    #[arg(long)]
    fps: Option<u32>,

    /// Typing sound file name inside the sound directory, or "No Sound".
    #[arg(long)]
    sound: Option<String>,

    /// Audio file looped over the whole video.
    #[arg(long)]
    custom_audio: Option<PathBuf>,

    /// Named color or #RRGGBB[AA].
    #[arg(long)]
    background: Option<ColorDef>,

    /// Named color or #RRGGBB[AA].
    #[arg(long)]
    text_color: Option<ColorDef>,

    /// Scale to 720p height and boost colors.
    #[arg(long)]
    enhance: bool,

    /// 1x, 1.25x, 1.5x, 1.75x or 2x.
    #[arg(long)]
    speed: Option<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Directory the stage videos are written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, default_value = "fonts")]
    font_dir: PathBuf,

    #[arg(long, default_value = "type-sounds")]
    sound_dir: PathBuf,

    /// Print diagnostics about the font (family name + SHA-256 of font bytes).
    #[arg(long)]
    dump_fonts: bool,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Frame index (0-based).
    #[arg(long)]
    index: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value = "fonts")]
    font_dir: PathBuf,

    /// Print diagnostics about the font (family name + SHA-256 of font bytes).
    #[arg(long)]
    dump_fonts: bool,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    #[arg(long, default_value = "fonts")]
    font_dir: PathBuf,

    #[arg(long, default_value = "type-sounds")]
    sound_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Catalog(args) => cmd_catalog(args),
    }
}

fn build_job(args: JobArgs) -> anyhow::Result<TypingJob> {
    let mut job = if let Some(path) = &args.in_path {
        TypingJob::from_path(path).with_context(|| format!("load job '{}'", path.display()))?
    } else if let Some(text) = args.text {
        TypingJob::new(text)
    } else if let Some(path) = &args.text_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read text file '{}'", path.display()))?;
        TypingJob::new(text)
    } else {
        anyhow::bail!("one of --in, --text or --text-file is required");
    };

    if let Some(v) = args.format {
        job.format = v;
    }
    if let Some(v) = args.line_spacing {
        job.line_spacing = v;
    }
    if let Some(v) = args.width {
        job.width = v;
    }
    if let Some(v) = args.height {
        job.height = v;
    }
    if let Some(v) = args.font {
        job.font = v;
    }
    if let Some(v) = args.font_size {
        job.font_size = v;
    }
    if let Some(v) = args.fps {
        job.fps = v;
    }
    if let Some(v) = args.sound {
        job.sound = v;
    }
    if let Some(v) = args.custom_audio {
        job.custom_audio = Some(v);
    }
    if let Some(v) = args.background {
        job.background = v;
    }
    if let Some(v) = args.text_color {
        job.text_color = v;
    }
    if args.enhance {
        job.enhance = true;
    }
    if let Some(v) = args.speed {
        job.speed = VideoSpeed::from_label(&v);
    }

    job.validate().context("invalid job")?;
    Ok(job)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let job = build_job(args.job)?;
    if args.dump_fonts {
        dump_font_diagnostics(&args.font_dir, &job.font)?;
    }

    let opts = PipelineOpts {
        out_dir: args.out_dir,
        font_dir: args.font_dir,
        sound_dir: args.sound_dir,
    };
    let out = typebytes::create_typing_video(&job, &opts)?;
    for stage in &out.stages {
        tracing::debug!(stage = %stage.stage, path = %stage.path.display(), "stage output");
    }

    eprintln!(
        "wrote {} ({} frames, font size {})",
        out.final_path.display(),
        out.frames,
        out.font_size
    );
    println!("{}", out.final_path.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let job = build_job(args.job)?;
    if args.dump_fonts {
        dump_font_diagnostics(&args.font_dir, &job.font)?;
    }

    let frame = typebytes::pipeline::render_single_frame(&job, &args.font_dir, args.index)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.image.to_straight_rgba8(),
        frame.image.width,
        frame.image.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} (frame {} of {})",
        args.out.display(),
        frame.index.0,
        job.text.chars().count()
    );
    Ok(())
}

fn cmd_catalog(args: CatalogArgs) -> anyhow::Result<()> {
    let fonts = AssetDir::new(&args.font_dir);
    println!("fonts ({}):", args.font_dir.display());
    for name in FONT_CHOICES {
        let default = if *name == DEFAULT_FONT { " (default)" } else { "" };
        println!("  [{}] {name}{default}", presence(fonts.contains(name)));
    }

    let sounds = AssetDir::new(&args.sound_dir);
    println!("sounds ({}):", args.sound_dir.display());
    println!("  [ok] {NO_SOUND} (default)");
    for name in SOUND_CHOICES {
        println!("  [{}] {name}", presence(sounds.contains(name)));
    }

    println!("speeds:");
    for speed in VideoSpeed::ALL {
        println!("  {speed}");
    }
    Ok(())
}

fn presence(found: bool) -> &'static str {
    if found { "ok" } else { "--" }
}

fn dump_font_diagnostics(font_dir: &Path, name: &str) -> anyhow::Result<()> {
    let font = FontSource::load(&AssetDir::new(font_dir), name)
        .with_context(|| format!("load font '{name}'"))?;
    let engine = TextLayoutEngine::new(font.bytes.as_slice())
        .with_context(|| format!("register font '{name}'"))?;

    eprintln!("text font diagnostics:");
    eprintln!("  font_source: {}", font.name);
    eprintln!("  family:      {}", engine.family_name());
    eprintln!("  sha256:      {}", sha256_hex(&font.bytes));
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
