use std::{
    io::Read as _,
    path::PathBuf,
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    assets::media::{ensure_parent_dir, is_ffmpeg_on_path},
    foundation::error::{TypeBytesError, TypeBytesResult},
    render::FrameRGBA,
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> TypeBytesResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TypeBytesError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(TypeBytesError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(TypeBytesError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn default_mp4_config(
    out_path: impl Into<PathBuf>,
    width: u32,
    height: u32,
    fps: u32,
) -> EncodeConfig {
    EncodeConfig {
        width,
        height,
        fps,
        out_path: out_path.into(),
        overwrite: true,
    }
}

/// Streams raw frames into a system `ffmpeg` producing H.264 MP4 without audio.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    bg_rgba: [u8; 4],
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    frames_written: u64,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig, bg_rgba: [u8; 4]) -> TypeBytesResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(TypeBytesError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(TypeBytesError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            TypeBytesError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TypeBytesError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| TypeBytesError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(out = %cfg.out_path.display(), fps = cfg.fps, "ffmpeg encoder started");
        Ok(Self {
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            cfg,
            bg_rgba,
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            frames_written: 0,
        })
    }

    pub fn encode_frame(&mut self, frame: &FrameRGBA) -> TypeBytesResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(TypeBytesError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }

        if frame.data.len() != self.scratch.len() {
            return Err(TypeBytesError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.bg_rgba,
        )?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TypeBytesError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        if let Err(e) = stdin.write_all(&self.scratch) {
            return Err(self.abort(e));
        }

        self.frames_written += 1;
        Ok(())
    }

    /// ffmpeg stopped reading frames. Reap it and report why.
    fn abort(&mut self, write_err: std::io::Error) -> TypeBytesError {
        drop(self.stdin.take());
        let status = match self.child.wait() {
            Ok(status) => status.to_string(),
            Err(e) => format!("unknown ({e})"),
        };
        let stderr = self.take_stderr().unwrap_or_default();
        TypeBytesError::encode(format!(
            "ffmpeg stopped accepting frames after {} frames ({write_err}); exited with status \
             {status}: {}",
            self.frames_written,
            String::from_utf8_lossy(&stderr).trim()
        ))
    }

    fn take_stderr(&mut self) -> TypeBytesResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| TypeBytesError::encode("ffmpeg stderr reader panicked"))?
                .map_err(|e| TypeBytesError::encode(format!("failed to read ffmpeg stderr: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn finish(mut self) -> TypeBytesResult<PathBuf> {
        drop(self.stdin.take());

        let status = self.child.wait().map_err(|e| {
            TypeBytesError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr = self.take_stderr()?;

        if !status.success() {
            return Err(TypeBytesError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        tracing::debug!(frames = self.frames_written, "ffmpeg encoder finished");
        Ok(self.cfg.out_path)
    }
}

fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> TypeBytesResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(TypeBytesError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;

        let (r, g, b) = if src_is_premul {
            (
                s[0] as u16 + mul_div255(bg_r, inv),
                s[1] as u16 + mul_div255(bg_g, inv),
                s[2] as u16 + mul_div255(bg_b, inv),
            )
        } else {
            (
                mul_div255(s[0] as u16, a) + mul_div255(bg_r, inv),
                mul_div255(s[1] as u16, a) + mul_div255(bg_g, inv),
                mul_div255(s[2] as u16, a) + mul_div255(bg_b, inv),
            )
        };

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(default_mp4_config("target/out.mp4", 0, 400, 10).validate().is_err());
        assert!(default_mp4_config("target/out.mp4", 801, 400, 10).validate().is_err());
        assert!(default_mp4_config("target/out.mp4", 800, 400, 0).validate().is_err());
        assert!(default_mp4_config("target/out.mp4", 800, 400, 10).validate().is_ok());
    }

    #[test]
    fn early_ffmpeg_exit_reports_its_stderr() {
        if !is_ffmpeg_on_path() {
            return;
        }
        // ffmpeg cannot pick a muxer for this extension and exits before reading any input.
        let out = PathBuf::from("target/encode_failure/out.not-a-container");
        let cfg = default_mp4_config(&out, 64, 64, 10);
        let mut enc = FfmpegEncoder::new(cfg, [0, 0, 0, 255]).unwrap();
        let frame = FrameRGBA {
            width: 64,
            height: 64,
            data: vec![255u8; 64 * 64 * 4],
            premultiplied: true,
        };

        let mut err = None;
        for _ in 0..256 {
            if let Err(e) = enc.encode_frame(&frame) {
                err = Some(e);
                break;
            }
        }
        let err = match err {
            Some(e) => e,
            None => enc.finish().unwrap_err(),
        };

        let msg = err.to_string();
        assert!(matches!(err, TypeBytesError::Encode(_)), "{msg}");
        assert!(msg.contains("exited with status"), "{msg}");
        assert!(msg.contains("output format"), "{msg}");
    }

    #[test]
    fn flatten_premul_over_black_produces_expected_rgb() {
        let src = vec![128u8, 0u8, 0u8, 128u8];
        let mut dst = vec![0u8; 4];
        flatten_to_opaque_rgba8(&mut dst, &src, true, [0, 0, 0, 255]).unwrap();
        assert_eq!(dst, vec![128u8, 0u8, 0u8, 255u8]);
    }

    #[test]
    fn flatten_straight_over_white_blends_background() {
        let src = vec![0u8, 0u8, 0u8, 0u8];
        let mut dst = vec![0u8; 4];
        flatten_to_opaque_rgba8(&mut dst, &src, false, [255, 255, 255, 255]).unwrap();
        assert_eq!(dst, vec![255u8, 255u8, 255u8, 255u8]);
    }

    #[test]
    fn flatten_rejects_mismatched_buffers() {
        let mut dst = vec![0u8; 8];
        assert!(flatten_to_opaque_rgba8(&mut dst, &[0u8; 4], true, [0, 0, 0, 255]).is_err());
    }
}
