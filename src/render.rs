use crate::{
    assets::font::FontSource,
    foundation::core::{Canvas, Rgba8},
    foundation::error::{TypeBytesError, TypeBytesResult},
    layout::FrameLayout,
};

pub mod cpu;

/// A rendered frame, RGBA8 row-major and tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn solid(canvas: Canvas, color: Rgba8) -> Self {
        let px = color.to_premul();
        let len = canvas.width as usize * canvas.height as usize;
        let mut data = Vec::with_capacity(len * 4);
        for _ in 0..len {
            data.extend_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: true,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Pixel data as straight (non-premultiplied) RGBA8, as image files expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if !self.premultiplied {
            return out;
        }
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// Count of pixels that differ from `color`.
    pub fn count_differing(&self, color: Rgba8) -> usize {
        let px = color.to_premul();
        self.data.chunks_exact(4).filter(|p| *p != px).count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStyle {
    pub background: Rgba8,
    pub text_color: Rgba8,
}

/// Measures and draws text for the typing renderer.
pub trait TextBackend {
    /// Advance width of a single space glyph at `size_px`.
    fn space_width(&mut self, size_px: f32) -> TypeBytesResult<f32>;

    /// Height of one rendered line of `line` at `size_px`.
    fn line_height(&mut self, line: &str, size_px: f32) -> TypeBytesResult<f32>;

    fn render_frame(
        &mut self,
        canvas: Canvas,
        style: &FrameStyle,
        layout: &FrameLayout,
    ) -> TypeBytesResult<FrameRGBA>;
}

impl<T: TextBackend + ?Sized> TextBackend for Box<T> {
    fn space_width(&mut self, size_px: f32) -> TypeBytesResult<f32> {
        (**self).space_width(size_px)
    }

    fn line_height(&mut self, line: &str, size_px: f32) -> TypeBytesResult<f32> {
        (**self).line_height(line, size_px)
    }

    fn render_frame(
        &mut self,
        canvas: Canvas,
        style: &FrameStyle,
        layout: &FrameLayout,
    ) -> TypeBytesResult<FrameRGBA> {
        (**self).render_frame(canvas, style, layout)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub enum BackendKind {
    #[default]
    Cpu,
}

pub fn create_backend(kind: BackendKind, font: &FontSource) -> TypeBytesResult<Box<dyn TextBackend>> {
    match kind {
        BackendKind::Cpu => {
            let backend = cpu::CpuBackend::new(font).map_err(|e| match e {
                TypeBytesError::Validation(msg) => {
                    TypeBytesError::validation(format!("font '{}': {msg}", font.name))
                }
                other => other,
            })?;
            Ok(Box::new(backend))
        }
    }
}
