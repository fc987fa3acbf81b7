use std::collections::HashMap;

use crate::{
    assets::font::FontSource,
    assets::text::{TextBrushRgba8, TextLayoutEngine, total_advance},
    foundation::core::Canvas,
    foundation::error::{TypeBytesError, TypeBytesResult},
    layout::FrameLayout,
    render::{FrameRGBA, FrameStyle, TextBackend},
};

/// Parley shaping + vello_cpu rasterization for a single font.
pub struct CpuBackend {
    engine: TextLayoutEngine,
    font: vello_cpu::peniko::FontData,
    space_widths: HashMap<u32, f32>,
    blank_line_heights: HashMap<u32, f32>,
}

impl CpuBackend {
    pub fn new(font: &FontSource) -> TypeBytesResult<Self> {
        let engine = TextLayoutEngine::new(font.bytes.as_slice())?;
        tracing::debug!(font = %font.name, family = engine.family_name(), "cpu text backend ready");

        let font_data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
            0,
        );
        Ok(Self {
            engine,
            font: font_data,
            space_widths: HashMap::new(),
            blank_line_heights: HashMap::new(),
        })
    }

    pub fn family_name(&self) -> &str {
        self.engine.family_name()
    }

    fn blank_line_height(&mut self, size_px: f32) -> TypeBytesResult<f32> {
        if let Some(h) = self.blank_line_heights.get(&size_px.to_bits()) {
            return Ok(*h);
        }
        let layout = self
            .engine
            .layout_line(" ", size_px, TextBrushRgba8::default())?;
        let h = layout.height();
        self.blank_line_heights.insert(size_px.to_bits(), h);
        Ok(h)
    }
}

impl TextBackend for CpuBackend {
    fn space_width(&mut self, size_px: f32) -> TypeBytesResult<f32> {
        if let Some(w) = self.space_widths.get(&size_px.to_bits()) {
            return Ok(*w);
        }
        let layout = self
            .engine
            .layout_line(" ", size_px, TextBrushRgba8::default())?;
        let w = total_advance(&layout);
        if w <= 0.0 {
            return Err(TypeBytesError::layout(format!(
                "font '{}' has no measurable space glyph",
                self.engine.family_name()
            )));
        }
        self.space_widths.insert(size_px.to_bits(), w);
        Ok(w)
    }

    fn line_height(&mut self, line: &str, size_px: f32) -> TypeBytesResult<f32> {
        if line.is_empty() {
            return self.blank_line_height(size_px);
        }
        let layout = self
            .engine
            .layout_line(line, size_px, TextBrushRgba8::default())?;
        let h = layout.height();
        if h > 0.0 {
            Ok(h)
        } else {
            self.blank_line_height(size_px)
        }
    }

    fn render_frame(
        &mut self,
        canvas: Canvas,
        style: &FrameStyle,
        layout: &FrameLayout,
    ) -> TypeBytesResult<FrameRGBA> {
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| TypeBytesError::render("canvas width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| TypeBytesError::render("canvas height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(width, height);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let bg = style.background;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));

        let brush = TextBrushRgba8::from(style.text_color);
        for placed in &layout.lines {
            if placed.text.trim().is_empty() {
                continue;
            }
            let text_layout = self
                .engine
                .layout_line(&placed.text, layout.font_size, brush)?;

            ctx.set_transform(vello_cpu::kurbo::Affine::translate((
                f64::from(placed.x),
                f64::from(placed.y),
            )));

            for line in text_layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };

                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));

                    let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&self.font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}
