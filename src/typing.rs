//! Keystroke-by-keystroke frame generation.

use crate::{
    foundation::core::{Canvas, FrameIndex, Rgba8},
    foundation::error::{TypeBytesError, TypeBytesResult},
    layout::{self, FrameLayout, WrapMode},
    render::{FrameRGBA, FrameStyle, TextBackend},
};

#[derive(Clone, Debug, PartialEq)]
pub struct TypingParams {
    pub wrap_mode: WrapMode,
    pub line_spacing: f32,
    pub canvas: Canvas,
    /// Requested font size; the renderer may shrink it to fit.
    pub font_size: f32,
    pub background: Rgba8,
    pub text_color: Rgba8,
}

impl TypingParams {
    pub fn validate(&self) -> TypeBytesResult<()> {
        self.canvas.validate()?;
        if !self.line_spacing.is_finite() || self.line_spacing <= 0.0 {
            return Err(TypeBytesError::validation(format!(
                "line spacing must be finite and > 0 (got {})",
                self.line_spacing
            )));
        }
        layout::validate_font_size(self.font_size)
    }

    fn style(&self) -> FrameStyle {
        FrameStyle {
            background: self.background,
            text_color: self.text_color,
        }
    }
}

/// One emitted frame and the layout it was drawn from.
#[derive(Clone, Debug)]
pub struct TypingFrame {
    pub index: FrameIndex,
    pub prefix: String,
    pub layout: FrameLayout,
    pub image: FrameRGBA,
}

/// Renders one frame per character of `text`, each showing the text typed so far.
pub struct TypingRenderer<B: TextBackend> {
    backend: B,
    text: String,
    params: TypingParams,
    font_size: f32,
    columns: Option<usize>,
    prefix_ends: Vec<usize>,
}

impl<B: TextBackend> TypingRenderer<B> {
    /// Validate `params` and fit the font size against the complete `text`.
    pub fn new(mut backend: B, text: impl Into<String>, params: TypingParams) -> TypeBytesResult<Self> {
        params.validate()?;
        let text = text.into();

        let font_size =
            layout::fit_font_size(&mut backend, &text, params.canvas, params.font_size)?;
        let columns = layout::columns_for(&mut backend, params.wrap_mode, params.canvas, font_size)?;
        let prefix_ends = text.char_indices().map(|(i, c)| i + c.len_utf8()).collect();

        tracing::debug!(font_size, ?columns, "typing renderer ready");
        Ok(Self {
            backend,
            text,
            params,
            font_size,
            columns,
            prefix_ends,
        })
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn columns(&self) -> Option<usize> {
        self.columns
    }

    pub fn params(&self) -> &TypingParams {
        &self.params
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// One frame per character.
    pub fn frame_count(&self) -> usize {
        self.prefix_ends.len()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Lay out the text typed up to and including character `index`.
    pub fn layout_frame(&mut self, index: usize) -> TypeBytesResult<FrameLayout> {
        let end = self.prefix_end(index)?;
        let lines = layout::break_lines(
            &self.text[..end],
            self.params.wrap_mode,
            self.columns.unwrap_or(0),
        );
        layout::place_lines(
            &mut self.backend,
            lines,
            self.font_size,
            self.params.line_spacing,
        )
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub fn render_frame(&mut self, index: usize) -> TypeBytesResult<TypingFrame> {
        let end = self.prefix_end(index)?;
        let layout = self.layout_frame(index)?;
        let image = self
            .backend
            .render_frame(self.params.canvas, &self.params.style(), &layout)?;

        Ok(TypingFrame {
            index: FrameIndex(index as u64),
            prefix: self.text[..end].to_owned(),
            layout,
            image,
        })
    }

    /// Frames in typing order.
    pub fn frames(&mut self) -> TypingFrames<'_, B> {
        TypingFrames {
            renderer: self,
            next: 0,
        }
    }

    pub fn render_all(&mut self) -> TypeBytesResult<Vec<TypingFrame>> {
        self.frames().collect()
    }

    fn prefix_end(&self, index: usize) -> TypeBytesResult<usize> {
        self.prefix_ends.get(index).copied().ok_or_else(|| {
            TypeBytesError::validation(format!(
                "frame {index} is out of range (text has {} characters)",
                self.prefix_ends.len()
            ))
        })
    }
}

pub struct TypingFrames<'r, B: TextBackend> {
    renderer: &'r mut TypingRenderer<B>,
    next: usize,
}

impl<B: TextBackend> Iterator for TypingFrames<'_, B> {
    type Item = TypeBytesResult<TypingFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.renderer.frame_count() {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        Some(self.renderer.render_frame(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.renderer.frame_count().saturating_sub(self.next);
        (rem, Some(rem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PlacedLine;

    /// Monospace stand-in that paints one pixel per placed character so frames differ.
    struct MarkBackend;

    impl TextBackend for MarkBackend {
        fn space_width(&mut self, size_px: f32) -> TypeBytesResult<f32> {
            Ok(size_px * 0.5)
        }

        fn line_height(&mut self, _line: &str, size_px: f32) -> TypeBytesResult<f32> {
            Ok(size_px)
        }

        fn render_frame(
            &mut self,
            canvas: Canvas,
            style: &FrameStyle,
            layout: &FrameLayout,
        ) -> TypeBytesResult<FrameRGBA> {
            let mut frame = FrameRGBA::solid(canvas, style.background);
            let ink = style.text_color.to_premul();
            for PlacedLine { text, x, y } in &layout.lines {
                for (i, _) in text.chars().enumerate() {
                    let px = (*x as usize + i) + (*y as usize) * canvas.width as usize;
                    if let Some(p) = frame.data.get_mut(px * 4..px * 4 + 4) {
                        p.copy_from_slice(&ink);
                    }
                }
            }
            Ok(frame)
        }
    }

    fn params(mode: WrapMode, width: u32, height: u32) -> TypingParams {
        TypingParams {
            wrap_mode: mode,
            line_spacing: 1.5,
            canvas: Canvas { width, height },
            font_size: 18.0,
            background: Rgba8::opaque(0, 0, 0),
            text_color: Rgba8::opaque(255, 255, 255),
        }
    }

    #[test]
    fn typing_ab_yields_two_frames() {
        let mut r =
            TypingRenderer::new(MarkBackend, "ab", params(WrapMode::Programming, 800, 400))
                .unwrap();
        let frames = r.render_all().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].layout.line_texts(), vec!["a"]);
        assert_eq!(frames[1].layout.line_texts(), vec!["ab"]);
        assert_eq!(frames[0].prefix, "a");
        assert_eq!(frames[1].index, FrameIndex(1));
        assert_ne!(frames[0].image, frames[1].image);
    }

    #[test]
    fn frame_count_matches_characters() {
        for text in ["x", "hello world", "naïve café", "漢字 and ascii", "line\nbreak\n"] {
            let mut r =
                TypingRenderer::new(MarkBackend, text, params(WrapMode::Paragraph, 800, 400))
                    .unwrap();
            assert_eq!(r.frame_count(), text.chars().count());
            assert_eq!(r.frames().count(), text.chars().count());
        }
    }

    #[test]
    fn empty_text_yields_no_frames() {
        let mut r =
            TypingRenderer::new(MarkBackend, "", params(WrapMode::Paragraph, 800, 400)).unwrap();
        assert_eq!(r.frame_count(), 0);
        assert!(r.render_all().unwrap().is_empty());
    }

    #[test]
    fn prefixes_only_grow() {
        let text = "fn main() {\n    println!(\"hi\");\n}";
        let mut r =
            TypingRenderer::new(MarkBackend, text, params(WrapMode::Programming, 800, 400))
                .unwrap();
        let mut last = String::new();
        for frame in r.frames() {
            let frame = frame.unwrap();
            assert!(frame.prefix.starts_with(&last));
            assert_eq!(frame.prefix.chars().count(), last.chars().count() + 1);
            last = frame.prefix;
        }
        assert_eq!(last, text);
    }

    #[test]
    fn programming_mode_keeps_line_breaks() {
        let text = "a\n\n  b";
        let mut r =
            TypingRenderer::new(MarkBackend, text, params(WrapMode::Programming, 800, 400))
                .unwrap();
        let last = r.render_frame(text.chars().count() - 1).unwrap();
        assert_eq!(last.layout.line_texts(), vec!["a", "", "  b"]);
        let ys: Vec<f32> = last.layout.lines.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![20.0, 47.0, 74.0]);
    }

    #[test]
    fn paragraph_lines_stay_within_columns() {
        let text = "It was the best of times, it was the worst of times, it was the age of \
                    wisdom, it was the age of foolishness";
        let mut r =
            TypingRenderer::new(MarkBackend, text, params(WrapMode::Paragraph, 200, 400))
                .unwrap();
        let columns = r.columns().unwrap();
        // 160px budget / 9px space.
        assert_eq!(columns, 17);
        for frame in r.frames() {
            for line in frame.unwrap().layout.lines {
                assert!(line.text.chars().count() <= columns, "{:?}", line.text);
            }
        }
    }

    #[test]
    fn programming_font_is_fitted_on_wrapped_text() {
        let text = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10";
        let r = TypingRenderer::new(MarkBackend, text, params(WrapMode::Programming, 800, 100))
            .unwrap();
        assert_eq!(r.font_size(), 18.0);
    }

    #[test]
    fn paragraph_font_shrinks_for_long_text() {
        let text = "word ".repeat(200);
        let r = TypingRenderer::new(MarkBackend, text, params(WrapMode::Paragraph, 800, 100))
            .unwrap();
        assert_eq!(r.font_size(), 8.0);
    }

    #[test]
    fn rendering_is_deterministic() {
        let text = "deterministic output";
        let p = params(WrapMode::Paragraph, 200, 100);
        let a = TypingRenderer::new(MarkBackend, text, p.clone())
            .unwrap()
            .render_all()
            .unwrap();
        let b = TypingRenderer::new(MarkBackend, text, p)
            .unwrap()
            .render_all()
            .unwrap();
        let a: Vec<_> = a.into_iter().map(|f| f.image.data).collect();
        let b: Vec<_> = b.into_iter().map(|f| f.image.data).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_frame_is_an_error() {
        let mut r =
            TypingRenderer::new(MarkBackend, "ab", params(WrapMode::Paragraph, 800, 400)).unwrap();
        assert!(r.render_frame(2).is_err());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut p = params(WrapMode::Paragraph, 800, 400);
        p.line_spacing = 0.0;
        assert!(TypingRenderer::new(MarkBackend, "a", p).is_err());

        let mut p = params(WrapMode::Paragraph, 800, 400);
        p.font_size = -3.0;
        assert!(TypingRenderer::new(MarkBackend, "a", p).is_err());

        let mut p = params(WrapMode::Paragraph, 800, 400);
        p.font_size = 3.0e7;
        assert!(TypingRenderer::new(MarkBackend, "a", p).is_err());
    }
}
