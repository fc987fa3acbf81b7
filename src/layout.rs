//! Line breaking and font fitting for typed text.
//!
//! Paragraph text is wrapped by *columns*: the pixel budget divided by the width of one space
//! glyph. Proportional fonts can overshoot or undershoot the real pixel width.

use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::foundation::core::{Canvas, MARGIN_PX};
use crate::foundation::error::{TypeBytesError, TypeBytesResult};
use crate::render::TextBackend;

/// Smallest font size the fitting search will try.
pub const MIN_FONT_SIZE_PX: f32 = 1.0;

/// Largest font size a job may request.
pub const MAX_FONT_SIZE_PX: f32 = 4096.0;

const TAB_SIZE: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WrapMode {
    /// Reflow text to the canvas width.
    #[default]
    #[serde(alias = "paragraph")]
    Paragraph,
    /// Keep the text's own line breaks; never reflow.
    #[serde(alias = "programming")]
    Programming,
}

impl FromStr for WrapMode {
    type Err = TypeBytesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paragraph" => Ok(Self::Paragraph),
            "programming" => Ok(Self::Programming),
            other => Err(TypeBytesError::validation(format!(
                "unknown text format \"{other}\" (expected paragraph or programming)"
            ))),
        }
    }
}

/// One line of text positioned on the canvas (top-left of the line box).
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameLayout {
    pub font_size: f32,
    pub lines: Vec<PlacedLine>,
}

impl FrameLayout {
    pub fn line_texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Number of wrap columns for a pixel budget, using one space glyph as the column width.
pub fn wrap_columns(budget_px: f32, space_width_px: f32) -> TypeBytesResult<usize> {
    if !space_width_px.is_finite() || space_width_px <= 0.0 {
        return Err(TypeBytesError::layout(format!(
            "space glyph width must be finite and > 0 (got {space_width_px})"
        )));
    }
    let columns = (budget_px / space_width_px).floor();
    if !columns.is_finite() || columns < 1.0 {
        return Err(TypeBytesError::layout(format!(
            "a {budget_px}px line cannot hold a single {space_width_px}px space"
        )));
    }
    Ok(columns as usize)
}

/// Split `text` on its own line breaks.
///
/// A trailing break does not produce a trailing empty line; interior empty lines are kept.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if is_line_break(c) {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            lines.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\x0b'
            | '\x0c'
            | '\x1c'
            | '\x1d'
            | '\x1e'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

fn is_wrap_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

#[derive(Debug)]
struct Chunk {
    text: String,
    width: usize,
    is_space: bool,
}

impl Chunk {
    fn new(text: String) -> Self {
        let is_space = !text.is_empty() && text.chars().all(|c| c == ' ');
        Self {
            width: text.width(),
            text,
            is_space,
        }
    }
}

/// Greedy word wrap to `columns` display columns.
///
/// Every whitespace character counts as one space (tabs expand to the next multiple of 8),
/// whitespace is dropped at wrapped line starts and at line ends, whitespace-only lines are not
/// emitted, and words wider than a line are broken at grapheme boundaries.
pub fn wrap_paragraph(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut chunks = split_chunks(&normalize_whitespace(text));
    chunks.reverse();

    let mut lines: Vec<String> = Vec::new();
    while !chunks.is_empty() {
        let mut cur: Vec<Chunk> = Vec::new();
        let mut cur_width = 0usize;

        if !lines.is_empty() && chunks.last().is_some_and(|c| c.is_space) {
            chunks.pop();
        }

        while let Some(chunk) = chunks.pop() {
            if cur_width + chunk.width > columns {
                chunks.push(chunk);
                break;
            }
            cur_width += chunk.width;
            cur.push(chunk);
        }

        if let Some(chunk) = chunks.pop() {
            if chunk.width > columns {
                let space_left = columns.saturating_sub(cur_width);
                let (head, tail) = split_at_width(&chunk.text, space_left, cur.is_empty());
                if !head.is_empty() {
                    cur.push(Chunk::new(head));
                }
                if !tail.is_empty() {
                    chunks.push(Chunk::new(tail));
                }
            } else {
                chunks.push(chunk);
            }
        }

        if cur.last().is_some_and(|c| c.is_space) {
            cur.pop();
        }
        if !cur.is_empty() {
            lines.push(cur.iter().map(|c| c.text.as_str()).collect());
        }
    }

    lines
}

fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut col = 0usize;
    for c in text.chars() {
        match c {
            '\t' => {
                let pad = TAB_SIZE - (col % TAB_SIZE);
                out.extend(std::iter::repeat_n(' ', pad));
                col += pad;
            }
            '\n' | '\r' => {
                out.push(' ');
                col = 0;
            }
            c if is_wrap_space(c) => {
                out.push(' ');
                col += 1;
            }
            c => {
                out.push(c);
                col += 1;
            }
        }
    }
    out
}

fn split_chunks(text: &str) -> Vec<Chunk> {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_space = false;

    for (i, grapheme) in graphemes.iter().enumerate() {
        let is_space = grapheme.chars().all(|c| c == ' ');
        if is_space != in_space && !current.is_empty() {
            chunks.push(Chunk::new(std::mem::take(&mut current)));
        }
        current.push_str(grapheme);
        in_space = is_space;

        if breaks_after_hyphen(&graphemes, i) {
            chunks.push(Chunk::new(std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(current));
    }
    chunks
}

/// A single `-` between two letters ends a chunk, so `well-known` can wrap as `well-` `known`.
fn breaks_after_hyphen(graphemes: &[&str], i: usize) -> bool {
    let is_letter = |g: Option<&&str>| {
        g.and_then(|g| g.chars().next())
            .is_some_and(char::is_alphabetic)
    };
    graphemes[i] == "-"
        && i > 0
        && is_letter(graphemes.get(i - 1))
        && is_letter(graphemes.get(i + 1))
}

/// Split `word` so the head fits `max_width` columns. With `force_one`, the head always takes at
/// least one grapheme so wrapping makes progress.
fn split_at_width(word: &str, max_width: usize, force_one: bool) -> (String, String) {
    let mut head_width = 0usize;
    let mut split = 0usize;

    for (idx, grapheme) in word.grapheme_indices(true) {
        let w = grapheme.width();
        if head_width + w > max_width {
            if split == 0 && force_one {
                split = idx + grapheme.len();
            }
            break;
        }
        head_width += w;
        split = idx + grapheme.len();
    }

    (word[..split].to_owned(), word[split..].to_owned())
}

/// Break `text` into lines according to `mode`. `columns` is only consulted for paragraphs.
pub fn break_lines(text: &str, mode: WrapMode, columns: usize) -> Vec<String> {
    match mode {
        WrapMode::Paragraph => wrap_paragraph(text, columns),
        WrapMode::Programming => split_lines(text),
    }
}

/// Columns for `size_px` text on `canvas`, or `None` when `mode` does not wrap.
pub fn columns_for<B: TextBackend + ?Sized>(
    backend: &mut B,
    mode: WrapMode,
    canvas: Canvas,
    size_px: f32,
) -> TypeBytesResult<Option<usize>> {
    match mode {
        WrapMode::Paragraph => {
            let space = backend.space_width(size_px)?;
            wrap_columns(canvas.text_width(), space).map(Some)
        }
        WrapMode::Programming => Ok(None),
    }
}

/// Sum of per-line heights, without line spacing.
pub fn block_height<B: TextBackend + ?Sized>(
    backend: &mut B,
    lines: &[String],
    size_px: f32,
) -> TypeBytesResult<f32> {
    let mut total = 0.0f32;
    for line in lines {
        total += backend.line_height(line, size_px)?;
    }
    Ok(total)
}

/// Largest size, stepping down by 1px from `requested_px`, at which all of `text` fits inside
/// the canvas margins.
///
/// The whole text is always measured paragraph-wrapped to the canvas width, whatever mode the
/// frames are laid out in.
#[tracing::instrument(skip(backend, text), fields(chars = text.chars().count()))]
pub fn fit_font_size<B: TextBackend + ?Sized>(
    backend: &mut B,
    text: &str,
    canvas: Canvas,
    requested_px: f32,
) -> TypeBytesResult<f32> {
    validate_font_size(requested_px)?;

    let budget = canvas.text_height();
    let steps = (requested_px - MIN_FONT_SIZE_PX).floor() as u32;
    for step in 0..=steps {
        let size = requested_px - step as f32;
        let space = backend.space_width(size)?;
        let columns = match wrap_columns(canvas.text_width(), space) {
            Ok(c) => c,
            Err(TypeBytesError::Layout(reason)) => {
                tracing::debug!(size, %reason, "no wrap columns at this size");
                continue;
            }
            Err(e) => return Err(e),
        };

        let lines = wrap_paragraph(text, columns);
        let height = block_height(backend, &lines, size)?;
        if height <= budget {
            if step > 0 {
                tracing::info!(requested_px, size, "shrunk font size to fit canvas");
            }
            return Ok(size);
        }

        tracing::debug!(size, height, budget, "text too tall, shrinking");
    }

    Err(TypeBytesError::layout(format!(
        "text does not fit a {}x{} canvas at any font size down to {MIN_FONT_SIZE_PX}px",
        canvas.width, canvas.height
    )))
}

/// Requested sizes must lie in `MIN_FONT_SIZE_PX..=MAX_FONT_SIZE_PX`.
pub fn validate_font_size(size_px: f32) -> TypeBytesResult<()> {
    if !size_px.is_finite() || !(MIN_FONT_SIZE_PX..=MAX_FONT_SIZE_PX).contains(&size_px) {
        return Err(TypeBytesError::validation(format!(
            "font size must be between {MIN_FONT_SIZE_PX} and {MAX_FONT_SIZE_PX} (got {size_px})"
        )));
    }
    Ok(())
}

/// Place `lines` top-down from the top-left margin.
pub fn place_lines<B: TextBackend + ?Sized>(
    backend: &mut B,
    lines: Vec<String>,
    size_px: f32,
    line_spacing: f32,
) -> TypeBytesResult<FrameLayout> {
    let x = MARGIN_PX as f32;
    let mut y = MARGIN_PX as f32;
    let mut placed = Vec::with_capacity(lines.len());

    for text in lines {
        let height = backend.line_height(&text, size_px)?;
        placed.push(PlacedLine { text, x, y });
        y += height * line_spacing;
    }

    Ok(FrameLayout {
        font_size: size_px,
        lines: placed,
    })
}
