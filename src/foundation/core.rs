use crate::foundation::error::{TypeBytesError, TypeBytesResult};

/// Margin kept clear on every side of the canvas, in pixels.
pub const MARGIN_PX: u32 = 20;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> TypeBytesResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    pub fn validate(&self) -> TypeBytesResult<()> {
        if self.width <= 2 * MARGIN_PX || self.height <= 2 * MARGIN_PX {
            return Err(TypeBytesError::validation(format!(
                "canvas {}x{} leaves no room inside the {MARGIN_PX}px margins",
                self.width, self.height
            )));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(TypeBytesError::validation(format!(
                "canvas {}x{} exceeds the {}px raster limit",
                self.width,
                self.height,
                u16::MAX
            )));
        }
        Ok(())
    }

    /// Horizontal pixel budget for one line of text.
    pub fn text_width(&self) -> f32 {
        self.width.saturating_sub(2 * MARGIN_PX) as f32
    }

    /// Vertical pixel budget for the whole block of text.
    pub fn text_height(&self) -> f32 {
        self.height.saturating_sub(2 * MARGIN_PX) as f32
    }
}

/// Straight (non-premultiplied) RGBA8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            ((u16::from(c) * u16::from(a) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}
