use std::sync::Arc;

use crate::assets::AssetDir;
use crate::foundation::error::{TypeBytesError, TypeBytesResult};

pub const DEFAULT_FONT: &str = "SourceCodePro-Black.ttf";

/// Font files the font directory is expected to carry.
pub const FONT_CHOICES: &[&str] = &[
    "DejaVuMathTeXGyre.ttf",
    "FiraCode-Medium.ttf",
    "InputMono-Light.ttf",
    "JetBrainsMono-Thin.ttf",
    "ProggyCrossed Regular Mac.ttf",
    "SourceCodePro-Black.ttf",
    "arial.ttf",
    "calibri.ttf",
    "mukta-malar-extralight.ttf",
    "noto-sans-arabic-medium.ttf",
    "times new roman.ttf",
    "ANGSA.ttf",
    "Book-Antiqua.ttf",
    "CONSOLA.TTF",
    "COOPBL.TTF",
    "Rockwell-Bold.ttf",
    "Candara Light.TTF",
    "Carlito-Regular.ttf",
    "Castellar.ttf",
    "Courier New.ttf",
    "LSANS.TTF",
    "Lucida Bright Regular.ttf",
    "TRTempusSansITC.ttf",
    "Verdana.ttf",
    "bell-mt.ttf",
    "eras-itc-light.ttf",
    "fonnts.com-aptos-light.ttf",
    "georgia.ttf",
    "segoeuithis.ttf",
    "youyuan.TTF",
    "TfPonetoneExpanded-7BJZA.ttf",
];

pub const FONT_SIZE_CHOICES: &[f32] = &[16.0, 18.0, 20.0, 22.0, 24.0];

/// Raw font file contents plus the name it was loaded under.
#[derive(Clone)]
pub struct FontSource {
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl std::fmt::Debug for FontSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSource")
            .field("name", &self.name)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

impl FontSource {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> TypeBytesResult<Self> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(TypeBytesError::validation(format!(
                "font '{name}' is empty"
            )));
        }
        Ok(Self {
            name,
            bytes: Arc::new(bytes),
        })
    }

    pub fn load(dir: &AssetDir, name: &str) -> TypeBytesResult<Self> {
        let bytes = dir.read_bytes(name)?;
        tracing::debug!(font = name, bytes = bytes.len(), "loaded font");
        Self::from_bytes(name, bytes)
    }
}
