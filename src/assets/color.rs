use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8;
use crate::foundation::error::TypeBytesError;

/// Color names offered by the background/text color choices.
pub const NAMED_COLORS: &[(&str, Rgba8)] = &[
    ("black", Rgba8::opaque(0, 0, 0)),
    ("white", Rgba8::opaque(255, 255, 255)),
    ("darkblue", Rgba8::opaque(0, 0, 139)),
    ("orange", Rgba8::opaque(255, 165, 0)),
    ("green", Rgba8::opaque(0, 128, 0)),
];

/// A color as written in a job: a name from [`NAMED_COLORS`] or a hex string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorDef {
    label: String,
    rgba: Rgba8,
}

impl ColorDef {
    pub fn rgba(&self) -> Rgba8 {
        self.rgba
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn black() -> Self {
        Self {
            label: "black".to_owned(),
            rgba: Rgba8::opaque(0, 0, 0),
        }
    }

    pub fn white() -> Self {
        Self {
            label: "white".to_owned(),
            rgba: Rgba8::opaque(255, 255, 255),
        }
    }
}

impl FromStr for ColorDef {
    type Err = TypeBytesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let rgba = parse_color(label).map_err(TypeBytesError::validation)?;
        Ok(Self {
            label: label.to_owned(),
            rgba,
        })
    }
}

impl std::fmt::Display for ColorDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for ColorDef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for ColorDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_color(s: &str) -> Result<Rgba8, String> {
    let lower = s.to_ascii_lowercase();
    if let Some((_, rgba)) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
        return Ok(*rgba);
    }
    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex);
    }

    let names: Vec<&str> = NAMED_COLORS.iter().map(|(name, _)| *name).collect();
    Err(format!(
        "unknown color \"{s}\" (expected one of {} or #RRGGBB[AA])",
        names.join(", ")
    ))
}

fn parse_hex(s: &str) -> Result<Rgba8, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !s.is_ascii() {
        return Err("hex color must be ASCII".to_owned());
    }

    match s.len() {
        6 => Ok(Rgba8::opaque(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Rgba8 {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: hex_byte(&s[6..8])?,
        }),
        _ => Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_named_colors_case_insensitively() {
        let c: ColorDef = "DarkBlue".parse().unwrap();
        assert_eq!(c.rgba(), Rgba8::opaque(0, 0, 139));
        let c: ColorDef = "orange".parse().unwrap();
        assert_eq!(c.rgba(), Rgba8::opaque(255, 165, 0));
    }

    #[test]
    fn parses_hex_rgb_and_rgba() {
        let c: ColorDef = serde_json::from_value(json!("#ff0000")).unwrap();
        assert_eq!(c.rgba(), Rgba8::opaque(255, 0, 0));

        let c: ColorDef = serde_json::from_value(json!("#0000ff80")).unwrap();
        assert_eq!(c.rgba().b, 255);
        assert_eq!(c.rgba().a, 128);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "chartreuse".parse::<ColorDef>().unwrap_err();
        assert!(err.to_string().contains("unknown color"));
        assert!("#12345".parse::<ColorDef>().is_err());
    }

    #[test]
    fn serializes_back_to_label() {
        let c: ColorDef = "green".parse().unwrap();
        assert_eq!(serde_json::to_value(&c).unwrap(), json!("green"));
    }
}
