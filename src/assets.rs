use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{TypeBytesError, TypeBytesResult};

pub mod color;
pub mod font;
pub mod media;
pub mod text;

/// A directory of named asset files (fonts, typing sounds).
#[derive(Clone, Debug)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` inside this directory. Absolute paths and `..` are rejected.
    pub fn resolve(&self, name: &str) -> TypeBytesResult<PathBuf> {
        let norm = normalize_rel_path(name)?;
        Ok(self.root.join(Path::new(&norm)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn read_bytes(&self, name: &str) -> TypeBytesResult<Vec<u8>> {
        let path = self.resolve(name)?;
        std::fs::read(&path)
            .with_context(|| format!("read asset bytes from '{}'", path.display()))
            .map_err(TypeBytesError::from)
    }
}

/// Normalize a relative asset path.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> TypeBytesResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(TypeBytesError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(TypeBytesError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(TypeBytesError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(TypeBytesError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_spaces_and_strips_dots() {
        assert_eq!(
            normalize_rel_path("./Speed Typing.mp3").unwrap(),
            "Speed Typing.mp3"
        );
        assert_eq!(normalize_rel_path("a\\b.ttf").unwrap(), "a/b.ttf");
    }

    #[test]
    fn normalize_rejects_escapes() {
        assert!(normalize_rel_path("/etc/passwd").is_err());
        assert!(normalize_rel_path("../font.ttf").is_err());
        assert!(normalize_rel_path("./").is_err());
        assert!(normalize_rel_path("").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = AssetDir::new("target/definitely-missing-assets");
        assert!(!dir.contains("nope.ttf"));
        let err = dir.read_bytes("nope.ttf").unwrap_err();
        assert!(err.to_string().contains("nope.ttf"));
    }
}
