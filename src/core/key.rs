//! Session identity.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::path::normalize_path;

/// Absolute path of a previewed source file. Identity of its session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(PathBuf);

impl SessionKey {
    /// Build a key from any spelling of the path (relative, `..`, symlinks).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(normalize_path(path.as_ref()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Whether the file carries `extension` (case-sensitive, without the dot).
    pub fn has_extension(&self, extension: &str) -> bool {
        self.0.extension().and_then(|e| e.to_str()) == Some(extension)
    }

    /// File name without its extension: `/a/song.lytex` -> `song`.
    pub fn base_name(&self) -> &str {
        self.0.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
    }

    /// File name with extension: `/a/song.lytex` -> `song.lytex`.
    pub fn file_name(&self) -> &str {
        self.0.file_name().and_then(|s| s.to_str()).unwrap_or_default()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for SessionKey {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        let key = SessionKey::new("/scores/song.lytex");
        assert_eq!(key.base_name(), "song");
        assert_eq!(key.file_name(), "song.lytex");
        assert!(key.has_extension("lytex"));
        assert!(!key.has_extension("tex"));
    }

    #[test]
    fn test_relative_and_absolute_spellings_match() {
        let cwd = std::env::current_dir().unwrap();
        let relative = SessionKey::new("not-there/song.lytex");
        let absolute = SessionKey::new(cwd.join("not-there/song.lytex"));
        assert_eq!(relative, absolute);
        assert!(relative.path().is_absolute());
    }

    #[test]
    fn test_missing_extension() {
        let key = SessionKey::new("/scores/README");
        assert!(!key.has_extension("lytex"));
        assert_eq!(key.base_name(), "README");
    }
}
