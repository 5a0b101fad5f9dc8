//! `[compile]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [compile]
//! command = ["bash", "~/bin/build-score.sh"]   # source path is appended
//! extension = "lytex"
//! ```
//!
//! Without `command`, the bundled `lilypond-book` + `latexmk` script is used.

use serde::{Deserialize, Serialize};

/// Compiler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Build command; the source path is appended as the last argument.
    pub command: Option<Vec<String>>,

    /// Extension (without dot) of previewable documents.
    pub extension: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            command: None,
            extension: "lytex".into(),
        }
    }
}
