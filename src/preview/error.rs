//! Preview error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the compile-and-display routine.
///
/// None of these escape the orchestrator: each one becomes an `error`
/// surface message plus a user notification.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The compiler ran and reported failure.
    #[error("{0}")]
    CompileFailed(String),

    /// The compiler reported success but the PDF is not on disk.
    #[error("PDF file not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// Reading the PDF for transport failed.
    #[error("failed to read {}: {source}", path.display())]
    Transport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host could not open a display surface.
    #[error("failed to open preview: {0}")]
    Surface(String),
}
