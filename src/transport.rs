//! Artifact transport: PDF bytes to a `compiled` surface message.
//!
//! The PDF travels inline as standard (padded) base64; the panel page
//! decodes it with `atob` into a blob URL.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::preview::PreviewError;
use crate::surface::SurfaceMessage;

/// Read `pdf_path` and wrap it in a [`SurfaceMessage::Compiled`].
pub async fn encode_artifact(pdf_path: &Path) -> Result<SurfaceMessage, PreviewError> {
    let bytes = tokio::fs::read(pdf_path)
        .await
        .map_err(|source| PreviewError::Transport {
            path: pdf_path.to_path_buf(),
            source,
        })?;

    crate::debug!("transport"; "{} ({} bytes)", pdf_path.display(), bytes.len());

    Ok(SurfaceMessage::Compiled {
        pdf_data: STANDARD.encode(&bytes),
        pdf_path: pdf_path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_encode_artifact() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("song.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let message = encode_artifact(&pdf).await.unwrap();
        assert_eq!(
            message,
            SurfaceMessage::Compiled {
                pdf_data: "JVBERi0xLjQK".into(),
                pdf_path: pdf.display().to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_encode_missing_file() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("missing.pdf");

        let err = encode_artifact(&pdf).await.unwrap_err();
        assert!(matches!(err, PreviewError::Transport { .. }));
        assert!(err.to_string().contains("missing.pdf"));
    }
}
