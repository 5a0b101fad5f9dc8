//! Compiler invocation.
//!
//! The orchestrator only sees the [`Compiler`] trait: one async call that
//! always resolves to a [`CompileResult`], with every failure folded in.

mod lytex;
pub mod toolchain;

pub use lytex::LytexCompiler;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Outcome of one compiler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileResult {
    pub success: bool,
    /// Produced artifact (set on success)
    pub pdf_path: Option<PathBuf>,
    /// Human-readable failure reason (set on failure)
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl CompileResult {
    pub fn succeeded(pdf_path: PathBuf, stdout: String, stderr: String) -> Self {
        Self {
            success: true,
            pdf_path: Some(pdf_path),
            error: None,
            stdout,
            stderr,
        }
    }

    pub fn failed(error: impl Into<String>, stdout: String, stderr: String) -> Self {
        Self {
            success: false,
            pdf_path: None,
            error: Some(error.into()),
            stdout,
            stderr,
        }
    }

    /// Failure reason, or a generic one if the compiler gave none.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown compilation error")
    }
}

/// Turns a source document into a PDF.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Never fails: spawn errors, non-zero exits and missing artifacts are
    /// all reported through [`CompileResult`].
    async fn compile(&self, source: &Path) -> CompileResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_fallback() {
        let result = CompileResult {
            success: false,
            ..Default::default()
        };
        assert_eq!(result.error_message(), "Unknown compilation error");

        let result = CompileResult::failed("undefined control sequence", String::new(), String::new());
        assert_eq!(result.error_message(), "undefined control sequence");
        assert!(result.pdf_path.is_none());
    }
}
