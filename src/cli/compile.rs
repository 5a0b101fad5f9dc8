//! `compile` command: build one document and report the result.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::compiler::{CompileResult, Compiler, LytexCompiler};
use crate::config::PreviewConfig;
use crate::core::SessionKey;
use crate::logger::{status_error, status_success, status_warning};

/// Compile `file` once. Returns whether the build succeeded.
///
/// Bad input (no file, wrong extension, missing file) is an error; a failed
/// build is reported and returns `Ok(false)`.
pub fn compile_file(config: &PreviewConfig, file: Option<&Path>) -> Result<bool> {
    let key = validate_input(file, &config.compile.extension)?;
    let compiler = LytexCompiler::from_config(&config.compile)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;
    let result = runtime.block_on(compiler.compile(key.path()));

    Ok(report(&key, &result))
}

fn validate_input(file: Option<&Path>, extension: &str) -> Result<SessionKey> {
    let Some(file) = file else {
        bail!("No file selected for compilation");
    };
    let key = SessionKey::new(file);
    if !key.has_extension(extension) {
        bail!("Please select a .{} file for compilation", extension);
    }
    if !key.path().is_file() {
        bail!("File not found: {}", key);
    }
    Ok(key)
}

fn report(key: &SessionKey, result: &CompileResult) -> bool {
    if !result.success {
        status_error(
            &format!("Compilation failed: {}", result.error_message()),
            result.stderr.trim(),
        );
        return false;
    }

    let summary = format!("Successfully compiled: {}", key.file_name());
    let stderr = result.stderr.trim();
    if stderr.is_empty() {
        status_success(&summary);
    } else {
        status_warning(&summary, &format!("Compilation warning: {stderr}"));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_missing_argument() {
        let err = validate_input(None, "lytex").unwrap_err();
        assert_eq!(err.to_string(), "No file selected for compilation");
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let err = validate_input(Some(Path::new("notes.tex")), "lytex").unwrap_err();
        assert_eq!(err.to_string(), "Please select a .lytex file for compilation");
    }

    #[test]
    fn test_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_input(Some(&dir.path().join("song.lytex")), "lytex").unwrap_err();
        assert!(err.to_string().starts_with("File not found"));
    }

    #[test]
    fn test_accepts_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.lytex");
        std::fs::write(&file, "\\documentclass{article}").unwrap();

        let key = validate_input(Some(&file), "lytex").unwrap();
        assert_eq!(key.file_name(), "song.lytex");
    }

    #[test]
    fn test_report_outcome() {
        let key = SessionKey::new("/scores/song.lytex");
        let ok = CompileResult::succeeded("/scores/song.pdf".into(), String::new(), String::new());
        assert!(report(&key, &ok));

        // Warnings on stderr do not fail the build.
        let warned = CompileResult::succeeded("/scores/song.pdf".into(), String::new(), "overfull hbox".into());
        assert!(report(&key, &warned));

        let failed = CompileResult::failed("exit status 1", String::new(), String::new());
        assert!(!report(&key, &failed));
    }
}
