//! LyTeX compiler: `lilypond-book` + `latexmk` through a build command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{CompileResult, Compiler};
use crate::config::CompileConfig;
use crate::embed::COMPILE_SH;
use crate::utils::exec::{Cmd, format_failure};

/// Runs the build command with the source path appended, in the source's
/// directory, and expects `<dir>/<base>.pdf` afterwards.
#[derive(Debug, Clone)]
pub struct LytexCompiler {
    command: Vec<String>,
}

impl LytexCompiler {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Use the configured command, or the bundled script run with bash.
    pub fn from_config(config: &CompileConfig) -> Result<Self> {
        match &config.command {
            Some(command) => Ok(Self::new(command.clone())),
            None => {
                let script = install_script()?;
                Ok(Self::new(vec![
                    "bash".into(),
                    script.to_string_lossy().into_owned(),
                ]))
            }
        }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Artifact location for `source`.
    pub fn pdf_path_for(source: &Path) -> PathBuf {
        let base = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = source.parent().unwrap_or(Path::new("."));
        dir.join(format!("{base}.pdf"))
    }
}

/// Write the bundled script to a stable temp location.
fn install_script() -> Result<PathBuf> {
    let dir = std::env::temp_dir().join("lytex-preview");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join("compile.sh");
    std::fs::write(&path, COMPILE_SH)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    crate::debug!("compile"; "build script at {}", path.display());
    Ok(path)
}

#[async_trait]
impl Compiler for LytexCompiler {
    async fn compile(&self, source: &Path) -> CompileResult {
        let pdf_path = Self::pdf_path_for(source);
        let cwd = source.parent().unwrap_or(Path::new("."));
        let cmd = Cmd::from_slice(&self.command).arg(source).cwd(cwd);
        let name = cmd.program_name();

        crate::debug!("compile"; "{} {}", self.command.join(" "), source.display());

        let output = match cmd.run().await {
            Ok(output) => output,
            Err(e) => return CompileResult::failed(format!("{e:#}"), String::new(), String::new()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return CompileResult::failed(format_failure(&name, &output), stdout, stderr);
        }

        if tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
            CompileResult::succeeded(pdf_path, stdout, stderr)
        } else {
            CompileResult::failed("PDF file was not created after compilation", stdout, stderr)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> LytexCompiler {
        // `sh -c SCRIPT sh SOURCE` makes the source available as $1
        LytexCompiler::new(vec!["sh".into(), "-c".into(), script.into(), "sh".into()])
    }

    fn source(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("song.lytex");
        std::fs::write(&path, "\\begin{lilypond} c' \\end{lilypond}").unwrap();
        path
    }

    #[test]
    fn test_pdf_path_for() {
        assert_eq!(
            LytexCompiler::pdf_path_for(Path::new("/scores/song.lytex")),
            PathBuf::from("/scores/song.pdf")
        );
    }

    #[tokio::test]
    async fn test_compile_success() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir);
        let compiler = sh(r#"echo building; cp "$1" "${1%.lytex}.pdf""#);

        let result = compiler.compile(&src).await;
        assert!(result.success, "{result:?}");
        assert_eq!(result.pdf_path, Some(dir.path().join("song.pdf")));
        assert!(result.stdout.contains("building"));
    }

    #[tokio::test]
    async fn test_runs_in_source_directory() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir);
        let compiler = sh(r#"touch song.pdf"#);

        let result = compiler.compile(&src).await;
        assert!(result.success, "{result:?}");
    }

    #[tokio::test]
    async fn test_compile_nonzero_exit() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir);
        let compiler = sh("echo 'undefined control sequence' >&2; exit 1");

        let result = compiler.compile(&src).await;
        assert!(!result.success);
        assert!(result.error_message().contains("undefined control sequence"));
        assert!(result.stderr.contains("undefined control sequence"));
    }

    #[tokio::test]
    async fn test_compile_missing_pdf() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir);

        let result = sh("exit 0").compile(&src).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("PDF file was not created after compilation")
        );
    }

    #[tokio::test]
    async fn test_compile_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir);
        let compiler = LytexCompiler::new(vec!["/nonexistent/lytex-build-tool".into()]);

        let result = compiler.compile(&src).await;
        assert!(!result.success);
        assert!(result.error_message().contains("Failed to execute"));
    }

    #[test]
    fn test_from_config_default_installs_script() {
        let compiler = LytexCompiler::from_config(&CompileConfig::default()).unwrap();
        assert_eq!(compiler.command()[0], "bash");
        assert!(Path::new(&compiler.command()[1]).exists());
    }
}
