//! External command execution.
//!
//! A small builder over `tokio::process` so the event loop never blocks on a
//! child process.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let output = Cmd::from_slice(&["bash", "compile.sh"])
//!     .arg(source)
//!     .cwd(source_dir)
//!     .run()
//!     .await?;
//! ```

use anyhow::{Context, Result};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Output, Stdio},
};

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    /// Create from a command array (e.g., `["latexmk"]` or `["bash", "compile.sh"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Run to completion and capture output.
    ///
    /// Only spawn/wait failures are errors; a non-zero exit is returned in
    /// [`Output::status`] for the caller to judge.
    pub async fn run(self) -> Result<Output> {
        let name = self.program_name();
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute `{name}`"))?;

        log_lines(&name, &String::from_utf8_lossy(&output.stdout));
        log_lines(&name, &String::from_utf8_lossy(&output.stderr));
        Ok(output)
    }
}

/// Log non-empty output lines (verbose only).
fn log_lines(name: &str, output: &str) {
    let lines: Vec<_> = output.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();
    if !lines.is_empty() {
        crate::debug!(name; "{}", lines.join("\n"));
    }
}

/// Format error message for a failed command.
pub fn format_failure(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut msg = format!("Command `{name}` failed with {}", output.status);

    let detail = stderr.trim();
    if !detail.is_empty() {
        msg.push('\n');
        msg.push_str(detail);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::from_slice(&["echo", "hello"])
            .arg("world")
            .arg("!")
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["bash", "compile.sh"]).arg("song.lytex");
        assert_eq!(cmd.program_name(), "bash");
        assert_eq!(cmd.args, vec![OsString::from("compile.sh"), OsString::from("song.lytex")]);
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::from_slice(&["echo"]).arg("").arg("a").arg("").arg("b");
        assert_eq!(cmd.args.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_simple_command() {
        let output = Cmd::from_slice(&["echo", "hello"]).run().await.unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_is_not_an_error() {
        let output = Cmd::from_slice(&["sh", "-c", "echo boom >&2; exit 3"])
            .run()
            .await
            .unwrap();
        assert!(!output.status.success());

        let msg = format_failure("sh", &output);
        assert!(msg.contains("Command `sh` failed"));
        assert!(msg.contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let result = Cmd::from_slice(&["lytex-preview-no-such-program"]).run().await;
        assert!(result.is_err());
    }
}
