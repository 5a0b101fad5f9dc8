//! `check` command: report the LilyPond/LaTeX toolchain.

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use crate::compiler::toolchain::{self, INSTALL_HINT, MISSING_WARNING, ToolStatus};
use crate::log;

pub fn check_toolchain() -> Result<()> {
    let statuses = toolchain::check_toolchain();
    for status in &statuses {
        log!("check"; "{}", describe(status));
    }

    let missing = toolchain::missing(&statuses);
    if !missing.is_empty() {
        log!("warning"; "{}", INSTALL_HINT);
        bail!("{} (missing: {})", MISSING_WARNING, missing.join(", "));
    }
    Ok(())
}

fn describe(status: &ToolStatus) -> String {
    match &status.path {
        Some(path) => format!("{} {} ({})", "✓".green(), status.name, path.display()),
        None => format!("{} {} not found", "✗".red(), status.name),
    }
}
