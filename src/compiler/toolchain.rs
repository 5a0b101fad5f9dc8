//! LilyPond/LaTeX toolchain detection.

use std::path::PathBuf;

use crate::workbench::{Level, Workbench};

/// Programs the bundled build script needs.
pub const REQUIRED_TOOLS: &[&str] = &["lilypond", "lilypond-book", "latexmk"];

pub const MISSING_WARNING: &str =
    "LilyPond is not installed or not in PATH. LyTeX compilation will not work.";

pub const INSTALL_HINT: &str = "Install LilyPond from https://lilypond.org/";

/// Lookup result for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub name: &'static str,
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    pub fn is_found(&self) -> bool {
        self.path.is_some()
    }
}

/// Look up every required program on PATH.
pub fn check_toolchain() -> Vec<ToolStatus> {
    REQUIRED_TOOLS
        .iter()
        .map(|&name| ToolStatus {
            name,
            path: which::which(name).ok(),
        })
        .collect()
}

/// Names of missing programs.
pub fn missing(statuses: &[ToolStatus]) -> Vec<&'static str> {
    statuses
        .iter()
        .filter(|s| !s.is_found())
        .map(|s| s.name)
        .collect()
}

/// Warn at startup when the toolchain is incomplete. Returns whether it is complete.
pub fn warn_if_missing(workbench: &dyn Workbench) -> bool {
    notify_missing(&missing(&check_toolchain()), workbench)
}

fn notify_missing(missing: &[&str], workbench: &dyn Workbench) -> bool {
    if missing.is_empty() {
        return true;
    }
    workbench.notify(Level::Warning, MISSING_WARNING);
    workbench.notify(Level::Warning, &format!("missing: {}", missing.join(", ")));
    workbench.notify(Level::Warning, INSTALL_HINT);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionKey;
    use crate::session::Disposable;
    use crate::workbench::{Indicator, OpenedSurface};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Notes(Mutex<Vec<(Level, String)>>);

    struct Noop;

    impl Disposable for Noop {
        fn dispose(self: Box<Self>) {}
    }

    impl Workbench for Notes {
        fn open_surface(&self, _key: &SessionKey, _title: &str) -> anyhow::Result<OpenedSurface> {
            anyhow::bail!("no surfaces here")
        }

        fn show_indicator(&self, _indicator: Indicator) -> Box<dyn Disposable> {
            Box::new(Noop)
        }

        fn notify(&self, level: Level, message: &str) {
            self.0.lock().push((level, message.to_string()));
        }
    }

    #[test]
    fn test_missing_tools_warn() {
        let notes = Notes::default();
        assert!(!notify_missing(&["lilypond", "latexmk"], &notes));

        let notes = notes.0.lock();
        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|(level, _)| *level == Level::Warning));
        assert_eq!(notes[0].1, MISSING_WARNING);
        assert_eq!(notes[1].1, "missing: lilypond, latexmk");
    }

    #[test]
    fn test_complete_toolchain_is_silent() {
        let notes = Notes::default();
        assert!(notify_missing(&[], &notes));
        assert!(notes.0.lock().is_empty());
    }

    #[test]
    fn test_check_covers_all_tools() {
        let statuses = check_toolchain();
        let names: Vec<_> = statuses.iter().map(|s| s.name).collect();
        assert_eq!(names, REQUIRED_TOOLS);
    }

    #[test]
    fn test_missing_filters_found() {
        let statuses = vec![
            ToolStatus {
                name: "lilypond",
                path: Some(PathBuf::from("/usr/bin/lilypond")),
            },
            ToolStatus {
                name: "latexmk",
                path: None,
            },
        ];
        assert_eq!(missing(&statuses), vec!["latexmk"]);
    }
}
