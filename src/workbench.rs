//! The host side of a preview: where surfaces open, indicators show, and
//! messages reach the user.
//!
//! The orchestrator only talks to [`Workbench`]; `serve` backs it with
//! browser panels and a terminal, tests back it with recorders.

use tokio::sync::oneshot;

use crate::core::SessionKey;
use crate::session::Disposable;
use crate::surface::DisplaySurface;

/// Severity of a user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// A freshly opened surface plus its "closed by user" signal.
///
/// `closed` resolves with `Ok(())` only when the user closed the surface.
/// Disposing the surface from the host drops the sender instead.
pub struct OpenedSurface {
    pub surface: Box<dyn DisplaySurface>,
    pub closed: oneshot::Receiver<()>,
}

/// A clickable status control that requests the stop command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub key: SessionKey,
    pub label: String,
    pub tooltip: String,
}

impl Indicator {
    /// `Preview: song` / `Click to stop preview session for song.lytex`.
    pub fn for_session(key: &SessionKey) -> Self {
        let base = key.base_name();
        Self {
            key: key.clone(),
            label: format!("Preview: {base}"),
            tooltip: format!("Click to stop preview session for {}", key.file_name()),
        }
    }
}

/// Host services used by the session orchestrator.
pub trait Workbench: Send + Sync {
    /// Open a display surface titled `title` for `key`.
    fn open_surface(&self, key: &SessionKey, title: &str) -> anyhow::Result<OpenedSurface>;

    /// Show a status indicator; disposing the handle removes it.
    fn show_indicator(&self, indicator: Indicator) -> Box<dyn Disposable>;

    /// Show a message to the user.
    fn notify(&self, level: Level, message: &str);
}
