//! Preview host: the orchestrator's runtime thread and its browser workbench.
//!
//! ```text
//! HTTP workers ──HostMsg──► host loop (current_thread runtime)
//!                              ├─ initial compile tasks
//!                              ├─ FsActor (saves → broadcast)
//!                              └─ save watchers / close handlers
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};

use crate::core::SessionKey;
use crate::preview::{Orchestrator, StartOutcome, StopOutcome};
use crate::session::Disposable;
use crate::status::StatusBar;
use crate::surface::hub::SurfaceHub;
use crate::watch::{FsActor, WatchHandle};
use crate::workbench::{Indicator, Level, OpenedSurface, Workbench};
use crate::log;

/// Requests from the HTTP side to the host loop.
pub enum HostMsg {
    Preview {
        file: Option<PathBuf>,
        reply: oneshot::Sender<StartOutcome>,
    },
    Stop {
        focused: Option<PathBuf>,
        reply: oneshot::Sender<StopOutcome>,
    },
    /// Tear down every session; replies with how many were running.
    Shutdown { reply: oneshot::Sender<usize> },
}

/// Browser panels for surfaces, the status bar for indicators, the
/// terminal for messages.
pub struct BrowserWorkbench {
    hub: Arc<SurfaceHub>,
    status: Arc<StatusBar>,
}

impl BrowserWorkbench {
    pub fn new(hub: Arc<SurfaceHub>, status: Arc<StatusBar>) -> Self {
        Self { hub, status }
    }
}

impl Workbench for BrowserWorkbench {
    fn open_surface(&self, key: &SessionKey, title: &str) -> Result<OpenedSurface> {
        if crate::core::is_shutdown() {
            anyhow::bail!("server is shutting down");
        }
        let opened = self.hub.open(key, title);
        if let Some(url) = opened.surface.location() {
            log!("preview"; "{} -> {}", key.file_name(), url);
        }
        Ok(opened)
    }

    fn show_indicator(&self, indicator: Indicator) -> Box<dyn Disposable> {
        self.status.show(indicator)
    }

    fn notify(&self, level: Level, message: &str) {
        notify_terminal(level, message);
    }
}

/// Print a user message with a prefix matching its severity.
pub fn notify_terminal(level: Level, message: &str) {
    let module = match level {
        Level::Info => "preview",
        Level::Warning => "warning",
        Level::Error => "error",
    };
    log!(module; "{}", message);
}

/// Start the host thread. `files` are previewed right away.
pub fn spawn_host(
    orchestrator: Orchestrator,
    fs_actor: FsActor,
    watch: WatchHandle,
    files: Vec<PathBuf>,
) -> Result<(mpsc::Sender<HostMsg>, JoinHandle<()>)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create host runtime")?;
    let (tx, rx) = mpsc::channel(32);

    let handle = thread::spawn(move || {
        runtime.block_on(run_host(orchestrator, fs_actor, watch, files, rx));
    });
    Ok((tx, handle))
}

async fn run_host(
    orchestrator: Orchestrator,
    fs_actor: FsActor,
    watch: WatchHandle,
    files: Vec<PathBuf>,
    mut rx: mpsc::Receiver<HostMsg>,
) {
    tokio::spawn(fs_actor.run());

    for file in files {
        start(&orchestrator, &watch, Some(file), None);
    }

    while let Some(msg) = rx.recv().await {
        match msg {
            HostMsg::Preview { file, reply } => start(&orchestrator, &watch, file, Some(reply)),
            HostMsg::Stop { focused, reply } => {
                let _ = reply.send(orchestrator.stop_preview(focused.as_deref()));
            }
            HostMsg::Shutdown { reply } => {
                let _ = reply.send(orchestrator.shutdown());
                break;
            }
        }
    }
    crate::debug!("serve"; "host loop stopped");
}

/// Register the session in the loop, then compile off it.
///
/// The reply goes out as soon as the session exists, so an HTTP worker is
/// never held for the length of a build.
fn start(
    orchestrator: &Orchestrator,
    watch: &WatchHandle,
    file: Option<PathBuf>,
    reply: Option<oneshot::Sender<StartOutcome>>,
) {
    if let Some(file) = &file
        && orchestrator.is_previewable(file)
    {
        watch.track(file);
    }

    let pending = orchestrator.open_preview(file.as_deref());
    let outcome = match &pending {
        Ok(pending) => pending.outcome(),
        Err(outcome) => outcome.clone(),
    };
    if let Some(reply) = reply {
        let _ = reply.send(outcome);
    }

    if let Ok(pending) = pending {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.finish_preview(pending).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbench_indicator_goes_to_status_bar() {
        let status = StatusBar::new();
        let workbench = BrowserWorkbench::new(SurfaceHub::new(), Arc::clone(&status));

        let handle = workbench.show_indicator(Indicator::for_session(&SessionKey::new(
            "/scores/song.lytex",
        )));
        assert_eq!(status.len(), 1);
        handle.dispose();
        assert_eq!(status.len(), 0);
    }

    #[test]
    fn test_workbench_opens_panel() {
        let hub = SurfaceHub::new();
        hub.set_base_url("http://127.0.0.1:5277");
        let workbench = BrowserWorkbench::new(Arc::clone(&hub), StatusBar::new());

        let opened = workbench
            .open_surface(&SessionKey::new("/scores/song.lytex"), "LyTeX Preview: song.lytex")
            .unwrap();
        assert_eq!(hub.panel_count(), 1);
        assert!(opened.surface.location().is_some());
    }
}
