use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use super::{PreviewError, SaveWatcher, SavedDocument};
use crate::compiler::{CompileResult, Compiler};
use crate::core::SessionKey;
use crate::session::{Session, SessionId, SessionRegistry};
use crate::surface::SurfaceMessage;
use crate::transport::encode_artifact;
use crate::utils::plural::plural_count;
use crate::workbench::{Indicator, Level, OpenedSurface, Workbench};

/// Result of a start request, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new session exists; `compiled` tells how the first build went.
    Started {
        path: String,
        location: Option<String>,
        compiled: bool,
    },
    /// A new session exists and its first build is still running.
    Compiling {
        path: String,
        location: Option<String>,
    },
    /// A session for this file was already running.
    AlreadyActive {
        path: String,
        location: Option<String>,
    },
    /// Bad input (no file, wrong extension); nothing changed.
    Rejected { message: String },
    /// The host could not provide a surface; nothing changed.
    Failed { message: String },
}

/// A registered session whose initial compile has not run yet.
#[derive(Debug)]
pub struct PendingPreview {
    key: SessionKey,
    id: SessionId,
    location: Option<String>,
}

impl PendingPreview {
    /// What to report to a caller that does not wait for the first build.
    pub fn outcome(&self) -> StartOutcome {
        StartOutcome::Compiling {
            path: self.key.to_string(),
            location: self.location.clone(),
        }
    }
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    /// The focused document's session (if it had one) was stopped.
    Single { path: String, stopped: bool },
    /// Every session was stopped.
    All { count: usize },
}

/// Drives sessions: owns nothing itself, everything lives in the registry.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<SessionRegistry>,
    compiler: Arc<dyn Compiler>,
    workbench: Arc<dyn Workbench>,
    saves: broadcast::Sender<SavedDocument>,
    extension: Arc<str>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        compiler: Arc<dyn Compiler>,
        workbench: Arc<dyn Workbench>,
        saves: broadcast::Sender<SavedDocument>,
        extension: &str,
    ) -> Self {
        Self {
            registry,
            compiler,
            workbench,
            saves,
            extension: Arc::from(extension),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Whether `path` has the previewable extension.
    pub fn is_previewable(&self, path: &Path) -> bool {
        SessionKey::new(path).has_extension(&self.extension)
    }

    pub(super) fn subscribe_saves(&self) -> broadcast::Receiver<SavedDocument> {
        self.saves.subscribe()
    }

    /// Start previewing `file` and run the initial compilation.
    ///
    /// Must run inside a tokio runtime: the save watcher and the close
    /// handler are spawned onto it.
    pub async fn start_preview(&self, file: Option<&Path>) -> StartOutcome {
        match self.open_preview(file) {
            Ok(pending) => self.finish_preview(pending).await,
            Err(outcome) => outcome,
        }
    }

    /// First half of [`start_preview`](Self::start_preview): validate, open
    /// the surface and register the session. Nothing is compiled yet.
    ///
    /// There is no await between the active check and registration, so two
    /// starts for one file cannot both get a session.
    pub fn open_preview(&self, file: Option<&Path>) -> Result<PendingPreview, StartOutcome> {
        let Some(file) = file else {
            return Err(self.reject("No file selected for preview".into()));
        };

        let key = SessionKey::new(file);
        if !key.has_extension(&self.extension) {
            return Err(self.reject(format!(
                "Please select a .{} file for preview",
                self.extension
            )));
        }

        if self.registry.has_session(&key) {
            self.workbench
                .notify(Level::Info, "Preview session already active for this file!");
            return Err(StartOutcome::AlreadyActive {
                location: self.registry.surface_location(&key),
                path: key.to_string(),
            });
        }

        let title = format!("LyTeX Preview: {}", key.file_name());
        let OpenedSurface { surface, closed } = match self.workbench.open_surface(&key, &title) {
            Ok(opened) => opened,
            Err(e) => {
                let err = PreviewError::Surface(format!("{e:#}"));
                self.workbench.notify(Level::Error, &err.to_string());
                return Err(StartOutcome::Failed {
                    message: err.to_string(),
                });
            }
        };

        let id = SessionId::next();
        let indicator = self.workbench.show_indicator(Indicator::for_session(&key));
        let watcher = SaveWatcher::spawn(self.clone(), key.clone(), id);
        self.registry.create_session(Session::new(
            id,
            key.clone(),
            Box::new(watcher),
            indicator,
            surface,
        ));

        // Host-side disposal drops the sender, so only a user close gets through.
        let this = self.clone();
        let closed_key = key.clone();
        tokio::spawn(async move {
            if closed.await.is_ok() {
                this.on_surface_closed(&closed_key);
            }
        });

        self.workbench.notify(
            Level::Info,
            &format!("Preview session started for {}! Compiling...", key.file_name()),
        );

        Ok(PendingPreview {
            location: self.registry.surface_location(&key),
            key,
            id,
        })
    }

    /// Second half of [`start_preview`](Self::start_preview): the initial
    /// compilation of a session registered by [`open_preview`](Self::open_preview).
    pub async fn finish_preview(&self, pending: PendingPreview) -> StartOutcome {
        let PendingPreview { key, id, location } = pending;
        let name = key.file_name();

        let compiled = match self.compile_and_display(&key, id).await {
            Ok(()) => {
                self.workbench.notify(
                    Level::Info,
                    &format!("{name} compiled successfully! Save the file to auto-recompile."),
                );
                true
            }
            Err(e) => {
                self.workbench
                    .notify(Level::Error, &format!("Initial compilation failed: {e}"));
                false
            }
        };

        StartOutcome::Started {
            path: key.to_string(),
            location,
            compiled,
        }
    }

    fn reject(&self, message: String) -> StartOutcome {
        self.workbench.notify(Level::Error, &message);
        StartOutcome::Rejected { message }
    }

    /// Stop the focused document's session, or every session when the
    /// focused document is not previewable.
    pub fn stop_preview(&self, focused: Option<&Path>) -> StopOutcome {
        if let Some(file) = focused {
            let key = SessionKey::new(file);
            if key.has_extension(&self.extension) {
                let stopped = self.registry.stop_session(&key);
                self.workbench.notify(Level::Info, "Preview session stopped.");
                return StopOutcome::Single {
                    path: key.to_string(),
                    stopped,
                };
            }
        }

        let count = self
            .registry
            .all_session_paths()
            .iter()
            .filter(|key| self.registry.stop_session(key))
            .count();
        if count > 0 {
            self.workbench
                .notify(Level::Info, &format!("Stopped {count} preview session(s)."));
        }
        StopOutcome::All { count }
    }

    /// The user closed the surface: it is already gone, so stop everything else.
    pub fn on_surface_closed(&self, key: &SessionKey) {
        self.registry.mark_surface_disposed(key);
        if self.registry.stop_session(key) {
            self.workbench.notify(
                Level::Info,
                &format!(
                    "Preview session stopped for {} (preview closed).",
                    key.file_name()
                ),
            );
        }
    }

    /// Recompile after a save, with its own user messages.
    pub(super) async fn recompile(&self, key: &SessionKey, id: SessionId) {
        let name = key.file_name();
        self.workbench.notify(
            Level::Info,
            &format!("Auto-save detected for {name} - recompiling..."),
        );

        let result = self.compile_and_display(key, id).await;
        if !self.registry.is_current(key, id) {
            crate::debug!("preview"; "session ended during recompile: {} {}", key, id);
            return;
        }

        match result {
            Ok(()) => self
                .workbench
                .notify(Level::Info, &format!("Recompiled {name} successfully!")),
            Err(e) => self
                .workbench
                .notify(Level::Error, &format!("Recompilation failed: {e}")),
        }
    }

    /// Send `compile`, build, then send `compiled` or `error`.
    ///
    /// Errors are shown on the surface here and returned so the caller can
    /// word its own user message. Messages only reach session `id`: if the
    /// key changed hands meanwhile, the newer session's surface is left alone.
    pub async fn compile_and_display(
        &self,
        key: &SessionKey,
        id: SessionId,
    ) -> Result<(), PreviewError> {
        self.registry
            .send_message_to_session(key, id, &SurfaceMessage::Compile);

        let result = self.compiler.compile(key.path()).await;
        let outcome = match Self::artifact_message(result).await {
            Ok(message) => {
                self.registry.send_message_to_session(key, id, &message);
                Ok(())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            crate::debug!("preview"; "{}: {}", key.file_name(), e);
            self.registry
                .send_message_to_session(key, id, &SurfaceMessage::error(e.to_string()));
        }
        outcome
    }

    /// Check the compiler's claim and load the artifact.
    async fn artifact_message(result: CompileResult) -> Result<SurfaceMessage, PreviewError> {
        if !result.success {
            return Err(PreviewError::CompileFailed(result.error_message().to_string()));
        }
        let Some(pdf_path) = result.pdf_path else {
            return Err(PreviewError::CompileFailed(
                "compiler reported success without a PDF path".into(),
            ));
        };
        if !tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
            return Err(PreviewError::ArtifactMissing(pdf_path));
        }
        encode_artifact(&pdf_path).await
    }

    /// Tear down every session (process deactivation).
    pub fn shutdown(&self) -> usize {
        let count = self.registry.cleanup();
        if count > 0 {
            crate::log!("preview"; "stopped {}", plural_count(count, "session"));
        }
        count
    }
}
