//! FileSystem Actor
//!
//! Watches for document saves and publishes them to every session.
//! Implements the "Watcher-First" pattern: the watcher is attached before
//! any session starts, so no save is lost.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → saved_documents (filter) → broadcast<SavedDocument>
//!                ▲
//!           track(file) ── attach the file's directory if outside the root
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecommendedWatcher;
use rustc_hash::FxHashMap;
use tokio::sync::{broadcast, mpsc};

use crate::preview::SavedDocument;
use crate::utils::path::normalize_path;

// Pure timing and deduplication.
mod debouncer;
// Watch root attach/re-attach lifecycle.
mod roots;


use debouncer::{ChangeKind, Debouncer};
use roots::WatchRoots;

/// Requests extra directories to watch.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    track_tx: mpsc::UnboundedSender<PathBuf>,
}

impl WatchHandle {
    /// Make sure saves of `file` are observed.
    pub fn track(&self, file: &Path) {
        let dir = normalize_path(file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let _ = self.track_tx.send(dir);
    }
}

/// FileSystem Actor - watches for document saves
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    /// Watch-root consistency layer
    watch_roots: WatchRoots,
    /// Directories to add, from [`WatchHandle::track`]
    track_rx: mpsc::UnboundedReceiver<PathBuf>,
    /// Save events for session watchers
    saves: broadcast::Sender<SavedDocument>,
    debouncer: Debouncer,
    /// Extension (without dot) of previewable documents
    extension: String,
}

impl FsActor {
    /// Create a new FsActor with Watcher-First pattern
    ///
    /// The watcher starts immediately; events buffer until [`run`](Self::run).
    pub fn new(
        root: PathBuf,
        saves: broadcast::Sender<SavedDocument>,
        extension: &str,
        debounce: Duration,
    ) -> notify::Result<(Self, WatchHandle)> {
        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        // Missing roots are re-attached later
        let mut watch_roots = WatchRoots::new(normalize_path(&root));
        watch_roots.attach_existing(&mut watcher)?;

        let (track_tx, track_rx) = mpsc::unbounded_channel();

        let actor = Self {
            notify_rx,
            watcher,
            watch_roots,
            track_rx,
            saves,
            debouncer: Debouncer::new(debounce),
            extension: extension.to_string(),
        };
        Ok((actor, WatchHandle { track_tx }))
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            mut track_rx,
            saves,
            mut debouncer,
            extension,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                Some(dir) = track_rx.recv() => watch_roots.track(dir, &mut watcher),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    if let Some(raw) = debouncer.take_if_ready() {
                        publish(&saves, saved_documents(raw, &extension));
                    }
                }
            }
        }
        crate::debug!("watch"; "file watcher stopped");
    }
}

/// Keep settled writes of previewable documents.
fn saved_documents(raw: FxHashMap<PathBuf, ChangeKind>, extension: &str) -> Vec<SavedDocument> {
    let mut saved: Vec<_> = raw
        .into_iter()
        .filter(|(_, kind)| matches!(kind, ChangeKind::Created | ChangeKind::Modified))
        .filter(|(path, _)| path.extension().and_then(|e| e.to_str()) == Some(extension))
        .map(|(path, _)| SavedDocument { path })
        .collect();
    saved.sort_by(|a, b| a.path.cmp(&b.path));
    saved
}

fn publish(saves: &broadcast::Sender<SavedDocument>, documents: Vec<SavedDocument>) {
    for doc in documents {
        crate::debug!("watch"; "saved: {}", doc.path.display());
        // No receivers just means no session is running.
        let _ = saves.send(doc);
    }
}
