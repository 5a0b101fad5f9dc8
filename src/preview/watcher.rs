//! Per-session save watcher.
//!
//! ```text
//! save events ──► listener ──try_send──► [trigger; cap 1] ──► worker ──► recompile
//! (broadcast)     (path filter)                               (one at a time)
//! ```
//!
//! Recompiles are serialized and coalesced: a save during a running compile
//! queues one follow-up, and further saves while that follow-up is queued
//! are absorbed by it.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::Orchestrator;
use crate::core::SessionKey;
use crate::session::{Disposable, SessionId};

/// A document finished saving. `path` is normalized like [`SessionKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    pub path: PathBuf,
}

/// Save subscription of one session.
///
/// Disposing stops the listener. The worker finishes an in-flight compile,
/// then exits at its next trigger or once the trigger channel closes. It never
/// recompiles for a later session that reuses the same key.
pub struct SaveWatcher {
    key: SessionKey,
    listener: JoinHandle<()>,
}

impl SaveWatcher {
    pub fn spawn(orchestrator: Orchestrator, key: SessionKey, id: SessionId) -> Self {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        // Subscribe now so no save between spawn and first poll is missed.
        let mut saves = orchestrator.subscribe_saves();

        let listen_key = key.clone();
        let listener = tokio::spawn(async move {
            loop {
                match saves.recv().await {
                    Ok(doc) if doc.path == listen_key.path() => {
                        // Full means a compile is already queued.
                        let _ = trigger_tx.try_send(());
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        crate::debug!("watch"; "{} missed {} save event(s)", listen_key, skipped);
                        let _ = trigger_tx.try_send(());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let work_key = key.clone();
        tokio::spawn(async move {
            while trigger_rx.recv().await.is_some() {
                if !orchestrator.registry().is_current(&work_key, id) {
                    break;
                }
                orchestrator.recompile(&work_key, id).await;
            }
            crate::debug!("watch"; "recompile worker exited: {} {}", work_key, id);
        });

        Self { key, listener }
    }
}

impl Disposable for SaveWatcher {
    fn dispose(self: Box<Self>) {
        self.listener.abort();
        crate::debug!("watch"; "stopped watching {}", self.key);
    }
}
