//! Browser Surface Hub
//!
//! Every display surface is a *panel* with a numeric id. Browser pages
//! attach to a panel over WebSocket and receive its messages.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator --post--> PanelSurface --> SurfaceHub --[panel id]--> Clients
//!                                             ^                          |
//!                                             +--------[attach/close]----+
//! ```
//!
//! Lock order: `clients` may be held while taking `panels`, never the reverse.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::{DisplaySurface, SurfaceMessage};
use crate::core::SessionKey;
use crate::session::Disposable;
use crate::workbench::OpenedSurface;

pub type PanelId = u64;

/// Panel state kept by the hub.
struct Panel {
    key: SessionKey,
    title: String,
    /// Latest message, replayed to viewers that attach later
    snapshot: Option<String>,
    /// Fires the "closed by user" signal (taken once)
    closed_tx: Option<oneshot::Sender<()>>,
}

/// A connected viewer.
pub(super) struct Client {
    pub(super) ws: WebSocket<TcpStream>,
    /// Panel this viewer is attached to
    pub(super) panel: Option<PanelId>,
}

/// Public view of a panel (for rendering its page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelInfo {
    pub id: PanelId,
    pub key: SessionKey,
    pub title: String,
}

/// Shared registry of panels and viewer connections.
pub struct SurfaceHub {
    next_id: AtomicU64,
    panels: Mutex<FxHashMap<PanelId, Panel>>,
    pub(super) clients: Mutex<Vec<Client>>,
    /// Base URL of the HTTP server, e.g. `http://127.0.0.1:5277`
    base_url: Mutex<String>,
}

impl SurfaceHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            panels: Mutex::new(FxHashMap::default()),
            clients: Mutex::new(Vec::new()),
            base_url: Mutex::new(String::new()),
        })
    }

    /// Set the base URL used in panel locations.
    pub fn set_base_url(&self, url: impl Into<String>) {
        *self.base_url.lock() = url.into();
    }

    /// URL of a panel's page.
    pub fn panel_url(&self, id: PanelId) -> String {
        format!("{}/preview/{}", self.base_url.lock(), id)
    }

    /// Open a new panel for `key`.
    pub fn open(self: &Arc<Self>, key: &SessionKey, title: &str) -> OpenedSurface {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (closed_tx, closed) = oneshot::channel();

        self.panels.lock().insert(
            id,
            Panel {
                key: key.clone(),
                title: title.to_string(),
                snapshot: None,
                closed_tx: Some(closed_tx),
            },
        );
        crate::debug!("surface"; "opened panel {} for {}", id, key);

        OpenedSurface {
            surface: Box::new(PanelSurface {
                id,
                hub: Arc::clone(self),
            }),
            closed,
        }
    }

    pub fn panel(&self, id: PanelId) -> Option<PanelInfo> {
        self.panels.lock().get(&id).map(|p| PanelInfo {
            id,
            key: p.key.clone(),
            title: p.title.clone(),
        })
    }

    /// Deliver a message to every viewer of `id`.
    pub(super) fn post(&self, id: PanelId, message: &SurfaceMessage) {
        let json = message.to_json();
        {
            let mut panels = self.panels.lock();
            let Some(panel) = panels.get_mut(&id) else {
                crate::debug!("surface"; "post to unknown panel {}", id);
                return;
            };
            if message.is_snapshot() {
                panel.snapshot = Some(json.clone());
            }
        }
        self.send_to_panel(id, Message::Text(json.into()));
    }

    /// Host-side teardown: forget the panel and disconnect its viewers.
    ///
    /// Dropping the close sender here means the session's close handler
    /// never fires for a host-initiated dispose.
    pub(super) fn dispose(&self, id: PanelId) {
        if self.panels.lock().remove(&id).is_none() {
            return;
        }
        self.disconnect_panel(id);
        crate::debug!("surface"; "disposed panel {}", id);
    }

    /// User-side teardown: a viewer asked to close the panel.
    ///
    /// Returns whether a close signal was delivered.
    pub fn close_from_viewer(&self, id: PanelId) -> bool {
        let Some(mut panel) = self.panels.lock().remove(&id) else {
            return false;
        };
        self.disconnect_panel(id);

        match panel.closed_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Snapshot messages for a viewer attaching to `id`, or `None` for an
    /// unknown panel.
    pub(super) fn attach_messages(&self, id: PanelId) -> Option<Vec<String>> {
        let panels = self.panels.lock();
        let panel = panels.get(&id)?;

        let mut messages = vec![SurfaceMessage::Ready.to_json()];
        messages.extend(panel.snapshot.clone());
        Some(messages)
    }

    fn disconnect_panel(&self, id: PanelId) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|client| {
            if client.panel == Some(id) {
                let _ = client.ws.close(None);
                let _ = client.ws.flush();
                false
            } else {
                true
            }
        });
    }

    fn send_to_panel(&self, id: PanelId, msg: Message) {
        let mut clients = self.clients.lock();
        let mut sent = 0;

        clients.retain_mut(|client| {
            if client.panel != Some(id) {
                return true;
            }
            match client.ws.send(msg.clone()) {
                Ok(()) => {
                    sent += 1;
                    true
                }
                // Frame is queued; the reader loop keeps flushing it.
                Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    sent += 1;
                    true
                }
                Err(e) => {
                    crate::debug!("surface"; "viewer disconnected: {}", e);
                    false
                }
            }
        });

        if sent > 0 {
            crate::debug!("surface"; "sent to {} viewer(s) of panel {}", sent, id);
        }
    }
}

#[cfg(test)]
impl SurfaceHub {
    pub fn panel_count(&self) -> usize {
        self.panels.lock().len()
    }

    /// Latest message posted to a panel.
    pub fn snapshot(&self, id: PanelId) -> Option<String> {
        self.panels.lock().get(&id).and_then(|p| p.snapshot.clone())
    }
}

/// A session's handle to its hub panel.
pub struct PanelSurface {
    id: PanelId,
    hub: Arc<SurfaceHub>,
}

impl Disposable for PanelSurface {
    fn dispose(self: Box<Self>) {
        self.hub.dispose(self.id);
    }
}

impl DisplaySurface for PanelSurface {
    fn post(&self, message: &SurfaceMessage) {
        self.hub.post(self.id, message);
    }

    fn location(&self) -> Option<String> {
        Some(self.hub.panel_url(self.id))
    }
}
