use std::net::TcpStream;
use std::sync::Arc;

use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::hub::{Client, PanelId, SurfaceHub};

/// Message sent by a viewer page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ViewerMsg {
    /// `{"type":"attach","panel":3}`
    Attach(PanelId),
    /// `{"type":"close","panel":3}`
    Close(PanelId),
}

impl SurfaceHub {
    /// Accept a new viewer connection.
    pub fn add_client(&self, stream: TcpStream) {
        // Keep blocking mode during handshake, switch to non-blocking after
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("surface"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        // Read the attach message now so the first post after connect
        // already reaches this viewer.
        let panel = match Self::try_read_initial(&mut ws) {
            Some(ViewerMsg::Attach(id)) => self.greet(&mut ws, id).then_some(id),
            Some(ViewerMsg::Close(id)) => {
                self.close_from_viewer(id);
                None
            }
            None => None,
        };

        let mut clients = self.clients.lock();
        crate::debug!("surface"; "viewer connected (total: {}, panel: {:?})", clients.len() + 1, panel);
        clients.push(Client { ws, panel });
    }

    /// Send `ready` plus the panel's snapshot. `false` for unknown panels.
    fn greet(&self, ws: &mut WebSocket<TcpStream>, id: PanelId) -> bool {
        let Some(messages) = self.attach_messages(id) else {
            crate::debug!("surface"; "viewer attached to unknown panel {}", id);
            return false;
        };
        for json in messages {
            if let Err(e) = ws.send(Message::Text(json.into()))
                && !is_would_block(&e)
            {
                crate::debug!("surface"; "failed to greet viewer: {}", e);
                return false;
            }
        }
        true
    }

    /// Background thread to read viewer messages (non-blocking poll).
    pub fn client_reader_loop(hub: Arc<SurfaceHub>) {
        loop {
            std::thread::sleep(std::time::Duration::from_millis(100));
            if crate::core::is_shutdown() {
                return;
            }

            let mut closes = Vec::new();
            {
                let mut clients = hub.clients.lock();
                let mut disconnected = Vec::new();

                for (i, client) in clients.iter_mut().enumerate() {
                    // Push out frames queued by earlier non-blocking sends.
                    if let Err(e) = client.ws.flush()
                        && !is_would_block(&e)
                    {
                        disconnected.push(i);
                        continue;
                    }

                    match client.ws.read() {
                        Ok(Message::Text(text)) => match parse_viewer_message(&text) {
                            Some(ViewerMsg::Attach(id)) => {
                                if hub.greet(&mut client.ws, id) {
                                    client.panel = Some(id);
                                }
                            }
                            Some(ViewerMsg::Close(id)) => closes.push(id),
                            None => {}
                        },
                        Ok(Message::Close(_)) => disconnected.push(i),
                        Err(ref e) if is_would_block(e) => {}
                        Err(_) => disconnected.push(i),
                        _ => {}
                    }
                }

                for i in disconnected.into_iter().rev() {
                    crate::debug!("surface"; "viewer disconnected (panel: {:?})", clients[i].panel);
                    clients.remove(i);
                }
            }

            // Closing takes the client lock again, so run it outside.
            for id in closes {
                crate::debug!("surface"; "viewer closed panel {}", id);
                hub.close_from_viewer(id);
            }
        }
    }

    /// Try to read the viewer's first message.
    ///
    /// The page sends `attach` in its `onopen` callback; poll a few times
    /// with short delays to catch it.
    fn try_read_initial(ws: &mut WebSocket<TcpStream>) -> Option<ViewerMsg> {
        for _ in 0..5 {
            match ws.read() {
                Ok(Message::Text(text)) => {
                    if let Some(msg) = parse_viewer_message(&text) {
                        return Some(msg);
                    }
                }
                Err(ref e) if is_would_block(e) => {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                _ => break,
            }
        }
        None
    }
}

fn is_would_block(e: &tungstenite::Error) -> bool {
    matches!(e, tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock)
}

/// Parse a viewer message; anything unrecognized is ignored.
pub(super) fn parse_viewer_message(text: &str) -> Option<ViewerMsg> {
    let json = serde_json::from_str::<serde_json::Value>(text).ok()?;
    let panel = json.get("panel").and_then(serde_json::Value::as_u64)?;
    match json.get("type").and_then(|t| t.as_str())? {
        "attach" => Some(ViewerMsg::Attach(panel)),
        "close" => Some(ViewerMsg::Close(panel)),
        _ => None,
    }
}
