//! WebSocket Server for Display Surfaces
//!
//! Accepts viewer connections and hands them to the [`SurfaceHub`].

use std::net::{IpAddr, TcpListener};
use std::sync::Arc;

use anyhow::Result;

use super::hub::SurfaceHub;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Start the viewer WebSocket server. Returns the port actually bound.
///
/// Spawns the acceptor thread and the reader thread that polls viewers
/// for `attach`/`close` messages.
pub fn start_surface_server(interface: IpAddr, base_port: u16, hub: Arc<SurfaceHub>) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    let reader_hub = Arc::clone(&hub);
    std::thread::spawn(move || SurfaceHub::client_reader_loop(reader_hub));

    std::thread::spawn(move || {
        loop {
            if crate::core::is_shutdown() {
                break;
            }
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("surface"; "viewer connecting: {}", addr);

                    // Set blocking for the WebSocket handshake
                    let _ = stream.set_nonblocking(false);

                    let hub = Arc::clone(&hub);
                    std::thread::spawn(move || hub.add_client(stream));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
                Err(e) => {
                    crate::log!("surface"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
