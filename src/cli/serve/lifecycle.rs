//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::{Receiver, Sender};
use tiny_http::Server;
use tokio::sync::{mpsc, oneshot};

use super::host::HostMsg;
use crate::{core::register_server, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = String::new();

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                // Port 0 asks the OS; report what was actually bound.
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error
    ))
}

/// Register server for graceful shutdown.
///
/// When Ctrl+C is pressed, the handler signals `shutdown_tx` and unblocks
/// the server.
pub fn register_server_for_shutdown(server: Arc<Server>, shutdown_tx: Sender<()>) {
    register_server(server, shutdown_tx);
}

/// Turn the first shutdown signal into a host deactivation.
pub fn spawn_deactivator(shutdown_rx: Receiver<()>, host: mpsc::Sender<HostMsg>) -> JoinHandle<()> {
    thread::spawn(move || {
        if shutdown_rx.recv().is_ok() {
            deactivate(&host);
        }
    })
}

/// Ask the host to tear down every session and wait for the answer.
fn deactivate(host: &mpsc::Sender<HostMsg>) {
    let (reply, rx) = oneshot::channel();
    if host.blocking_send(HostMsg::Shutdown { reply }).is_err() {
        return;
    }
    if let Ok(count) = rx.blocking_recv() {
        crate::debug!("serve"; "deactivated with {} session(s) running", count);
    }
}

/// Wait for the host thread to finish (max 2 seconds).
pub fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    log!("serve"; "host did not stop in time, exiting anyway");
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_bind_reports_actual_port() {
        let (server, addr) = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap();
        assert_ne!(addr.port(), 0);
        drop(server);
    }

    #[test]
    fn test_deactivate_replies() {
        let (host_tx, mut host_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = crossbeam::channel::unbounded();

        let deactivator = spawn_deactivator(shutdown_rx, host_tx);
        shutdown_tx.send(()).unwrap();

        match host_rx.blocking_recv() {
            Some(HostMsg::Shutdown { reply }) => reply.send(2).unwrap(),
            _ => panic!("expected a shutdown request"),
        }
        deactivator.join().unwrap();
    }
}
