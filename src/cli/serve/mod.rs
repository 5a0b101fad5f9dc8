//! Preview server: browser panels, a status page, and the session host.

mod api;
mod host;
mod lifecycle;
mod response;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel;
use tiny_http::{Request, Server};
use tokio::sync::broadcast;

use crate::compiler::{LytexCompiler, toolchain};
use crate::config::PreviewConfig;
use crate::preview::Orchestrator;
use crate::session::SessionRegistry;
use crate::status::StatusBar;
use crate::surface::{hub::SurfaceHub, server::start_surface_server};
use crate::watch::FsActor;
use crate::{debug, log};

use api::ApiContext;

/// Worker threads answering HTTP requests.
const REQUEST_THREADS: usize = 4;

/// Buffered save events per subscriber before it lags.
const SAVE_CHANNEL_CAPACITY: usize = 64;

/// Run the preview server until Ctrl+C. `files` are previewed on startup.
pub fn serve(config: &PreviewConfig, files: Vec<PathBuf>) -> Result<()> {
    let hub = SurfaceHub::new();
    let ws_port = start_surface_server(config.serve.interface, config.serve.ws_port, Arc::clone(&hub))?;
    debug!("surface"; "ws://{}:{}", config.serve.interface, ws_port);

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    hub.set_base_url(format!("http://{addr}"));

    let registry = Arc::new(SessionRegistry::new());
    let status = StatusBar::new();
    let (saves, _) = broadcast::channel(SAVE_CHANNEL_CAPACITY);

    let compiler = LytexCompiler::from_config(&config.compile)?;
    debug!("compile"; "{}", compiler.command().join(" "));

    let workbench = host::BrowserWorkbench::new(Arc::clone(&hub), Arc::clone(&status));
    toolchain::warn_if_missing(&workbench);
    let orchestrator = Orchestrator::new(
        Arc::clone(&registry),
        Arc::new(compiler),
        Arc::new(workbench),
        saves.clone(),
        &config.compile.extension,
    );

    let (fs_actor, watch) = FsActor::new(
        config.watch_root().to_path_buf(),
        saves,
        &config.compile.extension,
        Duration::from_millis(config.watch.debounce_ms),
    )
    .context("failed to start file watcher")?;

    let (host_tx, host_handle) = host::spawn_host(orchestrator, fs_actor, watch, files)?;

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx.clone());
    let deactivator = lifecycle::spawn_deactivator(shutdown_rx, host_tx.clone());

    log!("serve"; "http://{}", addr);
    log!("watch"; "{}", config.watch_root().display());

    let ctx = Arc::new(ApiContext {
        host: host_tx,
        hub,
        registry,
        status,
        ws_port,
    });
    run_request_loop(&server, ctx)?;

    // The loop also ends on server errors; deactivate in that case too.
    let _ = shutdown_tx.send(());
    let _ = deactivator.join();
    lifecycle::wait_for_shutdown(host_handle);
    Ok(())
}

fn run_request_loop(server: &Server, ctx: Arc<ApiContext>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(&ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, ctx: &ApiContext) -> Result<()> {
    // Early exit if shutdown requested
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }
    api::handle(request, ctx)
}
