//! HTTP routes of the preview host.
//!
//! ```text
//! GET  /                     index: running previews + start form
//! GET  /preview/<id>         viewer page of one panel
//! POST /api/preview?path=P   start previewing P
//! POST /api/stop[?focused=P] stop P's session, or all of them
//! GET  /api/sessions         running sessions as JSON
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tiny_http::{Method, Request};
use tokio::sync::{mpsc, oneshot};

use super::host::HostMsg;
use super::response;
use crate::embed::serve::{INDEX_HTML, IndexVars, PREVIEW_HTML, PreviewVars};
use crate::session::SessionRegistry;
use crate::status::{StatusBar, render_items};
use crate::surface::hub::SurfaceHub;

/// Everything a request handler can reach.
pub struct ApiContext {
    pub host: mpsc::Sender<HostMsg>,
    pub hub: Arc<SurfaceHub>,
    pub registry: Arc<SessionRegistry>,
    pub status: Arc<StatusBar>,
    pub ws_port: u16,
}

#[derive(Debug, Serialize)]
struct SessionEntry {
    path: String,
    location: Option<String>,
    /// The viewer closed the panel and teardown has not finished yet.
    surface_closed: bool,
}

/// Route a request.
pub fn handle(request: Request, ctx: &ApiContext) -> Result<()> {
    let url = request.url().to_string();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    let method = request.method().clone();

    match (method, path) {
        (Method::Get | Method::Head, "/") => respond_index(request, ctx),
        (Method::Get | Method::Head, _) if path.starts_with("/preview/") => {
            respond_panel(request, ctx, &path["/preview/".len()..])
        }
        (Method::Post, "/api/preview") => {
            let file = query_param(query, "path").map(PathBuf::from);
            reply_with(request, ask(ctx, |reply| HostMsg::Preview { file, reply }))
        }
        (Method::Post, "/api/stop") => {
            let focused = query_param(query, "focused").map(PathBuf::from);
            reply_with(request, ask(ctx, |reply| HostMsg::Stop { focused, reply }))
        }
        (Method::Get, "/api/sessions") => response::respond_json(request, 200, &sessions(ctx)),
        (_, "/api/preview" | "/api/stop" | "/api/sessions") => {
            response::respond_method_not_allowed(request)
        }
        _ => response::respond_not_found(request),
    }
}

/// Send a request to the host loop and wait for its reply.
fn ask<T>(ctx: &ApiContext, msg: impl FnOnce(oneshot::Sender<T>) -> HostMsg) -> Result<T> {
    let (reply, rx) = oneshot::channel();
    ctx.host
        .blocking_send(msg(reply))
        .map_err(|_| anyhow::anyhow!("preview host is not running"))?;
    rx.blocking_recv()
        .map_err(|_| anyhow::anyhow!("preview host dropped the request"))
}

fn reply_with<T: Serialize>(request: Request, outcome: Result<T>) -> Result<()> {
    match outcome {
        Ok(outcome) => response::respond_json(request, 200, &outcome),
        Err(e) => response::respond_json_error(request, 503, &format!("{e:#}")),
    }
}

/// Running sessions, in the registry's path order.
fn sessions(ctx: &ApiContext) -> Vec<SessionEntry> {
    session_entries(&ctx.registry)
}

fn session_entries(registry: &SessionRegistry) -> Vec<SessionEntry> {
    registry
        .all_session_paths()
        .into_iter()
        .map(|key| SessionEntry {
            location: registry.surface_location(&key),
            surface_closed: registry.is_surface_disposed(&key),
            path: key.to_string(),
        })
        .collect()
}

fn respond_index(request: Request, ctx: &ApiContext) -> Result<()> {
    let items: Vec<_> = ctx
        .status
        .items()
        .into_iter()
        .map(|indicator| {
            let location = ctx.registry.surface_location(&indicator.key);
            (indicator, location)
        })
        .collect();

    let body = INDEX_HTML.render(&IndexVars {
        version: env!("CARGO_PKG_VERSION"),
        indicators: render_items(&items),
    });
    response::respond_html(request, body)
}

fn respond_panel(request: Request, ctx: &ApiContext, id: &str) -> Result<()> {
    let Some(panel) = id.parse().ok().and_then(|id| ctx.hub.panel(id)) else {
        return response::respond_not_found(request);
    };
    crate::debug!("serve"; "viewer page {} for {}", panel.id, panel.key);
    let body = PREVIEW_HTML.render(&PreviewVars {
        panel_id: panel.id,
        title: panel.title,
        ws_port: ctx.ws_port,
    });
    response::respond_html(request, body)
}

/// Decoded value of `name` in a query string. Empty values count as absent.
fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != name {
            return None;
        }
        let value = value.replace('+', " ");
        let decoded = percent_decode_str(&value).decode_utf8_lossy().into_owned();
        (!decoded.is_empty()).then_some(decoded)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionKey;
    use crate::session::{Disposable, Session, SessionId};
    use crate::surface::{DisplaySurface, SurfaceMessage};

    struct Noop;

    impl Disposable for Noop {
        fn dispose(self: Box<Self>) {}
    }

    impl DisplaySurface for Noop {
        fn post(&self, _message: &SurfaceMessage) {}
    }

    fn register(registry: &SessionRegistry, path: &str) -> SessionKey {
        let key = SessionKey::new(path);
        registry.create_session(Session::new(
            SessionId::next(),
            key.clone(),
            Box::new(Noop),
            Box::new(Noop),
            Box::new(Noop),
        ));
        key
    }

    #[test]
    fn test_session_entries_follow_registry_order() {
        let registry = SessionRegistry::new();
        register(&registry, "/scores/b.lytex");
        let a = register(&registry, "/scores/a.lytex");
        registry.mark_surface_disposed(&a);

        let entries = session_entries(&registry);
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        let expected: Vec<_> = registry
            .all_session_paths()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(paths, expected);

        let closed: Vec<_> = entries.iter().map(|e| e.surface_closed).collect();
        assert_eq!(closed, vec![true, false]);
    }

    #[test]
    fn test_query_param() {
        let query = "path=%2Fscores%2Fmy+song.lytex&x=1";
        assert_eq!(
            query_param(query, "path").as_deref(),
            Some("/scores/my song.lytex")
        );
        assert_eq!(query_param(query, "x").as_deref(), Some("1"));
        assert_eq!(query_param(query, "focused"), None);
        assert_eq!(query_param("path=", "path"), None);
        assert_eq!(query_param("", "path"), None);
    }
}
