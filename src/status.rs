//! Status bar: one stop control per running preview.
//!
//! Items are listed on the index page and logged as they come and go.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::session::Disposable;
use crate::utils::html::escape;
use crate::workbench::Indicator;

#[derive(Default)]
pub struct StatusBar {
    next_id: AtomicU64,
    items: Mutex<Vec<(u64, Indicator)>>,
}

impl StatusBar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add an item; disposing the returned handle removes it.
    pub fn show(self: &Arc<Self>, indicator: Indicator) -> Box<dyn Disposable> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        crate::log!("status"; "{}", indicator.label);
        self.items.lock().push((id, indicator));
        Box::new(StatusItem {
            id,
            bar: Arc::clone(self),
        })
    }

    /// Current items in display order.
    pub fn items(&self) -> Vec<Indicator> {
        self.items.lock().iter().map(|(_, i)| i.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn remove(&self, id: u64) {
        let removed = {
            let mut items = self.items.lock();
            items
                .iter()
                .position(|(item_id, _)| *item_id == id)
                .map(|pos| items.remove(pos).1)
        };
        if let Some(indicator) = removed {
            crate::log!("status"; "removed {}", indicator.label);
        }
    }
}

struct StatusItem {
    id: u64,
    bar: Arc<StatusBar>,
}

impl Disposable for StatusItem {
    fn dispose(self: Box<Self>) {
        self.bar.remove(self.id);
    }
}

/// Render `<li>` rows for the index page. `location` links the label to
/// the session's panel.
pub fn render_items(items: &[(Indicator, Option<String>)]) -> String {
    if items.is_empty() {
        return r#"<li class="empty">No active previews</li>"#.to_string();
    }

    let mut html = String::new();
    for (indicator, location) in items {
        let label = escape(&indicator.label);
        let tooltip = escape(&indicator.tooltip);
        let path = escape(indicator.key.path().to_str().unwrap_or_default());
        let link = match location {
            Some(url) => format!(r#"<a href="{}" target="_blank">{label}</a>"#, escape(url)),
            None => format!("<span>{label}</span>"),
        };
        html.push_str(&format!(
            r#"<li>{link}<button data-stop="{path}" title="{tooltip}">Stop</button></li>"#
        ));
        html.push('\n');
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionKey;

    fn indicator(path: &str) -> Indicator {
        Indicator::for_session(&SessionKey::new(path))
    }

    #[test]
    fn test_show_and_dispose() {
        let bar = StatusBar::new();
        let a = bar.show(indicator("/scores/a.lytex"));
        let _b = bar.show(indicator("/scores/b.lytex"));
        assert_eq!(bar.len(), 2);

        a.dispose();
        let labels: Vec<_> = bar.items().into_iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["Preview: b"]);
    }

    #[test]
    fn test_render_items() {
        let html = render_items(&[(
            indicator("/scores/song.lytex"),
            Some("http://127.0.0.1:5277/preview/1".into()),
        )]);
        assert!(html.contains(r#"href="http://127.0.0.1:5277/preview/1""#));
        assert!(html.contains("Preview: song"));
        assert!(html.contains(r#"data-stop="/scores/song.lytex""#));
        assert!(html.contains("Click to stop preview session for song.lytex"));
    }

    #[test]
    fn test_render_empty() {
        assert!(render_items(&[]).contains("No active previews"));
    }
}
