//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Browser pages served by `lytex-preview serve`
//! - [`COMPILE_SH`] - Default LyTeX build script
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{PREVIEW_HTML, PreviewVars};
//!
//! let html = PREVIEW_HTML.render(&PreviewVars {
//!     panel_id: 1,
//!     title: "Preview: song".into(),
//!     ws_port: 35729,
//! });
//! ```

mod template;

pub use template::{Template, TemplateVars};

/// Default build script: `lilypond-book` then `latexmk`, PDF placed next to
/// the source. Invoked as `bash compile.sh <file>`.
pub const COMPILE_SH: &str = include_str!("compile.sh");

pub mod serve {
    use super::{Template, TemplateVars};
    use crate::utils::html::escape;

    /// Variables for preview.html.
    pub struct PreviewVars {
        pub panel_id: u64,
        pub title: String,
        pub ws_port: u16,
    }

    impl TemplateVars for PreviewVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__PANEL_ID__", &self.panel_id.to_string())
                .replace("__TITLE__", &escape(&self.title))
                .replace("__WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Variables for index.html.
    pub struct IndexVars {
        pub version: &'static str,
        /// Pre-rendered `<li>` rows, one per status indicator
        pub indicators: String,
    }

    impl TemplateVars for IndexVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__VERSION__", self.version)
                .replace("__INDICATORS__", &self.indicators)
        }
    }

    /// Panel page: attaches to one display surface over WebSocket.
    pub const PREVIEW_HTML: Template<PreviewVars> =
        Template::new(include_str!("serve/preview.html"));

    /// Landing page: status bar with one stop control per session.
    pub const INDEX_HTML: Template<IndexVars> =
        Template::new(include_str!("serve/index.html"));
}

#[cfg(test)]
mod tests {
    use super::serve::*;

    #[test]
    fn test_preview_vars_injected() {
        let html = PREVIEW_HTML.render(&PreviewVars {
            panel_id: 7,
            title: "Preview: <song>".into(),
            ws_port: 35729,
        });
        assert!(html.contains("const PANEL_ID = 7;"));
        assert!(html.contains("const WS_PORT = 35729;"));
        assert!(html.contains("Preview: &lt;song&gt;"));
        assert!(!html.contains("__PANEL_ID__"));
    }

    #[test]
    fn test_only_close_button_ends_session() {
        // Reloading or navigating away must not stop the session.
        let html = PREVIEW_HTML.render(&PreviewVars {
            panel_id: 1,
            title: "Preview: song".into(),
            ws_port: 35729,
        });
        assert_eq!(html.matches(r#"type: "close""#).count(), 1);
        for event in ["beforeunload", "unload", "pagehide"] {
            assert!(!html.contains(event), "page listens for {event}");
        }
    }

    #[test]
    fn test_index_vars_injected() {
        let html = INDEX_HTML.render(&IndexVars {
            version: "0.1.0",
            indicators: "<li>row</li>".into(),
        });
        assert!(html.contains("<li>row</li>"));
        assert!(html.contains("0.1.0"));
    }

    #[test]
    fn test_compile_script_runs_both_stages() {
        assert!(super::COMPILE_SH.contains("lilypond-book"));
        assert!(super::COMPILE_SH.contains("latexmk"));
    }
}
