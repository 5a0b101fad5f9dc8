//! Display surfaces - isolated panels that show compiled output.
//!
//! The core only needs two things from a surface: a message sink and a way
//! to dispose it. Browser panels are served by [`hub::SurfaceHub`] over
//! WebSocket.
//!
//! # Message Protocol
//!
//! ```text
//! {"command":"ready"}
//! {"command":"compile"}
//! {"command":"compiled","pdfData":"<base64>","pdfPath":"/scores/song.pdf"}
//! {"command":"error","error":"undefined control sequence"}
//! ```

pub mod hub;
pub mod server;

mod client_io;

use serde::{Deserialize, Serialize};

use crate::session::Disposable;

/// Message posted from the host to a display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum SurfaceMessage {
    /// Surface is attached and waiting for output.
    Ready,
    /// A compilation started.
    Compile,
    /// Compilation finished; carries the PDF.
    Compiled {
        #[serde(rename = "pdfData")]
        pdf_data: String,
        #[serde(rename = "pdfPath")]
        pdf_path: String,
    },
    /// Compilation failed.
    Error { error: String },
}

impl SurfaceMessage {
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"command":"error","error":"serialization failed: {e}"}}"#)
        })
    }

    /// Whether a late-joining viewer should be shown this message.
    pub fn is_snapshot(&self) -> bool {
        !matches!(self, Self::Ready)
    }
}

/// A rendering panel owned by one session.
pub trait DisplaySurface: Disposable {
    /// Deliver a message. Delivery is best-effort.
    fn post(&self, message: &SurfaceMessage);

    /// Where a user can look at this surface (a URL for browser panels).
    fn location(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(SurfaceMessage::Compile.to_json(), r#"{"command":"compile"}"#);
        assert_eq!(SurfaceMessage::Ready.to_json(), r#"{"command":"ready"}"#);
        assert_eq!(
            SurfaceMessage::error("undefined control sequence").to_json(),
            r#"{"command":"error","error":"undefined control sequence"}"#
        );

        let compiled = SurfaceMessage::Compiled {
            pdf_data: "JVBERi0=".into(),
            pdf_path: "song.pdf".into(),
        };
        assert_eq!(
            compiled.to_json(),
            r#"{"command":"compiled","pdfData":"JVBERi0=","pdfPath":"song.pdf"}"#
        );
    }

    #[test]
    fn test_parse_from_viewer_side() {
        let msg: SurfaceMessage =
            serde_json::from_str(r#"{"command":"error","error":"boom"}"#).unwrap();
        assert_eq!(msg, SurfaceMessage::error("boom"));
    }

    #[test]
    fn test_ready_is_not_a_snapshot() {
        assert!(!SurfaceMessage::Ready.is_snapshot());
        assert!(SurfaceMessage::Compile.is_snapshot());
    }
}
