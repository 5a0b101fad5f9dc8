//! Preview orchestration: the start/stop verbs and recompile-on-save.
//!
//! # Lifecycle
//!
//! ```text
//!            start_preview                 stop_preview / surface closed
//!   NONE ───────────────────► ACTIVE ─────────────────────────────────► NONE
//!                               │ ▲
//!                         save  │ │ compile -> compiled | error
//!                               ▼ │
//!                          SaveWatcher
//! ```
//!
//! Compile outcomes never change whether a session exists; they only change
//! what its surface shows.

mod error;
mod orchestrator;
mod watcher;


pub use error::PreviewError;
pub use orchestrator::{Orchestrator, StartOutcome, StopOutcome};
pub use watcher::{SaveWatcher, SavedDocument};
