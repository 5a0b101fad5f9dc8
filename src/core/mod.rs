//! Core types - pure abstractions shared across the codebase.

mod key;
mod state;

pub use key::SessionKey;
pub use state::{is_shutdown, register_server, setup_shutdown_handler};
