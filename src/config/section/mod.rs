//! Configuration section definitions.
//!
//! | Section     | Purpose                                   |
//! |-------------|-------------------------------------------|
//! | `[serve]`   | Preview server (interface, ports)         |
//! | `[compile]` | Build command and document extension      |
//! | `[watch]`   | Save detection (root, debounce)           |

mod compile;
mod serve;
mod watch;

pub use compile::CompileConfig;
pub use serve::ServeConfig;
pub use watch::WatchConfig;
