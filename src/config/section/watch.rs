//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! root = "~/scores"    # Watched recursively (default: config dir or cwd)
//! debounce_ms = 300    # Quiet period before a save is reported
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Save detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory watched recursively for saves.
    pub root: Option<PathBuf>,

    /// Debounce window in milliseconds.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: None,
            debounce_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_watch_config() {
        let config = test_parse_config("[watch]\nroot = \"scores\"\ndebounce_ms = 50");
        assert_eq!(config.watch.root, Some(PathBuf::from("scores")));
        assert_eq!(config.watch.debounce_ms, 50);
    }

    #[test]
    fn test_watch_config_defaults() {
        let config = test_parse_config("");
        assert!(config.watch.root.is_none());
        assert_eq!(config.watch.debounce_ms, 300);
    }
}
