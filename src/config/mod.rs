//! Configuration management for `lytex-preview.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/   # [serve], [compile], [watch]
//! ├── error      # ConfigError
//! ├── util       # find_config_file
//! └── mod.rs     # PreviewConfig (this file)
//! ```
//!
//! The config file is optional: without one, every section uses its
//! defaults and the current directory is the project root.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{CompileConfig, ServeConfig, WatchConfig};

use util::find_config_file;

use crate::cli::{Cli, Commands};
use crate::utils::path::{expand_tilde, resolve_path};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name searched for upward from the cwd
pub const DEFAULT_CONFIG_NAME: &str = "lytex-preview.toml";

/// Root configuration structure representing lytex-preview.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Absolute path of the loaded config file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Project root: config file directory, or the cwd (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Compiler settings
    #[serde(default)]
    pub compile: CompileConfig,

    /// Save detection settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl PreviewConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file. A missing default
    /// config is fine; a missing config named explicitly with `-C` is not.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let config_name = expand_tilde(&cli.config);

        let mut config = match find_config_file(&config_name, &cwd) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = Some(path);
                config
            }
            None if cli.config != Path::new(DEFAULT_CONFIG_NAME) => {
                return Err(ConfigError::Io(
                    cwd.join(&config_name),
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                )
                .into());
            }
            None => Self {
                root: cwd,
                ..Self::default()
            },
        };

        config.finalize();
        config.apply_command_options(cli);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Expand `~` and resolve relative paths against the project root.
    fn finalize(&mut self) {
        if let Some(root) = self.watch.root.take() {
            self.watch.root = Some(resolve_path(&expand_tilde(&root), &self.root));
        }
        if let Some(command) = &mut self.compile.command {
            for arg in command.iter_mut() {
                *arg = shellexpand::tilde(arg.as_str()).into_owned();
            }
        }
        // Accept `extension = ".lytex"` as well.
        self.compile.extension = self.compile.extension.trim_start_matches('.').to_string();
    }

    /// CLI flags override file values.
    fn apply_command_options(&mut self, cli: &Cli) {
        if let Commands::Serve {
            interface, port, ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
        }
    }

    fn update_option<T: Clone>(target: &mut T, value: Option<&T>) {
        if let Some(v) = value {
            *target = v.clone();
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.port == 0 {
            return Err(ConfigError::Validation("[serve.port] must not be 0".into()));
        }
        if self.serve.ws_port == 0 {
            return Err(ConfigError::Validation(
                "[serve.ws_port] must not be 0".into(),
            ));
        }
        if self.compile.extension.is_empty() {
            return Err(ConfigError::Validation(
                "[compile.extension] must not be empty".into(),
            ));
        }
        if let Some(command) = &self.compile.command
            && command.first().is_none_or(|program| program.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "[compile.command] must name a program".into(),
            ));
        }
        Ok(())
    }

    /// Directory watched recursively for saves.
    pub fn watch_root(&self) -> &Path {
        self.watch.root.as_deref().unwrap_or(&self.root)
    }
}

/// Parse a config string for section tests (panics on invalid TOML).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PreviewConfig {
    PreviewConfig::from_str(content).unwrap()
}
