//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Live PDF preview for LilyPond + LaTeX documents
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: lytex-preview.toml)
    #[arg(short = 'C', long, global = true, default_value = "lytex-preview.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the preview server, optionally previewing FILES right away
    #[command(visible_alias = "s")]
    Serve {
        /// Documents to preview on startup
        #[arg(value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Compile a single document once
    #[command(visible_alias = "c")]
    Compile {
        /// Document to compile
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Check that the LilyPond/LaTeX toolchain is installed
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag_is_not_verbose() {
        let err = Cli::try_parse_from(["lytex-preview", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["lytex-preview", "serve", "a.lytex", "b.lytex", "-p", "8080"]);
        match cli.command {
            Commands::Serve { files, port, interface } => {
                assert_eq!(files, vec![PathBuf::from("a.lytex"), PathBuf::from("b.lytex")]);
                assert_eq!(port, Some(8080));
                assert!(interface.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("lytex-preview.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lytex-preview", "check", "-v", "-C", "custom.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_compile_file_optional() {
        let cli = Cli::parse_from(["lytex-preview", "compile"]);
        assert!(matches!(cli.command, Commands::Compile { file: None }));
    }
}
