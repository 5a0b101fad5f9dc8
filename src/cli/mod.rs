//! Command-line interface module.

mod args;
pub mod check;
pub mod compile;
pub mod serve;

pub use args::{Cli, Commands};
