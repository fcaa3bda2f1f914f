//! CLI module - argument parsing and subcommand runners

mod args;
pub mod commands;

pub use args::*;
pub use commands::{run_fit, run_inspect, run_transform};
