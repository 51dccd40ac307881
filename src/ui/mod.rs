//! User interface
//!
//! CLI parsing, output formatting and progress reporting for the
//! `urlprobe` binary.

pub mod cli;
pub mod color;
pub mod output;
pub mod progress;

// Re-export commonly used items
pub use cli::{CacheAction, Cli, Commands, RepairAction, cli_to_config};
pub use progress::ProgressReporter;
