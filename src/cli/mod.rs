//! The CLI surface: argument parsing, command handlers, and the exit-code
//! mapping that lets scripts branch on failure class.

pub mod commands;
pub mod display;
pub mod exit_code;
pub mod types;

pub use commands::Runtime;
pub use types::{BackupScopeArg, Cli, Commands, EngineCommands};
