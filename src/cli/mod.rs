//! Command-line interface for siteprep.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{
    Cli, Commands, CompletionsArgs, ConfigArgs, InitArgs, SqlArgs, StepArgs, WsusArgs,
};
pub use commands::{Command, CommandDispatcher, CommandResult, Project};
