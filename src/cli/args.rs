//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Siteprep - prepare a Windows host for a site server install.
#[derive(Debug, Parser)]
#[command(name = "siteprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides default .siteprep/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a default .siteprep/config.yml
    Init(InitArgs),

    /// Report what is missing without changing anything
    Check,

    /// Download installer prerequisites
    Prereqs(StepArgs),

    /// Install missing Windows roles and features
    Features(StepArgs),

    /// Install the deployment kit and, when required, its add-on
    Adk(StepArgs),

    /// Install the update service role and run its post-install step
    Wsus(WsusArgs),

    /// Render the database setup configuration and run setup
    Sql(SqlArgs),

    /// Create the directory container and grant the site server full control
    Container(StepArgs),

    /// Show resolved configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `init` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,
}

/// Arguments shared by commands that change the host.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StepArgs {
    /// Report what would change without changing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `wsus` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct WsusArgs {
    #[command(flatten)]
    pub step: StepArgs,

    /// Install the role without running wsusutil postinstall
    #[arg(long)]
    pub skip_postinstall: bool,
}

/// Arguments for the `sql` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SqlArgs {
    #[command(flatten)]
    pub step: StepArgs,

    /// Write the configuration file without launching setup
    #[arg(long)]
    pub render_only: bool,
}

/// Arguments for the `config` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the JSON schema of the config file instead
    #[arg(long)]
    pub schema: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
