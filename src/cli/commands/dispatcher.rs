//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`Project`] for the paths and flags every command shares
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::config::{load_config, validate, SiteConfig};
use crate::error::{Result, SiteprepError};
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output and prompts
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Where the configuration lives and how much to ask before changing things.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Option<PathBuf>,
    assume_yes: bool,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: None,
            assume_yes: false,
        }
    }

    /// Load this file instead of discovering `.siteprep/config.yml`.
    pub fn with_config(mut self, config: Option<PathBuf>) -> Self {
        self.config = config;
        self
    }

    /// Skip confirmations.
    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_override(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Load and validate the configuration.
    ///
    /// Returns `None` after telling the user when there is no configuration,
    /// so the command can exit with code 2.
    pub fn load(&self, ui: &mut dyn UserInterface) -> Result<Option<SiteConfig>> {
        let config = match load_config(&self.root, self.config_override()) {
            Ok(c) => c,
            Err(SiteprepError::ConfigNotFound { .. }) => {
                ui.error("No configuration found. Run 'siteprep init' first.");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        validate(&config)?;
        Ok(Some(config))
    }

    /// Ask before changing the host, unless `--yes` was given.
    pub fn confirm(&self, ui: &mut dyn UserInterface, question: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        ui.confirm("proceed", question, true)
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project: Project,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project.
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    /// Get the project the dispatcher works on.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Dispatch and execute a command.
    ///
    /// Routes the CLI subcommand to the appropriate command implementation
    /// and executes it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let project = self.project.clone();
        match &cli.command {
            Commands::Init(args) => {
                super::init::InitCommand::new(project, args.clone()).execute(ui)
            }
            Commands::Check => super::check::CheckCommand::new(project).execute(ui),
            Commands::Prereqs(args) => {
                super::prereqs::PrereqsCommand::new(project, args.clone()).execute(ui)
            }
            Commands::Features(args) => {
                super::features::FeaturesCommand::new(project, args.clone()).execute(ui)
            }
            Commands::Adk(args) => super::adk::AdkCommand::new(project, args.clone()).execute(ui),
            Commands::Wsus(args) => {
                super::wsus::WsusCommand::new(project, args.clone()).execute(ui)
            }
            Commands::Sql(args) => super::sql::SqlCommand::new(project, args.clone()).execute(ui),
            Commands::Container(args) => {
                super::container::ContainerCommand::new(project, args.clone()).execute(ui)
            }
            Commands::Config(args) => {
                super::config::ConfigCommand::new(project, args.clone()).execute(ui)
            }
            Commands::Completions(args) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
        }
    }
}
