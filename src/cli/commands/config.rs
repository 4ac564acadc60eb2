//! Config command implementation.
//!
//! The `siteprep config` command shows resolved configuration.

use crate::cli::args::ConfigArgs;
use crate::config::{config_schema, ConfigPaths};
use crate::error::{Result, SiteprepError};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};

/// The config command implementation.
pub struct ConfigCommand {
    project: Project,
    args: ConfigArgs,
}

impl ConfigCommand {
    /// Create a new config command.
    pub fn new(project: Project, args: ConfigArgs) -> Self {
        Self { project, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ConfigArgs {
        &self.args
    }
}

impl Command for ConfigCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        if self.args.schema {
            let json = serde_json::to_string_pretty(&config_schema())
                .map_err(|e| SiteprepError::Other(e.into()))?;
            ui.message(&json);
            return Ok(CommandResult::success());
        }

        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        // Show config file path(s)
        let existing = match self.project.config_override() {
            Some(path) => vec![path.to_path_buf()],
            None => ConfigPaths::discover(self.project.root())
                .all_existing()
                .into_iter()
                .cloned()
                .collect(),
        };
        for path in &existing {
            ui.message(&format!("# {}", path.display()));
        }
        ui.message("");

        if self.args.json {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| SiteprepError::Other(e.into()))?;
            ui.message(&json);
        } else {
            let yaml =
                serde_yaml::to_string(&config).map_err(|e| SiteprepError::Other(e.into()))?;
            ui.message(&yaml);
        }

        Ok(CommandResult::success())
    }
}
