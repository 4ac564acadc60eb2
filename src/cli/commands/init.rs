//! Init command implementation.
//!
//! The `siteprep init` command writes a starter configuration.

use std::fs;

use crate::cli::args::InitArgs;
use crate::config::project_config_path;
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};

/// The init command implementation.
pub struct InitCommand {
    project: Project,
    args: InitArgs,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(project: Project, args: InitArgs) -> Self {
        Self { project, args }
    }

    /// Starter configuration. Every value shown is the built-in default
    /// except `site.name`, so the file documents the knobs without changing them.
    fn create_config(&self) -> String {
        let site_name = self
            .project
            .root()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Primary Site");

        format!(
            "# siteprep configuration for {site_name}\n\
             #\n\
             # Per-server values (directory.principal, credentials) can go in\n\
             # .siteprep/config.local.yml, which is layered on top of this file.\n\
             \n\
             site:\n\
             \x20 name: \"{site_name}\"\n\
             \x20 # code: PS1\n\
             \n\
             features:\n\
             \x20 catalog: server            # server | optional\n\
             \x20 missing_catalog: fail      # fail | treat_as_empty\n\
             \x20 include_management_tools: false\n\
             \x20 # source: 'D:\\sources\\sxs'\n\
             \x20 # recommended: [RSAT-AD-Tools]\n\
             \n\
             adk:\n\
             \x20 installer: 'C:\\Sources\\ADK\\adksetup.exe'\n\
             \x20 features: [OptionId.DeploymentTools, OptionId.UserStateMigrationTool]\n\
             \x20 addon:\n\
             \x20   installer: 'C:\\Sources\\ADKWinPE\\adkwinpesetup.exe'\n\
             \x20   threshold: 10.1.17763.1\n\
             \n\
             prereqs:\n\
             \x20 setupdl: 'C:\\Sources\\ConfigMgr\\SMSSETUP\\BIN\\X64\\setupdl.exe'\n\
             \x20 destination: 'C:\\Sources\\ConfigMgr\\Prereqs'\n\
             \x20 # downloads:\n\
             \x20 #   - url: https://example.com/payload.exe\n\
             \x20 #     dest: 'C:\\Sources\\payload.exe'\n\
             \x20 #     sha256: <64 hex digits>\n\
             \n\
             wsus:\n\
             \x20 content_dir: 'C:\\WSUS'\n\
             \x20 # sql_instance: 'SQL01\\WSUS'  # internal database when absent\n\
             \n\
             sql:\n\
             \x20 setup: 'C:\\Sources\\SQL\\setup.exe'\n\
             \x20 instance_name: MSSQLSERVER\n\
             \x20 collation: SQL_Latin1_General_CP1_CI_AS\n\
             \x20 sysadmin_accounts: ['BUILTIN\\Administrators']\n\
             \n\
             directory:\n\
             \x20 container: System Management\n\
             \x20 parent: CN=System\n\
             \x20 # principal: 'CORP\\CM01$'\n\
             \x20 # server: dc01.corp.local\n\
             \x20 # username: 'CORP\\svc-siteprep'\n\
             \x20 # password_env: SITEPREP_DIRECTORY_PASSWORD\n\
             \n\
             wait:\n\
             \x20 interval_secs: 5\n"
        )
    }
}

impl Command for InitCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let path = project_config_path(self.project.root());

        if path.exists() && !self.args.force {
            ui.warning(&format!("{} already exists", path.display()));
            ui.show_hint("Use --force to overwrite it.");
            return Ok(CommandResult::failure(1));
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, self.create_config())?;
        tracing::info!("Wrote {}", path.display());

        ui.success(&format!("Created {}", path.display()));
        ui.show_hint("Set directory.principal, then run 'siteprep check'.");
        Ok(CommandResult::success())
    }
}
