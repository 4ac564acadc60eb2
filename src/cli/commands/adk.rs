//! ADK command implementation.
//!
//! The `siteprep adk` command installs the deployment kit, then the WinPE
//! add-on when the kit's version needs it.

use crate::cli::args::StepArgs;
use crate::config::SiteConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::install::{decide_addon, install_adk, InstallHost};
use crate::prereqs::{HostVersionSource, VersionSource};
use crate::shell::PowerShell;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};
use super::{declined, finish, poll_interval, report_warnings};

/// The adk command implementation.
pub struct AdkCommand {
    project: Project,
    args: StepArgs,
}

impl AdkCommand {
    /// Create a new adk command.
    pub fn new(project: Project, args: StepArgs) -> Self {
        Self { project, args }
    }

    pub fn run(
        &self,
        ui: &mut dyn UserInterface,
        config: &SiteConfig,
        versions: &mut dyn VersionSource,
        host: &mut InstallHost,
    ) -> Result<CommandResult> {
        let settings = &config.adk;
        let mut ctx = RunContext::new(self.args.dry_run);

        ui.show_header("Deployment kit");

        let decision = decide_addon(settings, versions, &mut ctx)?;
        ui.show_field("Installer", &settings.installer.display().to_string());
        ui.show_field("Version", &decision.kit_version.to_string());
        ui.show_field(
            "Add-on",
            if decision.required {
                "required"
            } else {
                "not required"
            },
        );

        if ctx.dry_run {
            report_warnings(ui, &mut ctx);
            return Ok(CommandResult::success());
        }

        if !self.project.confirm(ui, "Run the deployment kit installer?")? {
            return Ok(declined(ui));
        }

        let mut spinner = ui.start_spinner("Waiting for the deployment kit installer...");
        match install_adk(settings, decision, host, &ctx) {
            Ok(outcome) => {
                let message = if outcome.addon_wait.is_some() {
                    "Deployment kit and add-on installed"
                } else {
                    "Deployment kit installed"
                };
                spinner.finish_success(message);
            }
            Err(e) => {
                spinner.finish_error("Deployment kit installation failed");
                return Err(e);
            }
        }

        finish(ui, &mut ctx);
        Ok(CommandResult::success())
    }
}

impl Command for AdkCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        let mut versions = HostVersionSource::new(PowerShell::new());
        let mut host = InstallHost::system(poll_interval(&config));
        self.run(ui, &config, &mut versions, &mut host)
    }
}
