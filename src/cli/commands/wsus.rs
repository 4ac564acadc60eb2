//! WSUS command implementation.
//!
//! The `siteprep wsus` command installs the update service role and runs
//! `wsusutil postinstall` against the configured database and content directory.

use crate::cli::args::WsusArgs;
use crate::config::SiteConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::install::wsus::postinstall_arguments;
use crate::install::{
    install_wsus, role_features, FeatureInstaller, HostFeatureInstaller, HostPostInstall,
    PostInstall,
};
use crate::prereqs::{CatalogSource, HostCatalog};
use crate::shell::{display_command, PowerShell};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};
use super::{declined, finish, report_warnings};

/// The wsus command implementation.
pub struct WsusCommand {
    project: Project,
    args: WsusArgs,
}

impl WsusCommand {
    /// Create a new wsus command.
    pub fn new(project: Project, args: WsusArgs) -> Self {
        Self { project, args }
    }

    pub fn run(
        &self,
        ui: &mut dyn UserInterface,
        config: &SiteConfig,
        catalog: &mut dyn CatalogSource,
        installer: &mut dyn FeatureInstaller,
        postinstall: &mut dyn PostInstall,
    ) -> Result<CommandResult> {
        let settings = &config.wsus;
        let policy = config.features.missing_catalog.into();
        let mut ctx = RunContext::new(self.args.step.dry_run);

        ui.show_header("Update service role");
        ui.show_field("Role services", &role_features(settings).join(", "));
        ui.show_field(
            "Database",
            settings
                .sql_instance
                .as_deref()
                .unwrap_or("Windows Internal Database"),
        );
        ui.show_field("Content", &settings.content_dir.display().to_string());

        let postinstall_line =
            display_command(&settings.wsusutil, &postinstall_arguments(settings));

        if ctx.dry_run {
            let outcome = install_wsus(settings, catalog, policy, installer, None, &mut ctx)?;
            if outcome.missing.is_empty() {
                ui.message("Role services already installed");
            } else {
                ui.message(&format!("Would install: {}", outcome.missing.join(", ")));
            }
            if !self.args.skip_postinstall {
                ui.message(&format!("Would run: {}", postinstall_line));
            }
            report_warnings(ui, &mut ctx);
            return Ok(CommandResult::success());
        }

        if !self.project.confirm(ui, "Install the update service role?")? {
            return Ok(declined(ui));
        }

        let step = if self.args.skip_postinstall {
            None
        } else {
            Some(postinstall)
        };

        let mut spinner = ui.start_spinner("Installing update service role...");
        let outcome = match install_wsus(settings, catalog, policy, installer, step, &mut ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                spinner.finish_error("Update service setup failed");
                return Err(e);
            }
        };

        if outcome.missing.is_empty() {
            spinner.finish_skipped("Role services already installed");
        } else {
            spinner.finish_success(&format!("Installed {}", outcome.missing.join(", ")));
        }
        if outcome.postinstall_ran {
            ui.success(&format!("Ran {}", postinstall_line));
        } else {
            ui.show_hint(&format!("Post-install skipped. Run later: {}", postinstall_line));
        }

        finish(ui, &mut ctx);
        Ok(CommandResult::success())
    }
}

impl Command for WsusCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        let powershell = PowerShell::new();
        let mut catalog = HostCatalog::new(config.features.catalog, powershell.clone());
        let mut installer = HostFeatureInstaller::new(config.features.catalog, powershell);
        self.run(ui, &config, &mut catalog, &mut installer, &mut HostPostInstall)
    }
}
