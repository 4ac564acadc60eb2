//! Features command implementation.
//!
//! The `siteprep features` command installs the required Windows roles and
//! features that the host catalog reports as missing.

use crate::cli::args::StepArgs;
use crate::config::SiteConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::install::{
    install_features, plan_features, FeatureInstallOptions, FeatureInstaller, HostFeatureInstaller,
};
use crate::prereqs::{CatalogSource, HostCatalog};
use crate::shell::PowerShell;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};
use super::{declined, finish, report_warnings};

/// The features command implementation.
pub struct FeaturesCommand {
    project: Project,
    args: StepArgs,
}

impl FeaturesCommand {
    /// Create a new features command.
    pub fn new(project: Project, args: StepArgs) -> Self {
        Self { project, args }
    }

    /// Install missing features using the given catalog and installer.
    pub fn run(
        &self,
        ui: &mut dyn UserInterface,
        config: &SiteConfig,
        catalog: &mut dyn CatalogSource,
        installer: &mut dyn FeatureInstaller,
    ) -> Result<CommandResult> {
        let settings = &config.features;
        let mut ctx = RunContext::new(self.args.dry_run);
        let options = FeatureInstallOptions {
            source: settings.source.clone(),
            include_management_tools: settings.include_management_tools,
        };

        ui.show_header("Windows features");

        let resolution = plan_features(
            catalog,
            settings.missing_catalog.into(),
            &settings.required,
            &settings.recommended,
            &mut ctx,
        )?;

        if resolution.is_satisfied() {
            ui.success(&format!(
                "All {} required features are installed",
                settings.required.len()
            ));
            report_warnings(ui, &mut ctx);
            return Ok(CommandResult::success());
        }

        ui.message(&format!(
            "{} of {} required features are missing:",
            resolution.missing.len(),
            settings.required.len()
        ));
        for name in &resolution.missing {
            ui.message(&format!("  {}", name));
        }

        if ctx.dry_run {
            report_warnings(ui, &mut ctx);
            return Ok(CommandResult::success());
        }

        if !self.project.confirm(ui, "Install the missing features?")? {
            return Ok(declined(ui));
        }

        let mut spinner = ui.start_spinner("Installing features...");
        let report = match install_features(installer, &resolution.missing, &options, &mut ctx) {
            Ok(report) => report,
            Err(e) => {
                spinner.finish_error("Feature installation failed");
                return Err(e);
            }
        };
        spinner.finish_success(&format!("Installed {} features", report.installed.len()));

        finish(ui, &mut ctx);
        Ok(CommandResult::success())
    }
}

impl Command for FeaturesCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        let powershell = PowerShell::new();
        let mut catalog = HostCatalog::new(config.features.catalog, powershell.clone());
        let mut installer = HostFeatureInstaller::new(config.features.catalog, powershell);
        self.run(ui, &config, &mut catalog, &mut installer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::features::testing::{CountingCatalog, FixedCatalog, RecordingInstaller};
    use crate::prereqs::InstallState;
    use crate::ui::MockUI;

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.features.required = vec!["Web-Server".into(), "BITS".into(), "RDC".into()];
        config.features.recommended = vec!["RSAT-AD-Tools".into()];
        config
    }

    fn catalog() -> FixedCatalog {
        FixedCatalog(vec![
            ("Web-Server", InstallState::Installed),
            ("BITS", InstallState::Absent),
            ("RDC", InstallState::Absent),
        ])
    }

    fn command(dry_run: bool) -> FeaturesCommand {
        FeaturesCommand::new(
            Project::new("/site").with_assume_yes(true),
            StepArgs { dry_run },
        )
    }

    #[test]
    fn installs_only_missing_features() {
        let mut ui = MockUI::new();
        let mut installer = RecordingInstaller::default();

        let result = command(false)
            .run(&mut ui, &config(), &mut catalog(), &mut installer)
            .unwrap();

        assert!(result.success);
        assert_eq!(installer.calls, vec![vec!["BITS".to_string(), "RDC".to_string()]]);
        assert!(ui.has_message("2 of 3 required features are missing"));
        assert!(ui.has_warning("RSAT-AD-Tools"));
    }

    #[test]
    fn catalog_is_read_once_per_invocation() {
        let mut ui = MockUI::new();
        let mut installer = RecordingInstaller::default();
        let mut catalog = CountingCatalog::new(vec![
            ("Web-Server", InstallState::Installed),
            ("BITS", InstallState::Absent),
            ("RDC", InstallState::Installed),
        ]);

        command(false)
            .run(&mut ui, &config(), &mut catalog, &mut installer)
            .unwrap();

        assert_eq!(catalog.snapshots, 1);
        assert_eq!(installer.calls, vec![vec!["BITS".to_string()]]);
    }

    #[test]
    fn dry_run_lists_without_installing() {
        let mut ui = MockUI::new();
        let mut installer = RecordingInstaller::default();

        command(true)
            .run(&mut ui, &config(), &mut catalog(), &mut installer)
            .unwrap();

        assert!(installer.calls.is_empty());
        assert!(ui.has_message("BITS"));
        assert!(ui.spinners().is_empty());
    }

    #[test]
    fn satisfied_host_installs_nothing() {
        let mut ui = MockUI::new();
        let mut installer = RecordingInstaller::default();
        let mut catalog = FixedCatalog(vec![
            ("Web-Server", InstallState::Installed),
            ("BITS", InstallState::Installed),
            ("RDC", InstallState::Installed),
            ("RSAT-AD-Tools", InstallState::Installed),
        ]);

        command(false)
            .run(&mut ui, &config(), &mut catalog, &mut installer)
            .unwrap();

        assert!(installer.calls.is_empty());
        assert!(ui.has_success("All 3 required features are installed"));
        assert!(ui.warnings().is_empty());
    }

    #[test]
    fn declining_changes_nothing() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("proceed", "no");
        let mut installer = RecordingInstaller::default();
        let cmd = FeaturesCommand::new(Project::new("/site"), StepArgs::default());

        let result = cmd
            .run(&mut ui, &config(), &mut catalog(), &mut installer)
            .unwrap();

        assert!(result.success);
        assert!(installer.calls.is_empty());
        assert!(ui.has_message("Nothing changed"));
    }

    #[test]
    fn restart_request_adds_hint() {
        let mut ui = MockUI::new();
        let mut installer = RecordingInstaller {
            restart: true,
            ..RecordingInstaller::default()
        };

        command(false)
            .run(&mut ui, &config(), &mut catalog(), &mut installer)
            .unwrap();

        assert!(ui.has_hint("Restart the server"));
    }

    #[test]
    fn failed_install_is_an_error() {
        let mut ui = MockUI::new();
        let mut installer = RecordingInstaller {
            fail: true,
            ..RecordingInstaller::default()
        };

        let result = command(false).run(&mut ui, &config(), &mut catalog(), &mut installer);
        assert!(result.is_err());
    }
}
