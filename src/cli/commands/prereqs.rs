//! Prereqs command implementation.
//!
//! The `siteprep prereqs` command fetches configured payloads and runs the
//! vendor prerequisite downloader.

use crate::cli::args::StepArgs;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::install::download::setupdl_arguments;
use crate::install::{run_setupdl, DownloadOutcome, Downloader, InstallHost};
use crate::shell::display_command;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};
use super::{declined, poll_interval};

/// The prereqs command implementation.
pub struct PrereqsCommand {
    project: Project,
    args: StepArgs,
}

impl PrereqsCommand {
    /// Create a new prereqs command.
    pub fn new(project: Project, args: StepArgs) -> Self {
        Self { project, args }
    }

    pub fn run(
        &self,
        ui: &mut dyn UserInterface,
        config: &SiteConfig,
        downloader: &Downloader,
        host: &mut InstallHost,
    ) -> Result<CommandResult> {
        let settings = &config.prereqs;
        let setupdl_line =
            display_command(&settings.setupdl, &setupdl_arguments(&settings.destination));

        ui.show_header("Installer prerequisites");

        if self.args.dry_run {
            for spec in &settings.downloads {
                ui.message(&format!("Would download {} to {}", spec.url, spec.dest.display()));
            }
            ui.message(&format!("Would run: {}", setupdl_line));
            return Ok(CommandResult::success());
        }

        if !self.project.confirm(ui, "Download installer prerequisites?")? {
            return Ok(declined(ui));
        }

        for spec in &settings.downloads {
            let mut spinner = ui.start_spinner(&format!("Downloading {}", spec.url));
            match downloader.fetch(spec) {
                Ok(DownloadOutcome::Downloaded { path, bytes }) => {
                    spinner.finish_success(&format!("{} ({} bytes)", path.display(), bytes))
                }
                Ok(DownloadOutcome::AlreadyPresent { path }) => {
                    spinner.finish_skipped(&format!("{} already present", path.display()))
                }
                Err(e) => {
                    spinner.finish_error(&format!("Failed to download {}", spec.url));
                    return Err(e);
                }
            }
        }

        let mut spinner = ui.start_spinner("Waiting for the prerequisite downloader...");
        match run_setupdl(settings, host) {
            Ok(report) => spinner.finish_success(&format!(
                "Prerequisites downloaded to {} ({} checks)",
                settings.destination.display(),
                report.checks
            )),
            Err(e) => {
                spinner.finish_error("Prerequisite download failed");
                return Err(e);
            }
        }

        Ok(CommandResult::success())
    }
}

impl Command for PrereqsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        let downloader = Downloader::new()?;
        let mut host = InstallHost::system(poll_interval(&config));
        self.run(ui, &config, &downloader, &mut host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadSpec;
    use crate::error::SiteprepError;
    use crate::install::launch::testing::fake_host;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> SiteConfig {
        let setupdl = temp.path().join("setupdl.exe");
        fs::write(&setupdl, b"").unwrap();

        let mut config = SiteConfig::default();
        config.prereqs.setupdl = setupdl;
        config.prereqs.destination = temp.path().join("Prereqs");
        config
    }

    fn command(dry_run: bool) -> PrereqsCommand {
        PrereqsCommand::new(
            Project::new("/site").with_assume_yes(true),
            StepArgs { dry_run },
        )
    }

    #[test]
    fn runs_setupdl_into_destination() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let (mut host, log) = fake_host();
        let mut ui = MockUI::new();

        command(false)
            .run(&mut ui, &config, &Downloader::new().unwrap(), &mut host)
            .unwrap();

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, config.prereqs.setupdl);
        assert_eq!(log[0].1[0], "/NOUI");
        assert!(config.prereqs.destination.is_dir());
    }

    #[test]
    fn dry_run_lists_downloads() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.prereqs.downloads.push(DownloadSpec {
            url: "https://example.com/payload.exe".to_string(),
            dest: temp.path().join("payload.exe"),
            sha256: None,
        });
        let (mut host, log) = fake_host();
        let mut ui = MockUI::new();

        command(true)
            .run(&mut ui, &config, &Downloader::new().unwrap(), &mut host)
            .unwrap();

        assert!(log.borrow().is_empty());
        assert!(ui.has_message("Would download https://example.com/payload.exe"));
        assert!(ui.has_message("Would run:"));
        assert!(!temp.path().join("payload.exe").exists());
    }

    #[test]
    fn missing_setupdl_is_configuration_missing() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.prereqs.setupdl = temp.path().join("missing.exe");
        let (mut host, log) = fake_host();
        let mut ui = MockUI::new();

        let err = command(false)
            .run(&mut ui, &config, &Downloader::new().unwrap(), &mut host)
            .unwrap_err();

        assert!(matches!(err, SiteprepError::ConfigurationMissing { .. }));
        assert!(log.borrow().is_empty());
    }
}
