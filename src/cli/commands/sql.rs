//! SQL command implementation.
//!
//! The `siteprep sql` command renders the database setup configuration file
//! and launches setup with it.

use crate::cli::args::SqlArgs;
use crate::config::SiteConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::install::{install_sql, InstallHost, SqlSetupOptions};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};
use super::{declined, finish, poll_interval};

/// The sql command implementation.
pub struct SqlCommand {
    project: Project,
    args: SqlArgs,
}

impl SqlCommand {
    /// Create a new sql command.
    pub fn new(project: Project, args: SqlArgs) -> Self {
        Self { project, args }
    }

    pub fn run(
        &self,
        ui: &mut dyn UserInterface,
        config: &SiteConfig,
        host: &mut InstallHost,
    ) -> Result<CommandResult> {
        let settings = &config.sql;
        let mut ctx = RunContext::new(self.args.step.dry_run);

        ui.show_header("Database engine");
        let options = SqlSetupOptions::from_settings(settings)?;
        ui.show_field("Instance", options.instance_name());
        ui.show_field(
            "Configuration file",
            &settings.configuration_file.display().to_string(),
        );

        if ctx.dry_run {
            if ui.output_mode().shows_detail() {
                ui.message(&options.render());
            }
            install_sql(settings, host, self.args.render_only, &mut ctx)?;
            ui.message("Dry run: nothing written");
            return Ok(CommandResult::success());
        }

        if !self.args.render_only && !self.project.confirm(ui, "Run database setup?")? {
            return Ok(declined(ui));
        }

        let mut spinner = if self.args.render_only {
            ui.start_spinner("Writing configuration file...")
        } else {
            ui.start_spinner("Waiting for database setup...")
        };
        let outcome = match install_sql(settings, host, self.args.render_only, &mut ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                spinner.finish_error("Database setup failed");
                return Err(e);
            }
        };

        match outcome.wait {
            Some(_) => spinner.finish_success(&format!(
                "Setup finished for instance {}",
                options.instance_name()
            )),
            None => spinner.finish_success(&format!(
                "Wrote {}",
                outcome.configuration_file.display()
            )),
        }

        finish(ui, &mut ctx);
        Ok(CommandResult::success())
    }
}

impl Command for SqlCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        let mut host = InstallHost::system(poll_interval(&config));
        self.run(ui, &config, &mut host)
    }
}
