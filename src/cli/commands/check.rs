//! Check command implementation.
//!
//! The `siteprep check` command reports what the other commands would do
//! without changing the host. It exits 1 when anything required is missing
//! or could not be inspected.

use crate::config::SiteConfig;
use crate::context::{RunContext, Warning};
use crate::directory::{ContainerTarget, DirectoryStore, Provisioner};
use crate::error::Result;
use crate::install::{decide_addon, role_features};
use crate::prereqs::{
    load_catalog, resolve_missing, CatalogSource, HostCatalog, HostVersionSource, Resolution,
    VersionSource,
};
use crate::shell::PowerShell;
use crate::ui::UserInterface;

use super::container::{host_directory, show_plan};
use super::dispatcher::{Command, CommandResult, Project};
use super::report_warnings;

/// The check command implementation.
pub struct CheckCommand {
    project: Project,
}

/// Outcome of one check section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Ready,
    NeedsWork,
}

impl CheckCommand {
    /// Create a new check command.
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    pub fn run(
        &self,
        ui: &mut dyn UserInterface,
        config: &SiteConfig,
        catalog: &mut dyn CatalogSource,
        versions: &mut dyn VersionSource,
        store: Option<&mut dyn DirectoryStore>,
    ) -> Result<CommandResult> {
        let mut ctx = RunContext::new(true);
        let mut ready = true;

        ui.show_header("Windows features");
        let features = check_features(ui, config, catalog, &mut ctx);
        ready &= report(ui, features);

        ui.show_header("Deployment kit");
        let adk = check_adk(ui, config, versions, &mut ctx);
        ready &= report(ui, adk);

        ui.show_header("Directory container");
        let container = match store {
            Some(store) => check_container(ui, config, store),
            None => {
                ui.show_hint("Set directory.principal to check the container.");
                Ok(Verdict::NeedsWork)
            }
        };
        ready &= report(ui, container);

        report_warnings(ui, &mut ctx);

        if ready {
            ui.success("Host is ready");
            Ok(CommandResult::success())
        } else {
            ui.warning("Host needs work");
            Ok(CommandResult::failure(1))
        }
    }
}

/// Print a failed section and fold the result into a ready flag.
fn report(ui: &mut dyn UserInterface, result: Result<Verdict>) -> bool {
    match result {
        Ok(verdict) => verdict == Verdict::Ready,
        Err(e) => {
            tracing::debug!("Check failed: {:?}", e);
            ui.error(&e.to_string());
            false
        }
    }
}

fn check_features(
    ui: &mut dyn UserInterface,
    config: &SiteConfig,
    catalog: &mut dyn CatalogSource,
    ctx: &mut RunContext,
) -> Result<Verdict> {
    let snapshot = load_catalog(catalog, config.features.missing_catalog.into())?;
    let resolution = Resolution::compute(
        &config.features.required,
        &config.features.recommended,
        &snapshot,
    );
    for component in &resolution.recommended_missing {
        ctx.warn(Warning::OptionalComponentMissing {
            component: component.clone(),
        });
    }

    let roles = resolve_missing(&role_features(&config.wsus), &snapshot);

    if resolution.is_satisfied() {
        ui.success(&format!(
            "All {} required features are installed",
            config.features.required.len()
        ));
    } else {
        ui.message(&format!("Missing: {}", resolution.missing.join(", ")));
    }
    if roles.is_empty() {
        ui.success("Update service role is installed");
    } else {
        ui.message(&format!("Missing role services: {}", roles.join(", ")));
    }

    if resolution.is_satisfied() && roles.is_empty() {
        Ok(Verdict::Ready)
    } else {
        Ok(Verdict::NeedsWork)
    }
}

fn check_adk(
    ui: &mut dyn UserInterface,
    config: &SiteConfig,
    versions: &mut dyn VersionSource,
    ctx: &mut RunContext,
) -> Result<Verdict> {
    let decision = decide_addon(&config.adk, versions, ctx)?;
    ui.show_field("Version", &decision.kit_version.to_string());
    ui.show_field("Threshold", &decision.threshold.to_string());
    ui.show_field(
        "Add-on",
        if decision.required {
            "required"
        } else {
            "not required"
        },
    );
    Ok(Verdict::Ready)
}

fn check_container(
    ui: &mut dyn UserInterface,
    config: &SiteConfig,
    store: &mut dyn DirectoryStore,
) -> Result<Verdict> {
    let target = ContainerTarget::from_settings(&config.directory)?;
    let plan = Provisioner::new(store, &target).inspect()?;
    show_plan(ui, &plan);
    if plan.is_noop() {
        Ok(Verdict::Ready)
    } else {
        Ok(Verdict::NeedsWork)
    }
}

impl Command for CheckCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        let powershell = PowerShell::new();
        let mut catalog = HostCatalog::new(config.features.catalog, powershell.clone());
        let mut versions = HostVersionSource::new(powershell);

        if config.directory.principal.is_none() {
            return self.run(ui, &config, &mut catalog, &mut versions, None);
        }
        let mut store = host_directory(&config)?;
        self.run(ui, &config, &mut catalog, &mut versions, Some(&mut store))
    }
}
