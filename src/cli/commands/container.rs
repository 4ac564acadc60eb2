//! Container command implementation.
//!
//! The `siteprep container` command makes sure the systems-management
//! container exists under the namespace root and that the site server's
//! account has full control over it. Running it twice changes nothing the
//! second time.

use crate::cli::args::StepArgs;
use crate::config::SiteConfig;
use crate::context::RunContext;
use crate::directory::{
    AdsiDirectory, ContainerTarget, DirectoryOptions, DirectoryStore, PermissionChange,
    ProvisionPlan, Provisioner,
};
use crate::error::Result;
use crate::shell::PowerShell;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Project};
use super::{declined, finish};

/// The container command implementation.
pub struct ContainerCommand {
    project: Project,
    args: StepArgs,
}

impl ContainerCommand {
    /// Create a new container command.
    pub fn new(project: Project, args: StepArgs) -> Self {
        Self { project, args }
    }

    pub fn run(
        &self,
        ui: &mut dyn UserInterface,
        config: &SiteConfig,
        store: &mut dyn DirectoryStore,
    ) -> Result<CommandResult> {
        let target = ContainerTarget::from_settings(&config.directory)?;
        let mut ctx = RunContext::new(self.args.dry_run);

        ui.show_header("Directory container");

        let plan = Provisioner::new(&mut *store, &target).inspect()?;
        show_plan(ui, &plan);

        if ctx.dry_run {
            if plan.is_noop() {
                ui.success("Container and permission already in place");
            }
            if !plan.exists {
                ui.message(&format!("Would create {}", plan.container_dn));
            }
            if plan.permission_present != Some(true) {
                ui.message(&format!("Would grant full control to {}", plan.principal));
            }
            return Ok(CommandResult::success());
        }

        if !plan.is_noop() && !self.project.confirm(ui, "Provision the container?")? {
            return Ok(declined(ui));
        }

        let outcome = Provisioner::new(&mut *store, &target).run(&mut ctx)?;
        if outcome.created {
            ui.success(&format!("Created {}", outcome.container.dn()));
        }
        match outcome.permission {
            PermissionChange::Added => {
                ui.success(&format!("Granted full control to {}", target.principal))
            }
            PermissionChange::AlreadyPresent if !outcome.created => {
                ui.success("Container and permission already in place")
            }
            PermissionChange::AlreadyPresent => {}
        }

        finish(ui, &mut ctx);
        Ok(CommandResult::success())
    }
}

/// Show what an inspection found.
pub(crate) fn show_plan(ui: &mut dyn UserInterface, plan: &ProvisionPlan) {
    ui.show_field("Container", &plan.container_dn.to_string());
    ui.show_field("Principal", &plan.principal.to_string());
    ui.show_field("Exists", if plan.exists { "yes" } else { "no" });
    ui.show_field(
        "Permission",
        match plan.permission_present {
            Some(true) => "present",
            Some(false) => "absent",
            None => "n/a",
        },
    );
}

/// Directory access configured by the `directory` section.
pub(crate) fn host_directory(config: &SiteConfig) -> Result<AdsiDirectory> {
    let options = DirectoryOptions::from_settings(&config.directory)?;
    Ok(AdsiDirectory::new(PowerShell::new(), options))
}

impl Command for ContainerCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.project.load(ui)? else {
            return Ok(CommandResult::failure(2));
        };

        let mut store = host_directory(&config)?;
        self.run(ui, &config, &mut store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{AccessRule, DistinguishedName, MemoryDirectory, Principal};
    use crate::error::SiteprepError;
    use crate::ui::MockUI;

    const ACCOUNT: &str = r"CORP\CM01$";
    const SID: &str = "S-1-5-21-1-2-3-1105";

    fn dn(s: &str) -> DistinguishedName {
        DistinguishedName::parse(s).unwrap()
    }

    fn container_dn() -> DistinguishedName {
        dn("CN=System Management,CN=System,DC=corp,DC=local")
    }

    fn store() -> MemoryDirectory {
        MemoryDirectory::new(dn("DC=corp,DC=local"))
            .with_object(dn("CN=System,DC=corp,DC=local"), "container")
            .with_principal(Principal::new(SID, ACCOUNT))
    }

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.directory.principal = Some(ACCOUNT.to_string());
        config
    }

    fn command(dry_run: bool) -> ContainerCommand {
        ContainerCommand::new(
            Project::new("/site").with_assume_yes(true),
            StepArgs { dry_run },
        )
    }

    #[test]
    fn creates_and_grants() {
        let mut store = store();
        let mut ui = MockUI::new();

        command(false).run(&mut ui, &config(), &mut store).unwrap();

        assert!(store.contains(&container_dn()));
        assert_eq!(store.rules_of(&container_dn()).unwrap().len(), 1);
        assert!(ui.has_success("Created CN=System Management"));
        assert!(ui.has_success("Granted full control"));
        assert!(ui.has_message("Done in"));
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut store = store();
        command(false)
            .run(&mut MockUI::new(), &config(), &mut store)
            .unwrap();
        let writes = store.counts().writes();

        let mut ui = MockUI::new();
        command(false).run(&mut ui, &config(), &mut store).unwrap();

        assert_eq!(store.counts().writes(), writes);
        assert!(ui.has_success("already in place"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let mut store = store();
        let mut ui = MockUI::new();

        command(true).run(&mut ui, &config(), &mut store).unwrap();

        assert_eq!(store.counts().writes(), 0);
        assert!(ui.has_message("Would create CN=System Management"));
        assert!(ui.has_message("Would grant full control"));
    }

    #[test]
    fn existing_container_only_gets_permission() {
        let mut store = store().with_object(container_dn(), "container");
        let mut ui = MockUI::new();

        command(false).run(&mut ui, &config(), &mut store).unwrap();

        assert_eq!(store.counts().creates, 0);
        assert_eq!(store.counts().acl_writes, 1);
        assert!(!ui.has_success("Created"));
    }

    #[test]
    fn existing_permission_for_other_spelling_is_kept() {
        let existing = AccessRule::full_control(Principal::from_account(r"corp\cm01$"));
        let mut store = store()
            .with_object(container_dn(), "container")
            .with_rule(&container_dn(), existing);
        let mut ui = MockUI::new();

        command(false).run(&mut ui, &config(), &mut store).unwrap();

        assert_eq!(store.counts().writes(), 0);
        assert!(ui.has_message("Permission: present"));
        assert!(ui.has_warning("already present"));
    }

    #[test]
    fn missing_principal_is_configuration_missing() {
        let mut store = store();
        let err = command(false)
            .run(&mut MockUI::new(), &SiteConfig::default(), &mut store)
            .unwrap_err();
        assert!(matches!(err, SiteprepError::ConfigurationMissing { .. }));
    }

    #[test]
    fn unresolvable_root_is_lookup_failed() {
        let mut store = store().with_unresolvable_root();
        let err = command(false)
            .run(&mut MockUI::new(), &config(), &mut store)
            .unwrap_err();
        assert!(matches!(err, SiteprepError::LookupFailed { .. }));
        assert_eq!(store.counts().writes(), 0);
    }
}
