//! Software update service role and its post-install step.

use crate::config::WsusSettings;
use crate::context::RunContext;
use crate::error::{Result, SiteprepError};
use crate::install::features::{
    install_features, FeatureInstallOptions, FeatureInstaller, InstallReport,
};
use crate::prereqs::{load_catalog, resolve_missing, CatalogPolicy, CatalogSource};
use crate::shell::{display_command, execute, CommandOptions};
use std::path::Path;

const ROLE_SERVICE: &str = "UpdateServices-Services";
const INTERNAL_DATABASE: &str = "UpdateServices-WidDB";
const SQL_DATABASE: &str = "UpdateServices-DB";

/// Role features for the configured database choice, extras last.
pub fn role_features(settings: &WsusSettings) -> Vec<String> {
    let database = if settings.sql_instance.is_some() {
        SQL_DATABASE
    } else {
        INTERNAL_DATABASE
    };
    let mut features = vec![ROLE_SERVICE.to_string(), database.to_string()];
    for extra in &settings.features {
        if !features.contains(extra) {
            features.push(extra.clone());
        }
    }
    features
}

/// Arguments for `wsusutil.exe postinstall`.
pub fn postinstall_arguments(settings: &WsusSettings) -> Vec<String> {
    let mut args = vec!["postinstall".to_string()];
    if let Some(instance) = &settings.sql_instance {
        args.push(format!("SQL_INSTANCE_NAME={}", instance));
    }
    args.push(format!("CONTENT_DIR={}", settings.content_dir.to_string_lossy()));
    args
}

/// Runs the post-install command.
pub trait PostInstall {
    fn run(&mut self, wsusutil: &Path, args: &[String]) -> Result<()>;
}

/// Runs `wsusutil.exe` and checks its exit code.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostPostInstall;

impl PostInstall for HostPostInstall {
    fn run(&mut self, wsusutil: &Path, args: &[String]) -> Result<()> {
        if !wsusutil.exists() {
            return Err(SiteprepError::ConfigurationMissing {
                what: "wsusutil".to_string(),
                detail: format!(
                    "{} does not exist; is the role installed?",
                    wsusutil.display()
                ),
            });
        }
        let result = execute(wsusutil, args, &CommandOptions::captured())?;
        if !result.success {
            tracing::debug!("wsusutil output: {}", result.stdout.trim());
            return Err(SiteprepError::CommandFailed {
                command: display_command(wsusutil, args),
                code: result.exit_code,
            });
        }
        Ok(())
    }
}

/// Outcome of [`install_wsus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsusOutcome {
    pub missing: Vec<String>,
    pub report: Option<InstallReport>,
    pub postinstall_ran: bool,
}

/// Install the role features that are missing, then run the post-install step.
pub fn install_wsus(
    settings: &WsusSettings,
    catalog: &mut dyn CatalogSource,
    policy: CatalogPolicy,
    installer: &mut dyn FeatureInstaller,
    postinstall: Option<&mut dyn PostInstall>,
    ctx: &mut RunContext,
) -> Result<WsusOutcome> {
    let snapshot = load_catalog(catalog, policy)?;
    let missing = resolve_missing(&role_features(settings), &snapshot);

    if ctx.dry_run {
        return Ok(WsusOutcome {
            missing,
            report: None,
            postinstall_ran: false,
        });
    }

    let options = FeatureInstallOptions {
        include_management_tools: true,
        ..FeatureInstallOptions::default()
    };
    let report = install_features(installer, &missing, &options, ctx)?;

    let postinstall_ran = match postinstall {
        Some(step) => {
            std::fs::create_dir_all(&settings.content_dir)?;
            let args = postinstall_arguments(settings);
            tracing::info!("Running post-install: {}", display_command(&settings.wsusutil, &args));
            step.run(&settings.wsusutil, &args)?;
            true
        }
        None => false,
    };

    Ok(WsusOutcome {
        missing,
        report: Some(report),
        postinstall_ran,
    })
}
