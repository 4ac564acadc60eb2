//! Deployment kit and its add-on.

use crate::config::AdkSettings;
use crate::context::{RunContext, Warning};
use crate::error::{Result, SiteprepError};
use crate::install::launch::InstallHost;
use crate::prereqs::{AddonRule, ToolVersion, VersionSource};
use crate::shell::WaitReport;
use std::path::{Path, PathBuf};

/// Silent-install arguments for the kit or its add-on.
pub fn installer_arguments(features: &[String], install_path: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "/quiet".to_string(),
        "/norestart".to_string(),
        "/ceip".to_string(),
        "off".to_string(),
        "/features".to_string(),
    ];
    args.extend(features.iter().cloned());
    if let Some(path) = install_path {
        args.push("/installpath".to_string());
        args.push(path.to_string_lossy().to_string());
    }
    args
}

/// The add-on decision for one kit installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonDecision {
    pub kit_version: ToolVersion,
    pub threshold: ToolVersion,
    pub required: bool,
    /// The add-on installer to run, when required.
    pub installer: Option<PathBuf>,
}

/// Decide whether the add-on is needed, and check it can be installed.
///
/// Runs regardless of whether anything else changes, so the operator is
/// always told when the kit needs the add-on.
///
/// # Errors
///
/// - `ConfigurationMissing` when the kit installer is absent
/// - `VersionIncompatible` when the add-on is needed but not available
pub fn decide_addon(
    settings: &AdkSettings,
    versions: &mut dyn VersionSource,
    ctx: &mut RunContext,
) -> Result<AddonDecision> {
    let threshold: ToolVersion =
        settings
            .addon
            .threshold
            .parse()
            .map_err(|message| SiteprepError::ConfigValidationError {
                message: format!("adk.addon.threshold: {}", message),
            })?;
    let kit_version = versions.file_version(&settings.installer)?;
    let required = AddonRule::new(threshold).requires_addon(kit_version);
    ctx.addon_required = Some(required);

    tracing::info!(
        "Deployment kit {} (add-on threshold {}): add-on {}",
        kit_version,
        threshold,
        if required { "required" } else { "not required" }
    );

    if !required {
        return Ok(AddonDecision {
            kit_version,
            threshold,
            required,
            installer: None,
        });
    }

    ctx.warn(Warning::AddonRequired {
        tool: tool_name(&settings.installer),
        installed: kit_version.to_string(),
        threshold: threshold.to_string(),
    });

    let incompatible = || SiteprepError::VersionIncompatible {
        tool: tool_name(&settings.installer),
        installed: kit_version.to_string(),
        threshold: threshold.to_string(),
        requirement: "the WinPE add-on installer (adk.addon.installer)".to_string(),
    };
    let installer = settings.addon.installer.clone().ok_or_else(incompatible)?;
    if !installer.exists() {
        tracing::debug!("Add-on installer {} does not exist", installer.display());
        return Err(incompatible());
    }

    Ok(AddonDecision {
        kit_version,
        threshold,
        required,
        installer: Some(installer),
    })
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Outcome of [`install_adk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdkOutcome {
    pub decision: AddonDecision,
    /// `None` in dry-run mode.
    pub kit_wait: Option<WaitReport>,
    /// `None` in dry-run mode or when the add-on is not required.
    pub addon_wait: Option<WaitReport>,
}

/// Install the kit, then the add-on when `decision` says the kit needs it.
///
/// `decision` comes from [`decide_addon`], so both checks happen before
/// anything is launched.
pub fn install_adk(
    settings: &AdkSettings,
    decision: AddonDecision,
    host: &mut InstallHost,
    ctx: &RunContext,
) -> Result<AdkOutcome> {
    if ctx.dry_run {
        return Ok(AdkOutcome {
            decision,
            kit_wait: None,
            addon_wait: None,
        });
    }

    let kit_wait = host.launch_and_wait(
        &settings.installer,
        &installer_arguments(&settings.features, settings.install_path.as_deref()),
        &settings.process_name,
    )?;

    let addon_wait = match &decision.installer {
        Some(addon) => Some(host.launch_and_wait(
            addon,
            &installer_arguments(&settings.addon.features, settings.install_path.as_deref()),
            &settings.addon.process_name,
        )?),
        None => None,
    };

    Ok(AdkOutcome {
        decision,
        kit_wait: Some(kit_wait),
        addon_wait,
    })
}
