//! Windows role and feature installation.

use crate::config::CatalogKind;
use crate::context::{RunContext, Warning};
use crate::error::{Result, SiteprepError};
use crate::prereqs::{load_catalog, CatalogPolicy, CatalogSource, Resolution};
use crate::shell::PowerShell;
use serde::Deserialize;
use std::path::PathBuf;

/// Switches passed to the host install command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureInstallOptions {
    /// Alternate payload location (e.g. `D:\sources\sxs`).
    pub source: Option<PathBuf>,
    pub include_management_tools: bool,
}

/// Result of one install command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub success: bool,
    pub restart_needed: bool,
}

/// Installs named features on the host.
pub trait FeatureInstaller {
    fn install(&mut self, names: &[String], options: &FeatureInstallOptions)
        -> Result<InstallReport>;
}

const SERVER_INSTALL_SCRIPT: &str = r#"
$params = @{ Name = ($env:SITEPREP_FEATURES -split ',') }
if ($env:SITEPREP_MANAGEMENT_TOOLS -eq '1') { $params.IncludeManagementTools = $true }
if ($env:SITEPREP_SOURCE) { $params.Source = $env:SITEPREP_SOURCE }
$result = Install-WindowsFeature @params
@{ success = [bool]$result.Success; restart = ("$($result.RestartNeeded)" -eq 'Yes') }
"#;

const OPTIONAL_INSTALL_SCRIPT: &str = r#"
$params = @{ Online = $true; All = $true; NoRestart = $true; FeatureName = ($env:SITEPREP_FEATURES -split ',') }
if ($env:SITEPREP_SOURCE) { $params.Source = $env:SITEPREP_SOURCE; $params.LimitAccess = $true }
$result = Enable-WindowsOptionalFeature @params
@{ success = $true; restart = [bool]$result.RestartNeeded }
"#;

#[derive(Debug, Deserialize)]
struct InstallRow {
    success: bool,
    restart: bool,
}

/// Feature installer using the host's PowerShell cmdlets.
#[derive(Debug, Clone)]
pub struct HostFeatureInstaller {
    kind: CatalogKind,
    powershell: PowerShell,
}

impl HostFeatureInstaller {
    pub fn new(kind: CatalogKind, powershell: PowerShell) -> Self {
        Self { kind, powershell }
    }

    fn script(&self) -> &'static str {
        match self.kind {
            CatalogKind::Server => SERVER_INSTALL_SCRIPT,
            CatalogKind::Optional => OPTIONAL_INSTALL_SCRIPT,
        }
    }

    fn command_name(&self) -> &'static str {
        match self.kind {
            CatalogKind::Server => "Install-WindowsFeature",
            CatalogKind::Optional => "Enable-WindowsOptionalFeature",
        }
    }
}

fn install_params(
    names: &[String],
    options: &FeatureInstallOptions,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("FEATURES", names.join(","))];
    if options.include_management_tools {
        params.push(("MANAGEMENT_TOOLS", "1".to_string()));
    }
    if let Some(source) = &options.source {
        params.push(("SOURCE", source.to_string_lossy().to_string()));
    }
    params
}

impl FeatureInstaller for HostFeatureInstaller {
    fn install(
        &mut self,
        names: &[String],
        options: &FeatureInstallOptions,
    ) -> Result<InstallReport> {
        let row: InstallRow = self
            .powershell
            .try_json(self.script(), &install_params(names, options))?
            .map_err(|e| {
                if e.is_access_denied() {
                    SiteprepError::AccessDenied {
                        target: names.join(", "),
                        operation: "install".to_string(),
                    }
                } else {
                    tracing::debug!("{} failed: {}", self.command_name(), e);
                    SiteprepError::CommandFailed {
                        command: format!("{} {}", self.command_name(), names.join(",")),
                        code: None,
                    }
                }
            })?;

        Ok(InstallReport {
            installed: names.to_vec(),
            success: row.success,
            restart_needed: row.restart,
        })
    }
}

/// Install `names`, recording a restart warning when the host asks for one.
///
/// An empty list issues no command.
pub fn install_features(
    installer: &mut dyn FeatureInstaller,
    names: &[String],
    options: &FeatureInstallOptions,
    ctx: &mut RunContext,
) -> Result<InstallReport> {
    if names.is_empty() {
        return Ok(InstallReport {
            success: true,
            ..InstallReport::default()
        });
    }

    tracing::info!("Installing {}", names.join(", "));
    let report = installer.install(names, options)?;
    if !report.success {
        return Err(SiteprepError::CommandFailed {
            command: format!("install {}", names.join(",")),
            code: None,
        });
    }
    if report.restart_needed {
        ctx.warn(Warning::RestartPending {
            reason: format!("installing {}", names.join(", ")),
        });
    }
    Ok(report)
}

/// Outcome of [`ensure_features`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOutcome {
    pub resolution: Resolution,
    /// `None` in dry-run mode.
    pub report: Option<InstallReport>,
}

/// Take one catalog snapshot and resolve `required` and `recommended`
/// against it. Missing recommended components become warnings.
pub fn plan_features(
    catalog: &mut dyn CatalogSource,
    policy: CatalogPolicy,
    required: &[String],
    recommended: &[String],
    ctx: &mut RunContext,
) -> Result<Resolution> {
    let snapshot = load_catalog(catalog, policy)?;
    let resolution = Resolution::compute(required, recommended, &snapshot);

    for component in &resolution.recommended_missing {
        ctx.warn(Warning::OptionalComponentMissing {
            component: component.clone(),
        });
    }
    Ok(resolution)
}

/// Read the catalog, install the missing required features and warn about
/// missing recommended ones.
pub fn ensure_features(
    catalog: &mut dyn CatalogSource,
    policy: CatalogPolicy,
    installer: &mut dyn FeatureInstaller,
    required: &[String],
    recommended: &[String],
    options: &FeatureInstallOptions,
    ctx: &mut RunContext,
) -> Result<FeatureOutcome> {
    let resolution = plan_features(catalog, policy, required, recommended, ctx)?;

    if ctx.dry_run {
        return Ok(FeatureOutcome {
            resolution,
            report: None,
        });
    }

    let report = install_features(installer, &resolution.missing, options, ctx)?;
    Ok(FeatureOutcome {
        resolution,
        report: Some(report),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::prereqs::{FeatureCatalog, InstallState};

    pub struct FixedCatalog(pub Vec<(&'static str, InstallState)>);

    impl CatalogSource for FixedCatalog {
        fn snapshot(&mut self) -> Result<FeatureCatalog> {
            Ok(self.0.iter().copied().collect())
        }
    }

    /// A fixed catalog that counts how often it is read.
    pub struct CountingCatalog {
        pub inner: FixedCatalog,
        pub snapshots: usize,
    }

    impl CountingCatalog {
        pub fn new(entries: Vec<(&'static str, InstallState)>) -> Self {
            Self {
                inner: FixedCatalog(entries),
                snapshots: 0,
            }
        }
    }

    impl CatalogSource for CountingCatalog {
        fn snapshot(&mut self) -> Result<FeatureCatalog> {
            self.snapshots += 1;
            self.inner.snapshot()
        }
    }

    #[derive(Default)]
    pub struct RecordingInstaller {
        pub calls: Vec<Vec<String>>,
        pub restart: bool,
        pub fail: bool,
    }

    impl FeatureInstaller for RecordingInstaller {
        fn install(
            &mut self,
            names: &[String],
            _options: &FeatureInstallOptions,
        ) -> Result<InstallReport> {
            self.calls.push(names.to_vec());
            Ok(InstallReport {
                installed: names.to_vec(),
                success: !self.fail,
                restart_needed: self.restart,
            })
        }
    }
}
