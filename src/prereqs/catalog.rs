//! Snapshot of which optional OS components are installed.

use crate::config::CatalogKind;
use crate::error::{Result, SiteprepError};
use crate::shell::PowerShell;
use serde::Deserialize;
use std::collections::HashMap;

/// Install state of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Absent,
    Installed,
}

/// Identifier → install state, fetched once per invocation.
///
/// The snapshot is never mutated after it is read; installing features does
/// not update it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureCatalog {
    entries: HashMap<String, InstallState>,
}

impl FeatureCatalog {
    /// An empty catalog: every lookup reports "not installed".
    pub fn empty() -> Self {
        Self::default()
    }

    /// State of `name`, or `None` if the catalog does not list it.
    pub fn state(&self, name: &str) -> Option<InstallState> {
        self.entries.get(name).copied()
    }

    /// Whether `name` is listed and installed.
    pub fn is_installed(&self, name: &str) -> bool {
        self.state(name) == Some(InstallState::Installed)
    }

    /// Number of listed components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, InstallState)> for FeatureCatalog {
    fn from_iter<I: IntoIterator<Item = (S, InstallState)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Something that can produce a catalog snapshot.
pub trait CatalogSource {
    /// Read the current catalog.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` when the catalog itself cannot be read.
    fn snapshot(&mut self) -> Result<FeatureCatalog>;
}

/// How a caller treats an unreadable catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogPolicy {
    /// Propagate `ConfigurationMissing`.
    Require,
    /// Continue with an empty catalog.
    TreatAsEmpty,
}

impl From<crate::config::MissingCatalog> for CatalogPolicy {
    fn from(value: crate::config::MissingCatalog) -> Self {
        match value {
            crate::config::MissingCatalog::Fail => Self::Require,
            crate::config::MissingCatalog::TreatAsEmpty => Self::TreatAsEmpty,
        }
    }
}

/// Read a snapshot, applying the caller's policy for an unreadable catalog.
///
/// Only `ConfigurationMissing` is subject to the policy; any other error
/// propagates regardless.
pub fn load_catalog(
    source: &mut dyn CatalogSource,
    policy: CatalogPolicy,
) -> Result<FeatureCatalog> {
    match source.snapshot() {
        Ok(catalog) => {
            tracing::debug!("Feature catalog lists {} components", catalog.len());
            Ok(catalog)
        }
        Err(SiteprepError::ConfigurationMissing { what, detail })
            if policy == CatalogPolicy::TreatAsEmpty =>
        {
            tracing::warn!("{} unavailable ({}); assuming nothing is installed", what, detail);
            Ok(FeatureCatalog::empty())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Installed")]
    installed: bool,
}

const SERVER_CATALOG_SCRIPT: &str = r#"
if (-not (Get-Command Get-WindowsFeature -ErrorAction SilentlyContinue)) {
    throw [System.Management.Automation.ItemNotFoundException]::new('Get-WindowsFeature is not available on this host')
}
,@(Get-WindowsFeature | ForEach-Object { @{ Name = $_.Name; Installed = [bool]$_.Installed } })
"#;

const OPTIONAL_CATALOG_SCRIPT: &str = r#"
if (-not (Get-Command Get-WindowsOptionalFeature -ErrorAction SilentlyContinue)) {
    throw [System.Management.Automation.ItemNotFoundException]::new('Get-WindowsOptionalFeature is not available on this host')
}
,@(Get-WindowsOptionalFeature -Online | ForEach-Object { @{ Name = $_.FeatureName; Installed = ($_.State -eq 'Enabled') } })
"#;

/// Catalog read from the host through PowerShell.
#[derive(Debug, Clone)]
pub struct HostCatalog {
    kind: CatalogKind,
    powershell: PowerShell,
}

impl HostCatalog {
    /// Create a host catalog of the given kind.
    pub fn new(kind: CatalogKind, powershell: PowerShell) -> Self {
        Self { kind, powershell }
    }

    fn script(&self) -> &'static str {
        match self.kind {
            CatalogKind::Server => SERVER_CATALOG_SCRIPT,
            CatalogKind::Optional => OPTIONAL_CATALOG_SCRIPT,
        }
    }
}

impl CatalogSource for HostCatalog {
    fn snapshot(&mut self) -> Result<FeatureCatalog> {
        let unavailable = |detail: String| SiteprepError::ConfigurationMissing {
            what: "feature catalog".to_string(),
            detail,
        };

        // PowerShell itself missing also means there is no catalog to read.
        let outcome = self
            .powershell
            .try_json::<Vec<CatalogRow>>(self.script(), &[])
            .map_err(|e| unavailable(e.to_string()))?;

        let rows = outcome.map_err(|e| {
            if e.is_access_denied() {
                SiteprepError::AccessDenied {
                    target: "feature catalog".to_string(),
                    operation: "read".to_string(),
                }
            } else {
                unavailable(e.to_string())
            }
        })?;

        Ok(parse_rows(rows))
    }
}

fn parse_rows(rows: Vec<CatalogRow>) -> FeatureCatalog {
    rows.into_iter()
        .map(|row| {
            let state = if row.installed {
                InstallState::Installed
            } else {
                InstallState::Absent
            };
            (row.name, state)
        })
        .collect()
}
