//! Configuration schema definitions for siteprep.
//!
//! This module contains all the struct definitions that map to
//! the YAML configuration file format. Every section has serde defaults,
//! so a config file only needs to name what differs from a stock site server.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for `.siteprep/config.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity (for display purposes)
    pub site: SiteSettings,

    /// Windows roles and features
    pub features: FeatureSettings,

    /// Deployment kit and its add-on
    pub adk: AdkSettings,

    /// Installer prerequisite downloads
    pub prereqs: PrereqSettings,

    /// Software update service role
    pub wsus: WsusSettings,

    /// Database engine setup
    pub sql: SqlSettings,

    /// Directory container provisioning
    pub directory: DirectorySettings,

    /// Polling behaviour for long-running installers
    pub wait: WaitSettings,
}

/// Site identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    /// Three-character site code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Friendly site name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Which host catalog lists optional components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Server roles and features (`Get-WindowsFeature`)
    #[default]
    Server,
    /// Client optional features (`Get-WindowsOptionalFeature -Online`)
    Optional,
}

/// What to do when the feature catalog cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingCatalog {
    /// Stop with an error
    #[default]
    Fail,
    /// Continue as if nothing were installed
    TreatAsEmpty,
}

/// Windows roles and features.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureSettings {
    /// Catalog to query
    pub catalog: CatalogKind,

    /// Mandatory feature identifiers, installed in this order
    pub required: Vec<String>,

    /// Optional feature identifiers; missing ones only produce warnings
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended: Vec<String>,

    /// Alternate payload source (e.g. `D:\sources\sxs`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    /// Install management tools alongside each feature
    pub include_management_tools: bool,

    /// Behaviour when the catalog cannot be read
    pub missing_catalog: MissingCatalog,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            catalog: CatalogKind::Server,
            required: default_required_features(),
            recommended: Vec::new(),
            source: None,
            include_management_tools: false,
            missing_catalog: MissingCatalog::Fail,
        }
    }
}

fn default_required_features() -> Vec<String> {
    [
        "NET-Framework-Features",
        "NET-Framework-Core",
        "BITS",
        "BITS-IIS-Ext",
        "BITS-Compact-Server",
        "RDC",
        "WAS-Process-Model",
        "WAS-Config-APIs",
        "WAS-Net-Environment",
        "Web-Server",
        "Web-ISAPI-Ext",
        "Web-ISAPI-Filter",
        "Web-Net-Ext",
        "Web-Net-Ext45",
        "Web-ASP-Net",
        "Web-ASP-Net45",
        "Web-ASP",
        "Web-Windows-Auth",
        "Web-Basic-Auth",
        "Web-URL-Auth",
        "Web-IP-Security",
        "Web-Scripting-Tools",
        "Web-Mgmt-Service",
        "Web-Stat-Compression",
        "Web-Dyn-Compression",
        "Web-Metabase",
        "Web-WMI",
        "Web-HTTP-Redirect",
        "Web-Log-Libraries",
        "Web-HTTP-Tracing",
        "UpdateServices-RSAT",
        "UpdateServices-API",
        "UpdateServices-UI",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Deployment kit installer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AdkSettings {
    /// Path to `adksetup.exe`
    pub installer: PathBuf,

    /// Feature option identifiers passed to `/features`
    pub features: Vec<String>,

    /// Custom install location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,

    /// Process name polled while the installer runs
    pub process_name: String,

    /// Separately distributed add-on
    pub addon: AddonSettings,
}

impl Default for AdkSettings {
    fn default() -> Self {
        Self {
            installer: PathBuf::from(r"C:\Sources\ADK\adksetup.exe"),
            features: vec![
                "OptionId.DeploymentTools".to_string(),
                "OptionId.UserStateMigrationTool".to_string(),
            ],
            install_path: None,
            process_name: "adksetup".to_string(),
            addon: AddonSettings::default(),
        }
    }
}

/// Add-on required by newer deployment kit releases.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AddonSettings {
    /// Path to `adkwinpesetup.exe`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer: Option<PathBuf>,

    /// Feature option identifiers passed to `/features`
    pub features: Vec<String>,

    /// Process name polled while the add-on installer runs
    pub process_name: String,

    /// Kit versions at or above this need the add-on
    pub threshold: String,
}

impl Default for AddonSettings {
    fn default() -> Self {
        Self {
            installer: Some(PathBuf::from(r"C:\Sources\ADKWinPE\adkwinpesetup.exe")),
            features: vec!["OptionId.WindowsPreinstallationEnvironment".to_string()],
            process_name: "adkwinpesetup".to_string(),
            threshold: "10.1.17763.1".to_string(),
        }
    }
}

/// Installer prerequisite downloads.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PrereqSettings {
    /// Path to the prerequisite downloader (`setupdl.exe`)
    pub setupdl: PathBuf,

    /// Directory receiving downloaded prerequisites
    pub destination: PathBuf,

    /// Process name polled while the downloader runs
    pub process_name: String,

    /// Additional payloads fetched over HTTP
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub downloads: Vec<DownloadSpec>,
}

impl Default for PrereqSettings {
    fn default() -> Self {
        Self {
            setupdl: PathBuf::from(r"C:\Sources\ConfigMgr\SMSSETUP\BIN\X64\setupdl.exe"),
            destination: PathBuf::from(r"C:\Sources\ConfigMgr\Prereqs"),
            process_name: "setupdl".to_string(),
            downloads: Vec::new(),
        }
    }
}

/// A payload fetched over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DownloadSpec {
    /// Source URL
    pub url: String,

    /// Destination file
    pub dest: PathBuf,

    /// Expected SHA-256 of the payload (hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Software update service role.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct WsusSettings {
    /// Content directory passed to the post-install step
    pub content_dir: PathBuf,

    /// SQL instance for the update database; internal database when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_instance: Option<String>,

    /// Path to `wsusutil.exe`
    pub wsusutil: PathBuf,

    /// Extra features installed alongside the role services
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Default for WsusSettings {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(r"C:\WSUS"),
            sql_instance: None,
            wsusutil: PathBuf::from(r"C:\Program Files\Update Services\Tools\wsusutil.exe"),
            features: Vec::new(),
        }
    }
}

/// Database engine setup.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SqlSettings {
    /// Path to the database `setup.exe`
    pub setup: PathBuf,

    /// Where the rendered configuration file is written
    pub configuration_file: PathBuf,

    /// Instance name
    pub instance_name: String,

    /// Setup features
    pub features: Vec<String>,

    /// Server collation
    pub collation: String,

    /// Accounts granted sysadmin
    pub sysadmin_accounts: Vec<String>,

    /// Engine service account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    /// Agent service account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_service_account: Option<String>,

    /// User database directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// User log directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Backup directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Enable the TCP protocol
    pub tcp_enabled: bool,

    /// Process name polled while setup runs
    pub process_name: String,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            setup: PathBuf::from(r"C:\Sources\SQL\setup.exe"),
            configuration_file: PathBuf::from(r"C:\Sources\SQL\ConfigurationFile.ini"),
            instance_name: "MSSQLSERVER".to_string(),
            features: vec!["SQLENGINE".to_string()],
            collation: "SQL_Latin1_General_CP1_CI_AS".to_string(),
            sysadmin_accounts: vec!["BUILTIN\\Administrators".to_string()],
            service_account: None,
            agent_service_account: None,
            data_dir: None,
            log_dir: None,
            backup_dir: None,
            tcp_enabled: true,
            process_name: "setup".to_string(),
        }
    }
}

/// Directory container provisioning.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct DirectorySettings {
    /// Directory server to bind to; default server when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Alternate account; current identity when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Environment variable holding the password for `username`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Container name
    pub container: String,

    /// Parent path relative to the namespace root
    pub parent: String,

    /// Object class of the container
    pub object_class: String,

    /// Account granted full control over the container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            server: None,
            username: None,
            password_env: None,
            container: "System Management".to_string(),
            parent: "CN=System".to_string(),
            object_class: "container".to_string(),
            principal: None,
        }
    }
}

/// Polling behaviour for long-running installers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct WaitSettings {
    /// Seconds between liveness checks
    pub interval_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}
