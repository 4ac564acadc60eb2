//! Installer drivers.
//!
//! Each driver checks what is already in place, then hands the actual work to
//! the platform: feature cmdlets, vendor installers launched silently and
//! polled until they exit, or `wsusutil.exe`.

pub mod adk;
pub mod download;
pub mod features;
pub mod launch;
pub mod sql;
pub mod wsus;

pub use adk::{decide_addon, install_adk, installer_arguments, AddonDecision, AdkOutcome};
pub use download::{run_setupdl, sha256_file, DownloadOutcome, Downloader};
pub use features::{
    ensure_features, install_features, plan_features, FeatureInstallOptions, FeatureInstaller,
    FeatureOutcome, HostFeatureInstaller, InstallReport,
};
pub use launch::{HostLauncher, InstallHost, Launcher};
pub use sql::{install_sql, SqlOutcome, SqlSetupOptions};
pub use wsus::{install_wsus, role_features, HostPostInstall, PostInstall, WsusOutcome};
