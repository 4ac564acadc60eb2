//! Error types for siteprep operations.
//!
//! This module defines [`SiteprepError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Every variant is terminal for the running command; nothing is retried
//! - Use `anyhow::Error` (via `SiteprepError::Other`) for glue inside host adapters
//! - Messages carry the target and the expected vs. observed state so an
//!   operator can finish the job by hand

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for siteprep operations.
#[derive(Debug, Error)]
pub enum SiteprepError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A required input file, path or catalog is absent.
    #[error("Missing {what}: {detail}")]
    ConfigurationMissing { what: String, detail: String },

    /// The namespace root or a required object could not be resolved.
    #[error("Lookup failed for '{target}': {message}")]
    LookupFailed { target: String, message: String },

    /// A write was accepted but its result is not observable afterwards.
    #[error("Creation of '{target}' could not be confirmed: {message}")]
    CreationFailed { target: String, message: String },

    /// The acting credential lacks rights for the operation.
    #[error("Access denied while trying to {operation} '{target}'")]
    AccessDenied { target: String, operation: String },

    /// An installed tool version requires a dependency that is not available.
    #[error("{tool} {installed} is at or above {threshold} and requires {requirement}")]
    VersionIncompatible {
        tool: String,
        installed: String,
        threshold: String,
        requirement: String,
    },

    /// External command could not be started or reported failure.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for siteprep operations.
pub type Result<T> = std::result::Result<T, SiteprepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = SiteprepError::ConfigNotFound {
            path: PathBuf::from("/foo/config.yml"),
        };
        assert!(err.to_string().contains("/foo/config.yml"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = SiteprepError::ConfigParseError {
            path: PathBuf::from("/config.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/config.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn configuration_missing_displays_what_and_detail() {
        let err = SiteprepError::ConfigurationMissing {
            what: "feature catalog".into(),
            detail: "Get-WindowsFeature is not available".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("feature catalog"));
        assert!(msg.contains("Get-WindowsFeature"));
    }

    #[test]
    fn lookup_failed_displays_target() {
        let err = SiteprepError::LookupFailed {
            target: "RootDSE".into(),
            message: "server not operational".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("RootDSE"));
        assert!(msg.contains("server not operational"));
    }

    #[test]
    fn creation_failed_displays_target() {
        let err = SiteprepError::CreationFailed {
            target: "CN=System Management,CN=System,DC=corp,DC=local".into(),
            message: "not found after create".into(),
        };
        assert!(err.to_string().contains("CN=System Management"));
    }

    #[test]
    fn access_denied_displays_operation_and_target() {
        let err = SiteprepError::AccessDenied {
            target: "CN=System,DC=corp,DC=local".into(),
            operation: "create child in".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("create child in"));
        assert!(msg.contains("CN=System,DC=corp,DC=local"));
    }

    #[test]
    fn version_incompatible_displays_versions() {
        let err = SiteprepError::VersionIncompatible {
            tool: "adksetup.exe".into(),
            installed: "10.1.22621.1".into(),
            threshold: "10.1.17763.1".into(),
            requirement: "the WinPE add-on".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10.1.22621.1"));
        assert!(msg.contains("10.1.17763.1"));
        assert!(msg.contains("WinPE add-on"));
    }

    #[test]
    fn command_failed_displays_command_and_code() {
        let err = SiteprepError::CommandFailed {
            command: "wsusutil.exe postinstall".into(),
            code: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("wsusutil.exe postinstall"));
        assert!(msg.contains("1"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: SiteprepError = io_err.into();
        assert!(matches!(err, SiteprepError::Io(_)));
    }
}
