//! PowerShell bridge.
//!
//! Host facilities (feature catalog, directory services, file metadata) are
//! reached through short PowerShell scripts. Every script is wrapped so that
//! it prints exactly one JSON document: `{"ok": <value>}` on success or
//! `{"error": {"category": ..., "message": ...}}` on failure. Parameters are
//! handed over as `SITEPREP_*` environment variables and never spliced into
//! the script text, so values with quotes or `$` cannot change the script.

use crate::error::{Result, SiteprepError};
use crate::shell::command::{execute, CommandOptions};
use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix of environment variables carrying script parameters.
pub const PARAM_PREFIX: &str = "SITEPREP_";

/// A failure reported by the script itself.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ScriptError {
    /// PowerShell error category (e.g. `PermissionDenied`, `ObjectNotFound`).
    #[serde(default)]
    pub category: String,
    /// Exception message.
    #[serde(default)]
    pub message: String,
}

impl ScriptError {
    /// Whether the failure means the acting credential lacks rights.
    pub fn is_access_denied(&self) -> bool {
        let message = self.message.to_lowercase();
        self.category == "PermissionDenied"
            || self.category == "SecurityError"
            || message.contains("access is denied")
            || message.contains("insufficient access rights")
            || message.contains("unauthorized")
    }

    /// Whether the failure means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        let message = self.message.to_lowercase();
        self.category == "ObjectNotFound"
            || message.contains("there is no such object")
            || message.contains("not recognized as")
            || message.contains("cannot find")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.category.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} ({})", self.message, self.category)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Envelope<T> {
    Ok(T),
    Error(ScriptError),
}

/// Runs PowerShell scripts and decodes their JSON output.
#[derive(Debug, Clone)]
pub struct PowerShell {
    executable: PathBuf,
}

impl Default for PowerShell {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerShell {
    /// Use the platform's PowerShell (`powershell.exe` on Windows, `pwsh` elsewhere).
    pub fn new() -> Self {
        let executable = if cfg!(target_os = "windows") {
            "powershell.exe"
        } else {
            "pwsh"
        };
        Self::with_executable(executable)
    }

    /// Use a specific PowerShell executable.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// The executable this bridge invokes.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Wrap a script body in the JSON envelope.
    pub fn wrap(body: &str) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'\n\
             $ProgressPreference = 'SilentlyContinue'\n\
             try {{\n\
             $result = & {{\n{}\n}}\n\
             @{{ ok = $result }} | ConvertTo-Json -Depth 8 -Compress\n\
             }} catch {{\n\
             @{{ error = @{{ category = \"$($_.CategoryInfo.Category)\"; message = \"$($_.Exception.Message)\" }} }} | ConvertTo-Json -Compress\n\
             exit 1\n\
             }}",
            body
        )
    }

    /// Command-line arguments for running a wrapped script.
    pub fn arguments(body: &str) -> Vec<String> {
        vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-Command".to_string(),
            Self::wrap(body),
        ]
    }

    /// Run a script and decode its envelope.
    ///
    /// The outer `Result` fails when PowerShell cannot be started or prints
    /// something other than an envelope. The inner one carries failures the
    /// script reported, so callers can map them to a precise error kind.
    pub fn try_json<T: DeserializeOwned>(
        &self,
        body: &str,
        params: &[(&str, String)],
    ) -> Result<std::result::Result<T, ScriptError>> {
        let mut options = CommandOptions::captured();
        for (name, value) in params {
            options = options.with_env(&format!("{}{}", PARAM_PREFIX, name), value.clone());
        }

        let result = execute(&self.executable, &Self::arguments(body), &options)?;
        tracing::debug!(
            "PowerShell exited with {:?} after {:?}",
            result.exit_code,
            result.duration
        );

        decode_envelope(&result.stdout).map_err(|e| {
            tracing::debug!("Undecodable PowerShell output: {}", result.stderr.trim());
            e
        })
    }

    /// Run a script, treating any script failure as an error.
    pub fn run_json<T: DeserializeOwned>(
        &self,
        body: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        self.try_json(body, params)?
            .map_err(|e| SiteprepError::Other(anyhow!("PowerShell: {}", e)))
    }
}

/// Decode the last JSON line of script output.
pub fn decode_envelope<T: DeserializeOwned>(
    stdout: &str,
) -> Result<std::result::Result<T, ScriptError>> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| SiteprepError::Other(anyhow!("PowerShell produced no JSON output")))?;

    let envelope: Envelope<T> = serde_json::from_str(line)
        .map_err(|e| SiteprepError::Other(anyhow!("Unexpected PowerShell output: {}", e)))?;

    Ok(match envelope {
        Envelope::Ok(value) => Ok(value),
        Envelope::Error(err) => Err(err),
    })
}
