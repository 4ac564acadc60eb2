//! External program execution.
//!
//! Programs are started directly (no intermediate shell) so that paths and
//! arguments containing spaces or quotes reach the installer untouched.

use crate::error::{Result, SiteprepError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Result of executing an external program.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the program succeeded (exit code 0).
    pub success: bool,
}

/// Options for program execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Capture stdout and stderr (if false, inherits from parent).
    pub capture: bool,
}

impl CommandOptions {
    /// Options that capture all output.
    pub fn captured() -> Self {
        Self {
            capture: true,
            ..Default::default()
        }
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }
}

/// Render a program and its arguments for logs and error messages.
pub fn display_command(program: &Path, args: &[String]) -> String {
    let mut parts = vec![quote_if_needed(&program.to_string_lossy())];
    parts.extend(args.iter().map(|a| quote_if_needed(a)));
    parts.join(" ")
}

fn quote_if_needed(part: &str) -> String {
    if part.contains(' ') && !part.starts_with('"') {
        format!("\"{}\"", part)
    } else {
        part.to_string()
    }
}

/// Execute a program and wait for it to finish.
pub fn execute(program: &Path, args: &[String], options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();
    let rendered = display_command(program, args);
    tracing::debug!("Executing {}", rendered);

    let mut cmd = Command::new(program);
    cmd.args(args);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    if options.capture {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let output = cmd.output().map_err(|e| {
        tracing::debug!("Failed to start {}: {}", rendered, e);
        SiteprepError::CommandFailed {
            command: rendered.clone(),
            code: None,
        }
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    Ok(CommandResult {
        exit_code: output.status.code(),
        stdout,
        stderr,
        duration: start.elapsed(),
        success: output.status.success(),
    })
}

/// Execute a program and return whether it succeeded.
pub fn execute_check(program: &Path, args: &[String]) -> bool {
    execute(program, args, &CommandOptions::captured())
        .map(|r| r.success)
        .unwrap_or(false)
}

/// Start a program without waiting for it.
///
/// The child is never awaited and its exit code is never read; callers
/// observe completion by polling the process table.
pub fn launch_detached(program: &Path, args: &[String]) -> Result<u32> {
    let rendered = display_command(program, args);

    if !program.exists() {
        return Err(SiteprepError::ConfigurationMissing {
            what: "installer".to_string(),
            detail: format!("{} does not exist", program.display()),
        });
    }

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            tracing::debug!("Failed to launch {}: {}", rendered, e);
            SiteprepError::CommandFailed {
                command: rendered.clone(),
                code: None,
            }
        })?;

    let pid = child.id();
    tracing::info!("Launched {} (pid {})", rendered, pid);
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_command_quotes_spaces() {
        let rendered = display_command(
            Path::new(r"C:\Program Files\Update Services\Tools\wsusutil.exe"),
            &["postinstall".to_string(), "CONTENT_DIR=D:\\WSUS".to_string()],
        );
        assert_eq!(
            rendered,
            r#""C:\Program Files\Update Services\Tools\wsusutil.exe" postinstall CONTENT_DIR=D:\WSUS"#
        );
    }

    #[test]
    fn display_command_leaves_quoted_parts() {
        let rendered = display_command(Path::new("setup.exe"), &["\"a b\"".to_string()]);
        assert_eq!(rendered, "setup.exe \"a b\"");
    }

    #[test]
    fn options_with_env() {
        let options = CommandOptions::captured().with_env("SITEPREP_NAME", "value");
        assert!(options.capture);
        assert_eq!(options.env.get("SITEPREP_NAME").map(String::as_str), Some("value"));
    }

    #[test]
    fn launch_missing_program_is_configuration_missing() {
        let err = launch_detached(Path::new("/definitely/not/here/setup.exe"), &[]).unwrap_err();
        assert!(matches!(err, SiteprepError::ConfigurationMissing { .. }));
    }

    #[test]
    fn execute_missing_program_is_command_failed() {
        let err = execute(
            Path::new("/definitely/not/here/tool"),
            &[],
            &CommandOptions::captured(),
        )
        .unwrap_err();
        assert!(matches!(err, SiteprepError::CommandFailed { code: None, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn execute_captures_stdout() {
        let result = execute(
            Path::new("sh"),
            &["-c".to_string(), "echo hello".to_string()],
            &CommandOptions::captured(),
        )
        .unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn execute_passes_env() {
        let options = CommandOptions::captured().with_env("SITEPREP_TEST_VAR", "my_value");
        let result = execute(
            Path::new("sh"),
            &["-c".to_string(), "echo $SITEPREP_TEST_VAR".to_string()],
            &options,
        )
        .unwrap();
        assert!(result.stdout.contains("my_value"));
    }

    #[cfg(unix)]
    #[test]
    fn execute_reports_failure_code() {
        let result = execute(
            Path::new("sh"),
            &["-c".to_string(), "exit 3".to_string()],
            &CommandOptions::captured(),
        )
        .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn execute_check_returns_bool() {
        assert!(execute_check(Path::new("true"), &[]));
        assert!(!execute_check(Path::new("false"), &[]));
    }
}
