//! Process liveness checks.

use crate::error::{Result, SiteprepError};
use crate::shell::command::{execute, CommandOptions};
use std::path::Path;

/// Answers whether a process with a given image name is running.
pub trait ProcessProbe {
    /// Whether at least one process named `name` is running.
    ///
    /// `name` is the image name without extension (`adksetup`, not `adksetup.exe`).
    fn is_running(&mut self, name: &str) -> Result<bool>;
}

/// Probe backed by the host process table.
///
/// Uses `tasklist` on Windows and `pgrep -x` elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProcessProbe;

impl ProcessProbe for HostProcessProbe {
    fn is_running(&mut self, name: &str) -> Result<bool> {
        if cfg!(target_os = "windows") {
            let args = tasklist_args(name);
            let result = execute(Path::new("tasklist"), &args, &CommandOptions::captured())?;
            if !result.success {
                return Err(SiteprepError::CommandFailed {
                    command: format!("tasklist {}", args.join(" ")),
                    code: result.exit_code,
                });
            }
            Ok(tasklist_lists(&result.stdout, name))
        } else {
            let result = execute(
                Path::new("pgrep"),
                &["-x".to_string(), name.to_string()],
                &CommandOptions::captured(),
            )?;
            // pgrep: 0 = matched, 1 = nothing matched, anything else = failure
            match result.exit_code {
                Some(0) => Ok(true),
                Some(1) => Ok(false),
                code => Err(SiteprepError::CommandFailed {
                    command: format!("pgrep -x {}", name),
                    code,
                }),
            }
        }
    }
}

fn image_name(name: &str) -> String {
    if name.to_lowercase().ends_with(".exe") {
        name.to_string()
    } else {
        format!("{}.exe", name)
    }
}

fn tasklist_args(name: &str) -> Vec<String> {
    vec![
        "/FI".to_string(),
        format!("IMAGENAME eq {}", image_name(name)),
        "/NH".to_string(),
        "/FO".to_string(),
        "CSV".to_string(),
    ]
}

/// Whether `tasklist /FO CSV /NH` output contains the image.
///
/// When nothing matches, tasklist prints an informational line instead of CSV rows.
fn tasklist_lists(output: &str, name: &str) -> bool {
    let image = format!("\"{}\"", image_name(name).to_lowercase());
    output
        .lines()
        .any(|line| line.to_lowercase().starts_with(&image))
}
