//! External process execution, the PowerShell bridge and completion polling.

pub mod command;
pub mod powershell;
pub mod process;
pub mod wait;

pub use command::{
    display_command, execute, execute_check, launch_detached, CommandOptions, CommandResult,
};
pub use powershell::{PowerShell, ScriptError};
pub use process::{HostProcessProbe, ProcessProbe};
pub use wait::{wait_until_gone, SleepTicker, Ticker, WaitReport};

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("TF_BUILD").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}
