//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! Commands that touch the host build their host adapters in `execute` and
//! hand them to a `run` method taking trait objects, so the same flow runs
//! against fakes in tests.

pub mod adk;
pub mod check;
pub mod completions;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod features;
pub mod init;
pub mod prereqs;
pub mod sql;
pub mod wsus;

pub use dispatcher::{Command, CommandDispatcher, CommandResult, Project};

use std::time::Duration;

use crate::config::SiteConfig;
use crate::context::RunContext;
use crate::ui::{format_duration, UserInterface};

/// Report every warning the run collected.
pub(crate) fn report_warnings(ui: &mut dyn UserInterface, ctx: &mut RunContext) {
    for warning in ctx.drain_warnings() {
        tracing::warn!("{}", warning);
        ui.warning(&warning.to_string());
    }
    if ctx.restart_pending {
        ui.show_hint("Restart the server before continuing with the next step.");
    }
}

/// Report warnings, then how long the run took.
pub(crate) fn finish(ui: &mut dyn UserInterface, ctx: &mut RunContext) {
    report_warnings(ui, ctx);
    let elapsed = ctx.elapsed().to_std().unwrap_or_default();
    tracing::info!("Finished in {}", format_duration(elapsed));
    ui.message(&format!("Done in {}", format_duration(elapsed)));
}

/// Poll interval from the `wait` section.
pub(crate) fn poll_interval(config: &SiteConfig) -> Duration {
    Duration::from_secs(config.wait.interval_secs)
}

/// Tell the user nothing changed because they declined.
pub(crate) fn declined(ui: &mut dyn UserInterface) -> CommandResult {
    ui.message("Nothing changed.");
    CommandResult::success()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Warning;
    use crate::ui::MockUI;

    #[test]
    fn report_warnings_drains_context() {
        let mut ui = MockUI::new();
        let mut ctx = RunContext::new(false);
        ctx.warn(Warning::OptionalComponentMissing {
            component: "RSAT-AD-Tools".to_string(),
        });

        report_warnings(&mut ui, &mut ctx);

        assert!(ui.has_warning("RSAT-AD-Tools"));
        assert!(ctx.warnings().is_empty());
        assert!(ui.hints().is_empty());
    }

    #[test]
    fn restart_adds_hint() {
        let mut ui = MockUI::new();
        let mut ctx = RunContext::new(false);
        ctx.warn(Warning::RestartPending {
            reason: "installing NET-Framework-Core".to_string(),
        });

        report_warnings(&mut ui, &mut ctx);

        assert!(ui.has_warning("restart"));
        assert!(ui.has_hint("Restart the server"));
    }

    #[test]
    fn finish_reports_elapsed_time() {
        let mut ui = MockUI::new();
        let mut ctx = RunContext::new(false);
        ctx.started_at -= chrono::Duration::seconds(3);
        ctx.warn(Warning::OptionalComponentMissing {
            component: "RSAT-AD-Tools".to_string(),
        });

        finish(&mut ui, &mut ctx);

        assert!(ui.has_warning("RSAT-AD-Tools"));
        assert!(ui.has_message("Done in 3."));
    }

    #[test]
    fn poll_interval_reads_seconds() {
        let mut config = SiteConfig::default();
        config.wait.interval_secs = 12;
        assert_eq!(poll_interval(&config), Duration::from_secs(12));
    }
}
