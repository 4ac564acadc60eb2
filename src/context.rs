//! Per-invocation run context.
//!
//! A [`RunContext`] is built when a command starts and handed by `&mut` to
//! every step. Steps record their non-fatal findings here instead of
//! printing them, and the command reports them once at the end.

use chrono::{DateTime, Utc};
use std::fmt;

/// A non-fatal finding that does not block progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The permission entry was already on the object.
    PermissionAlreadyPresent { object: String, principal: String },
    /// A recommended component is not installed.
    OptionalComponentMissing { component: String },
    /// The host needs a restart before the change takes effect.
    RestartPending { reason: String },
    /// The installed tool needs the add-on.
    AddonRequired {
        tool: String,
        installed: String,
        threshold: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionAlreadyPresent { object, principal } => write!(
                f,
                "Permission for {} on {} is already present; please verify it grants full control",
                principal, object
            ),
            Self::OptionalComponentMissing { component } => {
                write!(f, "Recommended component {} is not installed", component)
            }
            Self::RestartPending { reason } => write!(f, "A restart is required: {}", reason),
            Self::AddonRequired {
                tool,
                installed,
                threshold,
            } => write!(
                f,
                "{} {} is at or above {} and needs the WinPE add-on",
                tool, installed, threshold
            ),
        }
    }
}

/// State threaded through one command invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Report what would change without changing it.
    pub dry_run: bool,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// Whether any step asked for a restart.
    pub restart_pending: bool,
    /// Add-on decision, once evaluated.
    pub addon_required: Option<bool>,
    warnings: Vec<Warning>,
}

impl RunContext {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            started_at: Utc::now(),
            restart_pending: false,
            addon_required: None,
            warnings: Vec::new(),
        }
    }

    /// Record a warning. Restart warnings also set `restart_pending`.
    pub fn warn(&mut self, warning: Warning) {
        if matches!(warning, Warning::RestartPending { .. }) {
            self.restart_pending = true;
        }
        tracing::debug!("Recorded warning: {}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Take the recorded warnings, leaving none behind.
    pub fn drain_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Time since the invocation started.
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(false)
    }
}
