//! Siteprep - Windows site-server preparation.
//!
//! Siteprep brings a Windows server to the state a configuration-management
//! site server needs before its own setup can run: server features, the
//! deployment kit and its WinPE add-on, the update service role, the
//! database engine and the systems-management container in the directory.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, merging, and validation
//! - [`context`] - Per-run state and collected warnings
//! - [`directory`] - Directory container and access-rule provisioning
//! - [`error`] - Error types and result aliases
//! - [`install`] - Feature, kit, role, and database installation
//! - [`prereqs`] - Feature catalog resolution and version checks
//! - [`shell`] - Process execution and wait loops
//! - [`ui`] - Interactive prompts, spinners, and terminal output
//!
//! # Example
//!
//! ```
//! use siteprep::prereqs::{AddonRule, ToolVersion};
//!
//! let threshold: ToolVersion = "10.1.17763.1".parse().unwrap();
//! let rule = AddonRule::new(threshold);
//! assert!(!rule.requires_addon("10.1.16299.15".parse().unwrap()));
//! assert!(rule.requires_addon("10.1.22621.1".parse().unwrap()));
//! ```
//!
//! For file-based config loading, see the integration tests.

pub mod cli;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod install;
pub mod prereqs;
pub mod shell;
pub mod ui;

pub use error::{Result, SiteprepError};
