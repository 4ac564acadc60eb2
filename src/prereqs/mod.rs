//! Prerequisite resolution.
//!
//! Compares a declared set of required components against a snapshot of the
//! host's component catalog, and decides whether a tool version needs a
//! separately distributed add-on. Everything here is a pure computation over
//! supplied snapshots; the host adapters only produce those snapshots.
//!
//! # Modules
//!
//! - [`catalog`] - Feature catalog snapshots and their sources
//! - [`resolver`] - Missing-component computation
//! - [`version`] - Four-part versions and the add-on rule
//!
//! # Example
//!
//! ```
//! use siteprep::prereqs::{resolve_missing, AddonRule, FeatureCatalog, InstallState};
//!
//! let catalog: FeatureCatalog = [("A", InstallState::Installed), ("B", InstallState::Absent)]
//!     .into_iter()
//!     .collect();
//! assert_eq!(resolve_missing(&["A", "B", "C"], &catalog), vec!["B", "C"]);
//!
//! let rule = AddonRule::new("10.1.17763.1".parse().unwrap());
//! assert!(rule.requires_addon("10.1.17763.1".parse().unwrap()));
//! ```

pub mod catalog;
pub mod resolver;
pub mod version;

pub use catalog::{
    load_catalog, CatalogPolicy, CatalogSource, FeatureCatalog, HostCatalog, InstallState,
};
pub use resolver::{resolve_missing, Resolution};
pub use version::{extract_version, AddonRule, HostVersionSource, ToolVersion, VersionSource};
