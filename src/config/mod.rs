//! Configuration loading, parsing, and validation for siteprep.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Layering in [`merger`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use siteprep::config::{load_merged_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".siteprep");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "site:\n  code: PS1").unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.site.code, Some("PS1".to_string()));
//! ```

pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

pub use schema::{
    AddonSettings, AdkSettings, CatalogKind, DirectorySettings, DownloadSpec, FeatureSettings,
    MissingCatalog, PrereqSettings, SiteConfig, SiteSettings, SqlSettings, WaitSettings,
    WsusSettings,
};

pub use loader::{
    load_config, load_config_file, load_config_value, load_merged_config, parse_config,
    project_config_path, ConfigPaths, CONFIG_DIR,
};

pub use merger::{deep_merge, merge_layers};

pub use validator::{validate, validate_config, ValidationError};

/// JSON Schema describing the config file.
pub fn config_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(SiteConfig)).unwrap_or_default()
}
