//! Configuration file discovery and loading.
//!
//! A project keeps its config in `.siteprep/config.yml`. An optional
//! `.siteprep/config.local.yml` next to it is layered on top, which is where
//! per-server values (principal, server, credentials) usually live.

use crate::config::merger::merge_layers;
use crate::config::schema::SiteConfig;
use crate::error::{Result, SiteprepError};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-project config directory.
pub const CONFIG_DIR: &str = ".siteprep";

/// Paths to configuration files in merge order (later overrides earlier).
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project config: .siteprep/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .siteprep/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        Self {
            project: existing(project_config_path(project_root)),
            project_local: existing(project_root.join(CONFIG_DIR).join("config.local.yml")),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.project.iter().chain(self.project_local.iter()).collect()
    }

    /// Check if the project config exists.
    pub fn has_project_config(&self) -> bool {
        self.project.is_some()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Location of the project config for a root, whether or not it exists.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join("config.yml")
}

/// Parse YAML content into a [`SiteConfig`].
///
/// `source_path` is only used for error reporting.
pub fn parse_config(content: &str, source_path: &Path) -> Result<SiteConfig> {
    serde_yaml::from_str(content).map_err(|e| SiteprepError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a config file as a raw YAML value (for merging).
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SiteprepError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            SiteprepError::Io(e)
        }
    })?;

    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| SiteprepError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    // An empty file parses to null; treat it as an empty mapping.
    if value.is_null() {
        Ok(serde_yaml::Value::Mapping(Default::default()))
    } else {
        Ok(value)
    }
}

/// Load a single config file without layering.
pub fn load_config_file(path: &Path) -> Result<SiteConfig> {
    let value = load_config_value(path)?;
    serde_yaml::from_value(value).map_err(|e| SiteprepError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and layer the project config with its local override.
///
/// # Errors
///
/// Returns `ConfigNotFound` if no project config exists.
/// Returns `ConfigParseError` if any layer is invalid.
pub fn load_merged_config(project_root: &Path) -> Result<SiteConfig> {
    let paths = ConfigPaths::discover(project_root);

    if !paths.has_project_config() {
        return Err(SiteprepError::ConfigNotFound {
            path: project_config_path(project_root),
        });
    }

    let mut layers = Vec::new();
    for path in paths.all_existing() {
        tracing::debug!("Loading config layer {}", path.display());
        layers.push(load_config_value(path)?);
    }

    serde_yaml::from_value(merge_layers(&layers)).map_err(|e| SiteprepError::ConfigParseError {
        path: project_config_path(project_root),
        message: format!("Failed to parse merged config: {}", e),
    })
}

/// Load config with optional path override.
///
/// An explicit `--config` path is loaded alone, without the local layer.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<SiteConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}
