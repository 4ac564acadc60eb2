//! Configuration validation rules.
//!
//! Validation collects every problem instead of stopping at the first one,
//! so an operator can fix a config file in one pass.

use crate::config::schema::SiteConfig;
use crate::error::{Result, SiteprepError};
use crate::prereqs::ToolVersion;
use std::collections::HashSet;

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    fn new(rule: &str, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
        }
    }
}

/// Validate a configuration and return all errors.
pub fn validate_config(config: &SiteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_site(config));
    errors.extend(validate_features(config));
    errors.extend(validate_adk(config));
    errors.extend(validate_downloads(config));
    errors.extend(validate_sql(config));
    errors.extend(validate_directory(config));

    if config.wait.interval_secs == 0 {
        errors.push(ValidationError::new(
            "zero-interval",
            "wait.interval_secs must be greater than zero".to_string(),
        ));
    }

    errors
}

fn validate_site(config: &SiteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if let Some(code) = &config.site.code {
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(ValidationError::new(
                "site-code",
                format!("site.code '{}' must be three letters or digits", code),
            ));
        }
    }
    errors
}

fn validate_features(config: &SiteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for name in &config.features.required {
        if name.trim().is_empty() {
            errors.push(ValidationError::new(
                "empty-feature",
                "features.required contains an empty identifier".to_string(),
            ));
        } else if !seen.insert(name.as_str()) {
            errors.push(ValidationError::new(
                "duplicate-feature",
                format!("features.required lists '{}' more than once", name),
            ));
        }
    }

    errors
}

fn validate_adk(config: &SiteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if let Err(e) = config.adk.addon.threshold.parse::<ToolVersion>() {
        errors.push(ValidationError::new(
            "addon-threshold",
            format!("adk.addon.threshold: {}", e),
        ));
    }
    if config.adk.features.is_empty() {
        errors.push(ValidationError::new(
            "adk-features",
            "adk.features must name at least one feature".to_string(),
        ));
    }
    errors
}

fn validate_downloads(config: &SiteConfig) -> Vec<ValidationError> {
    config
        .prereqs
        .downloads
        .iter()
        .filter_map(|d| {
            let sha = d.sha256.as_ref()?;
            if sha.len() == 64 && sha.chars().all(|c| c.is_ascii_hexdigit()) {
                None
            } else {
                Some(ValidationError::new(
                    "sha256",
                    format!("sha256 for {} must be 64 hex digits", d.url),
                ))
            }
        })
        .collect()
}

fn validate_sql(config: &SiteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if config.sql.instance_name.is_empty() || config.sql.instance_name.len() > 16 {
        errors.push(ValidationError::new(
            "sql-instance",
            format!(
                "sql.instance_name '{}' must be 1 to 16 characters",
                config.sql.instance_name
            ),
        ));
    }
    if config.sql.collation.chars().any(char::is_whitespace) {
        errors.push(ValidationError::new(
            "sql-collation",
            format!(
                "sql.collation '{}' must not contain whitespace",
                config.sql.collation
            ),
        ));
    }
    errors
}

fn validate_directory(config: &SiteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let dir = &config.directory;

    if dir.password_env.is_some() && dir.username.is_none() {
        errors.push(ValidationError::new(
            "credential",
            "directory.password_env requires directory.username".to_string(),
        ));
    }
    if dir.container.trim().is_empty() {
        errors.push(ValidationError::new(
            "container-name",
            "directory.container must not be empty".to_string(),
        ));
    }
    if crate::directory::DistinguishedName::parse(&dir.parent).is_err() {
        errors.push(ValidationError::new(
            "container-parent",
            format!(
                "directory.parent '{}' is not a valid relative name",
                dir.parent
            ),
        ));
    }

    errors
}

/// Validate and return Result (for convenience).
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail.
pub fn validate(config: &SiteConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(SiteprepError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}
