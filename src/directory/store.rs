//! The directory access seam and its connection options.

use crate::config::DirectorySettings;
use crate::directory::types::{AccessRule, DistinguishedName, ObjectHandle, Principal};
use crate::error::{Result, SiteprepError};

/// Alternate identity for directory operations.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and as whom directory operations run.
///
/// The default targets the default server as the current session identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryOptions {
    server: Option<String>,
    credential: Option<Credential>,
}

impl DirectoryOptions {
    /// Build options, rejecting a password given without a username.
    pub fn new(
        server: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let server = server.filter(|s| !s.trim().is_empty());
        let username = username.filter(|u| !u.trim().is_empty());

        let credential = match (username, password) {
            (Some(username), password) => Some(Credential {
                username,
                password: password.unwrap_or_default(),
            }),
            (None, Some(_)) => {
                return Err(SiteprepError::ConfigValidationError {
                    message: "a directory password was supplied without a username".to_string(),
                })
            }
            (None, None) => None,
        };

        Ok(Self { server, credential })
    }

    /// Build options from the `directory` section, reading the password
    /// from the environment variable it names.
    pub fn from_settings(settings: &DirectorySettings) -> Result<Self> {
        let password = match &settings.password_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                SiteprepError::ConfigurationMissing {
                    what: "directory password".to_string(),
                    detail: format!("environment variable {} is not set", var),
                }
            })?),
            None => None,
        };
        Self::new(settings.server.clone(), settings.username.clone(), password)
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

/// Typed access to a hierarchical directory.
///
/// Implementations release any handle they open before returning, on
/// success and on failure alike.
pub trait DirectoryStore {
    /// Distinguished name of the top of the namespace.
    ///
    /// # Errors
    ///
    /// `LookupFailed` when the root cannot be resolved.
    fn root_context(&mut self) -> Result<DistinguishedName>;

    /// Objects of `object_class` named exactly `name` anywhere below `scope`.
    fn search(
        &mut self,
        scope: &DistinguishedName,
        object_class: &str,
        name: &str,
    ) -> Result<Vec<ObjectHandle>>;

    /// Immediate children of `object`.
    fn children(&mut self, object: &ObjectHandle) -> Result<Vec<ObjectHandle>>;

    /// Create and commit `CN=<name>` of `object_class` under `parent`.
    fn create_child(
        &mut self,
        parent: &DistinguishedName,
        object_class: &str,
        name: &str,
    ) -> Result<()>;

    /// Current access-control entries of `object`.
    fn access_rules(&mut self, object: &ObjectHandle) -> Result<Vec<AccessRule>>;

    /// Append `rule` to the access-control list of `object` and commit.
    fn add_access_rule(&mut self, object: &ObjectHandle, rule: &AccessRule) -> Result<()>;

    /// Resolve an account name to a principal carrying both forms.
    fn resolve_principal(&mut self, account: &str) -> Result<Principal>;
}
