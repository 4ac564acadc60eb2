//! Find-or-create a container and grant one principal full control on it.

use crate::config::DirectorySettings;
use crate::context::{RunContext, Warning};
use crate::directory::store::DirectoryStore;
use crate::directory::types::{AccessRule, DistinguishedName, ObjectHandle, Principal, Rdn};
use crate::error::{Result, SiteprepError};

/// States visited by a provisioning run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    NotSearched,
    Found,
    Created,
    PermissionAbsent,
    PermissionPresent,
    Done,
}

/// What happened to the permission entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionChange {
    Added,
    AlreadyPresent,
}

/// The container to provision and the principal to grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    /// Parent path relative to the namespace root, e.g. `CN=System`.
    pub parent: DistinguishedName,
    pub name: String,
    pub object_class: String,
    /// Account name to grant full control.
    pub principal: String,
}

impl ContainerTarget {
    /// Build a target from the `directory` configuration section.
    pub fn from_settings(settings: &DirectorySettings) -> Result<Self> {
        let parent = DistinguishedName::parse(&settings.parent).map_err(|message| {
            SiteprepError::ConfigValidationError {
                message: format!("directory.parent: {}", message),
            }
        })?;
        let principal = settings.principal.clone().ok_or_else(|| {
            SiteprepError::ConfigurationMissing {
                what: "directory principal".to_string(),
                detail: "set directory.principal to the site server's computer account".to_string(),
            }
        })?;
        Ok(Self {
            parent,
            name: settings.container.clone(),
            object_class: settings.object_class.clone(),
            principal,
        })
    }
}

/// Result of a provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub container: ObjectHandle,
    /// Whether this run created the container.
    pub created: bool,
    pub permission: PermissionChange,
    pub trace: Vec<ProvisionState>,
}

/// Read-only view of what a run would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    pub container_dn: DistinguishedName,
    pub principal: Principal,
    pub exists: bool,
    /// `None` when the container does not exist yet.
    pub permission_present: Option<bool>,
}

impl ProvisionPlan {
    /// Whether a run would write anything.
    pub fn is_noop(&self) -> bool {
        self.exists && self.permission_present == Some(true)
    }
}

/// Drives a [`DirectoryStore`] through the provisioning steps.
///
/// Nothing is written until the container's existence is settled, and the
/// only write to the access-control list is a single append gated by a
/// membership test. A second run therefore performs reads only.
pub struct Provisioner<'a, S: DirectoryStore + ?Sized> {
    store: &'a mut S,
    target: &'a ContainerTarget,
}

impl<'a, S: DirectoryStore + ?Sized> Provisioner<'a, S> {
    pub fn new(store: &'a mut S, target: &'a ContainerTarget) -> Self {
        Self { store, target }
    }

    fn resolve_scope(&mut self) -> Result<(DistinguishedName, Principal)> {
        let root = self.store.root_context()?;
        let parent = self.target.parent.under(&root);
        let principal = self.store.resolve_principal(&self.target.principal)?;
        tracing::debug!("Provisioning under {} for {}", parent, principal);
        Ok((parent, principal))
    }

    /// Direct child of `parent` with the target's class and name, if any.
    fn find(&mut self, parent: &DistinguishedName) -> Result<Option<ObjectHandle>> {
        let hits = self
            .store
            .search(parent, &self.target.object_class, &self.target.name)?;
        Ok(hits
            .into_iter()
            .find(|h| h.dn().parent().as_ref() == Some(parent)))
    }

    fn has_permission(&mut self, container: &ObjectHandle, principal: &Principal) -> Result<bool> {
        let rules = self.store.access_rules(container)?;
        Ok(rules.iter().any(|rule| principal.matches(&rule.principal)))
    }

    /// Run the provisioning steps, recording warnings in `ctx`.
    ///
    /// # Errors
    ///
    /// - `LookupFailed` when the namespace root or the principal cannot be resolved
    /// - `CreationFailed` when a create was accepted but the object is not found afterwards
    /// - `AccessDenied` when the store refuses a read or write
    pub fn run(&mut self, ctx: &mut RunContext) -> Result<ProvisionOutcome> {
        let mut trace = vec![ProvisionState::NotSearched];
        let (parent, principal) = self.resolve_scope()?;

        let (container, created) = match self.find(&parent)? {
            Some(handle) => {
                trace.push(ProvisionState::Found);
                tracing::info!("Container {} already exists", handle.dn());
                (handle, false)
            }
            None => {
                let expected = parent.child(Rdn::cn(&self.target.name));
                tracing::info!("Creating container {}", expected);
                self.store
                    .create_child(&parent, &self.target.object_class, &self.target.name)?;

                let handle = self.find(&parent)?.ok_or_else(|| SiteprepError::CreationFailed {
                    target: expected.to_string(),
                    message: "the create was accepted but a search afterwards found nothing"
                        .to_string(),
                })?;
                trace.push(ProvisionState::Created);
                (handle, true)
            }
        };

        let permission = if self.has_permission(&container, &principal)? {
            trace.push(ProvisionState::PermissionPresent);
            ctx.warn(Warning::PermissionAlreadyPresent {
                object: container.dn().to_string(),
                principal: principal.to_string(),
            });
            PermissionChange::AlreadyPresent
        } else {
            trace.push(ProvisionState::PermissionAbsent);
            tracing::info!("Granting full control on {} to {}", container.dn(), principal);
            self.store
                .add_access_rule(&container, &AccessRule::full_control(principal))?;
            PermissionChange::Added
        };

        trace.push(ProvisionState::Done);
        Ok(ProvisionOutcome {
            container,
            created,
            permission,
            trace,
        })
    }

    /// Report what [`run`](Self::run) would do without writing anything.
    pub fn inspect(&mut self) -> Result<ProvisionPlan> {
        let (parent, principal) = self.resolve_scope()?;
        let container_dn = parent.child(Rdn::cn(&self.target.name));

        let (exists, permission_present) = match self.find(&parent)? {
            Some(handle) => (true, Some(self.has_permission(&handle, &principal)?)),
            None => (false, None),
        };

        Ok(ProvisionPlan {
            container_dn,
            principal,
            exists,
            permission_present,
        })
    }
}
