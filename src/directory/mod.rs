//! Idempotent directory provisioning.
//!
//! A [`Provisioner`] finds or creates one container object and makes sure a
//! single principal holds full control over it. All directory access goes
//! through the [`DirectoryStore`] trait:
//!
//! - [`AdsiDirectory`] talks to Active Directory
//! - [`MemoryDirectory`] keeps a tree in memory for tests and dry runs
//!
//! # Example
//!
//! ```
//! use siteprep::context::RunContext;
//! use siteprep::directory::{
//!     ContainerTarget, DistinguishedName, MemoryDirectory, PermissionChange, Principal,
//!     Provisioner,
//! };
//!
//! let root = DistinguishedName::parse("DC=corp,DC=local").unwrap();
//! let mut store = MemoryDirectory::new(root.clone())
//!     .with_object(DistinguishedName::parse("CN=System,DC=corp,DC=local").unwrap(), "container")
//!     .with_principal(Principal::new("S-1-5-21-1-2-3-1104", "CORP\\CM01$"));
//! let target = ContainerTarget {
//!     parent: DistinguishedName::parse("CN=System").unwrap(),
//!     name: "System Management".into(),
//!     object_class: "container".into(),
//!     principal: "CORP\\CM01$".into(),
//! };
//!
//! let mut ctx = RunContext::default();
//! let first = Provisioner::new(&mut store, &target).run(&mut ctx).unwrap();
//! assert!(first.created);
//! let second = Provisioner::new(&mut store, &target).run(&mut ctx).unwrap();
//! assert_eq!(second.permission, PermissionChange::AlreadyPresent);
//! ```

pub mod adsi;
pub mod memory;
pub mod provisioner;
pub mod store;
pub mod types;

pub use adsi::AdsiDirectory;
pub use memory::{MemoryDirectory, OperationCounts};
pub use provisioner::{
    ContainerTarget, PermissionChange, ProvisionOutcome, ProvisionPlan, ProvisionState, Provisioner,
};
pub use store::{Credential, DirectoryOptions, DirectoryStore};
pub use types::{
    AccessEffect, AccessRights, AccessRule, DistinguishedName, InheritanceScope, ObjectHandle,
    Principal, Rdn,
};
