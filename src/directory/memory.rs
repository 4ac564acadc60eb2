//! In-memory directory store.
//!
//! Used for dry runs and tests. Counts every operation and can be told to
//! misbehave the way a real directory does: an unreachable root, writes that
//! are accepted but never show up, and paths the credential may not touch.

use crate::directory::store::DirectoryStore;
use crate::directory::types::{AccessRule, DistinguishedName, ObjectHandle, Principal, Rdn};
use crate::error::{Result, SiteprepError};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct Node {
    handle: ObjectHandle,
    acl: Vec<AccessRule>,
}

/// Operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub root_lookups: usize,
    pub searches: usize,
    pub creates: usize,
    pub acl_reads: usize,
    pub acl_writes: usize,
}

impl OperationCounts {
    /// Creates plus ACL writes.
    pub fn writes(&self) -> usize {
        self.creates + self.acl_writes
    }
}

/// A directory tree held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    root: DistinguishedName,
    nodes: BTreeMap<String, Node>,
    principals: HashMap<String, Principal>,
    counts: OperationCounts,
    unresolvable_root: bool,
    ignore_creates: bool,
    denied: Vec<DistinguishedName>,
}

fn key(dn: &DistinguishedName) -> String {
    dn.to_string().to_lowercase()
}

impl MemoryDirectory {
    /// A tree holding only `root` (a `domainDNS` object).
    pub fn new(root: DistinguishedName) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            key(&root),
            Node {
                handle: ObjectHandle::new(root.clone(), "domainDNS"),
                acl: Vec::new(),
            },
        );
        Self {
            root,
            nodes,
            principals: HashMap::new(),
            counts: OperationCounts::default(),
            unresolvable_root: false,
            ignore_creates: false,
            denied: Vec::new(),
        }
    }

    /// Add an object directly, bypassing counters and faults.
    pub fn with_object(mut self, dn: DistinguishedName, object_class: &str) -> Self {
        self.nodes.insert(
            key(&dn),
            Node {
                handle: ObjectHandle::new(dn, object_class),
                acl: Vec::new(),
            },
        );
        self
    }

    /// Add an access rule directly, bypassing counters and faults.
    pub fn with_rule(mut self, dn: &DistinguishedName, rule: AccessRule) -> Self {
        if let Some(node) = self.nodes.get_mut(&key(dn)) {
            node.acl.push(rule);
        }
        self
    }

    /// Register an account that `resolve_principal` can find.
    pub fn with_principal(mut self, principal: Principal) -> Self {
        if let Some(account) = &principal.account {
            self.principals.insert(account.to_lowercase(), principal);
        }
        self
    }

    /// Make `root_context` fail.
    pub fn with_unresolvable_root(mut self) -> Self {
        self.unresolvable_root = true;
        self
    }

    /// Accept creates without storing anything.
    pub fn with_ignored_creates(mut self) -> Self {
        self.ignore_creates = true;
        self
    }

    /// Deny writes at or below `dn`.
    pub fn with_denied(mut self, dn: DistinguishedName) -> Self {
        self.denied.push(dn);
        self
    }

    pub fn counts(&self) -> OperationCounts {
        self.counts
    }

    /// Whether an object exists at `dn`.
    pub fn contains(&self, dn: &DistinguishedName) -> bool {
        self.nodes.contains_key(&key(dn))
    }

    /// Access rules stored on `dn`, if the object exists.
    pub fn rules_of(&self, dn: &DistinguishedName) -> Option<&[AccessRule]> {
        self.nodes.get(&key(dn)).map(|n| n.acl.as_slice())
    }

    /// Number of objects, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn is_below(dn: &DistinguishedName, ancestor: &DistinguishedName) -> bool {
        let mut current = Some(dn.clone());
        while let Some(candidate) = current {
            if &candidate == ancestor {
                return true;
            }
            current = candidate.parent();
        }
        false
    }

    fn check_write(&self, target: &DistinguishedName, operation: &str) -> Result<()> {
        if self.denied.iter().any(|d| Self::is_below(target, d)) {
            return Err(SiteprepError::AccessDenied {
                target: target.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn node(&self, object: &ObjectHandle) -> Result<&Node> {
        self.nodes
            .get(&key(object.dn()))
            .ok_or_else(|| SiteprepError::LookupFailed {
                target: object.dn().to_string(),
                message: "there is no such object".to_string(),
            })
    }
}

impl DirectoryStore for MemoryDirectory {
    fn root_context(&mut self) -> Result<DistinguishedName> {
        self.counts.root_lookups += 1;
        if self.unresolvable_root {
            return Err(SiteprepError::LookupFailed {
                target: "RootDSE".to_string(),
                message: "the server is not operational".to_string(),
            });
        }
        Ok(self.root.clone())
    }

    fn search(
        &mut self,
        scope: &DistinguishedName,
        object_class: &str,
        name: &str,
    ) -> Result<Vec<ObjectHandle>> {
        self.counts.searches += 1;
        Ok(self
            .nodes
            .values()
            .map(|n| &n.handle)
            .filter(|h| h.dn() != scope && Self::is_below(h.dn(), scope))
            .filter(|h| h.object_class().eq_ignore_ascii_case(object_class))
            .filter(|h| h.name().eq_ignore_ascii_case(name))
            .cloned()
            .collect())
    }

    fn children(&mut self, object: &ObjectHandle) -> Result<Vec<ObjectHandle>> {
        self.node(object)?;
        Ok(self
            .nodes
            .values()
            .map(|n| &n.handle)
            .filter(|h| h.dn().parent().as_ref() == Some(object.dn()))
            .cloned()
            .collect())
    }

    fn create_child(
        &mut self,
        parent: &DistinguishedName,
        object_class: &str,
        name: &str,
    ) -> Result<()> {
        self.counts.creates += 1;
        self.check_write(parent, "create child in")?;
        if !self.nodes.contains_key(&key(parent)) {
            return Err(SiteprepError::LookupFailed {
                target: parent.to_string(),
                message: "there is no such object".to_string(),
            });
        }

        let dn = parent.child(Rdn::cn(name));
        if self.nodes.contains_key(&key(&dn)) {
            return Err(SiteprepError::Other(anyhow::anyhow!(
                "the object {} already exists",
                dn
            )));
        }
        if self.ignore_creates {
            return Ok(());
        }

        self.nodes.insert(
            key(&dn),
            Node {
                handle: ObjectHandle::new(dn, object_class),
                acl: Vec::new(),
            },
        );
        Ok(())
    }

    fn access_rules(&mut self, object: &ObjectHandle) -> Result<Vec<AccessRule>> {
        self.counts.acl_reads += 1;
        Ok(self.node(object)?.acl.clone())
    }

    fn add_access_rule(&mut self, object: &ObjectHandle, rule: &AccessRule) -> Result<()> {
        self.counts.acl_writes += 1;
        self.check_write(object.dn(), "modify permissions on")?;
        let k = key(object.dn());
        let node = self
            .nodes
            .get_mut(&k)
            .ok_or_else(|| SiteprepError::LookupFailed {
                target: object.dn().to_string(),
                message: "there is no such object".to_string(),
            })?;
        node.acl.push(rule.clone());
        Ok(())
    }

    fn resolve_principal(&mut self, account: &str) -> Result<Principal> {
        self.principals
            .get(&account.to_lowercase())
            .cloned()
            .ok_or_else(|| SiteprepError::LookupFailed {
                target: account.to_string(),
                message: "no such account".to_string(),
            })
    }
}
