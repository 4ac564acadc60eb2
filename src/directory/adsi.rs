//! Directory store backed by Active Directory through `System.DirectoryServices`.
//!
//! Every operation is one PowerShell script. The server and credential travel
//! as environment variables, so the password never appears on a command line.
//! Each script disposes the entries and searchers it opens in a `finally`
//! block.

use crate::directory::store::{DirectoryOptions, DirectoryStore};
use crate::directory::types::{
    escape_filter_value, escape_value, AccessEffect, AccessRights, AccessRule, DistinguishedName,
    InheritanceScope, ObjectHandle, Principal,
};
use crate::error::{Result, SiteprepError};
use crate::shell::{PowerShell, ScriptError};
use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const PRELUDE: &str = r#"
function Open-Entry([string]$dn) {
    $path = if ($env:SITEPREP_SERVER) { "LDAP://$($env:SITEPREP_SERVER)/$dn" } else { "LDAP://$dn" }
    if ($env:SITEPREP_USER) {
        New-Object System.DirectoryServices.DirectoryEntry($path, $env:SITEPREP_USER, $env:SITEPREP_PASSWORD)
    } else {
        New-Object System.DirectoryServices.DirectoryEntry($path)
    }
}
"#;

const ROOT_SCRIPT: &str = r#"
$entry = Open-Entry 'RootDSE'
try { [string]$entry.Properties['defaultNamingContext'][0] } finally { $entry.Dispose() }
"#;

const SEARCH_SCRIPT: &str = r#"
$base = $null
$searcher = $null
try {
    $base = Open-Entry $env:SITEPREP_SCOPE
    $searcher = New-Object System.DirectoryServices.DirectorySearcher($base)
    $searcher.Filter = $env:SITEPREP_FILTER
    $searcher.SearchScope = 'Subtree'
    [void]$searcher.PropertiesToLoad.Add('distinguishedName')
    [void]$searcher.PropertiesToLoad.Add('objectClass')
    $results = $searcher.FindAll()
    try {
        ,@($results | ForEach-Object {
            @{ dn = [string]$_.Properties['distinguishedname'][0]; class = $env:SITEPREP_CLASS }
        })
    } finally { $results.Dispose() }
} finally {
    if ($searcher) { $searcher.Dispose() }
    if ($base) { $base.Dispose() }
}
"#;

const CHILDREN_SCRIPT: &str = r#"
$entry = Open-Entry $env:SITEPREP_DN
try {
    ,@($entry.Children | ForEach-Object {
        $dn = [string]$_.Properties['distinguishedName'][0]
        $class = [string]$_.SchemaClassName
        $_.Dispose()
        @{ dn = $dn; class = $class }
    })
} finally { $entry.Dispose() }
"#;

const CREATE_SCRIPT: &str = r#"
$parent = Open-Entry $env:SITEPREP_PARENT
try {
    $child = $parent.Children.Add($env:SITEPREP_RDN, $env:SITEPREP_CLASS)
    try { $child.CommitChanges() } finally { $child.Dispose() }
    $null
} finally { $parent.Dispose() }
"#;

const ACL_SCRIPT: &str = r#"
$entry = Open-Entry $env:SITEPREP_DN
try {
    $sidType = [System.Security.Principal.SecurityIdentifier]
    ,@($entry.ObjectSecurity.GetAccessRules($true, $true, $sidType) | ForEach-Object {
        $sid = $_.IdentityReference.Value
        $account = try { $_.IdentityReference.Translate([System.Security.Principal.NTAccount]).Value } catch { $null }
        @{
            sid = $sid
            account = $account
            rights = "$($_.ActiveDirectoryRights)"
            effect = "$($_.AccessControlType)"
            inheritance = "$($_.InheritanceType)"
        }
    })
} finally { $entry.Dispose() }
"#;

const ADD_RULE_SCRIPT: &str = r#"
$entry = Open-Entry $env:SITEPREP_DN
try {
    $identity = if ($env:SITEPREP_SID) {
        New-Object System.Security.Principal.SecurityIdentifier($env:SITEPREP_SID)
    } else {
        New-Object System.Security.Principal.NTAccount($env:SITEPREP_ACCOUNT)
    }
    $rule = New-Object System.DirectoryServices.ActiveDirectoryAccessRule(
        $identity,
        [System.DirectoryServices.ActiveDirectoryRights]$env:SITEPREP_RIGHTS,
        [System.Security.AccessControl.AccessControlType]$env:SITEPREP_EFFECT,
        [System.DirectoryServices.ActiveDirectorySecurityInheritance]$env:SITEPREP_INHERITANCE)
    $entry.ObjectSecurity.AddAccessRule($rule)
    $entry.CommitChanges()
    $null
} finally { $entry.Dispose() }
"#;

const RESOLVE_SCRIPT: &str = r#"
$account = New-Object System.Security.Principal.NTAccount($env:SITEPREP_ACCOUNT)
$sid = $account.Translate([System.Security.Principal.SecurityIdentifier]).Value
@{ sid = $sid; account = $env:SITEPREP_ACCOUNT }
"#;

#[derive(Debug, Deserialize)]
struct ObjectRow {
    dn: String,
    class: String,
}

#[derive(Debug, Deserialize)]
struct RuleRow {
    sid: Option<String>,
    account: Option<String>,
    rights: String,
    effect: String,
    inheritance: String,
}

#[derive(Debug, Deserialize)]
struct PrincipalRow {
    sid: Option<String>,
    account: Option<String>,
}

/// Active Directory store.
#[derive(Debug, Clone)]
pub struct AdsiDirectory {
    powershell: PowerShell,
    options: DirectoryOptions,
}

impl AdsiDirectory {
    pub fn new(powershell: PowerShell, options: DirectoryOptions) -> Self {
        Self {
            powershell,
            options,
        }
    }

    fn connection_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(server) = self.options.server() {
            params.push(("SERVER", server.to_string()));
        }
        if let Some(credential) = self.options.credential() {
            params.push(("USER", credential.username.clone()));
            params.push(("PASSWORD", credential.password.clone()));
        }
        params
    }

    /// Run `body` and map script failures on `target` to error kinds.
    fn call<T: DeserializeOwned>(
        &self,
        body: &str,
        extra: Vec<(&'static str, String)>,
        target: &str,
        operation: &str,
    ) -> Result<T> {
        let mut params = self.connection_params();
        params.extend(extra);
        let script = format!("{}\n{}", PRELUDE, body);

        tracing::debug!("Directory: {} '{}'", operation, target);
        self.powershell
            .try_json(&script, &params)?
            .map_err(|e| classify(e, target, operation))
    }
}

fn classify(error: ScriptError, target: &str, operation: &str) -> SiteprepError {
    if error.is_access_denied() {
        SiteprepError::AccessDenied {
            target: target.to_string(),
            operation: operation.to_string(),
        }
    } else if error.is_not_found() {
        SiteprepError::LookupFailed {
            target: target.to_string(),
            message: error.to_string(),
        }
    } else {
        SiteprepError::Other(anyhow!("Failed to {} '{}': {}", operation, target, error))
    }
}

fn parse_dn(text: &str) -> Result<DistinguishedName> {
    DistinguishedName::parse(text)
        .map_err(|e| SiteprepError::Other(anyhow!("Directory returned a bad name: {}", e)))
}

fn object_rows(rows: Vec<ObjectRow>) -> Result<Vec<ObjectHandle>> {
    rows.into_iter()
        .map(|row| Ok(ObjectHandle::new(parse_dn(&row.dn)?, row.class)))
        .collect()
}

fn rule_row(row: RuleRow) -> Result<AccessRule> {
    let effect = row
        .effect
        .parse::<AccessEffect>()
        .map_err(|e| SiteprepError::Other(anyhow!(e)))?;
    let inheritance = row
        .inheritance
        .parse::<InheritanceScope>()
        .map_err(|e| SiteprepError::Other(anyhow!(e)))?;
    Ok(AccessRule {
        principal: Principal {
            sid: row.sid,
            account: row.account,
        },
        rights: AccessRights::from(row.rights.as_str()),
        effect,
        inheritance,
    })
}

/// LDAP filter matching `object_class` objects named `name`.
pub fn search_filter(object_class: &str, name: &str) -> String {
    format!(
        "(&(objectClass={})(name={}))",
        escape_filter_value(object_class),
        escape_filter_value(name)
    )
}

impl DirectoryStore for AdsiDirectory {
    fn root_context(&mut self) -> Result<DistinguishedName> {
        let raw: Option<String> = self
            .call(ROOT_SCRIPT, Vec::new(), "RootDSE", "read")
            .map_err(|e| match e {
                SiteprepError::AccessDenied { .. } => e,
                other => SiteprepError::LookupFailed {
                    target: "RootDSE".to_string(),
                    message: other.to_string(),
                },
            })?;

        let raw = raw.filter(|s| !s.is_empty()).ok_or_else(|| SiteprepError::LookupFailed {
            target: "RootDSE".to_string(),
            message: "no default naming context".to_string(),
        })?;
        parse_dn(&raw)
    }

    fn search(
        &mut self,
        scope: &DistinguishedName,
        object_class: &str,
        name: &str,
    ) -> Result<Vec<ObjectHandle>> {
        let scope_text = scope.to_string();
        let rows: Vec<ObjectRow> = self.call(
            SEARCH_SCRIPT,
            vec![
                ("SCOPE", scope_text.clone()),
                ("FILTER", search_filter(object_class, name)),
                ("CLASS", object_class.to_string()),
            ],
            &scope_text,
            "search",
        )?;
        object_rows(rows)
    }

    fn children(&mut self, object: &ObjectHandle) -> Result<Vec<ObjectHandle>> {
        let dn = object.dn().to_string();
        let rows: Vec<ObjectRow> =
            self.call(CHILDREN_SCRIPT, vec![("DN", dn.clone())], &dn, "list children of")?;
        object_rows(rows)
    }

    fn create_child(
        &mut self,
        parent: &DistinguishedName,
        object_class: &str,
        name: &str,
    ) -> Result<()> {
        let parent_text = parent.to_string();
        let _: Option<serde_json::Value> = self.call(
            CREATE_SCRIPT,
            vec![
                ("PARENT", parent_text.clone()),
                ("RDN", format!("CN={}", escape_value(name))),
                ("CLASS", object_class.to_string()),
            ],
            &parent_text,
            "create child in",
        )?;
        Ok(())
    }

    fn access_rules(&mut self, object: &ObjectHandle) -> Result<Vec<AccessRule>> {
        let dn = object.dn().to_string();
        let rows: Vec<RuleRow> =
            self.call(ACL_SCRIPT, vec![("DN", dn.clone())], &dn, "read permissions on")?;
        rows.into_iter().map(rule_row).collect()
    }

    fn add_access_rule(&mut self, object: &ObjectHandle, rule: &AccessRule) -> Result<()> {
        let dn = object.dn().to_string();
        let mut params = vec![
            ("DN", dn.clone()),
            ("RIGHTS", rule.rights.as_str().to_string()),
            ("EFFECT", rule.effect.as_str().to_string()),
            ("INHERITANCE", rule.inheritance.as_str().to_string()),
        ];
        match (&rule.principal.sid, &rule.principal.account) {
            (Some(sid), _) => params.push(("SID", sid.clone())),
            (None, Some(account)) => params.push(("ACCOUNT", account.clone())),
            (None, None) => {
                return Err(SiteprepError::Other(anyhow!(
                    "cannot grant permissions to an unidentified principal"
                )))
            }
        }
        let _: Option<serde_json::Value> =
            self.call(ADD_RULE_SCRIPT, params, &dn, "modify permissions on")?;
        Ok(())
    }

    fn resolve_principal(&mut self, account: &str) -> Result<Principal> {
        let row: PrincipalRow = self
            .call(
                RESOLVE_SCRIPT,
                vec![("ACCOUNT", account.to_string())],
                account,
                "resolve",
            )
            .map_err(|e| match e {
                SiteprepError::Other(inner) => SiteprepError::LookupFailed {
                    target: account.to_string(),
                    message: inner.to_string(),
                },
                other => other,
            })?;
        Ok(Principal {
            sid: row.sid,
            account: row.account.or_else(|| Some(account.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_escapes_name() {
        assert_eq!(
            search_filter("container", "System Management"),
            "(&(objectClass=container)(name=System Management))"
        );
        assert_eq!(
            search_filter("container", "a*)(b"),
            r"(&(objectClass=container)(name=a\2a\29\28b))"
        );
    }

    #[test]
    fn connection_params_carry_server_and_credential() {
        let options = DirectoryOptions::new(
            Some("dc01.corp.local".into()),
            Some("CORP\\svc".into()),
            Some("pw".into()),
        )
        .unwrap();
        let store = AdsiDirectory::new(PowerShell::new(), options);
        let params = store.connection_params();
        assert!(params.contains(&("SERVER", "dc01.corp.local".to_string())));
        assert!(params.contains(&("USER", "CORP\\svc".to_string())));
        assert!(params.contains(&("PASSWORD", "pw".to_string())));
    }

    #[test]
    fn default_options_pass_nothing() {
        let store = AdsiDirectory::new(PowerShell::new(), DirectoryOptions::default());
        assert!(store.connection_params().is_empty());
    }

    #[test]
    fn classify_maps_access_denied() {
        let err = classify(
            ScriptError {
                category: "NotSpecified".into(),
                message: "Access is denied.".into(),
            },
            "CN=System,DC=corp,DC=local",
            "create child in",
        );
        assert!(matches!(err, SiteprepError::AccessDenied { .. }));
    }

    #[test]
    fn classify_maps_missing_object() {
        let err = classify(
            ScriptError {
                category: "NotSpecified".into(),
                message: "There is no such object on the server.".into(),
            },
            "CN=System,DC=corp,DC=local",
            "search",
        );
        assert!(matches!(err, SiteprepError::LookupFailed { .. }));
    }

    #[test]
    fn parses_rule_rows() {
        let rows: Vec<RuleRow> = serde_json::from_str(
            r#"[{"sid":"S-1-5-21-1-2-3-1104","account":"CORP\\CM01$","rights":"GenericAll","effect":"Allow","inheritance":"All"},
                {"sid":"S-1-5-18","account":null,"rights":"ReadProperty, WriteProperty","effect":"Deny","inheritance":"None"}]"#,
        )
        .unwrap();
        let rules: Vec<AccessRule> = rows.into_iter().map(|r| rule_row(r).unwrap()).collect();
        assert_eq!(
            rules[0],
            AccessRule::full_control(Principal::new("S-1-5-21-1-2-3-1104", "CORP\\CM01$"))
        );
        assert_eq!(rules[1].principal.account, None);
        assert_eq!(rules[1].effect, AccessEffect::Deny);
        assert_eq!(rules[1].rights.as_str(), "ReadProperty, WriteProperty");
    }

    #[test]
    fn parses_object_rows() {
        let rows: Vec<ObjectRow> = serde_json::from_str(
            r#"[{"dn":"CN=System Management,CN=System,DC=corp,DC=local","class":"container"}]"#,
        )
        .unwrap();
        let handles = object_rows(rows).unwrap();
        assert_eq!(handles[0].name(), "System Management");
        assert_eq!(handles[0].object_class(), "container");
    }

    #[test]
    fn scripts_release_handles() {
        let scripts = [
            SEARCH_SCRIPT,
            CHILDREN_SCRIPT,
            CREATE_SCRIPT,
            ACL_SCRIPT,
            ADD_RULE_SCRIPT,
            ROOT_SCRIPT,
        ];
        for script in scripts {
            assert!(script.contains("finally"));
            assert!(script.contains("Dispose()"));
        }
    }

    #[test]
    fn search_opens_base_inside_guarded_block() {
        let guard = SEARCH_SCRIPT.find("try {").unwrap();
        let open = SEARCH_SCRIPT.find("$base = Open-Entry").unwrap();
        let searcher = SEARCH_SCRIPT.find("$searcher = New-Object").unwrap();
        assert!(guard < open);
        assert!(guard < searcher);
        assert!(SEARCH_SCRIPT.contains("if ($base) { $base.Dispose() }"));
    }
}
