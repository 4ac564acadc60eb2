//! Typed model of directory objects, principals and access rules.

use std::fmt;
use std::str::FromStr;

/// One `attribute=value` component of a distinguished name.
#[derive(Debug, Clone)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Create a component; the value is stored unescaped.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// A `CN=` component.
    pub fn cn(value: impl Into<String>) -> Self {
        Self::new("CN", value)
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.attribute.eq_ignore_ascii_case(&other.attribute)
            && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl Eq for Rdn {}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape_value(&self.value))
    }
}

/// Escape an attribute value for use inside a distinguished name.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let leading = i == 0 && (c == ' ' || c == '#');
        let trailing = i == value.chars().count() - 1 && c == ' ';
        if matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') || leading || trailing {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a value for use inside an LDAP search filter.
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// A distinguished name, most specific component first.
///
/// Comparison ignores ASCII case, as the directory does.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DistinguishedName {
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parse `CN=System,DC=corp,DC=local`; backslash escapes are honoured.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut rdns = Vec::new();
        for component in split_unescaped(text, ',') {
            let component = component.trim();
            let Some(eq) = find_unescaped(component, '=') else {
                return Err(format!("'{}' has no attribute in '{}'", text, component));
            };
            let attribute = component[..eq].trim();
            let raw_value = component[eq + 1..].trim();
            if attribute.is_empty()
                || !attribute.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return Err(format!("'{}' has an invalid attribute '{}'", text, attribute));
            }
            if raw_value.is_empty() {
                return Err(format!("'{}' has an empty value for {}", text, attribute));
            }
            rdns.push(Rdn::new(attribute, unescape(raw_value)));
        }
        if rdns.is_empty() {
            return Err("distinguished name is empty".to_string());
        }
        Ok(Self { rdns })
    }

    /// The name with `rdn` prepended.
    pub fn child(&self, rdn: Rdn) -> Self {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self { rdns }
    }

    /// This (relative) name placed under `root`.
    pub fn under(&self, root: &DistinguishedName) -> Self {
        let mut rdns = self.rdns.clone();
        rdns.extend(root.rdns.iter().cloned());
        Self { rdns }
    }

    /// The name of the containing object, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.len() <= 1 {
            None
        } else {
            Some(Self {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// The most specific component.
    pub fn leaf(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Value of the most specific component.
    pub fn rdn_value(&self) -> &str {
        self.leaf().map(Rdn::value).unwrap_or_default()
    }

    pub fn components(&self) -> &[Rdn] {
        &self.rdns
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.rdns.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for DistinguishedName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn split_unescaped(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

fn find_unescaped(text: &str, target: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == target {
            return Some(i);
        }
    }
    None
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// A security principal as the directory reports it.
///
/// Stores may report a principal by raw security identifier, by account
/// name, or both. Both forms are kept and either one can establish identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    /// Security identifier, e.g. `S-1-5-21-...-1104`.
    pub sid: Option<String>,
    /// Account name, e.g. `CORP\CM01$`.
    pub account: Option<String>,
}

impl Principal {
    /// A principal known by both forms.
    pub fn new(sid: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            sid: Some(sid.into()),
            account: Some(account.into()),
        }
    }

    /// A principal known only by security identifier.
    pub fn from_sid(sid: impl Into<String>) -> Self {
        Self {
            sid: Some(sid.into()),
            account: None,
        }
    }

    /// A principal known only by account name.
    pub fn from_account(account: impl Into<String>) -> Self {
        Self {
            sid: None,
            account: Some(account.into()),
        }
    }

    /// Whether `other` denotes the same principal.
    ///
    /// True when the identifiers are equal, or when the account names are
    /// equal ignoring case.
    pub fn matches(&self, other: &Principal) -> bool {
        let same_sid = match (&self.sid, &other.sid) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        let same_account = match (&self.account, &other.account) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        same_sid || same_account
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.account, &self.sid) {
            (Some(account), Some(sid)) => write!(f, "{} ({})", account, sid),
            (Some(account), None) => write!(f, "{}", account),
            (None, Some(sid)) => write!(f, "{}", sid),
            (None, None) => write!(f, "<unknown principal>"),
        }
    }
}

/// Rights granted or denied by an access rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRights {
    GenericAll,
    GenericRead,
    GenericWrite,
    ReadProperty,
    WriteProperty,
    CreateChild,
    DeleteChild,
    /// Any other combination, as the store spelled it.
    Other(String),
}

impl AccessRights {
    pub fn as_str(&self) -> &str {
        match self {
            Self::GenericAll => "GenericAll",
            Self::GenericRead => "GenericRead",
            Self::GenericWrite => "GenericWrite",
            Self::ReadProperty => "ReadProperty",
            Self::WriteProperty => "WriteProperty",
            Self::CreateChild => "CreateChild",
            Self::DeleteChild => "DeleteChild",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for AccessRights {
    fn from(s: &str) -> Self {
        match s.trim() {
            "GenericAll" => Self::GenericAll,
            "GenericRead" => Self::GenericRead,
            "GenericWrite" => Self::GenericWrite,
            "ReadProperty" => Self::ReadProperty,
            "WriteProperty" => Self::WriteProperty,
            "CreateChild" => Self::CreateChild,
            "DeleteChild" => Self::DeleteChild,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Whether a rule allows or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEffect {
    Allow,
    Deny,
}

impl AccessEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl FromStr for AccessEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Allow" => Ok(Self::Allow),
            "Deny" => Ok(Self::Deny),
            other => Err(format!("unknown access effect '{}'", other)),
        }
    }
}

/// Which objects below the target a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InheritanceScope {
    /// The object only.
    None,
    /// The object and its whole subtree.
    All,
    /// The subtree but not the object.
    Descendents,
    /// Immediate children only.
    Children,
    /// The object and its immediate children.
    SelfAndChildren,
}

impl InheritanceScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::All => "All",
            Self::Descendents => "Descendents",
            Self::Children => "Children",
            Self::SelfAndChildren => "SelfAndChildren",
        }
    }
}

impl FromStr for InheritanceScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "None" => Ok(Self::None),
            "All" => Ok(Self::All),
            "Descendents" => Ok(Self::Descendents),
            "Children" => Ok(Self::Children),
            "SelfAndChildren" => Ok(Self::SelfAndChildren),
            other => Err(format!("unknown inheritance scope '{}'", other)),
        }
    }
}

/// One access-control entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub principal: Principal,
    pub rights: AccessRights,
    pub effect: AccessEffect,
    pub inheritance: InheritanceScope,
}

impl AccessRule {
    /// Full control, allowed, inherited by the whole subtree.
    pub fn full_control(principal: Principal) -> Self {
        Self {
            principal,
            rights: AccessRights::GenericAll,
            effect: AccessEffect::Allow,
            inheritance: InheritanceScope::All,
        }
    }
}

/// Opaque reference to an object in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    dn: DistinguishedName,
    object_class: String,
}

impl ObjectHandle {
    pub fn new(dn: DistinguishedName, object_class: impl Into<String>) -> Self {
        Self {
            dn,
            object_class: object_class.into(),
        }
    }

    /// Distinguished name of the object.
    pub fn dn(&self) -> &DistinguishedName {
        &self.dn
    }

    /// Relative name value (e.g. `System Management`).
    pub fn name(&self) -> &str {
        self.dn.rdn_value()
    }

    /// Structural object class.
    pub fn object_class(&self) -> &str {
        &self.object_class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(s: &str) -> DistinguishedName {
        DistinguishedName::parse(s).unwrap()
    }

    #[test]
    fn parses_and_displays() {
        let name = dn("CN=System,DC=corp,DC=local");
        assert_eq!(name.components().len(), 3);
        assert_eq!(name.to_string(), "CN=System,DC=corp,DC=local");
    }

    #[test]
    fn comparison_ignores_case() {
        assert_eq!(dn("cn=system,dc=CORP,dc=local"), dn("CN=System,DC=corp,DC=local"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(DistinguishedName::parse("").is_err());
        assert!(DistinguishedName::parse("System").is_err());
        assert!(DistinguishedName::parse("CN=").is_err());
        assert!(DistinguishedName::parse("=x").is_err());
    }

    #[test]
    fn escaped_commas_stay_in_value() {
        let name = dn(r"CN=Smith\, John,DC=corp");
        assert_eq!(name.leaf().unwrap().value(), "Smith, John");
        assert_eq!(name.to_string(), r"CN=Smith\, John,DC=corp");
    }

    #[test]
    fn child_under_and_parent() {
        let root = dn("DC=corp,DC=local");
        let system = dn("CN=System").under(&root);
        assert_eq!(system.to_string(), "CN=System,DC=corp,DC=local");

        let container = system.child(Rdn::cn("System Management"));
        assert_eq!(
            container.to_string(),
            "CN=System Management,CN=System,DC=corp,DC=local"
        );
        assert_eq!(container.parent(), Some(system));
        assert_eq!(dn("DC=local").parent(), None);
    }

    #[test]
    fn escape_value_handles_specials() {
        assert_eq!(escape_value("a,b"), r"a\,b");
        assert_eq!(escape_value("#lead"), r"\#lead");
        assert_eq!(escape_value("trail "), r"trail\ ");
        assert_eq!(escape_value("System Management"), "System Management");
    }

    #[test]
    fn escape_filter_value_handles_specials() {
        assert_eq!(escape_filter_value("a*(b)"), r"a\2a\28b\29");
        assert_eq!(escape_filter_value(r"x\y"), r"x\5cy");
    }

    #[test]
    fn principal_matches_by_sid() {
        let target = Principal::new("S-1-5-21-1-2-3-1104", r"CORP\CM01$");
        assert!(target.matches(&Principal::from_sid("S-1-5-21-1-2-3-1104")));
    }

    #[test]
    fn principal_matches_by_account_only() {
        let target = Principal::new("S-1-5-21-1-2-3-1104", r"CORP\CM01$");
        assert!(target.matches(&Principal::from_account(r"corp\cm01$")));
    }

    #[test]
    fn principal_mismatch() {
        let target = Principal::new("S-1-5-21-1-2-3-1104", r"CORP\CM01$");
        assert!(!target.matches(&Principal::new("S-1-5-21-1-2-3-1105", r"CORP\CM02$")));
        assert!(!target.matches(&Principal::default()));
    }

    #[test]
    fn access_rights_round_trip_names() {
        assert_eq!(AccessRights::from("GenericAll"), AccessRights::GenericAll);
        let combo = AccessRights::from("ReadProperty, WriteProperty");
        assert_eq!(combo.as_str(), "ReadProperty, WriteProperty");
    }

    #[test]
    fn effect_and_inheritance_parse() {
        assert_eq!("Allow".parse::<AccessEffect>(), Ok(AccessEffect::Allow));
        assert!("Maybe".parse::<AccessEffect>().is_err());
        assert_eq!("All".parse::<InheritanceScope>(), Ok(InheritanceScope::All));
        assert!("Everything".parse::<InheritanceScope>().is_err());
    }

    #[test]
    fn full_control_rule_shape() {
        let rule = AccessRule::full_control(Principal::from_account("CORP\\CM01$"));
        assert_eq!(rule.rights, AccessRights::GenericAll);
        assert_eq!(rule.effect, AccessEffect::Allow);
        assert_eq!(rule.inheritance, InheritanceScope::All);
    }

    #[test]
    fn handle_getters() {
        let handle = ObjectHandle::new(dn("CN=System Management,CN=System,DC=corp"), "container");
        assert_eq!(handle.name(), "System Management");
        assert_eq!(handle.object_class(), "container");
        assert_eq!(handle.dn().to_string(), "CN=System Management,CN=System,DC=corp");
    }
}
