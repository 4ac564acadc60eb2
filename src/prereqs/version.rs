//! Four-part tool versions and the add-on rule.

use crate::error::{Result, SiteprepError};
use crate::shell::PowerShell;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

/// A `major.minor.build.revision` version.
///
/// Ordering compares major, then minor, then build, then revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl ToolVersion {
    /// Create a version from its four components.
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for ToolVersion {
    type Err = String;

    /// Parse two to four dot-separated numbers; missing components are zero.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(format!(
                "'{}' is not a version (expected major.minor[.build[.revision]])",
                s
            ));
        }

        let mut numbers = [0u32; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not a version: bad component '{}'", s, part))?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2], numbers[3]))
    }
}

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+){0,2}").unwrap());

/// Pull the first dotted version out of a metadata string.
///
/// File version resources often carry build labels, e.g.
/// `"10.1.17763.1 (WinBuild.160101.0800)"`.
pub fn extract_version(text: &str) -> Option<ToolVersion> {
    VERSION_PATTERN
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Decides whether a separately distributed add-on must be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddonRule {
    /// Versions at or above this require the add-on.
    pub threshold: ToolVersion,
}

impl AddonRule {
    /// Create a rule for the given threshold.
    pub fn new(threshold: ToolVersion) -> Self {
        Self { threshold }
    }

    /// Whether `installed` needs the add-on. The threshold itself does.
    pub fn requires_addon(&self, installed: ToolVersion) -> bool {
        installed >= self.threshold
    }
}

/// Reads version metadata from a binary.
pub trait VersionSource {
    /// File version of the binary at `path`.
    fn file_version(&mut self, path: &Path) -> Result<ToolVersion>;
}

const FILE_VERSION_SCRIPT: &str = r#"
$item = Get-Item -LiteralPath $env:SITEPREP_PATH
$info = $item.VersionInfo
if ($info.FileVersion) { $info.FileVersion }
else { "$($info.FileMajorPart).$($info.FileMinorPart).$($info.FileBuildPart).$($info.FilePrivatePart)" }
"#;

/// Version source reading the file version resource through PowerShell.
#[derive(Debug, Clone, Default)]
pub struct HostVersionSource {
    powershell: PowerShell,
}

impl HostVersionSource {
    /// Create a source using the given PowerShell bridge.
    pub fn new(powershell: PowerShell) -> Self {
        Self { powershell }
    }
}

impl VersionSource for HostVersionSource {
    fn file_version(&mut self, path: &Path) -> Result<ToolVersion> {
        if !path.exists() {
            return Err(SiteprepError::ConfigurationMissing {
                what: "installer".to_string(),
                detail: format!("{} does not exist", path.display()),
            });
        }

        let raw: String = self.powershell.run_json(
            FILE_VERSION_SCRIPT,
            &[("PATH", path.to_string_lossy().to_string())],
        )?;

        extract_version(&raw).ok_or_else(|| SiteprepError::ConfigurationMissing {
            what: "version information".to_string(),
            detail: format!("{} reports version '{}'", path.display(), raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ToolVersion {
        s.parse().unwrap()
    }

    #[test]
    fn parses_four_parts() {
        assert_eq!(v("10.1.17763.1"), ToolVersion::new(10, 1, 17763, 1));
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(v("10.1"), ToolVersion::new(10, 1, 0, 0));
        assert_eq!(v("10.1.22621"), ToolVersion::new(10, 1, 22621, 0));
    }

    #[test]
    fn rejects_malformed() {
        assert!("10".parse::<ToolVersion>().is_err());
        assert!("1.2.3.4.5".parse::<ToolVersion>().is_err());
        assert!("10.x.1.1".parse::<ToolVersion>().is_err());
        assert!("".parse::<ToolVersion>().is_err());
    }

    #[test]
    fn orders_by_component_not_text() {
        assert!(v("10.1.17763.1") > v("10.1.9999.9"));
        assert!(v("10.1.17762.9") < v("10.1.17763.1"));
        assert!(v("10.2.0.0") > v("10.1.99999.99"));
        assert!(v("11.0") > v("10.99.99999.99"));
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(v("10.1.17763.1").to_string(), "10.1.17763.1");
        assert_eq!(v("10.1").to_string(), "10.1.0.0");
    }

    #[test]
    fn extract_version_from_build_label() {
        assert_eq!(
            extract_version("10.1.17763.1 (WinBuild.160101.0800)"),
            Some(ToolVersion::new(10, 1, 17763, 1))
        );
        assert_eq!(
            extract_version("Version 10.1.22621.1 built"),
            Some(ToolVersion::new(10, 1, 22621, 1))
        );
        assert_eq!(extract_version("no version here"), None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let rule = AddonRule::new(v("10.1.17763.1"));
        assert!(rule.requires_addon(v("10.1.17763.1")));
    }

    #[test]
    fn below_threshold_needs_nothing() {
        let rule = AddonRule::new(v("10.1.17763.1"));
        assert!(!rule.requires_addon(v("10.1.17762.9")));
        assert!(!rule.requires_addon(v("10.1.16299.15")));
    }

    #[test]
    fn above_threshold_needs_addon() {
        let rule = AddonRule::new(v("10.1.17763.1"));
        assert!(rule.requires_addon(v("10.1.22621.1")));
        assert!(rule.requires_addon(v("10.1.17763.2")));
    }

    #[test]
    fn host_source_missing_file_is_configuration_missing() {
        let mut source = HostVersionSource::default();
        let err = source
            .file_version(Path::new("/definitely/not/here/adksetup.exe"))
            .unwrap_err();
        assert!(matches!(err, SiteprepError::ConfigurationMissing { .. }));
    }
}
