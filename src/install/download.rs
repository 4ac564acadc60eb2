//! Prerequisite payload downloads and the vendor prerequisite downloader.

use crate::config::{DownloadSpec, PrereqSettings};
use crate::error::{Result, SiteprepError};
use crate::install::launch::InstallHost;
use crate::shell::WaitReport;
use anyhow::anyhow;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What happened to one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fetched and written.
    Downloaded { path: PathBuf, bytes: u64 },
    /// Destination already holds the expected content.
    AlreadyPresent { path: PathBuf },
}

/// Hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fetches payloads over HTTP.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a downloader with a 10-minute per-request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(600))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("siteprep/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SiteprepError::Other(anyhow!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetch one payload unless a verified copy is already in place.
    ///
    /// The body is written to `<dest>.part` and only renamed over `dest`
    /// once its checksum (when configured) matches.
    pub fn fetch(&self, spec: &DownloadSpec) -> Result<DownloadOutcome> {
        let dest = &spec.dest;

        if let Some(expected) = &spec.sha256 {
            if dest.exists() && sha256_file(dest)?.eq_ignore_ascii_case(expected) {
                tracing::info!("{} is already present", dest.display());
                return Ok(DownloadOutcome::AlreadyPresent { path: dest.clone() });
            }
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        tracing::info!("Downloading {} to {}", spec.url, dest.display());
        let mut response = self
            .client
            .get(&spec.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| SiteprepError::Other(anyhow!("Failed to download {}: {}", spec.url, e)))?;

        let partial = partial_path(dest);
        let bytes = write_partial(&partial, |file| {
            response.copy_to(file).map_err(|e| {
                SiteprepError::Other(anyhow!("Failed to download {}: {}", spec.url, e))
            })
        })?;

        if let Some(expected) = &spec.sha256 {
            let actual = sha256_file(&partial)?;
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = fs::remove_file(&partial);
                return Err(SiteprepError::Other(anyhow!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    spec.url,
                    expected,
                    actual
                )));
            }
        }

        fs::rename(&partial, dest)?;
        Ok(DownloadOutcome::Downloaded {
            path: dest.clone(),
            bytes,
        })
    }
}

/// Fill `partial` through `copy`, removing it again when the copy fails.
fn write_partial<F>(partial: &Path, copy: F) -> Result<u64>
where
    F: FnOnce(&mut File) -> Result<u64>,
{
    let mut file = File::create(partial)?;
    match copy(&mut file) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(partial);
            Err(e)
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Arguments for the prerequisite downloader.
pub fn setupdl_arguments(destination: &Path) -> Vec<String> {
    vec!["/NOUI".to_string(), destination.to_string_lossy().to_string()]
}

/// Run the vendor prerequisite downloader into `settings.destination`.
///
/// # Errors
///
/// `ConfigurationMissing` when the downloader is not where the
/// configuration says.
pub fn run_setupdl(settings: &PrereqSettings, host: &mut InstallHost) -> Result<WaitReport> {
    if !settings.setupdl.exists() {
        return Err(SiteprepError::ConfigurationMissing {
            what: "prerequisite downloader".to_string(),
            detail: format!("{} does not exist", settings.setupdl.display()),
        });
    }
    fs::create_dir_all(&settings.destination)?;
    host.launch_and_wait(
        &settings.setupdl,
        &setupdl_arguments(&settings.destination),
        &settings.process_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::launch::testing::fake_host;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_SHA: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn sha256_of_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), HELLO_SHA);
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/tmp/ndp48.exe")),
            PathBuf::from("/tmp/ndp48.exe.part")
        );
    }

    #[test]
    fn failed_copy_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let partial = temp.path().join("ndp48.exe.part");

        let err = write_partial(&partial, |file| {
            file.write_all(b"half a body")?;
            Err(SiteprepError::Other(anyhow!("connection reset")))
        })
        .unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        assert!(!partial.exists());
    }

    #[test]
    fn completed_copy_keeps_partial_file() {
        let temp = TempDir::new().unwrap();
        let partial = temp.path().join("ndp48.exe.part");

        let bytes = write_partial(&partial, |file| {
            file.write_all(b"hello")?;
            Ok(5)
        })
        .unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(fs::read_to_string(&partial).unwrap(), "hello");
    }

    #[test]
    fn setupdl_arguments_are_silent() {
        let args = setupdl_arguments(Path::new("C:/Prereqs"));
        assert_eq!(args, vec!["/NOUI", "C:/Prereqs"]);
    }

    #[test]
    fn verified_existing_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("hello.txt");
        fs::write(&dest, "hello").unwrap();
        let spec = DownloadSpec {
            url: "http://127.0.0.1:9/unreachable".into(),
            dest: dest.clone(),
            sha256: Some(HELLO_SHA.to_uppercase()),
        };
        let outcome = Downloader::new().unwrap().fetch(&spec).unwrap();
        assert_eq!(outcome, DownloadOutcome::AlreadyPresent { path: dest });
    }

    #[test]
    fn missing_setupdl_is_configuration_missing() {
        let temp = TempDir::new().unwrap();
        let settings = PrereqSettings {
            setupdl: temp.path().join("setupdl.exe"),
            destination: temp.path().join("prereqs"),
            ..PrereqSettings::default()
        };
        let (mut host, log) = fake_host();
        let err = run_setupdl(&settings, &mut host).unwrap_err();
        assert!(matches!(err, SiteprepError::ConfigurationMissing { .. }));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn setupdl_is_launched_and_polled() {
        let temp = TempDir::new().unwrap();
        let setupdl = temp.path().join("setupdl.exe");
        fs::write(&setupdl, "").unwrap();
        let settings = PrereqSettings {
            setupdl: setupdl.clone(),
            destination: temp.path().join("prereqs"),
            ..PrereqSettings::default()
        };
        let (mut host, log) = fake_host();
        let report = run_setupdl(&settings, &mut host).unwrap();

        assert_eq!(report.checks, 3);
        assert!(settings.destination.is_dir());
        let log = log.borrow();
        assert_eq!(log[0].0, setupdl);
        assert_eq!(log[0].1[0], "/NOUI");
    }
}
