//! Database engine setup from a rendered configuration file.

use crate::config::SqlSettings;
use crate::context::RunContext;
use crate::error::{Result, SiteprepError};
use crate::install::launch::InstallHost;
use crate::shell::WaitReport;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Validated unattended-setup options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSetupOptions {
    instance_name: String,
    features: Vec<String>,
    collation: String,
    sysadmin_accounts: Vec<String>,
    service_account: Option<String>,
    agent_service_account: Option<String>,
    data_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    tcp_enabled: bool,
}

fn invalid(message: String) -> SiteprepError {
    SiteprepError::ConfigValidationError { message }
}

fn check_value(field: &str, value: &str) -> Result<()> {
    if value.contains('"') || value.contains('\n') || value.contains('\r') {
        return Err(invalid(format!(
            "sql.{} contains a quote or line break: {}",
            field, value
        )));
    }
    Ok(())
}

impl SqlSetupOptions {
    /// Build options from the `sql` section.
    pub fn from_settings(settings: &SqlSettings) -> Result<Self> {
        let name = settings.instance_name.trim();
        if name.is_empty() || name.len() > 16 {
            return Err(invalid(format!(
                "sql.instance_name must be 1 to 16 characters, got '{}'",
                name
            )));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(invalid(format!(
                "sql.instance_name '{}' may only contain letters, digits, '_' and '$'",
                name
            )));
        }
        if settings.features.is_empty() {
            return Err(invalid("sql.features must name at least one feature".into()));
        }
        if settings.sysadmin_accounts.is_empty() {
            return Err(invalid("sql.sysadmin_accounts must not be empty".into()));
        }
        if settings.collation.is_empty() || settings.collation.contains(char::is_whitespace) {
            return Err(invalid(format!(
                "sql.collation '{}' is not a collation name",
                settings.collation
            )));
        }

        for feature in &settings.features {
            check_value("features", feature)?;
        }
        for account in &settings.sysadmin_accounts {
            check_value("sysadmin_accounts", account)?;
        }
        for account in [&settings.service_account, &settings.agent_service_account]
            .into_iter()
            .flatten()
        {
            check_value("service_account", account)?;
        }
        for dir in [&settings.data_dir, &settings.log_dir, &settings.backup_dir]
            .into_iter()
            .flatten()
        {
            check_value("data_dir", &dir.to_string_lossy())?;
        }

        Ok(Self {
            instance_name: name.to_string(),
            features: settings.features.clone(),
            collation: settings.collation.clone(),
            sysadmin_accounts: settings.sysadmin_accounts.clone(),
            service_account: settings.service_account.clone(),
            agent_service_account: settings.agent_service_account.clone(),
            data_dir: settings.data_dir.clone(),
            log_dir: settings.log_dir.clone(),
            backup_dir: settings.backup_dir.clone(),
            tcp_enabled: settings.tcp_enabled,
        })
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Render the `[OPTIONS]` configuration file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "; Generated by siteprep {}", env!("CARGO_PKG_VERSION"));
        let _ = writeln!(out, "[OPTIONS]");
        let _ = writeln!(out, "ACTION=\"Install\"");
        let _ = writeln!(out, "QUIET=\"True\"");
        let _ = writeln!(out, "IACCEPTSQLSERVERLICENSETERMS=\"True\"");
        let _ = writeln!(out, "UPDATEENABLED=\"False\"");
        let _ = writeln!(out, "FEATURES={}", self.features.join(","));
        let _ = writeln!(out, "INSTANCENAME=\"{}\"", self.instance_name);
        let _ = writeln!(out, "INSTANCEID=\"{}\"", self.instance_name);
        let _ = writeln!(out, "SQLCOLLATION=\"{}\"", self.collation);

        let admins: Vec<String> = self
            .sysadmin_accounts
            .iter()
            .map(|a| format!("\"{}\"", a))
            .collect();
        let _ = writeln!(out, "SQLSYSADMINACCOUNTS={}", admins.join(" "));

        if let Some(account) = &self.service_account {
            let _ = writeln!(out, "SQLSVCACCOUNT=\"{}\"", account);
        }
        if let Some(account) = &self.agent_service_account {
            let _ = writeln!(out, "AGTSVCACCOUNT=\"{}\"", account);
        }
        let dirs = [
            ("SQLUSERDBDIR", &self.data_dir),
            ("SQLUSERDBLOGDIR", &self.log_dir),
            ("SQLBACKUPDIR", &self.backup_dir),
        ];
        for (key, dir) in dirs {
            if let Some(dir) = dir {
                let _ = writeln!(out, "{}=\"{}\"", key, dir.display());
            }
        }
        let _ = writeln!(out, "TCPENABLED=\"{}\"", if self.tcp_enabled { 1 } else { 0 });
        out
    }
}

/// Arguments for the database setup program.
pub fn setup_arguments(configuration_file: &Path) -> Vec<String> {
    vec![format!("/ConfigurationFile={}", configuration_file.display())]
}

/// Outcome of [`install_sql`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlOutcome {
    pub configuration_file: PathBuf,
    /// `None` when setup was not launched.
    pub wait: Option<WaitReport>,
}

/// Write the configuration file, then launch setup with it unless `render_only`.
///
/// Dry runs validate and render but write nothing.
pub fn install_sql(
    settings: &SqlSettings,
    host: &mut InstallHost,
    render_only: bool,
    ctx: &mut RunContext,
) -> Result<SqlOutcome> {
    let options = SqlSetupOptions::from_settings(settings)?;
    let rendered = options.render();
    let configuration_file = settings.configuration_file.clone();

    if ctx.dry_run {
        tracing::debug!("Rendered configuration:\n{}", rendered);
        return Ok(SqlOutcome {
            configuration_file,
            wait: None,
        });
    }

    if let Some(parent) = configuration_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&configuration_file, rendered)?;
    tracing::info!("Wrote {}", configuration_file.display());

    if render_only {
        return Ok(SqlOutcome {
            configuration_file,
            wait: None,
        });
    }

    if !settings.setup.exists() {
        return Err(SiteprepError::ConfigurationMissing {
            what: "database setup".to_string(),
            detail: format!("{} does not exist", settings.setup.display()),
        });
    }

    let wait = host.launch_and_wait(
        &settings.setup,
        &setup_arguments(&configuration_file),
        &settings.process_name,
    )?;

    Ok(SqlOutcome {
        configuration_file,
        wait: Some(wait),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::launch::testing::fake_host;
    use tempfile::TempDir;

    #[test]
    fn renders_defaults() {
        let options = SqlSetupOptions::from_settings(&SqlSettings::default()).unwrap();
        let ini = options.render();
        assert!(ini.contains("[OPTIONS]"));
        assert!(ini.contains("ACTION=\"Install\""));
        assert!(ini.contains("IACCEPTSQLSERVERLICENSETERMS=\"True\""));
        assert!(ini.contains("FEATURES=SQLENGINE"));
        assert!(ini.contains("INSTANCENAME=\"MSSQLSERVER\""));
        assert!(ini.contains("SQLCOLLATION=\"SQL_Latin1_General_CP1_CI_AS\""));
        assert!(ini.contains("SQLSYSADMINACCOUNTS=\"BUILTIN\\Administrators\""));
        assert!(ini.contains("TCPENABLED=\"1\""));
        assert!(!ini.contains("SQLSVCACCOUNT"));
    }

    #[test]
    fn renders_optional_fields() {
        let settings = SqlSettings {
            features: vec!["SQLENGINE".into(), "FULLTEXT".into()],
            sysadmin_accounts: vec!["CORP\\SQL Admins".into(), "CORP\\cmadmin".into()],
            service_account: Some("CORP\\svc-sql".into()),
            data_dir: Some(PathBuf::from(r"E:\Data")),
            tcp_enabled: false,
            ..SqlSettings::default()
        };
        let ini = SqlSetupOptions::from_settings(&settings).unwrap().render();
        assert!(ini.contains("FEATURES=SQLENGINE,FULLTEXT"));
        assert!(ini.contains("SQLSYSADMINACCOUNTS=\"CORP\\SQL Admins\" \"CORP\\cmadmin\""));
        assert!(ini.contains("SQLSVCACCOUNT=\"CORP\\svc-sql\""));
        assert!(ini.contains("SQLUSERDBDIR=\"E:\\Data\""));
        assert!(ini.contains("TCPENABLED=\"0\""));
    }

    #[test]
    fn rejects_long_instance_name() {
        let settings = SqlSettings {
            instance_name: "A".repeat(17),
            ..SqlSettings::default()
        };
        assert!(SqlSetupOptions::from_settings(&settings).is_err());
    }

    #[test]
    fn rejects_bad_instance_characters() {
        let settings = SqlSettings {
            instance_name: "CM-DB".into(),
            ..SqlSettings::default()
        };
        assert!(SqlSetupOptions::from_settings(&settings).is_err());
    }

    #[test]
    fn rejects_quotes_in_values() {
        let settings = SqlSettings {
            sysadmin_accounts: vec!["CORP\\\"evil".into()],
            ..SqlSettings::default()
        };
        assert!(SqlSetupOptions::from_settings(&settings).is_err());
    }

    #[test]
    fn rejects_empty_admins() {
        let settings = SqlSettings {
            sysadmin_accounts: vec![],
            ..SqlSettings::default()
        };
        assert!(SqlSetupOptions::from_settings(&settings).is_err());
    }

    #[test]
    fn setup_arguments_name_file() {
        assert_eq!(
            setup_arguments(Path::new("C:/cfg/ConfigurationFile.ini")),
            vec!["/ConfigurationFile=C:/cfg/ConfigurationFile.ini"]
        );
    }

    #[test]
    fn render_only_writes_file_without_launch() {
        let temp = TempDir::new().unwrap();
        let settings = SqlSettings {
            configuration_file: temp.path().join("sql").join("ConfigurationFile.ini"),
            ..SqlSettings::default()
        };
        let (mut host, log) = fake_host();

        let outcome =
            install_sql(&settings, &mut host, true, &mut RunContext::default()).unwrap();
        assert_eq!(outcome.wait, None);
        let written = std::fs::read_to_string(&settings.configuration_file).unwrap();
        assert!(written.contains("[OPTIONS]"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn launches_setup_with_file() {
        let temp = TempDir::new().unwrap();
        let setup = temp.path().join("setup.exe");
        std::fs::write(&setup, "").unwrap();
        let settings = SqlSettings {
            setup: setup.clone(),
            configuration_file: temp.path().join("ConfigurationFile.ini"),
            ..SqlSettings::default()
        };
        let (mut host, log) = fake_host();

        let outcome =
            install_sql(&settings, &mut host, false, &mut RunContext::default()).unwrap();
        assert!(outcome.wait.is_some());
        let log = log.borrow();
        assert_eq!(log[0].0, setup);
        assert!(log[0].1[0].starts_with("/ConfigurationFile="));
    }

    #[test]
    fn missing_setup_is_configuration_missing() {
        let temp = TempDir::new().unwrap();
        let settings = SqlSettings {
            setup: temp.path().join("setup.exe"),
            configuration_file: temp.path().join("ConfigurationFile.ini"),
            ..SqlSettings::default()
        };
        let (mut host, _log) = fake_host();
        let err = install_sql(&settings, &mut host, false, &mut RunContext::default()).unwrap_err();
        assert!(matches!(err, SiteprepError::ConfigurationMissing { .. }));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let settings = SqlSettings {
            configuration_file: temp.path().join("ConfigurationFile.ini"),
            ..SqlSettings::default()
        };
        let (mut host, _log) = fake_host();
        install_sql(&settings, &mut host, false, &mut RunContext::new(true)).unwrap();
        assert!(!settings.configuration_file.exists());
    }
}
