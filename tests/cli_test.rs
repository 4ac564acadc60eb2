//! Integration tests for the siteprep binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(".siteprep");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), config).unwrap();
    temp
}

fn siteprep(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("siteprep"));
    cmd.current_dir(temp.path()).env("CI", "1");
    cmd
}

const MINIMAL_CONFIG: &str = "site:\n  code: PS1\n";

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("siteprep"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("prepare a Windows host"))
        .stdout(predicate::str::contains("container"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("siteprep"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_requires_a_subcommand() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("siteprep"));
    cmd.assert().failure();
    Ok(())
}

#[test]
fn missing_config_exits_two() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    siteprep(&temp)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("siteprep init"));
    Ok(())
}

#[test]
fn init_writes_config_once() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    siteprep(&temp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(temp.path().join(".siteprep/config.yml").exists());

    siteprep(&temp)
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    siteprep(&temp).args(["init", "--force"]).assert().success();
    Ok(())
}

#[test]
fn config_shows_merged_yaml() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(MINIMAL_CONFIG);
    siteprep(&temp)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yml"))
        .stdout(predicate::str::contains("code: PS1"))
        .stdout(predicate::str::contains("instance_name: MSSQLSERVER"));
    Ok(())
}

#[test]
fn config_json_output() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(MINIMAL_CONFIG);
    siteprep(&temp)
        .args(["config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"code\": \"PS1\""));
    Ok(())
}

#[test]
fn config_schema_needs_no_project() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    siteprep(&temp)
        .args(["config", "--schema"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"properties\""));
    Ok(())
}

#[test]
fn explicit_config_path_is_used() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let path = temp.path().join("lab.yml");
    fs::write(&path, "site:\n  code: LAB\n")?;
    siteprep(&temp)
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("code: LAB"));
    Ok(())
}

#[test]
fn invalid_config_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("features:\n  required: [BITS, BITS]\n");
    siteprep(&temp)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BITS"));
    Ok(())
}

#[test]
fn container_without_principal_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(MINIMAL_CONFIG);
    siteprep(&temp)
        .args(["container", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("directory principal"));
    Ok(())
}

#[test]
fn sql_render_only_writes_configuration_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let ini = temp.path().join("sql").join("ConfigurationFile.ini");
    let temp = {
        let config = format!(
            "sql:\n  instance_name: CM\n  configuration_file: '{}'\n",
            ini.display()
        );
        let dir = temp.path().join(".siteprep");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("config.yml"), config)?;
        temp
    };

    siteprep(&temp)
        .args(["sql", "--render-only"])
        .assert()
        .success();

    let written = fs::read_to_string(&ini)?;
    assert!(written.contains("INSTANCENAME=\"CM\""));
    Ok(())
}

#[test]
fn sql_dry_run_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let ini = temp.path().join("ConfigurationFile.ini");
    let dir = temp.path().join(".siteprep");
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join("config.yml"),
        format!("sql:\n  configuration_file: '{}'\n", ini.display()),
    )?;

    siteprep(&temp)
        .args(["sql", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing written"));
    assert!(!ini.exists());
    Ok(())
}

#[test]
fn completions_for_powershell() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    siteprep(&temp)
        .args(["completions", "powershell"])
        .assert()
        .success()
        .stdout(predicate::str::contains("siteprep"));
    Ok(())
}
