#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the adx-server binary
//!
//! Each test runs the compiled binary with a scrubbed `APP__*` environment.

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const VALID_CONFIG: &str = r#"
server:
  bind_addr: "127.0.0.1:0"
logging:
  level: warn
datasource:
  cluster_url: "https://help.kusto.windows.net"
  tenant_id: "9a2ddabe-90c0-4e09-bf28-a91111a56ed7"
  client_id: "my-client"
  default_database: "Samples"
credentials:
  client_secret: "super-secret"
"#;

fn command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_adx-server"));
    for (key, _) in std::env::vars() {
        if key.starts_with("APP__") {
            cmd.env_remove(key);
        }
    }
    cmd.env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn run_adx_server(args: &[&str]) -> Output {
    command()
        .args(args)
        .output()
        .expect("Failed to execute adx-server")
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, content).expect("Failed to write config");
    path
}

#[test]
fn test_cli_help_command() {
    let output = run_adx_server(&["--help"]);
    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--print-config"), "Should mention print-config option");
}

#[test]
fn test_cli_version_command() {
    let output = run_adx_server(&["--version"]);
    assert!(output.status.success(), "Version command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("adx-server"), "Should contain binary name");
    assert!(
        stdout.chars().any(|c| c.is_ascii_digit()),
        "Should contain version numbers"
    );
}

#[test]
fn test_cli_invalid_command() {
    let output = run_adx_server(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should report the error: {stderr}");
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_adx_server(&["--config", "/nonexistent/config.yaml", "check"]);
    assert!(
        !output.status.success(),
        "Should fail when config file doesn't exist"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("does not exist"),
        "Should indicate config file not found: {stderr}"
    );
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "invalid: yaml: content: [unclosed");

    let output = run_adx_server(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "Should fail with invalid YAML");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("yaml") || stderr.contains("configuration"),
        "Should mention configuration parsing issue: {stderr}"
    );
}

#[test]
fn test_cli_config_validation_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    let output = run_adx_server(&["--config", config_path.to_str().unwrap(), "check"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "Valid config should pass: {stderr}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration is valid"));
    assert!(stdout.contains("help.kusto.windows.net"));
}

#[test]
fn test_cli_check_reports_incomplete_datasource() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "datasource:\n  cluster_url: \"some-baseurl\"\n");

    let output = run_adx_server(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "Incomplete config should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("datasource.cluster_url"),
        "Should name the offending field: {stderr}"
    );
}

#[test]
fn test_cli_print_config_redacts_secret() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    let output = run_adx_server(&["--config", config_path.to_str().unwrap(), "--print-config"]);
    assert!(output.status.success(), "print-config should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[REDACTED]"), "Secret should be redacted: {stdout}");
    assert!(!stdout.contains("super-secret"), "Secret must not be printed");
}

#[test]
fn test_cli_env_overrides_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    let output = command()
        .env("APP__DATASOURCE__DEFAULT_DATABASE", "Logs")
        .args(["--config", config_path.to_str().unwrap(), "--print-config"])
        .output()
        .expect("Failed to execute adx-server");
    assert!(output.status.success(), "print-config should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Logs"), "Env override should win: {stdout}");
    assert!(!stdout.contains("Samples"), "YAML value should be replaced: {stdout}");
}

#[test]
fn test_cli_port_override() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    let output = run_adx_server(&[
        "--config",
        config_path.to_str().unwrap(),
        "--port",
        "18087",
        "--print-config",
    ]);
    assert!(output.status.success(), "print-config should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("127.0.0.1:18087"), "Port override should apply: {stdout}");
}
