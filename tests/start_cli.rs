#![cfg(all(feature = "cli", unix))]

use std::error::Error;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const CONNECTION_JSON: &str = r#"{"cacert":"-----BEGIN CERTIFICATE-----","webConsoleUrl":"https://console-openshift-console.apps-crc.testing","url":"https://api.crc.testing:6443","kubeadminPassword":"kPass-1234"}"#;

type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Isolated home directory with a bundle, a pull secret and a scripted driver.
struct Workspace {
    home: TempDir,
    driver: PathBuf,
    bundle: PathBuf,
    pull_secret: PathBuf,
}

impl Workspace {
    fn new(running: bool) -> TestResult<Self> {
        let home = TempDir::new()?;
        let bundle = home.path().join("cluster_4.14.cairnbundle");
        fs::write(&bundle, b"bundle")?;
        let pull_secret = home.path().join("pull-secret.json");
        fs::write(&pull_secret, br#"{"auths":{"quay.io":{"auth":"dXNlcjpwYXNz"}}}"#)?;

        let driver = home.path().join("cairn-driver");
        let calls = home.path().join("driver-calls.log");
        let script = format!(
            r#"#!/bin/sh
echo "$1" >> '{calls}'
case "$1" in
  status) echo '{{"running": {running}}}' ;;
  start) cat > /dev/null; echo '{connection}' ;;
  *) echo "unknown action $1" >&2; exit 2 ;;
esac
"#,
            calls = calls.display(),
            connection = CONNECTION_JSON,
        );
        fs::write(&driver, script)?;
        let mut perms = fs::metadata(&driver)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&driver, perms)?;

        Ok(Self {
            home,
            driver,
            bundle,
            pull_secret,
        })
    }

    fn driver_calls(&self) -> Vec<String> {
        fs::read_to_string(self.home.path().join("driver-calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// `cairn start` against this workspace, without a pull secret.
    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_cairn"));
        command
            .env_clear()
            .env("HOME", self.home.path())
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("SHELL", "/bin/bash")
            .env("CAIRN_LOG_LEVEL", "error")
            .stdin(Stdio::null())
            .arg("start")
            .arg("--bundle")
            .arg(&self.bundle)
            .arg("--driver")
            .arg(&self.driver)
            .arg("--disable-update-check");
        command
    }

    fn start(&self, extra: &[&str]) -> TestResult<Output> {
        let mut command = self.command();
        command
            .arg("--pull-secret-file")
            .arg(&self.pull_secret)
            .args(extra);
        Ok(command.output()?)
    }
}

/// Serves a single `GET /api/version` request with the given version and
/// forwards the request line it received.
fn fake_daemon(version: &str) -> TestResult<(u16, Receiver<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let body = format!(r#"{{"cairnVersion":"{version}","commitSha":"abc123"}}"#);
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || -> Option<()> {
        let (mut stream, _) = listener.accept().ok()?;
        let mut reader = BufReader::new(stream.try_clone().ok()?);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).ok()?;
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).ok()? == 0 || header.trim().is_empty() {
                break;
            }
        }
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
        .ok()?;
        tx.send(request_line).ok()
    });
    Ok((port, rx))
}

fn unused_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn stdout_json(output: &Output) -> TestResult<Value> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn fresh_start_with_matching_daemon_reports_cluster() -> TestResult {
    let workspace = Workspace::new(false)?;
    let (port, daemon) = fake_daemon(CLIENT_VERSION)?;
    let port = port.to_string();

    // The host capacity checks depend on the machine running the tests.
    let output = workspace.start(&[
        "--network-mode",
        "user",
        "--daemon-port",
        &port,
        "--skip-check",
        "cpus,memory,disk-space",
        "-o",
        "json",
    ])?;
    let record = stdout_json(&output)?;

    let request_line = daemon.recv_timeout(Duration::from_secs(5))?;
    assert!(request_line.starts_with("GET /api/version "), "{request_line}");

    assert_eq!(output.status.code(), Some(0), "stderr: {}", text(&output.stderr));
    assert_eq!(record["success"], Value::Bool(true));
    assert!(record["error"].is_null());
    assert_eq!(
        record["clusterConfig"]["webConsoleUrl"],
        "https://console-openshift-console.apps-crc.testing"
    );
    assert_eq!(record["clusterConfig"]["adminCredentials"]["password"], "kPass-1234");
    assert_eq!(workspace.driver_calls(), vec!["status", "start"]);
    Ok(())
}

#[test]
fn daemon_version_mismatch_stops_before_start() -> TestResult {
    let workspace = Workspace::new(false)?;
    let (port, daemon) = fake_daemon("0.0.1-mismatch")?;
    let port = port.to_string();

    let output = workspace.start(&["--network-mode", "user", "--daemon-port", &port])?;
    assert!(daemon.recv_timeout(Duration::from_secs(5)).is_ok());

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert_eq!(
        text(&output.stderr).trim_end(),
        format!(
            "Error: The executable version ({CLIENT_VERSION}) doesn't match the daemon version (0.0.1-mismatch)"
        )
    );
    assert_eq!(workspace.driver_calls(), vec!["status"]);
    Ok(())
}

#[test]
fn unreachable_daemon_names_the_daemon() -> TestResult {
    let workspace = Workspace::new(false)?;
    let port = unused_port()?.to_string();

    let output = workspace.start(&["--network-mode", "user", "--daemon-port", &port, "-o", "json"])?;

    assert_eq!(output.status.code(), Some(1));
    let record = stdout_json(&output)?;
    assert_eq!(record["error"]["kind"], "daemonUnreachable");
    let message = record["error"]["message"].as_str().unwrap_or_default();
    assert!(
        message.starts_with("Is 'cairn daemon' running? Cannot reach daemon API: "),
        "{message}"
    );
    assert!(record["clusterConfig"].is_null());
    assert_eq!(workspace.driver_calls(), vec!["status"]);
    Ok(())
}

#[test]
fn invalid_nameserver_fails_before_any_collaborator() -> TestResult {
    let workspace = Workspace::new(false)?;

    let output = workspace.start(&["--nameserver", "999.1.1.1"])?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = text(&output.stderr);
    assert!(stderr.starts_with("Error: Invalid nameserver:"), "{stderr}");
    assert!(workspace.driver_calls().is_empty());
    Ok(())
}

#[test]
fn running_cluster_skips_gating() -> TestResult {
    let workspace = Workspace::new(true)?;
    // Nothing listens here; a daemon query would fail the run.
    let port = unused_port()?.to_string();

    let output = workspace.start(&[
        "--network-mode",
        "user",
        "--daemon-port",
        &port,
        "--cpus",
        "100000",
    ])?;

    assert_eq!(output.status.code(), Some(0), "stderr: {}", text(&output.stderr));
    let report = text(&output.stdout);
    assert!(report.starts_with("Started the OpenShift cluster.\n"));
    assert!(report.contains("  $ eval $(cairn oc-env)\n"));
    assert!(report.contains("  $ oc login -u developer https://api.crc.testing:6443\n"));
    assert_eq!(workspace.driver_calls(), vec!["status", "start"]);
    Ok(())
}

#[test]
fn running_cluster_starts_without_pull_secret() -> TestResult {
    let workspace = Workspace::new(true)?;

    let mut command = workspace.command();
    command.args(["--network-mode", "system", "-o", "json"]);
    let output = command.output()?;

    assert_eq!(output.status.code(), Some(0), "stderr: {}", text(&output.stderr));
    let record = stdout_json(&output)?;
    assert_eq!(record["success"], Value::Bool(true));
    assert!(record["error"].is_null());
    assert_eq!(record["clusterConfig"]["url"], "https://api.crc.testing:6443");
    assert_eq!(workspace.driver_calls(), vec!["status", "start"]);
    Ok(())
}

#[test]
fn fresh_start_without_pull_secret_is_a_backend_failure() -> TestResult {
    let workspace = Workspace::new(false)?;

    let mut command = workspace.command();
    command.args(["--network-mode", "system", "--skip-check", "cpus,memory,disk-space", "-o", "json"]);
    let output = command.output()?;

    assert_eq!(output.status.code(), Some(1));
    let record = stdout_json(&output)?;
    assert_eq!(record["error"]["kind"], "backendStart");
    let message = record["error"]["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("Unable to load pull secret"), "{message}");
    assert_eq!(workspace.driver_calls(), vec!["status"]);
    Ok(())
}

#[test]
fn preflight_failure_uses_reserved_exit_code() -> TestResult {
    let workspace = Workspace::new(false)?;

    let output = workspace.start(&["--network-mode", "system", "--cpus", "100000"])?;

    assert_eq!(output.status.code(), Some(2));
    let stderr = text(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    assert_eq!(
        lines[0],
        "Preflight checks failed during `cairn start`, please try to run `cairn setup` first in case you haven't done so yet",
        "{stderr}"
    );
    assert!(lines[1].starts_with("Error: Preflight check `cpus` failed"), "{stderr}");
    assert_eq!(workspace.driver_calls(), vec!["status"]);
    Ok(())
}

#[test]
fn settings_file_supplies_defaults() -> TestResult {
    let workspace = Workspace::new(false)?;
    let state_dir = workspace.home.path().join(".cairn");
    fs::create_dir_all(&state_dir)?;
    fs::write(
        state_dir.join("cairn.toml"),
        "nameserver = \"not-an-ip\"\nnetwork-mode = \"system\"\n",
    )?;

    let output = workspace.start(&["-o", "json"])?;

    assert_eq!(output.status.code(), Some(1));
    let record = stdout_json(&output)?;
    assert_eq!(record["error"]["kind"], "configValidation");
    assert!(workspace.driver_calls().is_empty());

    // The flag wins over the file.
    let output = workspace.start(&["-o", "json", "--nameserver", "10.0.0.53", "--cpus", "100000"])?;
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output)?["error"]["kind"], "preflight");
    Ok(())
}

#[test]
fn missing_explicit_config_is_reported() -> TestResult {
    let workspace = Workspace::new(false)?;
    let missing: &Path = &workspace.home.path().join("nope.toml");

    let output = workspace.start(&["--config", missing.to_str().unwrap_or_default()])?;

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("does not exist or is not readable"));
    assert!(workspace.driver_calls().is_empty());
    Ok(())
}
