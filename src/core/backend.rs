use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::cancel::{CancelToken, POLL_INTERVAL};
use super::options::StartConfig;
use super::outcome::{ClusterConfig, ClusterConnection, StartResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Running,
    NotRunning,
}

/// Provisioning backend that owns the cluster VM.
pub trait Backend {
    fn status(&self) -> Result<ClusterState>;

    /// Bring the cluster to a running state. Must tolerate an already running or
    /// partially started cluster. `observed` is what `status` reported; only a
    /// cluster that is not running needs the pull secret.
    fn start(
        &self,
        config: StartConfig,
        observed: ClusterState,
        cancel: &CancelToken,
    ) -> Result<StartResult>;
}

/// Request body written to the driver's stdin for `start`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest<'a> {
    bundle_path: &'a std::path::Path,
    memory: i32,
    disk_size: u32,
    cpus: i32,
    name_server: &'a str,
    /// `null` when the cluster is already running.
    pull_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    running: bool,
}

/// Delegates provisioning to an external driver executable.
///
/// `<driver> status --state-dir DIR` prints `{"running": bool}`;
/// `<driver> start --state-dir DIR` reads a JSON start request on stdin and
/// prints the cluster connection details on success. The request carries the
/// pull secret only when a new VM has to be created.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    driver: PathBuf,
    state_dir: PathBuf,
}

impl ProcessBackend {
    pub fn new(driver: PathBuf, state_dir: PathBuf) -> Self {
        Self { driver, state_dir }
    }

    fn command(&self, action: &str) -> Command {
        let mut command = Command::new(&self.driver);
        command
            .arg(action)
            .arg("--state-dir")
            .arg(self.state_dir.as_os_str());
        command
    }
}

impl Backend for ProcessBackend {
    fn status(&self) -> Result<ClusterState> {
        let output = self
            .command("status")
            .stdin(Stdio::null())
            .output()
            .map_err(|err| Error::BackendStatus {
                message: format!("failed to run {}: {err}", self.driver.display()),
            })?;
        if !output.status.success() {
            return Err(Error::BackendStatus {
                message: failure_message(&output.stderr, output.status),
            });
        }
        let reply: StatusReply =
            serde_json::from_slice(&output.stdout).map_err(|err| Error::BackendStatus {
                message: format!("driver returned malformed status: {err}"),
            })?;
        Ok(if reply.running {
            ClusterState::Running
        } else {
            ClusterState::NotRunning
        })
    }

    fn start(
        &self,
        config: StartConfig,
        observed: ClusterState,
        cancel: &CancelToken,
    ) -> Result<StartResult> {
        cancel.check("starting the cluster")?;
        let pull_secret = match observed {
            ClusterState::Running => None,
            ClusterState::NotRunning => match config.pull_secret.load() {
                Ok(secret) => Some(secret),
                Err(err @ Error::Cancelled { .. }) => return Err(err),
                Err(err) => {
                    return Err(Error::BackendStart {
                        message: err.to_string(),
                    });
                }
            },
        };
        let request = StartRequest {
            bundle_path: &config.bundle_path,
            memory: config.memory,
            disk_size: config.disk_size,
            cpus: config.cpus,
            name_server: &config.nameserver,
            pull_secret,
        };
        let payload = serde_json::to_vec(&request).map_err(|err| Error::BackendStart {
            message: format!("failed to encode start request: {err}"),
        })?;

        let mut child = self
            .command("start")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| Error::BackendStart {
                message: format!("failed to launch {}: {err}", self.driver.display()),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(&payload) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::BackendStart {
                    message: format!("failed to send start request to driver: {err}"),
                });
            }
        }

        let status = wait_or_kill(&mut child, cancel)?;
        let stdout = join_output(stdout);
        let stderr = join_output(stderr);

        if !status.success() {
            return Err(Error::BackendStart {
                message: failure_message(&stderr, status),
            });
        }

        let connection: ClusterConnection =
            serde_json::from_slice(&stdout).map_err(|err| Error::BackendStart {
                message: format!("driver returned malformed start result: {err}"),
            })?;
        Ok(StartResult::started(ClusterConfig::from(connection)))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn join_output(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn wait_or_kill(child: &mut Child, cancel: &CancelToken) -> Result<std::process::ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(err) => {
                return Err(Error::BackendStart {
                    message: format!("failed to wait for driver: {err}"),
                });
            }
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Cancelled {
                stage: "starting the cluster",
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn failure_message(stderr: &[u8], status: std::process::ExitStatus) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("driver exited with {status}"))
}
