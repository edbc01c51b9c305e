use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use crate::config::NetworkMode;
use crate::error::{Error, Result};

use super::cancel::CancelToken;
use super::version::{MACOS_APP_BUNDLE, VersionInfo, is_macos_app_install};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remediation wording used when the daemon cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonHint {
    /// The executable lives inside the macOS application bundle, which owns the daemon.
    MacosApp,
    Generic,
}

impl DaemonHint {
    pub fn detect() -> Self {
        if !cfg!(target_os = "macos") {
            return Self::Generic;
        }
        match std::env::current_exe() {
            Ok(exe) if is_macos_app_install(&exe) => Self::MacosApp,
            _ => Self::Generic,
        }
    }
}

impl fmt::Display for DaemonHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacosApp => write!(f, "Is '{MACOS_APP_BUNDLE}' running?"),
            Self::Generic => f.write_str("Is 'cairn daemon' running?"),
        }
    }
}

/// Payload of the daemon's version endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonVersion {
    pub cairn_version: String,
    #[serde(default)]
    pub commit_sha: Option<String>,
}

#[derive(Debug, Error)]
pub enum DaemonQueryError {
    #[error("{0}")]
    Transport(String),
    #[error("unexpected response from daemon: {0}")]
    InvalidResponse(String),
    #[error("interrupted")]
    Cancelled,
}

/// Client side of the daemon's version RPC.
pub trait DaemonClient {
    fn version(&self, cancel: &CancelToken) -> std::result::Result<DaemonVersion, DaemonQueryError>;
}

/// Talks to the daemon's HTTP API on the loopback interface.
#[derive(Debug, Clone)]
pub struct HttpDaemonClient {
    agent: Agent,
    base_url: String,
}

impl HttpDaemonClient {
    pub fn new(port: u16) -> Self {
        Self::with_base_url(format!("http://127.0.0.1:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    pub fn version_url(&self) -> String {
        format!("{}/api/version", self.base_url.trim_end_matches('/'))
    }
}

impl DaemonClient for HttpDaemonClient {
    fn version(&self, cancel: &CancelToken) -> std::result::Result<DaemonVersion, DaemonQueryError> {
        let agent = self.agent.clone();
        let url = self.version_url();
        let outcome = cancel.run_blocking("querying the daemon version", move || {
            fetch_version(&agent, &url)
        });
        match outcome {
            Ok(result) => result,
            Err(Error::Cancelled { .. }) => Err(DaemonQueryError::Cancelled),
            Err(other) => Err(DaemonQueryError::Transport(other.to_string())),
        }
    }
}

fn fetch_version(agent: &Agent, url: &str) -> std::result::Result<DaemonVersion, DaemonQueryError> {
    let response = agent
        .get(url)
        .call()
        .map_err(|err| DaemonQueryError::Transport(err.to_string()))?;
    let body = response
        .into_string()
        .map_err(|err| DaemonQueryError::Transport(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| DaemonQueryError::InvalidResponse(err.to_string()))
}

/// Result of a successful compatibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCheck {
    /// The networking mode does not use the daemon; nothing was queried.
    NotRequired,
    Compatible(VersionInfo),
}

/// Make sure the daemon, when the networking mode needs one, is reachable and
/// runs the same version as this executable.
pub fn check_daemon_compatibility(
    mode: NetworkMode,
    client: &dyn DaemonClient,
    client_version: &str,
    hint: DaemonHint,
    cancel: &CancelToken,
) -> Result<DaemonCheck> {
    if !mode.requires_daemon() {
        return Ok(DaemonCheck::NotRequired);
    }

    let reported = match client.version(cancel) {
        Ok(version) => version,
        Err(DaemonQueryError::Cancelled) => {
            return Err(Error::Cancelled {
                stage: "querying the daemon version",
            });
        }
        Err(err) => {
            return Err(Error::DaemonUnreachable {
                hint,
                reason: err.to_string(),
            });
        }
    };

    let info = VersionInfo {
        client: client_version.to_string(),
        daemon: reported.cairn_version,
    };
    if !info.matches() {
        return Err(Error::VersionMismatch {
            client: info.client,
            daemon: info.daemon,
        });
    }
    Ok(DaemonCheck::Compatible(info))
}
