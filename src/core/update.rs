//! Best-effort notification about newer releases.
//!
//! Nothing here can fail the caller: query errors are logged at debug level and
//! swallowed, and the returned [`UpdateCheck`] is informational only.

use std::time::Duration;

use semver::Version;
use serde::Deserialize;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use crate::error::Error;

use super::cancel::CancelToken;
use super::version::LANDING_PAGE_URL;

const RELEASE_INFO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseQueryError {
    #[error("{0}")]
    Transport(String),
    #[error("malformed release info: {0}")]
    MalformedInfo(String),
    #[error("malformed release version: {0}")]
    MalformedVersion(String),
    #[error("interrupted")]
    Cancelled,
}

/// Somewhere to ask for the latest published version.
pub trait ReleaseSource {
    fn latest_version(&self, cancel: &CancelToken) -> Result<Version, ReleaseQueryError>;
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    version: ReleaseVersion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseVersion {
    cairn_version: String,
}

/// Reads the release-info document published next to each release.
#[derive(Debug, Clone)]
pub struct HttpReleaseSource {
    agent: Agent,
    url: String,
}

impl HttpReleaseSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: AgentBuilder::new().timeout(RELEASE_INFO_TIMEOUT).build(),
            url: url.into(),
        }
    }
}

impl ReleaseSource for HttpReleaseSource {
    fn latest_version(&self, cancel: &CancelToken) -> Result<Version, ReleaseQueryError> {
        let agent = self.agent.clone();
        let url = self.url.clone();
        let outcome = cancel.run_blocking("checking for updates", move || {
            fetch_release_info(&agent, &url)
        });
        match outcome {
            Ok(result) => result,
            Err(Error::Cancelled { .. }) => Err(ReleaseQueryError::Cancelled),
            Err(other) => Err(ReleaseQueryError::Transport(other.to_string())),
        }
    }
}

fn fetch_release_info(agent: &Agent, url: &str) -> Result<Version, ReleaseQueryError> {
    let body = agent
        .get(url)
        .call()
        .map_err(|err| ReleaseQueryError::Transport(err.to_string()))?
        .into_string()
        .map_err(|err| ReleaseQueryError::Transport(err.to_string()))?;
    parse_release_info(&body)
}

fn parse_release_info(body: &str) -> Result<Version, ReleaseQueryError> {
    let info: ReleaseInfo = serde_json::from_str(body)
        .map_err(|err| ReleaseQueryError::MalformedInfo(err.to_string()))?;
    Version::parse(info.version.cairn_version.trim())
        .map_err(|err| ReleaseQueryError::MalformedVersion(err.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    Skipped,
    Unknown,
    UpToDate(Version),
    Available(Version),
}

pub fn check_for_update(
    skip: bool,
    source: &dyn ReleaseSource,
    current: &str,
    cancel: &CancelToken,
) -> UpdateCheck {
    if skip {
        return UpdateCheck::Skipped;
    }

    let current = match Version::parse(current) {
        Ok(version) => version,
        Err(err) => {
            log::debug!("Unable to parse the running version {current}: {err}");
            return UpdateCheck::Unknown;
        }
    };

    let latest = match source.latest_version(cancel) {
        Ok(version) => version,
        Err(err) => {
            log::debug!("Unable to find out if a new version is available: {err}");
            return UpdateCheck::Unknown;
        }
    };

    if latest > current {
        log::warn!("A new version ({latest}) has been published on {LANDING_PAGE_URL}");
        UpdateCheck::Available(latest)
    } else {
        log::debug!("No new version available. The latest version is {latest}");
        UpdateCheck::UpToDate(latest)
    }
}
