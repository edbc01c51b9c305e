use std::path::PathBuf;

use thiserror::Error;

use crate::core::daemon::DaemonHint;
use crate::core::outcome::ErrorKind;
use crate::core::validate::ConfigField;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid {field}: {message}")]
    InvalidStartConfig { field: ConfigField, message: String },
    #[error("Failed to read configuration file at {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration at {path} could not be parsed: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Configuration at {path} is invalid: {message}")]
    InvalidConfig { path: PathBuf, message: String },
    #[error("The configuration path {path} does not exist or is not readable.")]
    ExplicitConfigMissing { path: PathBuf },
    #[error("{hint} Cannot reach daemon API: {reason}")]
    DaemonUnreachable { hint: DaemonHint, reason: String },
    #[error("The executable version ({client}) doesn't match the daemon version ({daemon})")]
    VersionMismatch { client: String, daemon: String },
    #[error("Preflight check `{check}` failed: {message}")]
    PreflightFailed { check: String, message: String },
    #[error("{message}")]
    BackendStart { message: String },
    #[error("Unable to query cluster status: {message}")]
    BackendStatus { message: String },
    #[error("Unable to load pull secret: {message}")]
    PullSecret { message: String },
    #[error("Interrupted while {stage}.")]
    Cancelled { stage: &'static str },
    #[error("Background worker stopped unexpectedly while {stage}.")]
    WorkerPanicked { stage: &'static str },
    #[error("either an error or a cluster configuration is needed to render a start result")]
    MissingStartOutcome,
    #[error("Failed to write output: {source}")]
    WriteOutput {
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Classify the error for serialization; only preflight failures carry a remediation hint.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStartConfig { .. } => ErrorKind::ConfigValidation,
            Self::DaemonUnreachable { .. } => ErrorKind::DaemonUnreachable,
            Self::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            Self::PreflightFailed { .. } => ErrorKind::Preflight,
            Self::BackendStart { .. } => ErrorKind::BackendStart,
            Self::ReadConfig { .. }
            | Self::ParseConfig { .. }
            | Self::InvalidConfig { .. }
            | Self::ExplicitConfigMissing { .. }
            | Self::BackendStatus { .. }
            | Self::PullSecret { .. }
            | Self::Cancelled { .. }
            | Self::WorkerPanicked { .. }
            | Self::MissingStartOutcome
            | Self::WriteOutput { .. } => ErrorKind::Generic,
        }
    }
}

