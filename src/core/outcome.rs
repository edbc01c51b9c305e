use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ADMIN_USERNAME: &str = "kubeadmin";
pub const DEVELOPER_USERNAME: &str = "developer";
pub const DEVELOPER_PASSWORD: &str = "developer";

/// Coarse error category preserved in structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    ConfigValidation,
    DaemonUnreachable,
    VersionMismatch,
    Preflight,
    BackendStart,
    Generic,
}

/// Error value carried by a failed [`StartResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SerializableError {
    pub fn is_preflight(&self) -> bool {
        self.kind == ErrorKind::Preflight
    }
}

impl From<&Error> for SerializableError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Connection details reported by the provisioning backend after a successful start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConnection {
    pub cacert: String,
    pub web_console_url: String,
    pub url: String,
    pub kubeadmin_password: String,
}

/// Access details for a running cluster, as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub cacert: String,
    pub web_console_url: String,
    pub url: String,
    pub admin_credentials: Credentials,
    pub developer_credentials: Credentials,
}

impl From<ClusterConnection> for ClusterConfig {
    fn from(connection: ClusterConnection) -> Self {
        Self {
            cacert: connection.cacert,
            web_console_url: connection.web_console_url,
            url: connection.url,
            admin_credentials: Credentials {
                username: ADMIN_USERNAME.to_string(),
                password: connection.kubeadmin_password,
            },
            developer_credentials: Credentials {
                username: DEVELOPER_USERNAME.to_string(),
                password: DEVELOPER_PASSWORD.to_string(),
            },
        }
    }
}

/// Outcome of `start`.
///
/// Exactly one of `error` and `cluster_config` is populated; `success` mirrors
/// which one. The constructors are the only way to build a value outside this
/// module, so the pairing cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResult {
    success: bool,
    error: Option<SerializableError>,
    cluster_config: Option<ClusterConfig>,
}

impl StartResult {
    pub fn started(cluster_config: ClusterConfig) -> Self {
        Self {
            success: true,
            error: None,
            cluster_config: Some(cluster_config),
        }
    }

    pub fn failed(err: &Error) -> Self {
        Self {
            success: false,
            error: Some(SerializableError::from(err)),
            cluster_config: None,
        }
    }

    /// Fold an orchestration outcome into the record handed to the renderer.
    pub fn from_outcome(outcome: &Result<StartResult>) -> Self {
        match outcome {
            Ok(result) => result.clone(),
            Err(err) => Self::failed(err),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&SerializableError> {
        self.error.as_ref()
    }

    pub fn cluster_config(&self) -> Option<&ClusterConfig> {
        self.cluster_config.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn empty_for_tests() -> Self {
        Self {
            success: false,
            error: None,
            cluster_config: None,
        }
    }
}
