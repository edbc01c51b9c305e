use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::NetworkMode;

use super::daemon::DaemonHint;
use super::pull_secret::PullSecretLoader;

/// Options for the `start` operation, resolved from flags, environment and the config file.
#[derive(Clone)]
pub struct StartOptions {
    /// Path to the `.cairnbundle` used to provision the cluster.
    pub bundle: PathBuf,
    /// Memory in MiB.
    pub memory: i32,
    /// Disk size in GiB.
    pub disk_size: u32,
    pub cpus: i32,
    /// IPv4 nameserver handed to the cluster; empty when unset.
    pub nameserver: String,
    /// Lazily consulted when the backend needs the pull secret.
    pub pull_secret: Arc<dyn PullSecretLoader>,
    pub disable_update_check: bool,
    pub network_mode: NetworkMode,
    /// Wording used when the daemon cannot be reached.
    pub daemon_hint: DaemonHint,
}

impl fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartOptions")
            .field("bundle", &self.bundle)
            .field("memory", &self.memory)
            .field("disk_size", &self.disk_size)
            .field("cpus", &self.cpus)
            .field("nameserver", &self.nameserver)
            .field("pull_secret", &self.pull_secret.describe())
            .field("disable_update_check", &self.disable_update_check)
            .field("network_mode", &self.network_mode)
            .field("daemon_hint", &self.daemon_hint)
            .finish()
    }
}

/// Configuration handed to the provisioning backend.
pub struct StartConfig {
    pub bundle_path: PathBuf,
    pub memory: i32,
    pub disk_size: u32,
    pub cpus: i32,
    pub nameserver: String,
    pub pull_secret: Arc<dyn PullSecretLoader>,
}

impl StartConfig {
    pub fn from_options(options: &StartOptions) -> Self {
        Self {
            bundle_path: options.bundle.clone(),
            memory: options.memory,
            disk_size: options.disk_size,
            cpus: options.cpus,
            nameserver: options.nameserver.clone(),
            pull_secret: Arc::clone(&options.pull_secret),
        }
    }
}

impl fmt::Debug for StartConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartConfig")
            .field("bundle_path", &self.bundle_path)
            .field("memory", &self.memory)
            .field("disk_size", &self.disk_size)
            .field("cpus", &self.cpus)
            .field("nameserver", &self.nameserver)
            .field("pull_secret", &self.pull_secret.describe())
            .finish()
    }
}
