use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::daemon::DaemonHint;
use crate::core::options::StartOptions;
use crate::core::preflight::HOST_CHECKS;
use crate::core::pull_secret::ConfiguredPullSecret;
use crate::core::version::DEFAULT_RELEASE_INFO_URL;
use crate::error::{Error, Result};

pub const DEFAULT_CPUS: i32 = 4;
pub const DEFAULT_MEMORY_MIB: i32 = 9216;
pub const DEFAULT_DISK_SIZE_GIB: u32 = 31;
pub const DEFAULT_DAEMON_PORT: u16 = 7080;
pub const DEFAULT_DRIVER: &str = "cairn-driver";
pub const DEFAULT_BUNDLE_NAME: &str = "cairn_openshift.cairnbundle";
pub const STATE_DIR_NAME: &str = ".cairn";
pub const CONFIG_FILE_NAME: &str = "cairn.toml";

const KNOWN_KEYS: &[&str] = &[
    "bundle",
    "pull-secret-file",
    "cpus",
    "memory",
    "disk-size",
    "nameserver",
    "disable-update-check",
    "network-mode",
    "daemon-port",
    "driver",
    "release-info-url",
    "skip-checks",
];

/// How the cluster's network traffic is mediated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Host networking stack; no daemon involved.
    System,
    /// User-mode networking served by the `cairn daemon` process.
    User,
}

impl NetworkMode {
    pub fn requires_daemon(self) -> bool {
        matches!(self, Self::User)
    }

    pub fn default_for_host() -> Self {
        if cfg!(target_os = "linux") {
            Self::System
        } else {
            Self::User
        }
    }
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            other => Err(format!(
                "Unknown network mode `{other}`. Supported values: system, user"
            )),
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub state_dir: PathBuf,
    pub bundle: PathBuf,
    pub pull_secret_file: Option<PathBuf>,
    pub cpus: i32,
    pub memory: i32,
    pub disk_size: u32,
    pub nameserver: String,
    pub disable_update_check: bool,
    pub network_mode: NetworkMode,
    pub daemon_port: u16,
    pub driver: PathBuf,
    pub release_info_url: String,
    /// Host preflight checks left out of the gating step.
    pub skip_checks: Vec<String>,
    /// Non-fatal problems found in the configuration file.
    pub warnings: Vec<String>,
}

impl Settings {
    pub fn start_options(&self, daemon_hint: DaemonHint) -> StartOptions {
        StartOptions {
            bundle: self.bundle.clone(),
            memory: self.memory,
            disk_size: self.disk_size,
            cpus: self.cpus,
            nameserver: self.nameserver.clone(),
            pull_secret: Arc::new(ConfiguredPullSecret::new(self.pull_secret_file.clone())),
            disable_update_check: self.disable_update_check,
            network_mode: self.network_mode,
            daemon_hint,
        }
    }
}

/// Values supplied on the command line or through `CAIRN_*` variables.
/// They win over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub bundle: Option<PathBuf>,
    pub pull_secret_file: Option<PathBuf>,
    pub cpus: Option<i32>,
    pub memory: Option<i32>,
    pub disk_size: Option<u32>,
    pub nameserver: Option<String>,
    pub disable_update_check: bool,
    pub network_mode: Option<NetworkMode>,
    pub daemon_port: Option<u16>,
    pub driver: Option<PathBuf>,
    /// Replaces the file's list when non-empty.
    pub skip_checks: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSettings {
    bundle: Option<PathBuf>,
    pull_secret_file: Option<PathBuf>,
    cpus: Option<i32>,
    memory: Option<i32>,
    disk_size: Option<u32>,
    nameserver: Option<String>,
    disable_update_check: Option<bool>,
    network_mode: Option<String>,
    daemon_port: Option<u16>,
    driver: Option<PathBuf>,
    release_info_url: Option<String>,
    skip_checks: Option<Vec<String>>,
}

/// Resolve settings: overrides, then the configuration file, then defaults.
///
/// `explicit` names a configuration file that must exist; otherwise
/// `<home>/.cairn/cairn.toml` is read when present.
pub fn load_settings(
    explicit: Option<&Path>,
    home: &Path,
    overrides: &SettingsOverrides,
) -> Result<Settings> {
    let state_dir = home.join(STATE_DIR_NAME);
    let config_path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::ExplicitConfigMissing {
                    path: path.to_path_buf(),
                });
            }
            path.to_path_buf()
        }
        None => state_dir.join(CONFIG_FILE_NAME),
    };

    let mut warnings = Vec::new();
    let raw = if config_path.is_file() {
        read_raw_settings(&config_path, &mut warnings)?
    } else {
        RawSettings::default()
    };
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| state_dir.clone());

    let network_mode = match (overrides.network_mode, raw.network_mode.as_deref()) {
        (Some(mode), _) => mode,
        (None, Some(value)) => value.parse().map_err(|message| Error::InvalidConfig {
            path: config_path.clone(),
            message,
        })?,
        (None, None) => NetworkMode::default_for_host(),
    };

    let bundle = overrides
        .bundle
        .clone()
        .or_else(|| raw.bundle.map(|path| resolve_relative(&base_dir, path)))
        .unwrap_or_else(|| state_dir.join("cache").join(DEFAULT_BUNDLE_NAME));
    let pull_secret_file = overrides
        .pull_secret_file
        .clone()
        .or_else(|| raw.pull_secret_file.map(|path| resolve_relative(&base_dir, path)));
    let driver = overrides
        .driver
        .clone()
        .or(raw.driver)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DRIVER));
    let skip_checks = if overrides.skip_checks.is_empty() {
        raw.skip_checks.unwrap_or_default()
    } else {
        overrides.skip_checks.clone()
    };
    for check in &skip_checks {
        if !HOST_CHECKS.contains(&check.as_str()) {
            warnings.push(format!(
                "Unknown preflight check `{check}`; expected one of: {}.",
                HOST_CHECKS.join(", ")
            ));
        }
    }

    Ok(Settings {
        config_path,
        bundle,
        pull_secret_file,
        cpus: overrides.cpus.or(raw.cpus).unwrap_or(DEFAULT_CPUS),
        memory: overrides.memory.or(raw.memory).unwrap_or(DEFAULT_MEMORY_MIB),
        disk_size: overrides
            .disk_size
            .or(raw.disk_size)
            .unwrap_or(DEFAULT_DISK_SIZE_GIB),
        nameserver: overrides
            .nameserver
            .clone()
            .or(raw.nameserver)
            .unwrap_or_default(),
        disable_update_check: overrides.disable_update_check
            || raw.disable_update_check.unwrap_or(false),
        network_mode,
        daemon_port: overrides
            .daemon_port
            .or(raw.daemon_port)
            .unwrap_or(DEFAULT_DAEMON_PORT),
        driver,
        release_info_url: raw
            .release_info_url
            .unwrap_or_else(|| DEFAULT_RELEASE_INFO_URL.to_string()),
        skip_checks,
        state_dir,
        warnings,
    })
}

fn read_raw_settings(path: &Path, warnings: &mut Vec<String>) -> Result<RawSettings> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&contents).map_err(|source| Error::ParseConfig {
        path: path.to_path_buf(),
        source,
    })?;

    warnings.extend(detect_unknown_fields(&value));

    RawSettings::deserialize(value).map_err(|source| Error::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

fn detect_unknown_fields(value: &toml::Value) -> Vec<String> {
    let toml::Value::Table(table) = value else {
        return Vec::new();
    };
    table
        .keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .map(|key| format!("Unknown setting `{key}`; this value will be ignored."))
        .collect()
}

fn resolve_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

pub fn user_home_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME").filter(|home| !home.is_empty()) {
        return Some(PathBuf::from(home));
    }

    #[cfg(windows)]
    {
        if let Some(profile) = std::env::var_os("USERPROFILE").filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(profile));
        }
    }

    None
}
