use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::{NetworkMode, SettingsOverrides};
use crate::core::version::DISPLAY_VERSION;

/// Top-level CLI definition for the `cairn` tool.
#[derive(Debug, Parser)]
#[command(
    name = "cairn",
    author = "Cairn Project",
    version = DISPLAY_VERSION,
    about = "Run a local OpenShift cluster on your workstation.",
    long_about = "Cairn provisions a single-node OpenShift cluster inside a local virtual machine.\n\
                  Settings are read from flags, CAIRN_* environment variables and ~/.cairn/cairn.toml, in that order."
)]
pub struct Cli {
    /// Path to an explicit configuration file. Defaults to `~/.cairn/cairn.toml`.
    #[arg(
        global = true,
        long = "config",
        value_name = "PATH",
        env = "CAIRN_CONFIG",
        help = "Load settings from PATH instead of ~/.cairn/cairn.toml"
    )]
    pub config: Option<PathBuf>,

    /// Minimum level for diagnostic logging on stderr.
    #[arg(
        global = true,
        long = "log-level",
        value_name = "LEVEL",
        env = "CAIRN_LOG_LEVEL",
        default_value = "info",
        help = "Log verbosity: error, warn, info, debug or trace"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the cluster, running compatibility and preflight checks when it is not already up.
    Start(StartArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args, Default)]
pub struct StartArgs {
    #[arg(
        short = 'b',
        long,
        value_name = "PATH",
        env = "CAIRN_BUNDLE",
        help = "Bundle used to provision the cluster (*.cairnbundle)"
    )]
    pub bundle: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        value_name = "PATH",
        env = "CAIRN_PULL_SECRET_FILE",
        help = "File containing the image pull secret; prompted for when omitted"
    )]
    pub pull_secret_file: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        value_name = "COUNT",
        env = "CAIRN_CPUS",
        allow_negative_numbers = true,
        help = "Number of virtual CPUs for the cluster VM (minimum 4)"
    )]
    pub cpus: Option<i32>,

    #[arg(
        short = 'm',
        long,
        value_name = "MIB",
        env = "CAIRN_MEMORY",
        allow_negative_numbers = true,
        help = "Memory for the cluster VM in MiB (minimum 9216)"
    )]
    pub memory: Option<i32>,

    #[arg(
        short = 'd',
        long,
        value_name = "GIB",
        env = "CAIRN_DISK_SIZE",
        help = "Disk size for the cluster VM in GiB (minimum 31)"
    )]
    pub disk_size: Option<u32>,

    #[arg(
        short = 'n',
        long,
        value_name = "IPV4",
        env = "CAIRN_NAMESERVER",
        help = "IPv4 address of a nameserver the cluster should use"
    )]
    pub nameserver: Option<String>,

    #[arg(
        long,
        env = "CAIRN_DISABLE_UPDATE_CHECK",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        help = "Do not look for a newer release before starting"
    )]
    pub disable_update_check: bool,

    #[arg(
        long = "skip-check",
        value_name = "CHECK",
        env = "CAIRN_SKIP_CHECKS",
        value_delimiter = ',',
        help = "Leave out a host preflight check (cpus, memory, disk-space, driver); repeatable"
    )]
    pub skip_checks: Vec<String>,

    #[arg(
        long,
        value_name = "MODE",
        env = "CAIRN_NETWORK_MODE",
        help = "Networking mode: `system` or `user` (user mode needs `cairn daemon`)"
    )]
    pub network_mode: Option<NetworkMode>,

    #[arg(
        long,
        value_name = "PORT",
        env = "CAIRN_DAEMON_PORT",
        help = "Local port the daemon API listens on"
    )]
    pub daemon_port: Option<u16>,

    #[arg(
        long,
        value_name = "PATH",
        env = "CAIRN_DRIVER",
        help = "Provisioning driver executable"
    )]
    pub driver: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_enum,
        value_name = "FORMAT",
        env = "CAIRN_OUTPUT",
        default_value_t = OutputFormat::Text,
        help = "Output format"
    )]
    pub output: OutputFormat,
}

impl StartArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            bundle: self.bundle.clone(),
            pull_secret_file: self.pull_secret_file.clone(),
            cpus: self.cpus,
            memory: self.memory,
            disk_size: self.disk_size,
            nameserver: self.nameserver.clone(),
            disable_update_check: self.disable_update_check,
            network_mode: self.network_mode,
            daemon_port: self.daemon_port,
            driver: self.driver.clone(),
            skip_checks: self.skip_checks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn start_flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "cairn",
            "start",
            "-c",
            "6",
            "-m",
            "12288",
            "--nameserver",
            "10.0.0.53",
            "--network-mode",
            "user",
            "--disable-update-check",
            "--skip-check",
            "cpus",
            "--skip-check",
            "memory,disk-space",
            "-o",
            "json",
        ])
        .expect("parse");

        let Some(Commands::Start(args)) = cli.command else {
            panic!("expected start command");
        };
        assert_eq!(args.output, OutputFormat::Json);
        let overrides = args.overrides();
        assert_eq!(overrides.cpus, Some(6));
        assert_eq!(overrides.memory, Some(12288));
        assert_eq!(overrides.nameserver.as_deref(), Some("10.0.0.53"));
        assert_eq!(overrides.network_mode, Some(NetworkMode::User));
        assert!(overrides.disable_update_check);
        assert_eq!(overrides.skip_checks, ["cpus", "memory", "disk-space"]);
        assert!(overrides.bundle.is_none());
    }

    #[test]
    fn update_check_env_accepts_truthy_words() {
        temp_env::with_var("CAIRN_DISABLE_UPDATE_CHECK", Some("yes"), || {
            let cli = Cli::try_parse_from(["cairn", "start"]).expect("parse");
            let Some(Commands::Start(args)) = cli.command else {
                panic!("expected start command");
            };
            assert!(args.disable_update_check);
        });
        temp_env::with_var("CAIRN_DISABLE_UPDATE_CHECK", Some("0"), || {
            let cli = Cli::try_parse_from(["cairn", "start"]).expect("parse");
            let Some(Commands::Start(args)) = cli.command else {
                panic!("expected start command");
            };
            assert!(!args.disable_update_check);
        });
    }

    #[test]
    fn unknown_network_mode_is_a_usage_error() {
        let err = Cli::try_parse_from(["cairn", "start", "--network-mode", "bridged"])
            .expect_err("invalid mode");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
