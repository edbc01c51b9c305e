use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::cli::{OutputFormat, StartArgs};
use crate::config::{Settings, load_settings, user_home_dir};
use crate::core::backend::{ClusterState, ProcessBackend};
use crate::core::cancel::CancelToken;
use crate::core::daemon::{DaemonCheck, DaemonHint, HttpDaemonClient};
use crate::core::events::Event;
use crate::core::operations::{Collaborators, start};
use crate::core::outcome::StartResult;
use crate::core::preflight::HostPreflight;
use crate::core::reporter::Reporter;
use crate::core::update::{HttpReleaseSource, UpdateCheck};
use crate::core::version::BuildVariant;
use crate::error::{Error, Result};

use super::error::{exit_code, start_exit_code};
use super::render::{RenderEnv, render_start};
use super::shell::{Platform, detect_shell};

/// Forwards orchestration progress to the log.
struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, event: Event) {
        match event {
            Event::ConfigValidated => log::debug!("Start configuration is valid"),
            Event::UpdateChecked(UpdateCheck::Skipped) => log::debug!("Update check disabled"),
            Event::UpdateChecked(_) => {}
            Event::ClusterStatus { state } => match state {
                ClusterState::Running => log::info!("A cluster is already running"),
                ClusterState::NotRunning => log::debug!("No running cluster found"),
            },
            Event::StatusProbeFailed { reason } => {
                log::debug!("Cannot determine cluster status, assuming it is stopped: {reason}")
            }
            Event::GatingSkipped => {
                log::debug!("Skipping daemon and preflight checks for the running cluster")
            }
            Event::DaemonChecked(DaemonCheck::NotRequired) => {
                log::debug!("System networking mode, daemon not required")
            }
            Event::DaemonChecked(DaemonCheck::Compatible(versions)) => {
                log::debug!("Daemon version {} matches", versions.daemon)
            }
            Event::PreflightPassed => log::info!("Preflight checks passed"),
            Event::BackendStartRequested => log::info!("Starting the cluster, this may take a while..."),
        }
    }
}

pub fn handle_start(args: StartArgs, config_override: Option<&PathBuf>, cancel: &CancelToken) -> ExitCode {
    let settings = match resolve_settings(&args, config_override) {
        Ok(settings) => settings,
        Err(err) => return report_failure(&err, args.output),
    };

    for warning in &settings.warnings {
        log::warn!("{warning}");
    }

    let outcome = run_start(&settings, cancel);
    let result = StartResult::from_outcome(&outcome);

    let platform = Platform::current();
    let shell = match detect_shell(platform) {
        Ok(shell) => Some(shell),
        Err(err) => {
            log::debug!("Shell detection failed, using the default hint: {err}");
            None
        }
    };
    let env = RenderEnv {
        platform,
        shell,
        variant: BuildVariant::current(),
    };

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    if let Err(render_err) = render_start(&result, args.output, &env, &mut out, &mut err) {
        let _ = writeln!(err, "Error: {render_err}");
        return exit_code(&render_err);
    }
    let _ = out.flush();

    start_exit_code(&result)
}

fn resolve_settings(args: &StartArgs, config_override: Option<&PathBuf>) -> Result<Settings> {
    let home = user_home_dir().ok_or_else(|| Error::InvalidConfig {
        path: PathBuf::from("~"),
        message: "unable to determine the home directory; set HOME".to_string(),
    })?;
    load_settings(config_override.map(PathBuf::as_path), &home, &args.overrides())
}

fn run_start(settings: &Settings, cancel: &CancelToken) -> Result<StartResult> {
    let backend = ProcessBackend::new(settings.driver.clone(), settings.state_dir.clone());
    let daemon = HttpDaemonClient::new(settings.daemon_port);
    let preflight = HostPreflight::new(settings.state_dir.clone(), settings.driver.clone())
        .skipping(settings.skip_checks.iter().cloned());
    let releases = HttpReleaseSource::new(settings.release_info_url.clone());
    let collaborators = Collaborators::new(&backend, &daemon, &preflight, &releases);

    let options = settings.start_options(DaemonHint::detect());
    let mut reporter = LogReporter;
    start(&options, &collaborators, cancel, Some(&mut reporter))
}

/// Settings could not be resolved; still honour the requested output format.
fn report_failure(err: &Error, format: OutputFormat) -> ExitCode {
    let result = StartResult::failed(err);
    let env = RenderEnv {
        platform: Platform::current(),
        shell: None,
        variant: BuildVariant::current(),
    };
    let mut out = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    if let Err(render_err) = render_start(&result, format, &env, &mut out, &mut stderr) {
        let _ = writeln!(stderr, "Error: {render_err}");
    }
    exit_code(err)
}
