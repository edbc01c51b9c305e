use crate::error::{Error, Result};

use super::super::backend::{Backend, ClusterState};
use super::super::cancel::CancelToken;
use super::super::daemon::{DaemonClient, check_daemon_compatibility};
use super::super::events::Event;
use super::super::options::{StartConfig, StartOptions};
use super::super::outcome::StartResult;
use super::super::preflight::PreflightChecks;
use super::super::reporter::Reporter;
use super::super::update::{ReleaseSource, check_for_update};
use super::super::validate::validate_start_options;
use super::super::version::CLIENT_VERSION;

/// External systems `start` talks to.
pub struct Collaborators<'a> {
    pub backend: &'a dyn Backend,
    pub daemon: &'a dyn DaemonClient,
    pub preflight: &'a dyn PreflightChecks,
    pub releases: &'a dyn ReleaseSource,
    /// Version the daemon must report; defaults to this build's version.
    pub client_version: &'a str,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        daemon: &'a dyn DaemonClient,
        preflight: &'a dyn PreflightChecks,
        releases: &'a dyn ReleaseSource,
    ) -> Self {
        Self {
            backend,
            daemon,
            preflight,
            releases,
            client_version: CLIENT_VERSION,
        }
    }
}

struct Progress<'r> {
    delegate: Option<&'r mut dyn Reporter>,
}

impl Progress<'_> {
    fn emit(&mut self, event: Event) {
        if let Some(reporter) = self.delegate.as_deref_mut() {
            reporter.report(event);
        }
    }
}

/// Start the cluster.
///
/// Gating (daemon compatibility, then preflight) runs only when the backend
/// does not report a running cluster. A failed status probe counts as not
/// running so the backend's own start gets a chance to recover partial state.
pub fn start(
    options: &StartOptions,
    collaborators: &Collaborators<'_>,
    cancel: &CancelToken,
    reporter: Option<&mut dyn Reporter>,
) -> Result<StartResult> {
    let mut progress = Progress { delegate: reporter };

    validate_start_options(options)?;
    progress.emit(Event::ConfigValidated);

    let update = check_for_update(
        options.disable_update_check,
        collaborators.releases,
        collaborators.client_version,
        cancel,
    );
    progress.emit(Event::UpdateChecked(update));
    cancel.check("checking for updates")?;

    let config = StartConfig::from_options(options);

    let state = match collaborators.backend.status() {
        Ok(state) => {
            progress.emit(Event::ClusterStatus { state });
            state
        }
        Err(err) => {
            log::debug!("Cluster status probe failed, assuming it is not running: {err}");
            progress.emit(Event::StatusProbeFailed {
                reason: err.to_string(),
            });
            ClusterState::NotRunning
        }
    };

    match state {
        ClusterState::Running => progress.emit(Event::GatingSkipped),
        ClusterState::NotRunning => {
            let check = check_daemon_compatibility(
                options.network_mode,
                collaborators.daemon,
                collaborators.client_version,
                options.daemon_hint,
                cancel,
            )?;
            progress.emit(Event::DaemonChecked(check));

            cancel.check("running preflight checks")?;
            collaborators
                .preflight
                .run(options)
                .map_err(|failure| Error::PreflightFailed {
                    check: failure.check,
                    message: failure.message,
                })?;
            progress.emit(Event::PreflightPassed);
        }
    }

    progress.emit(Event::BackendStartRequested);
    collaborators.backend.start(config, state, cancel)
}
