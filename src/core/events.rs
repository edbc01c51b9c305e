use super::backend::ClusterState;
use super::daemon::DaemonCheck;
use super::update::UpdateCheck;

/// Progress milestones of a `start` invocation, in the order they can occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Settings passed validation.
    ConfigValidated,
    UpdateChecked(UpdateCheck),
    ClusterStatus { state: ClusterState },
    /// Status probe failed; the cluster is treated as not running.
    StatusProbeFailed { reason: String },
    /// Cluster already running; compatibility and preflight gates were skipped.
    GatingSkipped,
    DaemonChecked(DaemonCheck),
    PreflightPassed,
    BackendStartRequested,
}
