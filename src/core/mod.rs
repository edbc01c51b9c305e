//! Cairn library API surface: the `start` pipeline and the contracts of the
//! systems it drives.

pub mod backend;
pub mod cancel;
pub mod daemon;
pub mod events;
pub mod operations;
pub mod options;
pub mod outcome;
pub mod preflight;
pub mod pull_secret;
pub mod reporter;
pub mod update;
pub mod validate;
pub mod version;

pub use backend::{Backend, ClusterState, ProcessBackend};
pub use cancel::CancelToken;
pub use daemon::{DaemonClient, DaemonHint, HttpDaemonClient};
pub use events::Event;
pub use operations::{Collaborators, start};
pub use options::{StartConfig, StartOptions};
pub use outcome::{ClusterConfig, ErrorKind, SerializableError, StartResult};
pub use preflight::{HostPreflight, PreflightChecks, PreflightFailure};
pub use pull_secret::PullSecretLoader;
pub use reporter::Reporter;
pub use update::{HttpReleaseSource, ReleaseQueryError, ReleaseSource};
