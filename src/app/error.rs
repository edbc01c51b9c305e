use std::process::ExitCode;

use crate::Error;
use crate::core::outcome::{ErrorKind, StartResult};

/// Reserved for failed preflight checks so wrappers can suggest `cairn setup`.
pub const PREFLIGHT_FAILED_EXIT_CODE: u8 = 2;
pub const GENERIC_FAILURE_EXIT_CODE: u8 = 1;

fn code_for_kind(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Preflight => PREFLIGHT_FAILED_EXIT_CODE,
        ErrorKind::ConfigValidation
        | ErrorKind::DaemonUnreachable
        | ErrorKind::VersionMismatch
        | ErrorKind::BackendStart
        | ErrorKind::Generic => GENERIC_FAILURE_EXIT_CODE,
    }
}

pub fn exit_code(err: &Error) -> ExitCode {
    ExitCode::from(code_for_kind(err.kind()))
}

/// Exit status for a rendered start record.
pub fn start_exit_code(result: &StartResult) -> ExitCode {
    match result.error() {
        None => ExitCode::SUCCESS,
        Some(error) => ExitCode::from(code_for_kind(error.kind)),
    }
}
