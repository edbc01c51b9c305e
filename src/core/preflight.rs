use std::env;
use std::path::{Path, PathBuf};

use sysinfo::{Disks, System};

use super::options::StartOptions;

const BYTES_PER_MIB: u64 = 1024 * 1024;
const BYTES_PER_GIB: u64 = 1024 * BYTES_PER_MIB;

const CHECK_CPUS: &str = "cpus";
const CHECK_MEMORY: &str = "memory";
const CHECK_DISK: &str = "disk-space";
const CHECK_DRIVER: &str = "driver";

/// Names accepted by [`HostPreflight::skipping`], in the order the checks run.
pub const HOST_CHECKS: &[&str] = &[CHECK_CPUS, CHECK_MEMORY, CHECK_DISK, CHECK_DRIVER];

/// First failing preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightFailure {
    pub check: String,
    pub message: String,
}

impl PreflightFailure {
    fn new(check: &str, message: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            message: message.into(),
        }
    }
}

/// Environment-readiness checks run before the first start of a cluster.
pub trait PreflightChecks {
    fn run(&self, options: &StartOptions) -> Result<(), PreflightFailure>;
}

/// Host capacity snapshot used by [`HostPreflight`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub cpus: usize,
    pub total_memory_bytes: u64,
    /// Free space on the filesystem holding the state directory, if known.
    pub available_disk_bytes: Option<u64>,
}

impl HostFacts {
    pub fn probe(state_dir: &Path) -> Self {
        let system = System::new_all();
        let disks = Disks::new_with_refreshed_list();
        let probe = existing_ancestor(state_dir);
        let available_disk_bytes = disks
            .list()
            .iter()
            .filter(|disk| probe.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space());

        Self {
            cpus: system.cpus().len(),
            total_memory_bytes: system.total_memory(),
            available_disk_bytes,
        }
    }
}

fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|candidate| candidate.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Default check battery: CPU threads, memory, free disk and driver availability.
#[derive(Debug, Clone)]
pub struct HostPreflight {
    state_dir: PathBuf,
    driver: PathBuf,
    skipped: Vec<String>,
}

impl HostPreflight {
    pub fn new(state_dir: PathBuf, driver: PathBuf) -> Self {
        Self {
            state_dir,
            driver,
            skipped: Vec::new(),
        }
    }

    /// Leave out the named checks. Names outside [`HOST_CHECKS`] match nothing.
    pub fn skipping(mut self, checks: impl IntoIterator<Item = String>) -> Self {
        self.skipped.extend(checks);
        self
    }

    fn enabled(&self, check: &str) -> bool {
        if self.skipped.iter().any(|skipped| skipped == check) {
            log::debug!("Skipping preflight check `{check}`");
            return false;
        }
        true
    }

    fn run_with_facts(&self, facts: &HostFacts, options: &StartOptions) -> Result<(), PreflightFailure> {
        if self.enabled(CHECK_CPUS) {
            check_cpus(facts, options.cpus)?;
        }
        if self.enabled(CHECK_MEMORY) {
            check_memory(facts, options.memory)?;
        }
        if self.enabled(CHECK_DISK) {
            check_disk(facts, options.disk_size, &self.state_dir)?;
        }
        if self.enabled(CHECK_DRIVER) {
            check_driver(&self.driver)?;
        }
        Ok(())
    }
}

impl PreflightChecks for HostPreflight {
    fn run(&self, options: &StartOptions) -> Result<(), PreflightFailure> {
        let facts = HostFacts::probe(&self.state_dir);
        log::debug!("Host facts for preflight: {facts:?}");
        self.run_with_facts(&facts, options)
    }
}

fn check_cpus(facts: &HostFacts, requested: i32) -> Result<(), PreflightFailure> {
    let requested = usize::try_from(requested).unwrap_or(0);
    if requested > facts.cpus {
        return Err(PreflightFailure::new(
            CHECK_CPUS,
            format!(
                "Requested {requested} CPUs but the host has {} hardware threads.",
                facts.cpus
            ),
        ));
    }
    Ok(())
}

fn check_memory(facts: &HostFacts, requested_mib: i32) -> Result<(), PreflightFailure> {
    let requested = u64::try_from(requested_mib).unwrap_or(0) * BYTES_PER_MIB;
    if requested > facts.total_memory_bytes {
        return Err(PreflightFailure::new(
            CHECK_MEMORY,
            format!(
                "Requested {requested_mib} MiB of memory but the host has {} MiB.",
                facts.total_memory_bytes / BYTES_PER_MIB
            ),
        ));
    }
    Ok(())
}

fn check_disk(facts: &HostFacts, requested_gib: u32, state_dir: &Path) -> Result<(), PreflightFailure> {
    let Some(available) = facts.available_disk_bytes else {
        log::debug!(
            "Unable to determine free space at {}; skipping disk check.",
            state_dir.display()
        );
        return Ok(());
    };
    let requested = u64::from(requested_gib) * BYTES_PER_GIB;
    if requested > available {
        return Err(PreflightFailure::new(
            CHECK_DISK,
            format!(
                "{} has {} GiB free but the cluster disk needs {requested_gib} GiB.",
                state_dir.display(),
                available / BYTES_PER_GIB
            ),
        ));
    }
    Ok(())
}

fn check_driver(driver: &Path) -> Result<(), PreflightFailure> {
    if resolve_executable(driver).is_some() {
        return Ok(());
    }
    Err(PreflightFailure::new(
        CHECK_DRIVER,
        format!(
            "Provisioning driver `{}` was not found. Install it or set `driver` in the configuration.",
            driver.display()
        ),
    ))
}

/// Resolve `program` either as a path or by searching `PATH`.
pub fn resolve_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
