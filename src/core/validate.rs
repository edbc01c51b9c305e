use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Error, Result};

use super::options::StartOptions;

pub const MIN_MEMORY_MIB: i32 = 9216;
pub const MIN_CPUS: i32 = 4;
pub const MIN_DISK_SIZE_GIB: u32 = 31;
pub const BUNDLE_EXTENSION: &str = "cairnbundle";

/// Start setting a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Memory,
    Cpus,
    DiskSize,
    Bundle,
    Nameserver,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Cpus => "cpus",
            Self::DiskSize => "disk-size",
            Self::Bundle => "bundle",
            Self::Nameserver => "nameserver",
        };
        f.write_str(name)
    }
}

fn invalid(field: ConfigField, message: impl Into<String>) -> Error {
    Error::InvalidStartConfig {
        field,
        message: message.into(),
    }
}

/// Validate the start settings in a fixed order, stopping at the first failure:
/// memory, CPUs, disk size, bundle, then nameserver when one is set.
pub fn validate_start_options(options: &StartOptions) -> Result<()> {
    validate_memory(options.memory)?;
    validate_cpus(options.cpus)?;
    validate_disk_size(options.disk_size)?;
    validate_bundle(&options.bundle)?;
    if !options.nameserver.is_empty() {
        validate_nameserver(&options.nameserver)?;
    }
    Ok(())
}

pub fn validate_memory(memory: i32) -> Result<()> {
    if memory < MIN_MEMORY_MIB {
        return Err(invalid(
            ConfigField::Memory,
            format!("requires memory in MiB >= {MIN_MEMORY_MIB}, got {memory}"),
        ));
    }
    Ok(())
}

pub fn validate_cpus(cpus: i32) -> Result<()> {
    if cpus < MIN_CPUS {
        return Err(invalid(
            ConfigField::Cpus,
            format!("requires CPUs >= {MIN_CPUS}, got {cpus}"),
        ));
    }
    Ok(())
}

pub fn validate_disk_size(disk_size: u32) -> Result<()> {
    if disk_size < MIN_DISK_SIZE_GIB {
        return Err(invalid(
            ConfigField::DiskSize,
            format!("requires disk size in GiB >= {MIN_DISK_SIZE_GIB}, got {disk_size}"),
        ));
    }
    Ok(())
}

pub fn validate_bundle(bundle: &Path) -> Result<()> {
    if bundle.as_os_str().is_empty() {
        return Err(invalid(ConfigField::Bundle, "bundle path is empty"));
    }
    let has_extension = bundle
        .extension()
        .is_some_and(|ext| ext == BUNDLE_EXTENSION);
    if !has_extension {
        return Err(invalid(
            ConfigField::Bundle,
            format!(
                "{} is not a valid bundle (expected a `.{BUNDLE_EXTENSION}` file)",
                bundle.display()
            ),
        ));
    }
    if !bundle.is_file() {
        return Err(invalid(
            ConfigField::Bundle,
            format!("file {} does not exist", bundle.display()),
        ));
    }
    Ok(())
}

pub fn validate_nameserver(nameserver: &str) -> Result<()> {
    nameserver.parse::<Ipv4Addr>().map(|_| ()).map_err(|_| {
        invalid(
            ConfigField::Nameserver,
            format!("`{nameserver}` is not a valid IPv4 address"),
        )
    })
}
