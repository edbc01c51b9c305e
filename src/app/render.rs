//! Presentation of a [`StartResult`] as a JSON record or a human report.

use std::io::Write;

use crate::cli::OutputFormat;
use crate::core::outcome::{ClusterConfig, StartResult};
use crate::core::version::BuildVariant;
use crate::error::{Error, Result};

use super::shell::{Platform, Shell, command_line_prefix, usage_hint};

const OC_ENV_COMMAND: &str = "cairn oc-env";

const PREFLIGHT_HINT: &str = "Preflight checks failed during `cairn start`, please try to run `cairn setup` first in case you haven't done so yet";

const OKD_NOTICE: &str = "\nNOTE:\n\
This cluster was built from OKD - The Community Distribution of Kubernetes that powers Red Hat OpenShift.\n\
If you find an issue, please report it at https://github.com/openshift/okd\n";

/// Host facts that influence the human report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderEnv {
    pub platform: Platform,
    /// `None` when detection failed; the default hint syntax is used.
    pub shell: Option<Shell>,
    pub variant: BuildVariant,
}

/// Write `result` to `out`, or its error to `err` in text mode.
pub fn render_start(
    result: &StartResult,
    format: OutputFormat,
    env: &RenderEnv,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => render_json(result, out),
        OutputFormat::Text => render_text(result, env, out, err),
    }
}

fn render_json(result: &StartResult, out: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, result).map_err(|source| Error::WriteOutput {
        source: source.into(),
    })?;
    writeln!(out).map_err(|source| Error::WriteOutput { source })
}

fn render_text(
    result: &StartResult,
    env: &RenderEnv,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    if let Some(error) = result.error() {
        // Setup hint first; the error line is always last.
        if error.is_preflight() {
            writeln!(err, "{PREFLIGHT_HINT}").map_err(|source| Error::WriteOutput { source })?;
        }
        writeln!(err, "Error: {}", error.message).map_err(|source| Error::WriteOutput { source })?;
        return Ok(());
    }

    let cluster = result.cluster_config().ok_or(Error::MissingStartOutcome)?;
    out.write_all(cluster_report(cluster, env).as_bytes())
        .map_err(|source| Error::WriteOutput { source })
}

fn cluster_report(cluster: &ClusterConfig, env: &RenderEnv) -> String {
    let prefix = command_line_prefix(env.platform, env.shell);
    let hint = usage_hint(env.shell, OC_ENV_COMMAND);

    let mut report = String::new();
    report.push_str("Started the OpenShift cluster.\n\n");
    report.push_str("The server is accessible via web console at:\n");
    report.push_str(&format!("  {}\n\n", cluster.web_console_url));
    report.push_str("Log in as administrator:\n");
    report.push_str(&credential_lines(
        &cluster.admin_credentials.username,
        &cluster.admin_credentials.password,
    ));
    report.push('\n');
    report.push_str("Log in as user:\n");
    report.push_str(&credential_lines(
        &cluster.developer_credentials.username,
        &cluster.developer_credentials.password,
    ));
    report.push('\n');
    report.push_str("Use the 'oc' command line interface:\n");
    report.push_str(&format!("  {prefix} {hint}\n"));
    report.push_str(&format!(
        "  {prefix} oc login -u {} {}\n",
        cluster.developer_credentials.username, cluster.url
    ));

    if env.variant.is_okd() {
        report.push_str(OKD_NOTICE);
    }
    report
}

fn credential_lines(username: &str, password: &str) -> String {
    format!("  Username: {username}\n  Password: {password}\n")
}
