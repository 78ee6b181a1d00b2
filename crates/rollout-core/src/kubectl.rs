//! kubectl adapter: verifies cluster identity and tool compatibility before
//! anything mutating runs, then applies one resource file per call.
//!
//! Every call shells out as
//! `<kubectl> --context=<ctx> --namespace=<ns> <subcommand>`; failures carry
//! the tool's combined output and are never retried.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::{Result, RolloutError};

/// Minimal shape of `kubectl version --output=json`.
#[derive(Debug, Deserialize)]
struct VersionReport {
    #[serde(rename = "clientVersion")]
    client_version: Option<VersionInfo>,
    #[serde(rename = "serverVersion")]
    server_version: Option<VersionInfo>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "gitVersion")]
    git_version: String,
}

// ---------------------------------------------------------------------------
// KubectlVersion
// ---------------------------------------------------------------------------

/// A `major.minor.patch` triple parsed from a `v1.9.3`-style string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KubectlVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FromStr for KubectlVersion {
    type Err = RolloutError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let clean = trimmed.strip_prefix('v').unwrap_or(trimmed);
        // Drop pre-release/build suffixes like 1.9.0-beta.1 or 1.28.2+k3s1.
        let clean = match clean.find(['-', '+']) {
            Some(end) => &clean[..end],
            None => clean,
        };
        let bad = || RolloutError::BadVersion(s.to_string());
        let mut parts = clean.split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let patch = match parts.next() {
            Some(p) => p.parse().map_err(|_| bad())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(KubectlVersion {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for KubectlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ---------------------------------------------------------------------------
// KubeCtl
// ---------------------------------------------------------------------------

pub struct KubeCtl {
    kubectl_path: PathBuf,
    context: String,
    namespace: String,
    dryrun: bool,
}

impl KubeCtl {
    /// Build the adapter, running the context and version preflight unless
    /// the run mode suppresses cluster calls entirely.
    pub fn connect(config: &Configuration) -> Result<Self> {
        let kubectl = Self {
            kubectl_path: config.kubectl_path.clone(),
            context: config.context.clone(),
            namespace: config.namespace.clone(),
            dryrun: !config.mode.applies_to_cluster(),
        };
        if kubectl.dryrun {
            debug!("dry run: skipping kubectl preflight checks");
        } else {
            kubectl.verify_context_available()?;
            kubectl.verify_version(config.min_kubectl_version)?;
        }
        Ok(kubectl)
    }

    /// Apply one rendered resource file. In dry-run modes the command is
    /// logged and the subprocess is not invoked.
    pub fn apply(&self, file: &Path) -> Result<()> {
        self.run(&["apply", "-f"], Some(file)).map(drop)
    }

    /// The requested context must match one line of the tool's context
    /// listing exactly.
    fn verify_context_available(&self) -> Result<()> {
        let listing = self.run(&["config", "get-contexts", "-o", "name"], None)?;
        debug!(
            "kubectl knows the following contexts: {}",
            listing.trim().replace('\n', ", ")
        );
        if !context_in_listing(&listing, &self.context) {
            return Err(RolloutError::ClusterContext {
                context: self.context.clone(),
            });
        }
        Ok(())
    }

    /// Client below the configured minimum is fatal; a client older than the
    /// server, or an unreadable server version, is only worth a warning.
    fn verify_version(&self, minimum: KubectlVersion) -> Result<()> {
        let output = self.run(&["version", "--client=true", "--output=json"], None)?;
        let report: VersionReport = serde_json::from_str(&output)?;
        let client_raw = report
            .client_version
            .ok_or_else(|| RolloutError::BadVersion("kubectl reported no client version".into()))?
            .git_version;
        let client: KubectlVersion = client_raw.parse()?;
        if client < minimum {
            return Err(RolloutError::ClusterVersion {
                client: client_raw,
                minimum: minimum.to_string(),
            });
        }
        info!(client = %client, "kubectl client version accepted");

        match self.run(&["version", "--output=json"], None) {
            Ok(full) => match serde_json::from_str::<VersionReport>(&full) {
                Ok(report) => match report.server_version {
                    Some(server) => match server.git_version.parse::<KubectlVersion>() {
                        Ok(server_version) if client < server_version => warn!(
                            client = %client,
                            server = %server_version,
                            "kubectl client is older than the server"
                        ),
                        Ok(_) => {}
                        Err(_) => warn!(
                            version = %server.git_version,
                            "cannot parse server version, skipping skew check"
                        ),
                    },
                    None => warn!("kubectl reported no server version, skipping skew check"),
                },
                Err(e) => warn!(error = %e, "cannot parse kubectl version output, skipping skew check"),
            },
            Err(e) => warn!(error = %e, "cannot query server version, skipping skew check"),
        }
        Ok(())
    }

    fn run(&self, subcommand: &[&str], file: Option<&Path>) -> Result<String> {
        let command_display = self.render_command(subcommand, file);
        if self.dryrun {
            debug!(command = %command_display, "dry run: skipping kubectl call");
            return Ok(String::new());
        }
        debug!(command = %command_display, "running kubectl");

        let mut cmd = Command::new(&self.kubectl_path);
        cmd.arg(format!("--context={}", self.context))
            .arg(format!("--namespace={}", self.namespace))
            .args(subcommand);
        if let Some(file) = file {
            cmd.arg(file);
        }
        let output = cmd.output().map_err(|e| RolloutError::ClusterCall {
            command: command_display.clone(),
            output: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(RolloutError::ClusterCall {
                command: command_display,
                output: combined_output(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn render_command(&self, subcommand: &[&str], file: Option<&Path>) -> String {
        let mut display = format!(
            "{} --context={} --namespace={} {}",
            self.kubectl_path.display(),
            self.context,
            self.namespace,
            subcommand.join(" ")
        );
        if let Some(file) = file {
            display.push(' ');
            display.push_str(&file.display().to_string());
        }
        display
    }
}

fn context_in_listing(listing: &str, wanted: &str) -> bool {
    listing.lines().any(|line| line == wanted)
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim_end();
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    text
}
