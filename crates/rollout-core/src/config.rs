//! Invocation configuration: command line + per-user config file + the
//! namespace's variable files, resolved once into an immutable value.

use std::fs;
use std::path::PathBuf;

use ini::Ini;
use tracing::{debug, info, warn};

use crate::error::{Result, RolloutError};
use crate::kubectl::KubectlVersion;
use crate::paths;
use crate::resource::{self, ResourceKind};
use crate::vars::{self, VarMap};

pub const CONFIG_FILE_NAME: &str = ".rollout.ini";

/// Section of `~/.rollout.ini` holding tool-wide options; all other
/// sections are named after cluster contexts.
pub const GLOBAL_SECTION: &str = "rollout";

const REPOPATH_OPTION: &str = "repopath";
const KUBECTLPATH_OPTION: &str = "kubectlpath";
const MIN_VERSION_OPTION: &str = "minkubectlversion";
const RESOURCES_OPTION: &str = "resources";

pub const DEFAULT_KUBECTL_BIN: &str = "kubectl";

/// Oldest kubectl client whose `version --output=json` shape the adapter
/// understands.
pub const DEFAULT_MIN_KUBECTL_VERSION: &str = "1.9.0";

// ---------------------------------------------------------------------------
// RunMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Write, commit, and apply.
    Live,
    /// Render only: no filesystem write, no commit, no cluster call.
    DryRun,
    /// Write and commit, but skip the cluster apply.
    DryRunTemplatesOnly,
}

impl RunMode {
    /// Both flags at once resolve to a full dry run; documented precedence,
    /// not an error.
    pub fn from_flags(dryrun: bool, dryrun_templates: bool) -> Self {
        if dryrun && dryrun_templates {
            warn!("both --dryrun and --dryruntemp given, treating as a full dry run");
        }
        if dryrun {
            RunMode::DryRun
        } else if dryrun_templates {
            RunMode::DryRunTemplatesOnly
        } else {
            RunMode::Live
        }
    }

    pub fn writes_repository(self) -> bool {
        !matches!(self, RunMode::DryRun)
    }

    pub fn applies_to_cluster(self) -> bool {
        matches!(self, RunMode::Live)
    }
}

// ---------------------------------------------------------------------------
// DeployRequest / Configuration
// ---------------------------------------------------------------------------

/// What `rollout deploy` was asked to do, straight from the command line.
/// Paths in here are unresolved; [`Configuration::resolve`] owns that.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub app: String,
    pub version: String,
    pub namespace: String,
    pub context: String,
    pub config_file: Option<PathBuf>,
    pub secret_vars_file: Option<PathBuf>,
    pub extra_vars_file: Option<PathBuf>,
    pub commit_message: Option<String>,
    pub dryrun: bool,
    pub dryrun_templates: bool,
}

/// Everything the pipeline needs, resolved and validated. Built once per
/// invocation and never mutated; components borrow it read-only.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub app: String,
    pub version: String,
    pub namespace: String,
    pub context: String,
    pub mode: RunMode,
    /// Free-text fragment appended to the commit message; may be empty.
    pub commit_message: String,
    pub repo_path: PathBuf,
    pub templates_path: PathBuf,
    pub rollout_path: PathBuf,
    pub kubectl_path: PathBuf,
    pub min_kubectl_version: KubectlVersion,
    pub resources: Vec<ResourceKind>,
    pub secret_vars: VarMap,
    pub extra_vars: VarMap,
}

impl Configuration {
    pub fn resolve(request: DeployRequest) -> Result<Self> {
        let mode = RunMode::from_flags(request.dryrun, request.dryrun_templates);

        let config_file = match request.config_file {
            Some(path) => path,
            None => home::home_dir()
                .ok_or(RolloutError::HomeNotFound)?
                .join(CONFIG_FILE_NAME),
        };
        debug!(config = %config_file.display(), "reading config file");
        let file = Ini::load_from_file(&config_file).map_err(|source| {
            RolloutError::ConfigRead {
                path: config_file.clone(),
                source,
            }
        })?;

        let section = file.section(Some(request.context.as_str())).ok_or_else(|| {
            RolloutError::MissingSection {
                path: config_file.clone(),
                section: request.context.clone(),
            }
        })?;
        let repopath = section.get(REPOPATH_OPTION).ok_or_else(|| {
            RolloutError::MissingOption {
                path: config_file.clone(),
                section: request.context.clone(),
                option: REPOPATH_OPTION.to_string(),
            }
        })?;
        // Canonicalize once; downstream components never recheck paths.
        let repo_path = fs::canonicalize(repopath).map_err(|source| RolloutError::BadPath {
            what: "repository",
            path: PathBuf::from(repopath),
            source,
        })?;

        let kubectl_path = match file.get_from(Some(GLOBAL_SECTION), KUBECTLPATH_OPTION) {
            Some(path) => fs::canonicalize(path).map_err(|source| RolloutError::BadPath {
                what: "kubectl",
                path: PathBuf::from(path),
                source,
            })?,
            None => {
                warn!("no kubectl path configured, trying to use '{DEFAULT_KUBECTL_BIN}' from PATH");
                match which::which(DEFAULT_KUBECTL_BIN) {
                    Ok(path) => path,
                    Err(_) => PathBuf::from(DEFAULT_KUBECTL_BIN),
                }
            }
        };

        let min_kubectl_version: KubectlVersion = file
            .get_from(Some(GLOBAL_SECTION), MIN_VERSION_OPTION)
            .unwrap_or(DEFAULT_MIN_KUBECTL_VERSION)
            .parse()?;

        let resources = match file.get_from(Some(GLOBAL_SECTION), RESOURCES_OPTION) {
            Some(list) => resource::parse_kind_list(list)?,
            None => resource::default_kinds(),
        };

        let templates_path = paths::templates_path(&repo_path);
        let rollout_path = paths::rollout_path(&repo_path, &request.namespace);

        let secret_vars_file = request
            .secret_vars_file
            .unwrap_or_else(|| paths::default_secret_vars(&repo_path, &request.namespace));
        let secret_vars = vars::read_vars(&secret_vars_file)?;

        let extra_vars = match request.extra_vars_file {
            Some(path) => vars::read_vars(&path)?,
            None => {
                let default = paths::default_extra_vars(&repo_path, &request.namespace);
                if default.exists() {
                    info!(file = %default.display(), "found default extra vars file");
                    vars::read_vars(&default)?
                } else {
                    debug!("no extra vars file, continuing without extra variables");
                    VarMap::new()
                }
            }
        };

        Ok(Configuration {
            app: request.app,
            version: request.version,
            namespace: request.namespace,
            context: request.context,
            mode,
            commit_message: request.commit_message.unwrap_or_default(),
            repo_path,
            templates_path,
            rollout_path,
            kubectl_path,
            min_kubectl_version,
            resources,
            secret_vars,
            extra_vars,
        })
    }
}
