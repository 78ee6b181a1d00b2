use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("cannot read config file {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("missing section [{section}] in config file {path}")]
    MissingSection { path: PathBuf, section: String },

    #[error("missing option '{option}' in section [{section}] of {path}")]
    MissingOption {
        path: PathBuf,
        section: String,
        option: String,
    },

    #[error("cannot resolve {what} path {path}")]
    BadPath {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resource kind list '{list}': {reason}")]
    BadResourceList { list: String, reason: String },

    #[error("cannot read variables from {path}")]
    VarsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid variable file {path}")]
    VarsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate definition of \"{key}\" in {path}")]
    DuplicateKey { path: PathBuf, key: String },

    #[error("cannot render template for {kind}")]
    Template {
        kind: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("cannot create rollout directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("repository {path} is not in a clean state")]
    RepoNotClean { path: PathBuf },

    #[error("git {args} failed:\n{output}")]
    GitCommand { args: String, output: String },

    #[error("requested context '{context}' is not available to kubectl")]
    ClusterContext { context: String },

    #[error("kubectl client version {client} is below the required minimum {minimum}")]
    ClusterVersion { client: String, minimum: String },

    #[error("cannot parse version string '{0}'")]
    BadVersion(String),

    #[error("'{command}' failed:\n{output}")]
    ClusterCall { command: String, output: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RolloutError>;
