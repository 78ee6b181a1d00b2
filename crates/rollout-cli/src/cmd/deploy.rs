use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use rollout_core::config::{Configuration, DeployRequest};
use rollout_core::rollout::Rollout;
use rollout_core::store::CommitOutcome;

#[derive(Args, Debug)]
pub struct DeployCmd {
    /// Name of the application to roll out
    #[arg(short = 'a', long = "app")]
    pub app: String,

    /// Version of the application to roll out
    #[arg(short = 'v', long = "version")]
    pub version: String,

    /// Namespace to roll out on
    #[arg(short = 'n', long = "namespace")]
    pub namespace: String,

    /// Kubernetes context to use
    #[arg(short = 'C', long = "context")]
    pub context: String,

    /// Path to the config file [default: ~/.rollout.ini]
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to a file holding extra variables
    #[arg(short = 'e', long = "extravars")]
    pub extravars: Option<PathBuf>,

    /// Path to a file holding secret variables
    /// [default: <repopath>/secrets/<namespace>/secret_vars.json]
    #[arg(short = 's', long = "secret")]
    pub secret: Option<PathBuf>,

    /// Optional text appended to the commit message
    #[arg(short = 'm', long = "message")]
    pub message: Option<String>,

    /// Dry run: just print, don't write, commit, or apply
    #[arg(short = 'd', long = "dryrun")]
    pub dryrun: bool,

    /// Dry run: render and commit but don't apply
    #[arg(short = 'D', long = "dryruntemp")]
    pub dryruntemp: bool,

    /// Be verbose; print debug messages
    #[arg(short = 'V', long = "verbose")]
    pub verbose: bool,
}

pub fn run(args: DeployCmd) -> anyhow::Result<()> {
    let request = DeployRequest {
        app: args.app,
        version: args.version,
        namespace: args.namespace,
        context: args.context,
        config_file: args.config,
        secret_vars_file: args.secret,
        extra_vars_file: args.extravars,
        commit_message: args.message,
        dryrun: args.dryrun,
        dryrun_templates: args.dryruntemp,
    };

    let config = Configuration::resolve(request).context("resolving configuration")?;
    let record = Rollout::new(config).deploy()?;

    match &record.commit {
        CommitOutcome::Committed(id) => {
            println!("rolled out {} file(s), commit {}", record.files.len(), id);
        }
        CommitOutcome::Unchanged => println!("nothing changed"),
        CommitOutcome::Skipped => {
            println!("dry run: {} file(s) would be written", record.files.len());
        }
    }
    Ok(())
}
