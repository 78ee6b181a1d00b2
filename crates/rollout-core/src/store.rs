//! Writing a rendered rollout into the manifest repository.
//!
//! The store is the single place that interprets the run mode for write and
//! commit semantics; callers only pass the mode down.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::{Result, RolloutError};
use crate::git::GitRepository;
use crate::io;
use crate::paths;
use crate::resource::ResourceKind;

/// How the persist stage concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// One commit covering exactly the rollout files.
    Committed(String),
    /// The rendered output was byte-identical to what is already committed;
    /// no empty commit was created.
    Unchanged,
    /// Dry run: nothing was written or committed.
    Skipped,
}

/// The files of one rollout and the commit that captured them.
#[derive(Debug, Clone)]
pub struct RolloutRecord {
    /// Output file per kind, in stable kind order.
    pub files: Vec<(ResourceKind, PathBuf)>,
    pub commit: CommitOutcome,
}

pub struct RolloutStore<'a> {
    config: &'a Configuration,
    repo: GitRepository,
}

impl<'a> RolloutStore<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            repo: GitRepository::open(&config.repo_path),
        }
    }

    /// Write the rendered manifests, stage them, and commit them as one
    /// unit.
    ///
    /// Precondition in every mode: the working tree must be clean, so that
    /// the commit corresponds 1:1 to exactly the files written here with no
    /// unrelated local edits riding along.
    pub fn write(&self, rendered: &BTreeMap<ResourceKind, String>) -> Result<RolloutRecord> {
        if !self.repo.is_clean()? {
            return Err(RolloutError::RepoNotClean {
                path: self.config.repo_path.clone(),
            });
        }

        let files: Vec<(ResourceKind, PathBuf)> = rendered
            .keys()
            .map(|kind| {
                (
                    kind.clone(),
                    paths::manifest_file(&self.config.rollout_path, &self.config.app, kind),
                )
            })
            .collect();

        if !self.config.mode.writes_repository() {
            info!(
                "dry run: skipping write of {} file(s) for {}",
                files.len(),
                self.config.app
            );
            return Ok(RolloutRecord {
                files,
                commit: CommitOutcome::Skipped,
            });
        }

        for (kind, path) in &files {
            let outdir = paths::kind_dir(&self.config.rollout_path, kind);
            io::ensure_dir(&outdir)?;
            io::durable_write(path, rendered[kind].as_bytes())?;
            self.repo.add_files(&[path])?;
            debug!(file = %path.display(), "staged rendered manifest");
        }

        // Byte-identical output leaves the tree clean after staging; an
        // empty commit would only pollute the audit history.
        if self.repo.is_clean()? {
            warn!("definition of rollout already exists, nothing changed");
            return Ok(RolloutRecord {
                files,
                commit: CommitOutcome::Unchanged,
            });
        }

        let message = self.commit_message();
        let file_refs: Vec<&Path> = files.iter().map(|(_, p)| p.as_path()).collect();
        self.repo.commit_files(&file_refs, &message)?;
        let id = self.repo.head_commit()?;
        match self.repo.show(&self.config.rollout_path) {
            Ok(stat) => debug!("committed changes:\n{stat}"),
            Err(e) => debug!(error = %e, "cannot show committed changes"),
        }
        info!(commit = %id, "committed rollout");
        Ok(RolloutRecord {
            files,
            commit: CommitOutcome::Committed(id),
        })
    }

    fn commit_message(&self) -> String {
        let mut message = format!(
            "[{}] Created rollout for {} with version {}",
            self.config.namespace, self.config.app, self.config.version
        );
        if !self.config.commit_message.is_empty() {
            message.push_str("\n\n");
            message.push_str(&self.config.commit_message);
        }
        message
    }
}
