//! Thin wrapper around the `git` binary.
//!
//! The rollout repository is mutated exclusively through the porcelain
//! commands an operator would type, so every commit this tool makes can be
//! reproduced, inspected, and reverted by hand.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{Result, RolloutError};

pub struct GitRepository {
    repo_path: PathBuf,
}

impl GitRepository {
    pub fn open(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// A tree is clean when `git status --porcelain` reports nothing: no
    /// staged or unstaged changes and no untracked files.
    pub fn is_clean(&self) -> Result<bool> {
        let status = self.run(&["status", "--porcelain"], &[])?;
        Ok(status.trim().is_empty())
    }

    /// Stage the given files.
    pub fn add_files(&self, files: &[&Path]) -> Result<()> {
        self.run(&["add"], files).map(drop)
    }

    /// Commit exactly the given files with `message`.
    pub fn commit_files(&self, files: &[&Path], message: &str) -> Result<()> {
        self.run(&["commit", "-m", message], files).map(drop)
    }

    /// The commit id of HEAD.
    pub fn head_commit(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "HEAD"], &[])?.trim().to_string())
    }

    /// `git show --stat` of HEAD restricted to `path`.
    pub fn show(&self, path: &Path) -> Result<String> {
        self.run(&["show", "--stat", "HEAD"], &[path])
    }

    fn run(&self, args: &[&str], paths: &[&Path]) -> Result<String> {
        debug!(?args, repo = %self.repo_path.display(), "running git");
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path).args(args);
        if !paths.is_empty() {
            cmd.arg("--");
            for path in paths {
                cmd.arg(path);
            }
        }
        let output = cmd.output().map_err(|e| RolloutError::GitCommand {
            args: args.join(" "),
            output: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(RolloutError::GitCommand {
                args: args.join(" "),
                output: combined_output(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
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
