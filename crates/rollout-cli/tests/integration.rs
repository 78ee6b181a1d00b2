#![cfg(unix)]
#![allow(deprecated)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixture: a manifest repository, a config file pointing at it, and a fake
// kubectl that records every apply call.
// ---------------------------------------------------------------------------

struct Fixture {
    dir: TempDir,
    repo: PathBuf,
    config_file: PathBuf,
    kubectl_log: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("repo");

        fs::create_dir_all(repo.join("secrets/demo")).unwrap();
        fs::write(
            repo.join("secrets/demo/secret_vars.json"),
            r#"{"db_password": "hunter2"}"#,
        )
        .unwrap();
        git(&repo, &["init"]);
        git(&repo, &["config", "user.email", "test@example.org"]);
        git(&repo, &["config", "user.name", "Test"]);

        let kubectl = dir.path().join("kubectl");
        let kubectl_log = dir.path().join("kubectl.log");
        write_fake_kubectl(&kubectl, "v1.30.0", 0);

        let config_file = dir.path().join("rollout.ini");
        fs::write(
            &config_file,
            format!(
                "[rollout]\nkubectlpath = {kubectl}\n\n\
                 [minikube]\nrepopath = {repo}\n\n\
                 [ghost-cluster]\nrepopath = {repo}\n",
                kubectl = kubectl.display(),
                repo = repo.display()
            ),
        )
        .unwrap();

        Self {
            dir,
            repo,
            config_file,
            kubectl_log,
        }
    }

    fn write_template(&self, kind: &str, content: &str) {
        let dir = self.repo.join(format!("templates/{kind}s"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("foo-{kind}.tpl.yaml")), content).unwrap();
    }

    fn deploy(&self) -> Command {
        self.deploy_with_context("minikube")
    }

    fn deploy_with_context(&self, context: &str) -> Command {
        let mut cmd = Command::cargo_bin("rollout").unwrap();
        cmd.args(["deploy", "-a", "foo", "-v", "1.2.3", "-n", "demo", "-C", context, "-c"])
            .arg(&self.config_file)
            .env("KUBECTL_LOG", &self.kubectl_log);
        cmd
    }

    fn applied(&self) -> Vec<String> {
        match fs::read_to_string(&self.kubectl_log) {
            Ok(log) => log.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn commit_count(&self) -> usize {
        let output = Process::new("git")
            .current_dir(&self.repo)
            .args(["rev-list", "--count", "HEAD"])
            .output()
            .unwrap();
        if !output.status.success() {
            return 0;
        }
        String::from_utf8_lossy(&output.stdout).trim().parse().unwrap()
    }

    fn last_commit_message(&self) -> String {
        git(&self.repo, &["log", "-1", "--format=%B"])
    }
}

fn git(dir: &Path, args: &[&str]) -> String {
    fs::create_dir_all(dir).unwrap();
    let output = Process::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// The fake kubectl understands exactly the three subcommands the adapter
/// issues: context listing, version query, and apply.
fn write_fake_kubectl(path: &Path, client_version: &str, apply_exit: i32) {
    let script = format!(
        r#"#!/bin/sh
case "$3" in
  config)
    printf 'minikube\nother-cluster\n'
    ;;
  version)
    if [ "$4" = "--client=true" ]; then
      printf '{{"clientVersion":{{"gitVersion":"{client_version}"}}}}'
    else
      printf '{{"clientVersion":{{"gitVersion":"{client_version}"}},"serverVersion":{{"gitVersion":"v1.29.0"}}}}'
    fi
    ;;
  apply)
    if [ {apply_exit} -ne 0 ]; then
      echo 'The connection to the server was refused' >&2
      exit {apply_exit}
    fi
    echo "apply $5" >> "$KUBECTL_LOG"
    ;;
  *)
    echo "unexpected subcommand: $*" >&2
    exit 64
    ;;
esac
"#
    );
    fs::write(path, script).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

// ---------------------------------------------------------------------------
// argument and config errors
// ---------------------------------------------------------------------------

#[test]
fn missing_required_args_fails() {
    Command::cargo_bin("rollout")
        .unwrap()
        .args(["deploy", "-a", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn unknown_context_section_fails() {
    let fixture = Fixture::new();
    fixture
        .deploy_with_context("prod")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing section"));
}

#[test]
fn duplicate_secret_key_fails() {
    let fixture = Fixture::new();
    fs::write(
        fixture.repo.join("secrets/demo/secret_vars.json"),
        r#"{"a": 1, "a": 2}"#,
    )
    .unwrap();
    fixture
        .deploy()
        .arg("-d")
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate"));
}

// ---------------------------------------------------------------------------
// dry-run modes
// ---------------------------------------------------------------------------

#[test]
fn full_dry_run_leaves_no_trace() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "password: {{ db_password }}\n");
    fixture.write_template("deployment", "version: {{ app_version }}\n");

    fixture
        .deploy()
        .arg("-d")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 file(s) would be written"));

    assert!(!fixture.repo.join("rollout").exists());
    assert_eq!(fixture.commit_count(), 0);
    assert!(fixture.applied().is_empty());
}

#[test]
fn templates_only_commits_but_never_applies() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "password: {{ db_password }}\n");

    fixture.deploy().arg("-D").assert().success();

    assert!(fixture
        .repo
        .join("rollout/demo/configmaps/foo-configmap.yaml")
        .exists());
    assert_eq!(fixture.commit_count(), 1);
    assert!(fixture.applied().is_empty());
}

#[test]
fn both_dry_run_flags_behave_as_full_dry_run() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "x: 1\n");

    fixture.deploy().args(["-d", "-D"]).assert().success();

    assert!(!fixture.repo.join("rollout").exists());
    assert_eq!(fixture.commit_count(), 0);
}

// ---------------------------------------------------------------------------
// live rollout
// ---------------------------------------------------------------------------

#[test]
fn live_deploy_renders_commits_and_applies() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "password: {{ db_password }}\n");
    fixture.write_template("deployment", "version: {{ app_version }}\nns: {{ namespace }}\n");

    fixture
        .deploy()
        .assert()
        .success()
        .stdout(predicate::str::contains("rolled out 2 file(s)"));

    let configmap = fixture.repo.join("rollout/demo/configmaps/foo-configmap.yaml");
    let deployment = fixture.repo.join("rollout/demo/deployments/foo-deployment.yaml");
    assert_eq!(
        fs::read_to_string(&configmap).unwrap(),
        "password: hunter2\n"
    );
    assert_eq!(
        fs::read_to_string(&deployment).unwrap(),
        "version: 1.2.3\nns: demo\n"
    );

    assert_eq!(fixture.commit_count(), 1);
    let message = fixture.last_commit_message();
    assert!(message.contains("demo"));
    assert!(message.contains("foo"));
    assert!(message.contains("1.2.3"));

    let applied = fixture.applied();
    assert_eq!(applied.len(), 2);
    assert!(applied[0].ends_with("foo-configmap.yaml"));
    assert!(applied[1].ends_with("foo-deployment.yaml"));
}

#[test]
fn rerun_with_identical_input_reports_nothing_changed() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "static: content\n");

    fixture.deploy().assert().success();
    fixture
        .deploy()
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing changed"));

    assert_eq!(fixture.commit_count(), 1);
}

#[test]
fn commit_message_carries_the_fragment() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "x: 1\n");

    fixture
        .deploy()
        .args(["-D", "-m", "requested by ops"])
        .assert()
        .success();

    assert!(fixture.last_commit_message().contains("requested by ops"));
}

// ---------------------------------------------------------------------------
// preconditions and preflight
// ---------------------------------------------------------------------------

#[test]
fn dirty_repo_aborts_before_writing() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "x: 1\n");
    git(&fixture.repo, &["add", "."]);
    git(&fixture.repo, &["commit", "-m", "seed"]);
    fs::write(fixture.repo.join("local-edit.yaml"), "uncommitted").unwrap();

    fixture
        .deploy()
        .arg("-D")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in a clean state"));

    assert!(!fixture.repo.join("rollout").exists());
    assert_eq!(fixture.commit_count(), 1);
}

#[test]
fn context_missing_from_kubectl_listing_aborts() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "x: 1\n");

    // the config file knows this context, the fake kubectl does not
    fixture
        .deploy_with_context("ghost-cluster")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost-cluster"));

    // preflight failed before any render or write
    assert!(!fixture.repo.join("rollout").exists());
    assert_eq!(fixture.commit_count(), 0);
}

#[test]
fn old_client_version_aborts() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "x: 1\n");
    write_fake_kubectl(&fixture.dir.path().join("kubectl"), "v1.0.0", 0);

    fixture
        .deploy()
        .assert()
        .failure()
        .stderr(predicate::str::contains("below the required minimum"));

    assert_eq!(fixture.commit_count(), 0);
}

#[test]
fn failed_apply_keeps_the_commit() {
    let fixture = Fixture::new();
    fixture.write_template("configmap", "x: 1\n");
    write_fake_kubectl(&fixture.dir.path().join("kubectl"), "v1.30.0", 1);

    fixture
        .deploy()
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "The connection to the server was refused",
        ));

    // the audit record survives the failed apply
    assert_eq!(fixture.commit_count(), 1);
}
