use std::path::{Path, PathBuf};

use crate::resource::ResourceKind;

// ---------------------------------------------------------------------------
// Repository layout
// ---------------------------------------------------------------------------

pub const TEMPLATES_DIR: &str = "templates";
pub const ROLLOUT_DIR: &str = "rollout";
pub const SECRETS_DIR: &str = "secrets";
pub const MANIFESTS_DIR: &str = "manifests";

pub const SECRET_VARS_FILE: &str = "secret_vars.json";
pub const EXTRA_VARS_FILE: &str = "extra_vars.json";

/// Suffix of template files, `<app>-<kind>.tpl.yaml`.
pub const TEMPLATE_SUFFIX: &str = "tpl.yaml";
/// Suffix of rendered manifests, `<app>-<kind>.yaml`.
pub const MANIFEST_SUFFIX: &str = "yaml";

// ---------------------------------------------------------------------------
// Path helpers — everything is derived from the repository root and the
// target namespace, never configured separately.
// ---------------------------------------------------------------------------

pub fn templates_path(repo: &Path) -> PathBuf {
    repo.join(TEMPLATES_DIR)
}

pub fn rollout_path(repo: &Path, namespace: &str) -> PathBuf {
    repo.join(ROLLOUT_DIR).join(namespace)
}

pub fn default_secret_vars(repo: &Path, namespace: &str) -> PathBuf {
    repo.join(SECRETS_DIR).join(namespace).join(SECRET_VARS_FILE)
}

pub fn default_extra_vars(repo: &Path, namespace: &str) -> PathBuf {
    repo.join(MANIFESTS_DIR).join(namespace).join(EXTRA_VARS_FILE)
}

/// Per-kind subdirectory under a templates or rollout base directory.
pub fn kind_dir(base: &Path, kind: &ResourceKind) -> PathBuf {
    base.join(kind.plural())
}

pub fn template_file(templates: &Path, app: &str, kind: &ResourceKind) -> PathBuf {
    kind_dir(templates, kind).join(format!("{app}-{kind}.{TEMPLATE_SUFFIX}"))
}

pub fn manifest_file(rollout: &Path, app: &str, kind: &ResourceKind) -> PathBuf {
    kind_dir(rollout, kind).join(format!("{app}-{kind}.{MANIFEST_SUFFIX}"))
}
