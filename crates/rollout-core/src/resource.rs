use std::fmt;

use crate::error::{Result, RolloutError};

/// Resource kinds a rollout ships with when the config file does not
/// override the set.
pub const DEFAULT_KINDS: &[&str] = &[
    "configmap",
    "deployment",
    "secret",
    "service",
    "pod",
    "replicationcontroller",
];

/// A category of cluster manifest, e.g. `configmap` or `deployment`.
///
/// The kind names both the template subdirectory (`templates/<kind>s/`) and
/// the rollout output subdirectory (`rollout/<ns>/<kind>s/`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKind(String);

impl ResourceKind {
    pub(crate) fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name holding this kind's files, `<kind>s`.
    pub fn plural(&self) -> String {
        format!("{}s", self.0)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The default kind set, in rollout order.
pub fn default_kinds() -> Vec<ResourceKind> {
    DEFAULT_KINDS.iter().map(|k| ResourceKind::new(k)).collect()
}

/// Parse a comma-separated kind list from the config file.
///
/// Kinds must be lowercase alphanumeric (hyphens allowed); an empty list or
/// an invalid entry is a config error, not silently dropped.
pub fn parse_kind_list(list: &str) -> Result<Vec<ResourceKind>> {
    let mut kinds = Vec::new();
    for raw in list.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if !is_valid_kind(raw) {
            return Err(RolloutError::BadResourceList {
                list: list.to_string(),
                reason: format!("invalid kind '{raw}'"),
            });
        }
        kinds.push(ResourceKind::new(raw));
    }
    if kinds.is_empty() {
        return Err(RolloutError::BadResourceList {
            list: list.to_string(),
            reason: "no kinds given".to_string(),
        });
    }
    Ok(kinds)
}

fn is_valid_kind(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
