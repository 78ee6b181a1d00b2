//! Variable files: flat JSON objects with stricter-than-default semantics.
//!
//! A key defined twice in one file is a fatal error, not last-write-wins —
//! silently dropping one of two secret values is exactly the kind of
//! surprise a rollout must not have.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, RolloutError};

/// Flat key → value mapping read from a variable file.
pub type VarMap = BTreeMap<String, Value>;

/// A variable map plus the first duplicate key encountered while parsing.
struct CheckedVars {
    map: VarMap,
    duplicate: Option<String>,
}

struct VarsVisitor;

impl<'de> Visitor<'de> for VarsVisitor {
    type Value = CheckedVars;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of variables")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<CheckedVars, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = VarMap::new();
        let mut duplicate = None;
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            if map.insert(key.clone(), value).is_some() && duplicate.is_none() {
                duplicate = Some(key);
            }
        }
        Ok(CheckedVars { map, duplicate })
    }
}

impl<'de> Deserialize<'de> for CheckedVars {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(VarsVisitor)
    }
}

/// Read a variable file, rejecting duplicate top-level keys.
pub fn read_vars(path: &Path) -> Result<VarMap> {
    debug!(file = %path.display(), "reading variables");
    let text = fs::read_to_string(path).map_err(|source| RolloutError::VarsRead {
        path: path.to_path_buf(),
        source,
    })?;
    let checked: CheckedVars =
        serde_json::from_str(&text).map_err(|source| RolloutError::VarsParse {
            path: path.to_path_buf(),
            source,
        })?;
    if let Some(key) = checked.duplicate {
        return Err(RolloutError::DuplicateKey {
            path: path.to_path_buf(),
            key,
        });
    }
    Ok(checked.map)
}
