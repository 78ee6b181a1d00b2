use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{Result, RolloutError};

/// Write `data` to `path`, flushing and syncing before returning.
///
/// The rendered file is staged for commit right after this call; the sync
/// guarantees git never picks up a zero-byte file when the process dies
/// between open and write.
pub fn durable_write(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

/// Create `dir` and all parents, tolerating another process creating it
/// concurrently. Fails only if the directory still does not exist afterward.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if let Err(source) = fs::create_dir_all(dir) {
        if !dir.is_dir() {
            return Err(RolloutError::CreateDir {
                path: dir.to_path_buf(),
                source,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn durable_write_creates_file_with_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo-configmap.yaml");
        durable_write(&path, b"kind: ConfigMap").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "kind: ConfigMap");
    }

    #[test]
    fn durable_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.yaml");
        durable_write(&path, b"old").unwrap();
        durable_write(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn ensure_dir_creates_parents() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("rollout/demo/configmaps");
        ensure_dir(&deep).unwrap();
        assert!(deep.is_dir());
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configmaps");
        ensure_dir(&path).unwrap();
        ensure_dir(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn ensure_dir_fails_when_blocked_by_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocked");
        fs::write(&path, b"not a directory").unwrap();
        assert!(ensure_dir(&path).is_err());
    }
}
