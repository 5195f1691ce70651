use crate::error::{Result, VectorStoreError};
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Exclusive advisory lock on a snapshot, released on drop
pub(crate) struct SnapshotLock {
    file: std::fs::File,
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `path` with `suffix` appended to its file name, so `index.ragx` becomes
/// `index.ragx.lock` and snapshots differing only in extension never share one
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

pub(crate) fn lock_path_for_snapshot(snapshot_path: &Path) -> PathBuf {
    sibling_path(snapshot_path, "lock")
}

pub(crate) async fn acquire_snapshot_lock(snapshot_path: &Path) -> Result<SnapshotLock> {
    let path = lock_path_for_snapshot(snapshot_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::task::spawn_blocking(move || -> Result<SnapshotLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                VectorStoreError::Lock(format!("open snapshot lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            VectorStoreError::Lock(format!("acquire snapshot lock {}: {err}", path.display()))
        })?;
        log::debug!(
            "Acquired snapshot lock {} after {}ms",
            path.display(),
            start.elapsed().as_millis()
        );

        Ok(SnapshotLock { file })
    })
    .await
    .map_err(|err| VectorStoreError::Lock(format!("join snapshot lock task: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_path_keeps_snapshot_extension() {
        let a = lock_path_for_snapshot(Path::new("data/index.a"));
        let b = lock_path_for_snapshot(Path::new("data/index.b"));
        assert_eq!(a, PathBuf::from("data/index.a.lock"));
        assert_ne!(a, b);
        assert_eq!(
            sibling_path(Path::new("advisor.ragx"), "tmp"),
            PathBuf::from("advisor.ragx.tmp")
        );
    }

    #[tokio::test]
    async fn lock_creates_parent_and_releases_on_drop() {
        let tmp = TempDir::new().unwrap();
        let snapshot = tmp.path().join("nested").join("advisor.ragx");

        let first = acquire_snapshot_lock(&snapshot).await.unwrap();
        assert!(tmp.path().join("nested").join("advisor.ragx.lock").exists());
        drop(first);
        let _second = acquire_snapshot_lock(&snapshot).await.unwrap();
    }
}
