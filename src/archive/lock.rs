//! Advisory file locks on `<file>.lock` sidecars.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Held lock; released when dropped.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until an exclusive lock on `target`'s sidecar is held.
    pub fn exclusive(target: &Path) -> std::io::Result<Self> {
        let (file, path) = open_sidecar(target)?;
        file.lock_exclusive()?;
        tracing::trace!("locked {} exclusively", path.display());
        Ok(Self { file, path })
    }

    /// Block until a shared lock on `target`'s sidecar is held.
    pub fn shared(target: &Path) -> std::io::Result<Self> {
        let (file, path) = open_sidecar(target)?;
        FileExt::lock_shared(&file)?;
        tracing::trace!("locked {} shared", path.display());
        Ok(Self { file, path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

/// Sidecar lock path for a file: `metadata.txt` -> `metadata.txt.lock`.
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

fn open_sidecar(target: &Path) -> std::io::Result<(File, PathBuf)> {
    let path = lock_path(target);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Failed to open lock file '{}': {}", path.display(), e),
            )
        })?;
    Ok((file, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_path() {
        assert_eq!(
            lock_path(Path::new("/data/filecount.txt")),
            PathBuf::from("/data/filecount.txt.lock")
        );
    }

    #[test]
    fn test_exclusive_lock_blocks_second_try() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("filecount.txt");

        let held = FileLock::exclusive(&target).unwrap();
        let other = File::open(lock_path(&target)).unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_err());

        drop(held);
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
        FileExt::unlock(&other).unwrap();
    }
}
