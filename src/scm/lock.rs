//! Exclusive advisory lock on a checkout directory

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ScmError;

/// Held for the whole checkout/update/history/walk sequence of one branch.
/// Released when dropped.
#[derive(Debug)]
pub struct CheckoutLock {
    file: File,
    path: PathBuf,
}

impl CheckoutLock {
    /// Lock file path for `branch` inside `module_dir`; the branch name is
    /// encoded so `gnome/3-0` stays one path component.
    pub fn lock_path(module_dir: &Path, branch: &str) -> PathBuf {
        module_dir.join(format!(".{}.lock", urlencoding::encode(branch)))
    }

    /// Block (off the async runtime) until the lock is ours.
    pub async fn acquire(module_dir: &Path, branch: &str) -> Result<Self, ScmError> {
        tokio::fs::create_dir_all(module_dir).await?;
        let path = Self::lock_path(module_dir, branch);
        let file = OpenOptions::new().create(true).truncate(false).write(true).open(&path)?;

        let locked_path = path.clone();
        let file = tokio::task::spawn_blocking(move || file.lock_exclusive().map(|_| file))
            .await
            .map_err(|_| ScmError::Locked(locked_path))??;

        debug!(path = %path.display(), "checkout lock acquired");
        Ok(Self { file, path })
    }

    /// Take the lock only if nobody else holds it.
    pub fn try_acquire(module_dir: &Path, branch: &str) -> Result<Self, ScmError> {
        std::fs::create_dir_all(module_dir)?;
        let path = Self::lock_path(module_dir, branch);
        let file = OpenOptions::new().create(true).truncate(false).write(true).open(&path)?;
        file.try_lock_exclusive().map_err(|_| ScmError::Locked(path.clone()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CheckoutLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_second_lock_is_refused_until_release() {
        let dir = TempDir::new().unwrap();
        let lock = CheckoutLock::acquire(dir.path(), "master").await.unwrap();
        assert!(lock.path().ends_with(".master.lock"));
        assert!(matches!(CheckoutLock::try_acquire(dir.path(), "master"), Err(ScmError::Locked(_))));

        drop(lock);
        assert!(CheckoutLock::try_acquire(dir.path(), "master").is_ok());
    }

    #[tokio::test]
    async fn test_branch_with_slash_locks_in_module_dir() {
        let dir = TempDir::new().unwrap();
        let lock = CheckoutLock::acquire(dir.path(), "gnome/3-0").await.unwrap();
        assert_eq!(lock.path(), dir.path().join(".gnome%2F3-0.lock"));
        assert!(matches!(CheckoutLock::try_acquire(dir.path(), "gnome/3-0"), Err(ScmError::Locked(_))));
        assert!(CheckoutLock::try_acquire(dir.path(), "gnome-3-0").is_ok());
    }
}
