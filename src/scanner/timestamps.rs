//! Per-(file, routine) processing stamps
//!
//! A routine records the mtime of a file it consumed; the next scan skips
//! the file when its mtime is not newer. Stamps are staged and committed
//! with the facts derived from the file.

use anyhow::Result;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::repository::{Database, UnitOfWork};

/// Identity of an extraction routine: `<source-file>#<name>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Routine {
    file: &'static str,
    name: &'static str,
}

impl Routine {
    pub const fn new(file: &'static str, name: &'static str) -> Self {
        Self { file, name }
    }

    pub fn key(&self) -> String {
        let file = self.file.rsplit(['/', '\\']).next().unwrap_or(self.file);
        format!("{}#{}", file, self.name)
    }
}

/// Routine identity for the calling source file
#[macro_export]
macro_rules! routine {
    ($name:literal) => {
        $crate::scanner::Routine::new(file!(), $name)
    };
}

/// A file's mtime checked against its stored stamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    /// Path relative to the scm root
    pub path: String,
    pub routine: String,
    pub mtime: i64,
    /// The stamp is current and skipping is enabled
    pub unchanged: bool,
}

#[derive(Debug, Default)]
pub struct TimestampCache {
    enabled: bool,
    pending: FxHashMap<(String, String), i64>,
}

impl TimestampCache {
    /// `enabled = false` disables the skip check; stamps are still written
    pub fn new(enabled: bool) -> Self {
        Self { enabled, pending: FxHashMap::default() }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Stored stamp, -1 when none
    pub async fn get(&self, db: &Database, path: &str, routine: &str) -> Result<i64> {
        if let Some(stamp) = self.pending.get(&(path.to_string(), routine.to_string())) {
            return Ok(*stamp);
        }
        Ok(db.get_timestamp(path, routine).await?.unwrap_or(-1))
    }

    pub fn set(&mut self, path: &str, routine: &str, mtime: i64) {
        self.pending.insert((path.to_string(), routine.to_string()), mtime);
    }

    /// Compare `file` against its stamp. `path` is the scm-root relative key.
    pub async fn check(&self, db: &Database, file: &Path, path: String, routine: Routine) -> Result<FileStamp> {
        let routine = routine.key();
        let mtime = mtime_secs(file).await?;
        let stamp = self.get(db, &path, &routine).await?;
        Ok(FileStamp { unchanged: self.enabled && mtime <= stamp, path, routine, mtime })
    }

    pub fn record(&mut self, stamp: &FileStamp) {
        self.set(&stamp.path, &stamp.routine, stamp.mtime);
    }

    /// Move staged stamps into the unit of work
    pub fn drain_into(&mut self, unit: &mut UnitOfWork) {
        for ((path, routine), stamp) in self.pending.drain() {
            unit.stamp(path, routine, stamp);
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Modification time in whole seconds
pub async fn mtime_secs(path: &Path) -> std::io::Result<i64> {
    let modified = tokio::fs::metadata(path).await?.modified()?;
    Ok(modified.duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_key() {
        let routine = Routine::new("src/scanner/plugins/intltool.rs", "linguas");
        assert_eq!(routine.key(), "intltool.rs#linguas");
        assert_eq!(crate::routine!("here").key(), "timestamps.rs#here");
    }

    #[tokio::test]
    async fn test_pending_stamp_wins_over_store() {
        let db = Database::new(":memory:").await.unwrap();
        db.init_schema().await.unwrap();
        let mut cache = TimestampCache::new(true);
        assert_eq!(cache.get(&db, "a/po/LINGUAS", "intltool.rs#linguas").await.unwrap(), -1);
        cache.set("a/po/LINGUAS", "intltool.rs#linguas", 42);
        assert_eq!(cache.get(&db, "a/po/LINGUAS", "intltool.rs#linguas").await.unwrap(), 42);

        let mut unit = UnitOfWork::new();
        cache.drain_into(&mut unit);
        assert_eq!(cache.pending(), 0);
        assert_eq!(unit.staged_stamp("a/po/LINGUAS", "intltool.rs#linguas"), Some(42));
    }
}
