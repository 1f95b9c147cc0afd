// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use async_trait::async_trait;
use scmsweep::config::Config;
use scmsweep::error::ScmError;
use scmsweep::model::{AuthorIdentity, BranchRecord, Commit, CommitFile};
use scmsweep::repository::Database;
use scmsweep::scm::{CommitStream, HistorySource, RepositoryRecord, ScmKind};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use time::OffsetDateTime;

/// Create an in-memory test database
pub async fn create_test_db() -> Database {
    Database::new(":memory:").await.unwrap()
}

/// In-memory database with the schema in place
pub async fn setup_db() -> Database {
    let db = create_test_db().await;
    db.init_schema().await.unwrap();
    db
}

/// Temporary scm and web roots with a config pointing at them
pub struct Workspace {
    pub dir: TempDir,
    pub config: Config,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            scm_root: dir.path().join("scm"),
            web_files_root: dir.path().join("web"),
            database: dir.path().join("scmsweep.db"),
            tool_timeout_secs: 30,
        };
        Self { dir, config }
    }

    /// Checkout directory of a module branch
    pub fn checkout_dir(&self, branch: &BranchRecord) -> PathBuf {
        let server = branch.repo.server_name().unwrap();
        self.config.scm_root.join(server).join(&branch.repo.module).join(&branch.repo.branch)
    }

    /// Create the checkout of `branch` with the given files
    pub fn checkout(&self, branch: &BranchRecord, files: &[(&str, &str)]) -> PathBuf {
        let root = self.checkout_dir(branch);
        std::fs::create_dir_all(&root).unwrap();
        for (path, contents) in files {
            write_file(&root, path, contents.as_bytes());
        }
        root
    }
}

pub fn write_file(root: &Path, path: &str, contents: &[u8]) {
    let full_path = root.join(path);
    if let Some(parent) = full_path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&full_path, contents).unwrap();
}

/// Push a file's mtime forward so the next scan sees it as changed
pub fn touch_later(path: &Path) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
    file.set_modified(later).unwrap();
}

pub fn git_module(module: &str) -> BranchRecord {
    let repo = RepositoryRecord::new(ScmKind::Git, "git://git.gnome.org/", module, None, None);
    BranchRecord::module(repo).unwrap()
}

pub fn svn_module(module: &str) -> BranchRecord {
    let repo = RepositoryRecord::new(ScmKind::Svn, "http://svn.gnome.org/svn/", module, None, None);
    BranchRecord::module(repo).unwrap()
}

pub fn commit(id: &str, author: AuthorIdentity, unix: i64, files: &[&str]) -> Commit {
    Commit {
        id: id.to_string(),
        author,
        datetime: OffsetDateTime::from_unix_timestamp(unix).unwrap(),
        comment: format!("commit {id}"),
        files: files.iter().map(|f| CommitFile::new(*f, id, None)).collect(),
    }
}

/// History source replaying a fixed list of commits
pub struct FakeSource {
    pub server_id: String,
    pub commits: Vec<Commit>,
    /// Commit that comes out of the stream as this error instead
    pub fault: Option<(String, fn(&str) -> ScmError)>,
}

impl FakeSource {
    pub fn new(server_id: &str, commits: Vec<Commit>) -> Self {
        Self { server_id: server_id.to_string(), commits, fault: None }
    }

    pub fn failing_at(mut self, id: &str, error: fn(&str) -> ScmError) -> Self {
        self.fault = Some((id.to_string(), error));
        self
    }
}

#[async_trait]
impl HistorySource for FakeSource {
    fn server_id(&self) -> String {
        self.server_id.clone()
    }

    async fn current_revision(&self) -> Option<(String, OffsetDateTime)> {
        self.commits.last().map(|c| (c.id.clone(), c.datetime))
    }

    async fn history(&self, since: Option<&str>) -> Result<CommitStream, ScmError> {
        let start = match since {
            Some(since) => self.commits.iter().position(|c| c.id == since).map_or(0, |i| i + 1),
            None => 0,
        };
        let items = self.commits[start..]
            .iter()
            .map(|c| match &self.fault {
                Some((id, error)) if *id == c.id => Err(error(id)),
                _ => Ok(c.clone()),
            })
            .collect();
        Ok(CommitStream::from_results(items))
    }
}
