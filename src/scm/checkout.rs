//! Working copies of repository branches

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::ScmError;

use super::date::local_offset;
use super::record::{RepositoryRecord, ScmKind, server_id};
use super::source::{CommitStream, HistorySource};
use super::tool::ToolRunner;
use super::{cvs, git, svn};

/// A working copy bound to one repository record
#[derive(Debug)]
pub struct Checkout {
    repo: RepositoryRecord,
    server_name: String,
    scm_root: PathBuf,
    runner: ToolRunner,
    error: Option<String>,
}

impl Checkout {
    /// Validate `repo` and bind it to a directory under `scm_root`.
    ///
    /// Nothing touches the disk until [`Checkout::ensure`].
    pub fn new(repo: RepositoryRecord, scm_root: &Path, runner: ToolRunner) -> Result<Self, ScmError> {
        repo.validate()?;
        let server_name = repo.server_name()?;
        Ok(Self {
            repo,
            server_name,
            scm_root: scm_root.to_path_buf(),
            runner,
            error: None,
        })
    }

    pub fn repo(&self) -> &RepositoryRecord {
        &self.repo
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    /// Last checkout or update failure
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Parent of the checkout directory, shared by all branches of the module
    pub fn module_dir(&self) -> PathBuf {
        self.scm_root.join(&self.server_name).join(&self.repo.module)
    }

    /// `scm_root/server_name/module/branch`
    pub fn directory(&self) -> PathBuf {
        self.module_dir().join(&self.repo.branch)
    }

    pub fn ignore_dir(&self) -> &'static str {
        self.repo.kind.ignore_dir()
    }

    /// Remote URL (git, svn) or CVS root
    pub fn url(&self) -> String {
        let server = if self.repo.server.ends_with('/') || self.repo.kind == ScmKind::Cvs {
            self.repo.server.clone()
        } else {
            format!("{}/", self.repo.server)
        };
        let repo = &self.repo;
        match (repo.kind, repo.path.as_deref()) {
            (ScmKind::Cvs, _) => server,
            (_, Some(path)) => format!("{server}{path}"),
            (ScmKind::Git, None) => format!("{server}{}", repo.module),
            (ScmKind::Svn, None) if repo.branch == "trunk" => format!("{server}{}/trunk", repo.module),
            (ScmKind::Svn, None) => format!("{server}{}/branches/{}", repo.module, repo.branch),
        }
    }

    /// Browsable location of the branch, a directory in it, or a file
    pub fn location(&self, dir: Option<&str>, file: Option<&str>) -> String {
        let repo = &self.repo;
        match repo.kind {
            ScmKind::Cvs => {
                let mut base = format!("{} {}", repo.server, repo.module);
                if repo.branch != "HEAD" {
                    base = format!("{base}@{}", repo.branch);
                }
                match (dir, file) {
                    (Some(dir), Some(file)) => format!("{base} {dir}/{file}"),
                    (Some(dir), None) => format!("{base} {dir}"),
                    _ => base,
                }
            }
            ScmKind::Git => {
                let url = self.url();
                let suffix = if repo.branch == "master" { String::new() } else { format!("@{}", repo.branch) };
                match (dir, file) {
                    (Some(dir), Some(file)) => format!("{url}/{dir}/{file}{suffix}"),
                    (Some(dir), None) => format!("{url}/{dir}{suffix}"),
                    _ => format!("{url}{suffix}"),
                }
            }
            ScmKind::Svn => {
                let url = self.url();
                match (dir, file) {
                    (Some(dir), Some(file)) => format!("{url}/{dir}/{file}"),
                    (Some(dir), None) => format!("{url}/{dir}"),
                    _ => url,
                }
            }
        }
    }

    /// Check out when absent, update when present and `update` is set.
    ///
    /// Failures are kept in [`Checkout::error`], not returned.
    pub async fn ensure(&mut self, update: bool) {
        self.error = None;
        let result = if self.directory().exists() {
            if !update {
                return;
            }
            info!(module = %self.repo.module, branch = %self.repo.branch, server = %self.server_name, "updating");
            self.update().await
        } else {
            info!(module = %self.repo.module, branch = %self.repo.branch, server = %self.server_name, "checking out");
            self.checkout().await
        };

        if let Err(e) = result {
            warn!(module = %self.repo.module, branch = %self.repo.branch, error = %e, "checkout failed");
            self.error = Some(e.branch_message());
        }
    }

    async fn checkout(&self) -> Result<(), ScmError> {
        let module_dir = self.module_dir();
        tokio::fs::create_dir_all(&module_dir).await?;
        let branch = self.repo.branch.as_str();
        match self.repo.kind {
            ScmKind::Cvs => {
                let root = format!("-d{}", self.repo.server);
                self.runner
                    .run_checked(&module_dir, "cvs", &["-z3", &root, "co", "-r", branch, "-d", branch, &self.repo.module])
                    .await?;
            }
            ScmKind::Svn => {
                self.runner.run_checked(&module_dir, "svn", &["co", &self.url(), branch]).await?;
            }
            ScmKind::Git => {
                self.runner.run_checked(&module_dir, "git", &["clone", &self.url(), branch]).await?;
                let dir = self.directory();
                let tracking = format!("origin/{branch}");
                if self.runner.run_checked(&dir, "git", &["checkout", "-b", branch, &tracking]).await.is_err() {
                    self.runner.run_checked(&dir, "git", &["checkout", branch]).await?;
                }
            }
        }
        Ok(())
    }

    async fn update(&self) -> Result<(), ScmError> {
        let dir = self.directory();
        match self.repo.kind {
            ScmKind::Cvs => {
                self.runner.run_checked(&dir, "cvs", &["-z3", "up", "-Pd"]).await?;
            }
            ScmKind::Svn => {
                self.runner.run_checked(&dir, "svn", &["up"]).await?;
            }
            ScmKind::Git => {
                self.runner.run_checked(&dir, "git", &["fetch", "origin"]).await?;
                let upstream = format!("origin/{}", self.repo.branch);
                self.runner.run_checked(&dir, "git", &["rebase", &upstream]).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HistorySource for Checkout {
    fn server_id(&self) -> String {
        server_id(&self.server_name)
    }

    async fn current_revision(&self) -> Option<(String, OffsetDateTime)> {
        let dir = self.directory();
        match self.repo.kind {
            ScmKind::Cvs => None,
            ScmKind::Svn => {
                let info = self.runner.run_checked(&dir, "svn", &["info", "."]).await.ok()?;
                svn::parse_last_changed(&info)
            }
            ScmKind::Git => {
                let output = self
                    .runner
                    .run_checked(&dir, "git", &["show", "--name-only", "--pretty=format:%H%n%ad", "."])
                    .await
                    .ok()?;
                git::parse_tip(&output)
            }
        }
    }

    async fn history(&self, since: Option<&str>) -> Result<CommitStream, ScmError> {
        let dir = self.directory();
        let branch = self.repo.branch.as_str();
        match self.repo.kind {
            ScmKind::Cvs => {
                let start = since.map(|s| format!("{s}-"));
                let mut args = vec!["-q", "-u", "-b", branch];
                if let Some(start) = start.as_deref() {
                    args.extend(["-s", start]);
                }
                let output = self.runner.run_checked(&dir, "cvsps", &args).await?;
                Ok(CommitStream::from_commits(cvs::parse_patchsets(&output, since, local_offset())))
            }
            ScmKind::Svn => {
                let info = self.runner.run_checked(&dir, "svn", &["info"]).await?;
                let root = svn::parse_repository_root(&info).ok_or_else(|| ScmError::Tool {
                    program: "svn".into(),
                    message: "no Repository Root in svn info".into(),
                })?;
                let range = match since {
                    Some(rev) => match rev.parse::<u64>() {
                        Ok(n) => format!("-r{}:HEAD", n + 1),
                        Err(_) => format!("-r{rev}:HEAD"),
                    },
                    None => "-r{1970-01-01}:HEAD".to_string(),
                };
                let output = self.runner.run_checked(&dir, "svn", &["log", "-v", &range]).await?;
                Ok(CommitStream::from_commits(svn::parse_log(&output, &root, &self.url(), since)))
            }
            ScmKind::Git => {
                let range = match since {
                    Some(rev) => format!("{rev}..{branch}"),
                    None => branch.to_string(),
                };
                let output = self
                    .runner
                    .run_checked(&dir, "git", &["log", "--pretty=format:%H %P", &range])
                    .await?;
                Ok(CommitStream::git(self.runner.clone(), dir, git::parse_rev_list(&output)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout(kind: ScmKind, server: &str, branch: Option<&str>) -> Checkout {
        let repo = RepositoryRecord::new(kind, server, "gedit", branch, None);
        Checkout::new(repo, Path::new("/scm"), ToolRunner::default()).unwrap()
    }

    #[test]
    fn test_directory() {
        let co = checkout(ScmKind::Git, "git://git.gnome.org", None);
        assert_eq!(co.directory(), PathBuf::from("/scm/git.gnome.org/gedit/master"));
        assert_eq!(co.ignore_dir(), ".git");
    }

    #[test]
    fn test_svn_url() {
        assert_eq!(checkout(ScmKind::Svn, "http://svn.gnome.org/svn/", None).url(), "http://svn.gnome.org/svn/gedit/trunk");
        assert_eq!(
            checkout(ScmKind::Svn, "http://svn.gnome.org/svn", Some("gnome-2-22")).url(),
            "http://svn.gnome.org/svn/gedit/branches/gnome-2-22"
        );
    }

    #[test]
    fn test_locations() {
        let git = checkout(ScmKind::Git, "git://git.gnome.org/", Some("gnome-2-22"));
        assert_eq!(git.location(None, None), "git://git.gnome.org/gedit@gnome-2-22");
        assert_eq!(git.location(Some("po"), Some("de.po")), "git://git.gnome.org/gedit/po/de.po@gnome-2-22");

        let cvs = checkout(ScmKind::Cvs, ":pserver:anonymous@anoncvs.gnome.org:/cvs/gnome", None);
        assert_eq!(cvs.location(Some("po"), None), ":pserver:anonymous@anoncvs.gnome.org:/cvs/gnome gedit po");
        assert_eq!(cvs.server_id(), "gnome.org");
    }

    #[test]
    fn test_construction_fails_fast() {
        let repo = RepositoryRecord::new(ScmKind::Git, "not a url", "gedit", None, None);
        assert!(matches!(Checkout::new(repo, Path::new("/scm"), ToolRunner::default()), Err(ScmError::Config(_))));
    }
}
