//! Commit sources consumed by the history importer

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use time::OffsetDateTime;

use crate::error::ScmError;
use crate::model::Commit;

use super::git;
use super::tool::ToolRunner;

/// Anything that can report its tip and stream commits oldest first
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Scope for `/person/<userid>@<server_id>` identifiers
    fn server_id(&self) -> String;

    /// Native id and time of the tip, `None` when unknown
    async fn current_revision(&self) -> Option<(String, OffsetDateTime)>;

    /// Commits after `since` (exclusive), oldest first
    async fn history(&self, since: Option<&str>) -> Result<CommitStream, ScmError>;
}

enum Pending {
    Parsed(VecDeque<Result<Commit, ScmError>>),
    /// Revisions still to be read one `git show` at a time
    Git {
        runner: ToolRunner,
        directory: PathBuf,
        revs: VecDeque<(String, Option<String>)>,
    },
}

/// A finite, lazily consumed sequence of commits
pub struct CommitStream {
    pending: Pending,
}

impl CommitStream {
    pub fn from_commits(commits: Vec<Commit>) -> Self {
        Self::from_results(commits.into_iter().map(Ok).collect())
    }

    /// Already read items, failures included
    pub fn from_results(items: Vec<Result<Commit, ScmError>>) -> Self {
        Self { pending: Pending::Parsed(items.into()) }
    }

    pub(crate) fn git(runner: ToolRunner, directory: PathBuf, revs: Vec<(String, Option<String>)>) -> Self {
        Self { pending: Pending::Git { runner, directory, revs: revs.into() } }
    }

    pub fn remaining(&self) -> usize {
        match &self.pending {
            Pending::Parsed(commits) => commits.len(),
            Pending::Git { revs, .. } => revs.len(),
        }
    }

    /// Next commit; `None` once exhausted.
    ///
    /// A revision whose output cannot be parsed yields
    /// [`ScmError::Unparseable`]; a failing tool yields its error.
    pub async fn next(&mut self) -> Option<Result<Commit, ScmError>> {
        match &mut self.pending {
            Pending::Parsed(items) => items.pop_front(),
            Pending::Git { runner, directory, revs } => {
                let (rev, parent) = revs.pop_front()?;
                let output = match runner.run_checked(directory, "git", &["show", "--name-only", &rev]).await {
                    Ok(output) => output,
                    Err(e) => return Some(Err(e)),
                };
                match git::parse_show(&output, &rev, parent.as_deref()) {
                    Some(commit) => Some(Ok(commit)),
                    None => Some(Err(ScmError::Unparseable(rev))),
                }
            }
        }
    }
}
