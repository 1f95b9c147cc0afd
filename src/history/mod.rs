//! Incremental commit history import
//!
//! - **store**: persistence trait used by the importer
//! - **db_store**: Database implementation of RevisionStore

mod db_store;
mod store;

pub use store::RevisionStore;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::model::{AuthorIdentity, BranchRecord, Commit, Entity, EntityKind, RevisionRecord};
use crate::scanner::{NoopProgress, Phase, ProgressReporter};
use crate::scm::HistorySource;

/// Counts from one import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// The stored history already ended at the source's tip
    pub skipped: bool,
    pub imported: usize,
    /// Revisions that were already stored
    pub duplicates: usize,
    /// Commits the source could not parse
    pub failed: usize,
}

/// Imports the commits a branch does not have yet.
///
/// Identities resolved during one run are cached, so every author is read
/// from the store at most once.
pub struct HistoryImporter<'a, S: RevisionStore> {
    store: &'a S,
    progress: &'a dyn ProgressReporter,
    people: FxHashMap<String, Entity>,
    /// Author ident -> ident of the person it was merged into
    aliases: FxHashMap<String, String>,
}

impl<'a, S: RevisionStore> HistoryImporter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_progress(store, &NoopProgress)
    }

    pub fn with_progress(store: &'a S, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            store,
            progress,
            people: FxHashMap::default(),
            aliases: FxHashMap::default(),
        }
    }

    /// Bring the stored history of `branch` up to the source's tip.
    ///
    /// A commit that fails to parse is skipped. A failing tool or a storage
    /// error stops the import and is returned, leaving what was saved so far
    /// in place; the next run resumes right after it.
    pub async fn import_history(&mut self, branch: &mut BranchRecord, source: &dyn HistorySource) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let last = self.store.last_revision(&branch.ident).await?;

        if let (Some(last), Some((tip, _))) = (&last, source.current_revision().await) {
            if last.revision == tip {
                debug!("History of {} is up to date at {}", branch.ident, tip);
                report.skipped = true;
                return Ok(report);
            }
        }

        let since = last.as_ref().map(|r| r.revision.as_str());
        info!("Importing history of {} since {}", branch.ident, since.unwrap_or("the beginning"));
        let mut stream = source.history(since).await?;
        let server_id = source.server_id();
        let handle = self.progress.phase(&branch.ident, Phase::History, stream.remaining() as u64);

        while let Some(item) = stream.next().await {
            handle.inc(1);
            let commit = match item {
                Ok(commit) => {
                    handle.set_message(&commit.id);
                    commit
                }
                Err(e) if e.interrupts_history() => {
                    handle.finish();
                    return Err(e).with_context(|| format!("History import of {} stopped", branch.ident));
                }
                Err(e) => {
                    warn!("Skipping unreadable commit in {}: {}", branch.ident, e);
                    report.failed += 1;
                    continue;
                }
            };

            let ident = RevisionRecord::ident_for(&branch.ident, &commit.id);
            if self.store.revision_exists(&ident).await? {
                report.duplicates += 1;
                continue;
            }

            let (person, alias) = self.resolve_person(&commit.author, &server_id).await?;
            let revision = revision_record(ident, &branch.ident, &person, alias, commit);
            self.store.save_revision(&revision, &person).await?;
            self.people.insert(person.ident.clone(), person);
            report.imported += 1;
        }
        handle.finish();

        if let Some(latest) = self.store.latest_revision(&branch.ident).await? {
            branch.mod_datetime = Some(latest.datetime);
            branch.mod_person = Some(latest.person_ident);
            self.store
                .set_modified(&branch.ident, branch.mod_datetime, branch.mod_person.as_deref())
                .await?;
        }

        info!(
            "Imported {} revisions of {} ({} already stored, {} unreadable)",
            report.imported, branch.ident, report.duplicates, report.failed
        );
        Ok(report)
    }

    /// The person a commit is attributed to, plus the author ident when
    /// the commit was merged into a person known under another ident.
    async fn resolve_person(&mut self, author: &AuthorIdentity, server_id: &str) -> Result<(Entity, Option<String>)> {
        let (author_ident, kind) = author.resolve(server_id);

        let person_ident = match self.aliases.get(&author_ident) {
            Some(ident) => ident.clone(),
            None => {
                let ident = self.merge_target(author, &author_ident).await?.unwrap_or_else(|| author_ident.clone());
                self.aliases.insert(author_ident.clone(), ident.clone());
                ident
            }
        };

        let mut person = match self.people.get(&person_ident) {
            Some(person) => person.clone(),
            None => match self.store.entity(&person_ident).await? {
                Some(person) => person,
                None => Entity::new(person_ident.clone(), kind),
            },
        };
        person.extend(author.name.as_deref(), author.email.as_deref());

        let alias = (person.ident != author_ident).then_some(author_ident);
        Ok((person, alias))
    }

    /// Existing person with the same email, for authors known only by email
    async fn merge_target(&self, author: &AuthorIdentity, author_ident: &str) -> Result<Option<String>> {
        if author.userid.as_deref().is_some_and(|u| !u.is_empty()) {
            return Ok(None);
        }
        let Some(email) = author.email.as_deref().filter(|e| !e.is_empty()) else {
            return Ok(None);
        };
        Ok(self
            .store
            .entity_by_email(email)
            .await?
            .filter(|p| p.kind == EntityKind::Person && p.ident != author_ident)
            .map(|p| p.ident))
    }
}

fn revision_record(ident: String, branch_ident: &str, person: &Entity, alias: Option<String>, commit: Commit) -> RevisionRecord {
    RevisionRecord {
        ident,
        branch_ident: branch_ident.to_string(),
        person_ident: person.ident.clone(),
        alias_ident: alias,
        revision: commit.id,
        datetime: commit.datetime.unix_timestamp(),
        comment: commit.comment,
        files: commit.files,
    }
}
