//! Revision store trait for persistence abstraction
//!
//! Keeps the importer independent of the database so it can be driven
//! against an in-memory store.

use anyhow::Result;

use crate::model::{Entity, RevisionRecord};

/// Persistence layer for imported history
#[allow(async_fn_in_trait)]
pub trait RevisionStore {
    /// Most recently imported revision of a branch
    async fn last_revision(&self, branch_ident: &str) -> Result<Option<RevisionRecord>>;

    /// Revision with the newest commit date
    async fn latest_revision(&self, branch_ident: &str) -> Result<Option<RevisionRecord>>;

    async fn revision_exists(&self, ident: &str) -> Result<bool>;

    async fn entity(&self, ident: &str) -> Result<Option<Entity>>;

    /// A person already known under this email address
    async fn entity_by_email(&self, email: &str) -> Result<Option<Entity>>;

    /// Save a revision, its files and its author as one write
    async fn save_revision(&self, revision: &RevisionRecord, person: &Entity) -> Result<()>;

    /// Record the most recent change of a branch
    async fn set_modified(&self, branch_ident: &str, datetime: Option<i64>, person: Option<&str>) -> Result<()>;
}
