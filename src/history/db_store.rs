//! Database implementation of RevisionStore

use anyhow::Result;

use crate::model::{Entity, RevisionRecord};
use crate::repository::Database;

use super::store::RevisionStore;

impl RevisionStore for Database {
    async fn last_revision(&self, branch_ident: &str) -> Result<Option<RevisionRecord>> {
        Database::last_revision(self, branch_ident).await
    }

    async fn latest_revision(&self, branch_ident: &str) -> Result<Option<RevisionRecord>> {
        Database::latest_revision(self, branch_ident).await
    }

    async fn revision_exists(&self, ident: &str) -> Result<bool> {
        Database::revision_exists(self, ident).await
    }

    async fn entity(&self, ident: &str) -> Result<Option<Entity>> {
        self.get_entity(ident).await
    }

    async fn entity_by_email(&self, email: &str) -> Result<Option<Entity>> {
        Database::entity_by_email(self, email).await
    }

    async fn save_revision(&self, revision: &RevisionRecord, person: &Entity) -> Result<()> {
        self.insert_revision(revision, person).await
    }

    async fn set_modified(&self, branch_ident: &str, datetime: Option<i64>, person: Option<&str>) -> Result<()> {
        self.update_branch_modified(branch_ident, datetime, person).await
    }
}
