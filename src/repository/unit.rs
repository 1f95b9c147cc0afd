//! Unit of work: everything one branch scan produced, committed at once

use anyhow::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use tracing::debug;

use crate::model::{BranchKind, BranchRecord, Entity, OutputFile, Relation, RelationKind};

use super::database::{
    child_idents_in_tx, delete_branch_in_tx, remove_output_files, replace_relations_in_tx, save_branches_in_tx,
    save_entities_in_tx, save_output_files_in_tx, save_timestamps_in_tx, Removed,
};
use super::Database;

/// Replace a parent's children of one kind with exactly `members`
#[derive(Debug, Clone)]
pub struct Reconcile {
    pub parent: String,
    pub kind: BranchKind,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
struct RelationSet {
    kind: RelationKind,
    subj: String,
    relations: Vec<Relation>,
}

/// Staged writes of one branch scan
#[derive(Debug, Default)]
pub struct UnitOfWork {
    branches: Vec<BranchRecord>,
    branch_index: FxHashMap<String, usize>,
    entities: Vec<Entity>,
    entity_index: FxHashMap<String, usize>,
    relations: Vec<RelationSet>,
    reconciles: Vec<Reconcile>,
    timestamps: FxHashMap<(String, String), i64>,
    output_files: Vec<OutputFile>,
}

/// Outcome of [`Database::apply_unit`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnitSummary {
    pub saved: usize,
    pub deleted: usize,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a branch, replacing an earlier staged copy with the same ident.
    pub fn stage_branch(&mut self, record: BranchRecord) {
        match self.branch_index.get(&record.ident) {
            Some(&idx) => self.branches[idx] = record,
            None => {
                self.branch_index.insert(record.ident.clone(), self.branches.len());
                self.branches.push(record);
            }
        }
    }

    pub fn branch(&self, ident: &str) -> Option<&BranchRecord> {
        self.branch_index.get(ident).map(|&idx| &self.branches[idx])
    }

    pub fn branch_mut(&mut self, ident: &str) -> Option<&mut BranchRecord> {
        self.branch_index.get(ident).map(|&idx| &mut self.branches[idx])
    }

    /// Staged branches in staging order
    pub fn branches(&self) -> &[BranchRecord] {
        &self.branches
    }

    pub fn stage_entity(&mut self, entity: Entity) {
        match self.entity_index.get(&entity.ident) {
            Some(&idx) => self.entities[idx] = entity,
            None => {
                self.entity_index.insert(entity.ident.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn entity(&self, ident: &str) -> Option<&Entity> {
        self.entity_index.get(ident).map(|&idx| &self.entities[idx])
    }

    /// Replace the `(kind, subj)` relations on commit.
    pub fn set_relations(&mut self, kind: RelationKind, subj: impl Into<String>, relations: Vec<Relation>) {
        let subj = subj.into();
        self.relations.retain(|set| !(set.kind == kind && set.subj == subj));
        self.relations.push(RelationSet { kind, subj, relations });
    }

    pub fn relations(&self, kind: RelationKind, subj: &str) -> Option<&[Relation]> {
        self.relations
            .iter()
            .find(|set| set.kind == kind && set.subj == subj)
            .map(|set| set.relations.as_slice())
    }

    pub fn reconcile(&mut self, parent: impl Into<String>, kind: BranchKind, members: Vec<String>) {
        let parent = parent.into();
        self.reconciles.retain(|r| !(r.parent == parent && r.kind == kind));
        self.reconciles.push(Reconcile { parent, kind, members });
    }

    pub fn reconciles(&self) -> &[Reconcile] {
        &self.reconciles
    }

    pub fn stamp(&mut self, filename: impl Into<String>, sourcefunc: impl Into<String>, stamp: i64) {
        self.timestamps.insert((filename.into(), sourcefunc.into()), stamp);
    }

    pub fn staged_stamp(&self, filename: &str, sourcefunc: &str) -> Option<i64> {
        self.timestamps.get(&(filename.to_string(), sourcefunc.to_string())).copied()
    }

    pub fn output_file(&mut self, file: OutputFile) {
        self.output_files
            .retain(|f| !(f.kind == file.kind && f.ident == file.ident && f.filename == file.filename));
        self.output_files.push(file);
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
            && self.entities.is_empty()
            && self.relations.is_empty()
            && self.reconciles.is_empty()
            && self.timestamps.is_empty()
            && self.output_files.is_empty()
    }
}

impl Database {
    /// Commit a unit of work in ONE transaction.
    ///
    /// Order: entities, branches, relation sets, reconciliation (stale
    /// children deleted with cascade, members re-parented), timestamps,
    /// output file rows. Files of deleted output rows are removed from
    /// `web_root` only after the commit succeeded.
    pub async fn apply_unit(&self, unit: &UnitOfWork, web_root: &Path) -> Result<UnitSummary> {
        let mut tx = self.pool.begin().await?;

        save_entities_in_tx(&mut tx, &unit.entities).await?;
        save_branches_in_tx(&mut tx, &unit.branches).await?;

        for set in &unit.relations {
            replace_relations_in_tx(&mut tx, set.kind, &set.subj, &set.relations).await?;
        }

        let mut removed = Removed::default();
        for reconcile in &unit.reconciles {
            let members: FxHashSet<&str> = reconcile.members.iter().map(String::as_str).collect();
            for stale in child_idents_in_tx(&mut tx, &reconcile.parent, reconcile.kind).await? {
                if !members.contains(stale.as_str()) {
                    debug!("Removing stale {} {}", reconcile.kind, stale);
                    removed.merge(delete_branch_in_tx(&mut tx, &stale).await?);
                }
            }
            for member in &reconcile.members {
                sqlx::query("UPDATE branches SET parent_ident = ? WHERE ident = ?")
                    .bind(&reconcile.parent)
                    .bind(member)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let stamps: Vec<(String, String, i64)> = unit
            .timestamps
            .iter()
            .map(|((file, func), stamp)| (file.clone(), func.clone(), *stamp))
            .collect();
        save_timestamps_in_tx(&mut tx, &stamps).await?;
        save_output_files_in_tx(&mut tx, &unit.output_files).await?;

        tx.commit().await?;

        remove_output_files(web_root, &removed.output_files).await;
        Ok(UnitSummary { saved: unit.branches.len(), deleted: removed.branches })
    }
}
