use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, QueryBuilder, Row, Sqlite, Transaction,
};
use std::str::FromStr;
use tracing::{info, warn};

use crate::model::{
    BranchKind, BranchRecord, CommitFile, Entity, EntityKind, OutputFile, Relation, RelationKind, RevisionRecord,
};
use crate::scm::{RepositoryRecord, ScmKind};

use super::SCHEMA_VERSION;

/// Rows per multi-row INSERT; branches bind 21 values per row
pub(super) const BATCH_SIZE: usize = 400;

const BRANCH_COLUMNS: &str = "ident, kind, parent_ident, scm_type, scm_server, scm_module, scm_branch, scm_path, \
     scm_dir, scm_file, name, description, icon_dir, icon_name, error, mod_datetime, mod_person, score, \
     score_diff, updated, details";

/// Database abstraction for SQLite operations
pub struct Database {
    pub(super) pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Configure connection options with PRAGMAs applied to every connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-64000"); // 64MB cache

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        // Create metadata table first (needed to check version)
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let stored_version: Option<String> = sqlx::query("SELECT value FROM metadata WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value"));

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                info!("Schema version changed ({} -> {}), rebuilding store", old, SCHEMA_VERSION);
            }
            for table in [
                "output_files",
                "relations",
                "timestamps",
                "revision_files",
                "revisions",
                "entities",
                "branches",
            ] {
                sqlx::query(&format!("DROP TABLE IF EXISTS {table}")).execute(&self.pool).await?;
            }
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS branches (
                ident TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                parent_ident TEXT,
                scm_type TEXT NOT NULL,
                scm_server TEXT NOT NULL,
                scm_module TEXT NOT NULL,
                scm_branch TEXT NOT NULL,
                scm_path TEXT,
                scm_dir TEXT,
                scm_file TEXT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                icon_dir TEXT,
                icon_name TEXT,
                error TEXT,
                mod_datetime INTEGER,
                mod_person TEXT,
                score INTEGER NOT NULL DEFAULT 0,
                score_diff INTEGER NOT NULL DEFAULT 0,
                updated INTEGER,
                details TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS branches_parent ON branches (parent_ident, kind)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entities (
                ident TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS revisions (
                ident TEXT PRIMARY KEY,
                branch_ident TEXT NOT NULL,
                person_ident TEXT NOT NULL,
                alias_ident TEXT,
                revision TEXT NOT NULL,
                datetime INTEGER NOT NULL,
                comment TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS revisions_branch ON revisions (branch_ident, datetime)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS revision_files (
                revision_ident TEXT NOT NULL,
                filename TEXT NOT NULL,
                filerev TEXT NOT NULL,
                prevrev TEXT
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS revision_files_revision ON revision_files (revision_ident)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS timestamps (
                filename TEXT NOT NULL,
                sourcefunc TEXT NOT NULL,
                stamp INTEGER NOT NULL,
                PRIMARY KEY (filename, sourcefunc)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS relations (
                kind TEXT NOT NULL,
                subj_ident TEXT NOT NULL,
                pred_ident TEXT NOT NULL,
                maintainer INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (kind, subj_ident, pred_ident)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS output_files (
                type TEXT NOT NULL,
                ident TEXT NOT NULL,
                filename TEXT NOT NULL,
                datetime INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (type, ident, filename)
            )",
        )
        .execute(&self.pool)
        .await?;

        if needs_rebuild {
            sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)")
                .bind(SCHEMA_VERSION)
                .execute(&self.pool)
                .await?;
        }

        Ok(needs_rebuild)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Option<String> {
        sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
            .map(|row| row.get("value"))
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Branches
    // ---------------------------------------------------------------

    pub async fn get_branch(&self, ident: &str) -> Result<Option<BranchRecord>> {
        let row = sqlx::query(&format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE ident = ?"))
            .bind(ident)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(branch_from_row).transpose()
    }

    /// Branches of one kind whose ident matches a SQL `LIKE` pattern, by ident
    pub async fn select_branches(&self, kind: BranchKind, pattern: Option<&str>) -> Result<Vec<BranchRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE kind = ? AND ident LIKE ? ORDER BY ident"
        ))
        .bind(kind.as_str())
        .bind(pattern.unwrap_or("%"))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(branch_from_row).collect()
    }

    /// Direct children of a branch, optionally of one kind
    pub async fn children(&self, parent: &str, kind: Option<BranchKind>) -> Result<Vec<BranchRecord>> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query(&format!(
                    "SELECT {BRANCH_COLUMNS} FROM branches WHERE parent_ident = ? AND kind = ? ORDER BY ident"
                ))
                .bind(parent)
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {BRANCH_COLUMNS} FROM branches WHERE parent_ident = ? ORDER BY ident"
                ))
                .bind(parent)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(branch_from_row).collect()
    }

    pub async fn save_branch(&self, record: &BranchRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        save_branches_in_tx(&mut tx, std::slice::from_ref(record)).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Store (or clear) the last failure of a branch
    pub async fn set_branch_error(&self, ident: &str, error: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE branches SET error = ? WHERE ident = ?")
            .bind(error)
            .bind(ident)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a branch with its descendants, relations, revisions and output
    /// files, removing the output files from disk after the commit.
    pub async fn delete_branch(&self, ident: &str, web_root: &std::path::Path) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let removed = delete_branch_in_tx(&mut tx, ident).await?;
        tx.commit().await?;
        remove_output_files(web_root, &removed.output_files).await;
        Ok(removed.branches)
    }

    // ---------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------

    pub async fn get_entity(&self, ident: &str) -> Result<Option<Entity>> {
        let row = sqlx::query("SELECT ident, kind, name, email FROM entities WHERE ident = ?")
            .bind(ident)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entity_from_row).transpose()
    }

    /// A person already known under a userid ident with this email
    pub async fn entity_by_email(&self, email: &str) -> Result<Option<Entity>> {
        let row = sqlx::query(
            "SELECT ident, kind, name, email FROM entities WHERE email = ? AND kind = 'Person' ORDER BY ident LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(entity_from_row).transpose()
    }

    pub async fn save_entity(&self, entity: &Entity) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        save_entities_in_tx(&mut tx, std::slice::from_ref(entity)).await?;
        tx.commit().await?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Revisions
    // ---------------------------------------------------------------

    pub async fn revision_exists(&self, ident: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM revisions WHERE ident = ?")
            .bind(ident)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Most recently imported revision of a branch, where the next import
    /// resumes. Commit dates are not monotonic, so this is by import order.
    pub async fn last_revision(&self, branch_ident: &str) -> Result<Option<RevisionRecord>> {
        self.one_revision(branch_ident, "rowid DESC").await
    }

    /// Revision of a branch with the newest commit date
    pub async fn latest_revision(&self, branch_ident: &str) -> Result<Option<RevisionRecord>> {
        self.one_revision(branch_ident, "datetime DESC, rowid DESC").await
    }

    async fn one_revision(&self, branch_ident: &str, order: &str) -> Result<Option<RevisionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT ident, branch_ident, person_ident, alias_ident, revision, datetime, comment
             FROM revisions WHERE branch_ident = ? ORDER BY {order} LIMIT 1"
        ))
        .bind(branch_ident)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = revision_from_row(&row);
        record.files = self.revision_files(&record.ident).await?;
        Ok(Some(record))
    }

    /// All revisions of a branch, oldest first
    pub async fn revisions(&self, branch_ident: &str) -> Result<Vec<RevisionRecord>> {
        let rows = sqlx::query(
            "SELECT ident, branch_ident, person_ident, alias_ident, revision, datetime, comment
             FROM revisions WHERE branch_ident = ? ORDER BY datetime, rowid",
        )
        .bind(branch_ident)
        .fetch_all(&self.pool)
        .await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = revision_from_row(row);
            record.files = self.revision_files(&record.ident).await?;
            records.push(record);
        }
        Ok(records)
    }

    async fn revision_files(&self, revision_ident: &str) -> Result<Vec<CommitFile>> {
        let rows = sqlx::query(
            "SELECT filename, filerev, prevrev FROM revision_files WHERE revision_ident = ? ORDER BY rowid",
        )
        .bind(revision_ident)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| CommitFile::new(row.get::<String, _>("filename"), row.get::<String, _>("filerev"), row.get("prevrev")))
            .collect())
    }

    /// Commit datetimes of a branch, for activity statistics
    pub async fn revision_datetimes(&self, branch_ident: &str) -> Result<Vec<i64>> {
        let stamps: Vec<i64> = sqlx::query_scalar("SELECT datetime FROM revisions WHERE branch_ident = ? ORDER BY datetime")
            .bind(branch_ident)
            .fetch_all(&self.pool)
            .await?;
        Ok(stamps)
    }

    /// Persist one revision with its files and author in ONE transaction.
    pub async fn insert_revision(&self, revision: &RevisionRecord, person: &Entity) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        save_entities_in_tx(&mut tx, std::slice::from_ref(person)).await?;

        sqlx::query(
            "INSERT INTO revisions (ident, branch_ident, person_ident, alias_ident, revision, datetime, comment)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&revision.ident)
        .bind(&revision.branch_ident)
        .bind(&revision.person_ident)
        .bind(&revision.alias_ident)
        .bind(&revision.revision)
        .bind(revision.datetime)
        .bind(&revision.comment)
        .execute(&mut *tx)
        .await?;

        for chunk in revision.files.chunks(BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO revision_files (revision_ident, filename, filerev, prevrev) ");
            qb.push_values(chunk, |mut row, file| {
                row.push_bind(&revision.ident)
                    .push_bind(&file.filename)
                    .push_bind(&file.revision)
                    .push_bind(&file.previous);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Latest revision of a branch touching any of `files`, as
    /// `(datetime, person_ident)`
    pub async fn last_revision_for_files(&self, branch_ident: &str, files: &[String]) -> Result<Option<(i64, String)>> {
        if files.is_empty() {
            return Ok(None);
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT r.datetime, r.person_ident FROM revisions r \
             JOIN revision_files f ON f.revision_ident = r.ident WHERE r.branch_ident = ",
        );
        qb.push_bind(branch_ident);
        qb.push(" AND f.filename IN (");
        let mut separated = qb.separated(", ");
        for file in files {
            separated.push_bind(file);
        }
        separated.push_unseparated(") ORDER BY r.datetime DESC, r.rowid DESC LIMIT 1");
        let row = qb.build().fetch_optional(&self.pool).await?;
        Ok(row.map(|row| (row.get("datetime"), row.get("person_ident"))))
    }

    /// Record the most recent change of a branch
    pub async fn update_branch_modified(&self, ident: &str, datetime: Option<i64>, person: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE branches SET mod_datetime = ?, mod_person = ? WHERE ident = ?")
            .bind(datetime)
            .bind(person)
            .bind(ident)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Timestamps, relations, output files
    // ---------------------------------------------------------------

    pub async fn get_timestamp(&self, filename: &str, sourcefunc: &str) -> Result<Option<i64>> {
        let stamp: Option<i64> =
            sqlx::query_scalar("SELECT stamp FROM timestamps WHERE filename = ? AND sourcefunc = ?")
                .bind(filename)
                .bind(sourcefunc)
                .fetch_optional(&self.pool)
                .await?;
        Ok(stamp)
    }

    /// Relations of one kind whose subject is `subj`
    pub async fn relations(&self, kind: RelationKind, subj: &str) -> Result<Vec<Relation>> {
        let rows = sqlx::query(
            "SELECT kind, subj_ident, pred_ident, maintainer FROM relations
             WHERE kind = ? AND subj_ident = ? ORDER BY pred_ident",
        )
        .bind(kind.as_str())
        .bind(subj)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok::<_, anyhow::Error>(Relation {
                    kind: row.get::<String, _>("kind").parse()?,
                    subj: row.get("subj_ident"),
                    pred: row.get("pred_ident"),
                    maintainer: row.get("maintainer"),
                })
            })
            .collect()
    }

    pub async fn get_output_file(&self, kind: &str, ident: &str, filename: &str) -> Result<Option<OutputFile>> {
        let row = sqlx::query(
            "SELECT type, ident, filename, datetime, data FROM output_files
             WHERE type = ? AND ident = ? AND filename = ?",
        )
        .bind(kind)
        .bind(ident)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(output_file_from_row).transpose()
    }
}

// -------------------------------------------------------------------
// Transaction helpers, shared with the unit-of-work writer
// -------------------------------------------------------------------

/// What a cascading delete removed
#[derive(Debug, Default)]
pub(super) struct Removed {
    pub branches: usize,
    pub output_files: Vec<OutputFile>,
}

impl Removed {
    pub fn merge(&mut self, other: Removed) {
        self.branches += other.branches;
        self.output_files.extend(other.output_files);
    }
}

pub(super) async fn save_branches_in_tx(tx: &mut Transaction<'_, Sqlite>, records: &[BranchRecord]) -> Result<()> {
    for chunk in records.chunks(BATCH_SIZE) {
        if chunk.is_empty() {
            continue;
        }
        // JSON columns are encoded up front so binds can borrow them
        let mut encoded = Vec::with_capacity(chunk.len());
        for record in chunk {
            encoded.push((
                record,
                serde_json::to_string(&record.name)?,
                serde_json::to_string(&record.desc)?,
                serde_json::to_string(&record.details)?,
            ));
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("INSERT INTO branches ({BRANCH_COLUMNS}) "));
        qb.push_values(&encoded, |mut row, (record, name, desc, details)| {
            row.push_bind(&record.ident)
                .push_bind(record.kind().as_str())
                .push_bind(&record.parent)
                .push_bind(record.repo.kind.as_str())
                .push_bind(&record.repo.server)
                .push_bind(&record.repo.module)
                .push_bind(&record.repo.branch)
                .push_bind(&record.repo.path)
                .push_bind(&record.scm_dir)
                .push_bind(&record.scm_file)
                .push_bind(name)
                .push_bind(desc)
                .push_bind(&record.icon_dir)
                .push_bind(&record.icon_name)
                .push_bind(&record.error)
                .push_bind(record.mod_datetime)
                .push_bind(&record.mod_person)
                .push_bind(record.score)
                .push_bind(record.score_diff)
                .push_bind(record.updated)
                .push_bind(details);
        });
        qb.push(
            " ON CONFLICT(ident) DO UPDATE SET \
                kind = excluded.kind, parent_ident = excluded.parent_ident, \
                scm_type = excluded.scm_type, scm_server = excluded.scm_server, \
                scm_module = excluded.scm_module, scm_branch = excluded.scm_branch, \
                scm_path = excluded.scm_path, scm_dir = excluded.scm_dir, scm_file = excluded.scm_file, \
                name = excluded.name, description = excluded.description, \
                icon_dir = excluded.icon_dir, icon_name = excluded.icon_name, error = excluded.error, \
                mod_datetime = excluded.mod_datetime, mod_person = excluded.mod_person, \
                score = excluded.score, score_diff = excluded.score_diff, \
                updated = excluded.updated, details = excluded.details",
        );
        qb.build().execute(&mut **tx).await?;
    }
    Ok(())
}

pub(super) async fn save_entities_in_tx(tx: &mut Transaction<'_, Sqlite>, entities: &[Entity]) -> Result<()> {
    for chunk in entities.chunks(BATCH_SIZE) {
        if chunk.is_empty() {
            continue;
        }
        let mut encoded = Vec::with_capacity(chunk.len());
        for entity in chunk {
            encoded.push((entity, serde_json::to_string(&entity.name)?));
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("INSERT INTO entities (ident, kind, name, email) ");
        qb.push_values(&encoded, |mut row, (entity, name)| {
            row.push_bind(&entity.ident)
                .push_bind(entity.kind.as_str())
                .push_bind(name)
                .push_bind(&entity.email);
        });
        qb.push(" ON CONFLICT(ident) DO UPDATE SET name = excluded.name, email = excluded.email");
        qb.build().execute(&mut **tx).await?;
    }
    Ok(())
}

/// Replace every `(kind, subj)` relation with exactly `relations`.
pub(super) async fn replace_relations_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: RelationKind,
    subj: &str,
    relations: &[Relation],
) -> Result<()> {
    sqlx::query("DELETE FROM relations WHERE kind = ? AND subj_ident = ?")
        .bind(kind.as_str())
        .bind(subj)
        .execute(&mut **tx)
        .await?;

    for chunk in relations.chunks(BATCH_SIZE) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT OR REPLACE INTO relations (kind, subj_ident, pred_ident, maintainer) ");
        qb.push_values(chunk, |mut row, relation| {
            row.push_bind(relation.kind.as_str())
                .push_bind(&relation.subj)
                .push_bind(&relation.pred)
                .push_bind(relation.maintainer);
        });
        qb.build().execute(&mut **tx).await?;
    }
    Ok(())
}

pub(super) async fn save_timestamps_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    stamps: &[(String, String, i64)],
) -> Result<()> {
    for chunk in stamps.chunks(BATCH_SIZE) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT OR REPLACE INTO timestamps (filename, sourcefunc, stamp) ");
        qb.push_values(chunk, |mut row, (filename, sourcefunc, stamp)| {
            row.push_bind(filename).push_bind(sourcefunc).push_bind(*stamp);
        });
        qb.build().execute(&mut **tx).await?;
    }
    Ok(())
}

pub(super) async fn save_output_files_in_tx(tx: &mut Transaction<'_, Sqlite>, files: &[OutputFile]) -> Result<()> {
    for chunk in files.chunks(BATCH_SIZE) {
        if chunk.is_empty() {
            continue;
        }
        let mut encoded = Vec::with_capacity(chunk.len());
        for file in chunk {
            encoded.push((file, serde_json::to_string(&file.data)?));
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT OR REPLACE INTO output_files (type, ident, filename, datetime, data) ");
        qb.push_values(&encoded, |mut row, (file, data)| {
            row.push_bind(&file.kind)
                .push_bind(&file.ident)
                .push_bind(&file.filename)
                .push_bind(file.datetime)
                .push_bind(data);
        });
        qb.build().execute(&mut **tx).await?;
    }
    Ok(())
}

/// Idents of a parent's children of one kind
pub(super) async fn child_idents_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    parent: &str,
    kind: BranchKind,
) -> Result<Vec<String>> {
    let idents: Vec<String> = sqlx::query_scalar("SELECT ident FROM branches WHERE parent_ident = ? AND kind = ?")
        .bind(parent)
        .bind(kind.as_str())
        .fetch_all(&mut **tx)
        .await?;
    Ok(idents)
}

/// Cascading delete: the branch, every descendant, their relations,
/// revisions and output file rows. Files on disk are left to the caller.
pub(super) async fn delete_branch_in_tx(tx: &mut Transaction<'_, Sqlite>, ident: &str) -> Result<Removed> {
    let mut doomed = vec![ident.to_string()];
    let mut cursor = 0;
    while cursor < doomed.len() {
        let children: Vec<String> = sqlx::query_scalar("SELECT ident FROM branches WHERE parent_ident = ?")
            .bind(&doomed[cursor])
            .fetch_all(&mut **tx)
            .await?;
        doomed.extend(children);
        cursor += 1;
    }

    let mut removed = Removed::default();
    for ident in &doomed {
        sqlx::query("DELETE FROM relations WHERE subj_ident = ? OR pred_ident = ?")
            .bind(ident)
            .bind(ident)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            "DELETE FROM revision_files WHERE revision_ident IN (SELECT ident FROM revisions WHERE branch_ident = ?)",
        )
        .bind(ident)
        .execute(&mut **tx)
        .await?;
        sqlx::query("DELETE FROM revisions WHERE branch_ident = ?")
            .bind(ident)
            .execute(&mut **tx)
            .await?;

        let rows = sqlx::query("SELECT type, ident, filename, datetime, data FROM output_files WHERE ident = ?")
            .bind(ident)
            .fetch_all(&mut **tx)
            .await?;
        for row in &rows {
            removed.output_files.push(output_file_from_row(row)?);
        }
        sqlx::query("DELETE FROM output_files WHERE ident = ?")
            .bind(ident)
            .execute(&mut **tx)
            .await?;

        let result = sqlx::query("DELETE FROM branches WHERE ident = ?")
            .bind(ident)
            .execute(&mut **tx)
            .await?;
        removed.branches += result.rows_affected() as usize;
    }
    Ok(removed)
}

/// Best-effort removal of deleted output files
pub(super) async fn remove_output_files(web_root: &std::path::Path, files: &[OutputFile]) {
    for file in files {
        let path = file.path_under(web_root);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

// -------------------------------------------------------------------
// Row mapping
// -------------------------------------------------------------------

fn branch_from_row(row: &SqliteRow) -> Result<BranchRecord> {
    let repo = RepositoryRecord {
        kind: ScmKind::from_str(&row.get::<String, _>("scm_type"))?,
        server: row.get("scm_server"),
        module: row.get("scm_module"),
        branch: row.get("scm_branch"),
        path: row.get("scm_path"),
    };
    let ident: String = row.get("ident");
    let details = serde_json::from_str(&row.get::<String, _>("details"))
        .with_context(|| format!("Bad details column for {ident}"))?;
    Ok(BranchRecord {
        parent: row.get("parent_ident"),
        repo,
        scm_dir: row.get("scm_dir"),
        scm_file: row.get("scm_file"),
        name: serde_json::from_str(&row.get::<String, _>("name"))?,
        desc: serde_json::from_str(&row.get::<String, _>("description"))?,
        icon_dir: row.get("icon_dir"),
        icon_name: row.get("icon_name"),
        error: row.get("error"),
        mod_datetime: row.get("mod_datetime"),
        mod_person: row.get("mod_person"),
        score: row.get("score"),
        score_diff: row.get("score_diff"),
        updated: row.get("updated"),
        details,
        ident,
    })
}

fn entity_from_row(row: &SqliteRow) -> Result<Entity> {
    Ok(Entity {
        ident: row.get("ident"),
        kind: EntityKind::from_str(&row.get::<String, _>("kind"))?,
        name: serde_json::from_str(&row.get::<String, _>("name"))?,
        email: row.get("email"),
    })
}

fn revision_from_row(row: &SqliteRow) -> RevisionRecord {
    RevisionRecord {
        ident: row.get("ident"),
        branch_ident: row.get("branch_ident"),
        person_ident: row.get("person_ident"),
        alias_ident: row.get("alias_ident"),
        revision: row.get("revision"),
        datetime: row.get("datetime"),
        comment: row.get("comment"),
        files: Vec::new(),
    }
}

fn output_file_from_row(row: &SqliteRow) -> Result<OutputFile> {
    Ok(OutputFile {
        kind: row.get("type"),
        ident: row.get("ident"),
        filename: row.get("filename"),
        datetime: row.get("datetime"),
        data: serde_json::from_str(&row.get::<String, _>("data"))?,
    })
}
