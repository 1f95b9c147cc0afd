use anyhow::Result;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

use crate::config::Config;
use crate::error::ParseError;
use crate::model::{BranchDetails, BranchKind, BranchRecord};
use crate::parsers::Automake;
use crate::repository::{Database, UnitOfWork};
use crate::scm::Checkout;
use crate::util::relative_path;

use super::children::ChildSet;
use super::images::ImageCatalog;
use super::timestamps::{FileStamp, Routine, TimestampCache};
use super::ScanOptions;

/// State shared by the plugins while one module branch is scanned
pub struct ScanContext<'a> {
    pub db: &'a Database,
    pub config: &'a Config,
    pub options: ScanOptions,
    pub checkout: &'a Checkout,
    /// The module branch being scanned
    pub branch: BranchRecord,
    pub children: ChildSet,
    pub unit: UnitOfWork,
    pub timestamps: TimestampCache,
    pub images: ImageCatalog,
    pub now: i64,
    makefiles: FxHashMap<PathBuf, Arc<Automake>>,
}

impl<'a> ScanContext<'a> {
    pub fn new(
        db: &'a Database,
        config: &'a Config,
        options: ScanOptions,
        checkout: &'a Checkout,
        branch: BranchRecord,
    ) -> Self {
        Self {
            db,
            config,
            options,
            checkout,
            branch,
            children: ChildSet::new(),
            unit: UnitOfWork::new(),
            timestamps: TimestampCache::new(options.timestamps),
            images: ImageCatalog::new(),
            now: OffsetDateTime::now_utc().unix_timestamp(),
            makefiles: FxHashMap::default(),
        }
    }

    /// Checkout directory
    pub fn root(&self) -> PathBuf {
        self.checkout.directory()
    }

    /// Path relative to the checkout, "" for the checkout itself
    pub fn checkout_path(&self, path: &Path) -> String {
        relative_path(&self.root(), path).map(|p| p.into_owned()).unwrap_or_default()
    }

    /// `(scm_dir, scm_file)` of a file in the checkout
    pub fn split_path(&self, path: &Path) -> (String, String) {
        let rel = self.checkout_path(path);
        match rel.rsplit_once('/') {
            Some((dir, file)) => (dir.to_string(), file.to_string()),
            None => (String::new(), rel),
        }
    }

    /// Timestamp key of a file: its path relative to the scm root
    pub fn stamp_key(&self, path: &Path) -> String {
        relative_path(&self.config.scm_root, path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }

    pub async fn file_stamp(&self, path: &Path, routine: Routine) -> Result<FileStamp> {
        self.timestamps.check(self.db, path, self.stamp_key(path), routine).await
    }

    pub fn record_stamp(&mut self, stamp: &FileStamp) {
        self.timestamps.record(stamp);
    }

    /// Staged or stored record, else a new one; location fields always
    /// follow the scanned branch.
    pub async fn get_or_create(&self, ident: &str, details: BranchDetails) -> Result<BranchRecord> {
        let mut record = match self.lookup(ident).await? {
            Some(record) => record,
            None => BranchRecord::new(ident, self.branch.repo.clone(), details.clone()),
        };
        if record.kind() != details.kind() {
            record.details = details;
        }
        record.repo = self.branch.repo.clone();
        Ok(record)
    }

    pub async fn lookup(&self, ident: &str) -> Result<Option<BranchRecord>> {
        if let Some(record) = self.unit.branch(ident) {
            return Ok(Some(record.clone()));
        }
        self.db.get_branch(ident).await
    }

    /// Register a direct child of the module branch and stage it.
    pub fn add_child(&mut self, mut record: BranchRecord) {
        record.parent = Some(self.branch.ident.clone());
        self.children.add(record.kind(), &record.ident);
        self.unit.stage_branch(record);
    }

    /// Stored children of the module branch produced from one file
    pub async fn known_children(&self, kind: BranchKind, scm_dir: &str, scm_file: &str) -> Result<Vec<BranchRecord>> {
        let children = self.db.children(&self.branch.ident, Some(kind)).await?;
        Ok(children
            .into_iter()
            .filter(|c| c.scm_dir.as_deref().unwrap_or("") == scm_dir && c.scm_file.as_deref() == Some(scm_file))
            .collect())
    }

    /// Parsed `Makefile.am`, shared between the plugins that read it
    pub async fn automake(&mut self, path: &Path) -> Result<Arc<Automake>, ParseError> {
        if let Some(parsed) = self.makefiles.get(path) {
            return Ok(Arc::clone(parsed));
        }
        let parsed = Arc::new(Automake::from_path(path).await?);
        self.makefiles.insert(path.to_path_buf(), Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Package name found by the configure plugin
    pub fn package_name(&self) -> Option<&str> {
        self.branch.package_name().filter(|n| !n.is_empty())
    }

    /// Replace `@PACKAGE_NAME@` with the package name when known
    pub fn resolve_package(&self, value: &str) -> String {
        match (value, self.package_name()) {
            ("@PACKAGE_NAME@", Some(name)) => name.to_string(),
            _ => value.to_string(),
        }
    }

    pub fn child_ident(&self, prefix: &str, name: &str) -> Option<String> {
        self.branch.child_ident(prefix, name)
    }
}
