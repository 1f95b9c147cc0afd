//! Module branch scanner
//!
//! Brings a checkout up to date, imports its history and walks it with the
//! registered plugins, then commits everything found as one unit of work.
//!
//! # Architecture
//!
//! - **context**: per-scan state shared by the plugins
//! - **plugin**: the `ScanPlugin` trait and the ordered registry
//! - **plugins**: the extraction plugins
//! - **children**: discovered children and default-child selection
//! - **timestamps**: per-(file, routine) skip stamps
//! - **images**: PNG catalogue and icon lookup
//! - **activity**: weekly commit activity and scores
//! - **progress**: per-branch phase bars and the sweep counter

mod activity;
mod children;
mod context;
mod images;
mod plugin;
pub mod plugins;
mod progress;
mod timestamps;

pub use activity::{ACTIVITY_FILE, ActivitySeries, GRAPHS, update_activity};
pub use children::{ChildSet, default_child};
pub use context::ScanContext;
pub use images::{ImageCatalog, THEMED_ICON_DIR, image_dimensions};
pub use plugin::{Hook, PluginRegistry, ScanPlugin};
pub use progress::{NoopProgress, Phase, PhaseHandle, ProgressReporter, SweepProgress};
pub use timestamps::{FileStamp, Routine, TimestampCache};

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::history::{HistoryImporter, ImportReport};
use crate::model::{BranchKind, BranchRecord, LocalizedText};
use crate::repository::Database;
use crate::scm::{Checkout, CheckoutLock, ToolRunner};

/// Directories never descended into, besides the VCS metadata directory
const PRUNED_DIRS: &[&str] = &["examples", "test", "tests"];

/// Switches for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Import history and recompute activity
    pub history: bool,
    /// Skip files whose stamp is current
    pub timestamps: bool,
    /// Update existing checkouts
    pub update: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { history: true, timestamps: true, update: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Start,
    CheckoutReady,
    Walking,
    PostProcessing,
    Reconciling,
    Done,
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Start => "start",
            ScanState::CheckoutReady => "checkout-ready",
            ScanState::Walking => "walking",
            ScanState::PostProcessing => "post-processing",
            ScanState::Reconciling => "reconciling",
            ScanState::Done => "done",
            ScanState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of scanning one module branch
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub ident: String,
    pub state: ScanState,
    /// Message stored on the branch when the scan failed
    pub error: Option<String>,
    /// Children registered by the walk
    pub children: usize,
    /// Branches removed by reconciliation, descendants included
    pub deleted: usize,
    pub history: Option<ImportReport>,
}

impl ScanReport {
    fn new(ident: &str) -> Self {
        Self {
            ident: ident.to_string(),
            state: ScanState::Start,
            error: None,
            children: 0,
            deleted: 0,
            history: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state == ScanState::Done
    }
}

/// Scans module branches one at a time
pub struct ModuleScanner<'a> {
    db: &'a Database,
    config: &'a Config,
    options: ScanOptions,
    progress: &'a dyn ProgressReporter,
}

impl<'a> ModuleScanner<'a> {
    pub fn new(db: &'a Database, config: &'a Config, options: ScanOptions) -> Self {
        Self { db, config, options, progress: &NoopProgress }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Scan with the default plugins
    pub async fn scan(&self, branch: BranchRecord) -> Result<ScanReport> {
        self.scan_with(branch, plugins::default_plugins()).await
    }

    /// Scan one module branch.
    ///
    /// Failures of the checkout, a plugin or the final commit are stored on
    /// the branch and reported in the returned [`ScanReport`]; `Err` is only
    /// returned when that error could not be stored either.
    pub async fn scan_with(&self, branch: BranchRecord, registry: PluginRegistry) -> Result<ScanReport> {
        let ident = branch.ident.clone();
        let report = self.run(branch, registry).await;
        let state = report.as_ref().map_or(ScanState::Failed, |r| r.state);
        self.progress.branch_done(&ident, state);
        report
    }

    async fn run(&self, branch: BranchRecord, mut registry: PluginRegistry) -> Result<ScanReport> {
        let mut report = ScanReport::new(&branch.ident);
        info!(branch = %branch.ident, "scanning");

        let runner = ToolRunner::new(self.config.tool_timeout());
        let mut checkout = match Checkout::new(branch.repo.clone(), &self.config.scm_root, runner) {
            Ok(checkout) => checkout,
            Err(e) => return self.fail(report, branch, e.branch_message()).await,
        };

        let _lock = match CheckoutLock::acquire(&checkout.module_dir(), &branch.repo.branch).await {
            Ok(lock) => lock,
            Err(e) => return self.fail(report, branch, e.branch_message()).await,
        };

        checkout.ensure(self.options.update).await;
        if let Some(error) = checkout.error() {
            let error = error.to_string();
            return self.fail(report, branch, error).await;
        }
        transition(&mut report, ScanState::CheckoutReady);

        let mut ctx = ScanContext::new(self.db, self.config, self.options, &checkout, branch);
        ctx.branch.error = None;

        if self.options.history {
            let mut importer = HistoryImporter::with_progress(self.db, self.progress);
            match importer.import_history(&mut ctx.branch, ctx.checkout).await {
                Ok(imported) => report.history = Some(imported),
                Err(e) => {
                    warn!(branch = %ctx.branch.ident, error = %e, "history import failed");
                    ctx.branch.error = Some(format!("{e:#}"));
                }
            }
            let web_root = &self.config.web_files_root;
            if let Err(e) = update_activity(self.db, &mut ctx.branch, &mut ctx.unit, web_root, self.options.timestamps, ctx.now).await {
                warn!(branch = %ctx.branch.ident, error = %e, "activity update failed");
            }
        }

        if let Err(e) = self.walk(&mut ctx, &mut registry, &mut report).await {
            return self.fail(report, ctx.branch, format!("{e:#}")).await;
        }

        transition(&mut report, ScanState::Done);
        Ok(report)
    }

    /// Walk, post-process, reconcile and commit
    async fn walk(&self, ctx: &mut ScanContext<'_>, registry: &mut PluginRegistry, report: &mut ScanReport) -> Result<()> {
        transition(report, ScanState::Walking);
        for kind in registry.produces() {
            ctx.children.declare(kind);
        }

        for plugin in registry.with_hook(Hook::Prepare) {
            plugin.prepare(ctx).await.with_context(|| format!("{} plugin failed", plugin.name()))?;
        }

        let files = collect_files(ctx.root(), ctx.checkout.ignore_dir()).await?;
        let handle = self.progress.phase(&ctx.branch.ident, Phase::Walk, files.len() as u64);
        for path in &files {
            handle.inc(1);
            let (Some(dir), Some(basename)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) else {
                continue;
            };
            handle.set_message(basename);
            for plugin in registry.with_hook(Hook::File) {
                plugin
                    .process_file(ctx, dir, basename)
                    .await
                    .with_context(|| format!("{} plugin failed on {}", plugin.name(), path.display()))?;
            }
        }
        handle.finish();
        debug!(branch = %ctx.branch.ident, files = files.len(), "walk finished");

        transition(report, ScanState::PostProcessing);
        for plugin in registry.with_hook(Hook::PostProcess) {
            plugin.post_process(ctx).await.with_context(|| format!("{} plugin failed", plugin.name()))?;
        }

        transition(report, ScanState::Reconciling);
        let reconciles: Vec<(BranchKind, Vec<String>)> =
            ctx.children.iter().map(|(kind, members)| (kind, members.to_vec())).collect();
        for (kind, members) in reconciles {
            ctx.unit.reconcile(ctx.branch.ident.clone(), kind, members);
        }
        report.children = ctx.children.len();

        apply_default_child(ctx);
        for plugin in registry.with_hook(Hook::Finish) {
            plugin.finish(ctx).await.with_context(|| format!("{} plugin failed", plugin.name()))?;
        }
        ctx.branch.updated = Some(ctx.now);

        ctx.timestamps.drain_into(&mut ctx.unit);
        ctx.unit.stage_branch(ctx.branch.clone());

        let summary = self
            .db
            .apply_unit(&ctx.unit, &self.config.web_files_root)
            .await
            .context("Failed to commit scan results")?;
        report.deleted = summary.deleted;
        info!(
            branch = %ctx.branch.ident,
            children = report.children,
            saved = summary.saved,
            deleted = summary.deleted,
            "scan committed"
        );
        Ok(())
    }

    async fn fail(&self, mut report: ScanReport, mut branch: BranchRecord, error: String) -> Result<ScanReport> {
        warn!(branch = %branch.ident, state = %report.state, error = %error, "scan failed");
        branch.error = Some(error.clone());
        if self.db.get_branch(&branch.ident).await?.is_some() {
            self.db.set_branch_error(&branch.ident, Some(&error)).await?;
        } else {
            self.db.save_branch(&branch).await?;
        }
        report.error = Some(error);
        transition(&mut report, ScanState::Failed);
        Ok(report)
    }
}

fn transition(report: &mut ScanReport, state: ScanState) {
    debug!(branch = %report.ident, from = %report.state, to = %state, "scan state");
    report.state = state;
}

/// Module display name, description and icon from its default child
fn apply_default_child(ctx: &mut ScanContext<'_>) {
    let staged = |kind: BranchKind| -> Vec<&BranchRecord> {
        ctx.children.get(kind).iter().filter_map(|ident| ctx.unit.branch(ident)).collect()
    };
    let apps = staged(BranchKind::Application);
    let applets = staged(BranchKind::Applet);
    let capplets = staged(BranchKind::Capplet);
    let module = ctx.branch.repo.module.clone();

    match default_child(&module, &apps, &applets, &capplets) {
        Some(child) => {
            debug!(branch = %ctx.branch.ident, child = %child.ident, "default child");
            let (name, desc) = (child.name.clone(), child.desc.clone());
            let (icon_dir, icon_name) = (child.icon_dir.clone(), child.icon_name.clone());
            ctx.branch.name = name;
            ctx.branch.desc = desc;
            ctx.branch.icon_dir = icon_dir;
            ctx.branch.icon_name = icon_name;
        }
        None => {
            ctx.branch.name = LocalizedText::c(module);
            ctx.branch.desc = LocalizedText::new();
            ctx.branch.icon_dir = None;
            ctx.branch.icon_name = None;
        }
    }
}

/// Regular files of a checkout in sorted order, pruning VCS metadata and
/// example or test trees.
pub async fn collect_files(root: PathBuf, ignore_dir: &'static str) -> Result<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || walk_sorted(&root, ignore_dir))
        .await
        .context("File walk panicked")
}

fn walk_sorted(root: &Path, ignore_dir: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            name != ignore_dir && !PRUNED_DIRS.contains(&name.as_ref())
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_walk_prunes_and_sorts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for path in ["b/Makefile.am", "a.txt", ".git/config", "tests/x.desktop.in", "po/LINGUAS", "docs/examples/y"] {
            let path = root.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }

        let files: Vec<String> = walk_sorted(root, ".git")
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, ["a.txt", "b/Makefile.am", "po/LINGUAS"]);
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert!(options.history && options.timestamps && options.update);
    }
}
