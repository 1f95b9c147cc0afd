use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scmsweep::cli::{Cli, Command};
use scmsweep::config::Config;
use scmsweep::model::{BranchKind, BranchRecord, LocalizedText};
use scmsweep::repository::Database;
use scmsweep::scanner::{ModuleScanner, SweepProgress};
use scmsweep::scm::RepositoryRecord;
use scmsweep::util::format_timestamp;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(scm_root) = &cli.scm_root {
        config.scm_root = scm_root.clone();
    }
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }

    if let Some(parent) = config.database.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    let db_path = config.database.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path).await?;
    if db.init_schema().await? {
        info!("Created database {}", config.database.display());
    }

    match &cli.command {
        Command::Add { kind, server, module, branch, path } => {
            let repo = RepositoryRecord::new(*kind, server.as_str(), module.as_str(), branch.as_deref(), path.as_deref());
            repo.validate()?;
            let mut record = BranchRecord::module(repo)?;
            if let Some(existing) = db.get_branch(&record.ident).await? {
                info!(
                    "{} is already registered, last changed {}",
                    record.ident,
                    format_timestamp(existing.mod_datetime.unwrap_or(0))
                );
                return Ok(());
            }
            record.name = LocalizedText::c(module.as_str());
            db.save_branch(&record).await?;
            info!("Registered {}", record.ident);
        }
        Command::Sweep { pattern } => sweep(&db, &config, &cli, pattern.as_deref()).await?,
    }

    Ok(())
}

/// Scan every matching module branch, continuing past failures.
async fn sweep(db: &Database, config: &Config, cli: &Cli, pattern: Option<&str>) -> Result<()> {
    let branches = db.select_branches(BranchKind::Module, pattern).await?;
    if branches.is_empty() {
        warn!("No module branches match {}", pattern.unwrap_or("%"));
        return Ok(());
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current branch");
                cancelled.store(true, Ordering::SeqCst);
            }
        });
    }

    let progress = SweepProgress::new(branches.len() as u64, cli.verbose);
    let scanner = ModuleScanner::new(db, config, cli.scan_options()).with_progress(&progress);

    for branch in branches {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        let ident = branch.ident.clone();
        match scanner.scan(branch).await {
            Ok(report) if report.is_ok() => {}
            Ok(report) => warn!("{} failed: {}", ident, report.error.unwrap_or_default()),
            Err(e) => error!("{} failed: {:#}", ident, e),
        }
    }
    progress.finish();

    info!("Scanned {} module branches, {} failed", progress.scanned(), progress.failed());
    Ok(())
}
