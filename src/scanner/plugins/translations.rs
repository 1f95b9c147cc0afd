//! PO statistics of translation records

use anyhow::Result;
use tracing::{debug, warn};

use crate::model::{BranchDetails, BranchRecord};
use crate::parsers::Po;
use crate::routine;
use crate::scanner::context::ScanContext;

/// Re-read the PO file of `translation` when it changed since the last scan.
///
/// A missing or unreadable file is recorded on the translation.
pub async fn refresh_translation_stats(ctx: &mut ScanContext<'_>, translation: &mut BranchRecord) -> Result<()> {
    let BranchDetails::Translation { stats, .. } = &mut translation.details else {
        return Ok(());
    };
    let mut path = ctx.root();
    if let Some(dir) = translation.scm_dir.as_deref().filter(|d| !d.is_empty()) {
        path.push(dir);
    }
    let Some(file) = translation.scm_file.as_deref() else {
        return Ok(());
    };
    path.push(file);

    if !path.is_file() {
        debug!("No PO file for {}", translation.ident);
        translation.error = Some(format!("Missing {file}"));
        return Ok(());
    }

    let stamp = ctx.file_stamp(&path, routine!("po-stats")).await?;
    if stamp.unchanged && stats.is_some() {
        debug!("Skipping file {}", stamp.path);
        return Ok(());
    }

    match Po::from_path(&path).await {
        Ok(po) => {
            *stats = Some(po.stats());
            translation.error = None;
            translation.updated = Some(ctx.now);
            ctx.record_stamp(&stamp);
        }
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            translation.error = Some(e.to_string());
        }
    }
    Ok(())
}
