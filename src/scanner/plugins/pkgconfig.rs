//! pkg-config templates (`*.pc.in`) describe the libraries of a module

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::model::{BranchDetails, BranchFields, BranchKind, LocalizedText, Relation, RelationKind};
use crate::routine;
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};

static PC_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*)\.pc(\.in)+$").unwrap());
static VERSIONED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)-\d+(\d\d+)?").unwrap());

#[derive(Default)]
pub struct PkgConfigPlugin {
    files: Vec<PathBuf>,
}

#[async_trait]
impl ScanPlugin for PkgConfigPlugin {
    fn name(&self) -> &'static str {
        "pkgconfig"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File, Hook::PostProcess]
    }

    fn produces(&self) -> &'static [BranchKind] {
        &[BranchKind::Library]
    }

    async fn process_file(&mut self, _ctx: &mut ScanContext<'_>, dir: &Path, basename: &str) -> Result<()> {
        if PC_FILE.is_match(basename) {
            self.files.push(dir.join(basename));
        }
        Ok(())
    }

    async fn post_process(&mut self, ctx: &mut ScanContext<'_>) -> Result<()> {
        for path in std::mem::take(&mut self.files) {
            process_pc_file(ctx, &path).await?;
        }
        Ok(())
    }
}

async fn process_pc_file(ctx: &mut ScanContext<'_>, path: &Path) -> Result<()> {
    let Some(basename) = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| PC_FILE.captures(n))
        .map(|caps| caps[1].to_string())
    else {
        return Ok(());
    };
    if basename.contains("-uninstalled") {
        return Ok(());
    }

    let (scm_dir, scm_file) = ctx.split_path(path);
    let stamp = ctx.file_stamp(path, routine!("pc-file")).await?;
    if stamp.unchanged {
        debug!("Skipping file {}", stamp.path);
        for lib in ctx.known_children(BranchKind::Library, &scm_dir, &scm_file).await? {
            ctx.add_child(lib);
        }
        return Ok(());
    }
    info!("Processing file {}", stamp.path);

    let text = match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return Ok(());
        }
    };
    let (name, desc) = parse_pc(&text);
    if name.is_empty() {
        debug!("No Name in {}", stamp.path);
        return Ok(());
    }

    let Some(ident) = ctx.child_ident("lib", &basename) else {
        return Ok(());
    };
    let mut lib = ctx.get_or_create(&ident, BranchDetails::Library).await?;
    lib.update(BranchFields {
        name: Some(LocalizedText::c(ctx.resolve_package(&name))),
        desc: Some(LocalizedText::c(desc)),
        scm_dir: Some(scm_dir),
        scm_file: Some(scm_file),
        ..Default::default()
    });

    if let Some(doc) = reference_doc(ctx, &basename).await? {
        ctx.unit
            .set_relations(RelationKind::Documentation, ident.clone(), vec![Relation::documentation(&ident, doc)]);
    }

    ctx.record_stamp(&stamp);
    ctx.add_child(lib);
    Ok(())
}

/// `/ref/` document of a library, trying the name without its version
async fn reference_doc(ctx: &ScanContext<'_>, basename: &str) -> Result<Option<String>> {
    let mut candidates = Vec::with_capacity(2);
    candidates.extend(ctx.child_ident("ref", basename));
    if let Some(caps) = VERSIONED.captures(basename) {
        candidates.extend(ctx.child_ident("ref", &caps[1]));
    }
    for ident in candidates {
        if ctx.lookup(&ident).await?.is_some() {
            return Ok(Some(ident));
        }
    }
    Ok(None)
}

/// `Name:` and `Description:` of a pkg-config file
pub fn parse_pc(text: &str) -> (String, String) {
    let mut name = String::new();
    let mut desc = String::new();
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("Name:") {
            name = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Description:") {
            desc = value.trim().to_string();
        }
    }
    (name, desc)
}
