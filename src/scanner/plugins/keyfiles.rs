//! Desktop entries (`*.desktop.in`) of applications and control-panel
//! capplets

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::model::{BranchDetails, BranchFields, BranchKind, Relation, RelationKind};
use crate::parsers::KeyFile;
use crate::routine;
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};
use crate::util::strip_suffixes;

use super::tool_or_raw;

static DESKTOP_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*\.desktop(\.in)+$").unwrap());

const GROUP: &str = "Desktop Entry";

/// Applications found during the walk, completed in post-processing
#[derive(Default)]
pub struct KeyFilesPlugin {
    /// (application ident, icon name)
    icons: Vec<(String, String)>,
    /// (application ident, document ident)
    docs: Vec<(String, String)>,
}

#[async_trait]
impl ScanPlugin for KeyFilesPlugin {
    fn name(&self) -> &'static str {
        "keyfiles"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File, Hook::PostProcess]
    }

    fn produces(&self) -> &'static [BranchKind] {
        &[BranchKind::Application, BranchKind::Capplet]
    }

    async fn process_file(&mut self, ctx: &mut ScanContext<'_>, dir: &Path, basename: &str) -> Result<()> {
        if !DESKTOP_FILE.is_match(basename) {
            return Ok(());
        }
        let path = dir.join(basename);
        let (scm_dir, scm_file) = ctx.split_path(&path);

        let stamp = ctx.file_stamp(&path, routine!("desktop-entry")).await?;
        if stamp.unchanged {
            debug!("Skipping file {}", stamp.path);
            for kind in [BranchKind::Application, BranchKind::Capplet] {
                for app in ctx.known_children(kind, &scm_dir, &scm_file).await? {
                    ctx.add_child(app);
                }
            }
            return Ok(());
        }
        info!("Processing file {}", stamp.path);

        let rel = ctx.checkout_path(&path);
        let text = match tool_or_raw(ctx, "intltool-merge", &["-d", "-q", "-u", "po", rel.as_str(), "-"], &path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return Ok(());
            }
        };
        let keyfile = match KeyFile::parse_str(&text) {
            Ok(keyfile) => keyfile,
            Err(e) => {
                warn!("Could not parse {}: {}", stamp.path, e);
                return Ok(());
            }
        };
        if keyfile.get(GROUP, "Type") != Some("Application") {
            return Ok(());
        }

        let local_name = strip_suffixes(basename, &[".desktop.in.in", ".desktop.in"]);
        let exec = keyfile.get(GROUP, "Exec").map(|e| ctx.resolve_package(e));
        let (prefix, details) = if keyfile.get_list(GROUP, "Categories").contains(&"Settings") {
            ("capplet", BranchDetails::Capplet { exec })
        } else {
            ("app", BranchDetails::Application { exec })
        };
        let Some(ident) = ctx.child_ident(prefix, local_name) else {
            return Ok(());
        };

        let mut app = ctx.get_or_create(&ident, details.clone()).await?;
        app.details = details;
        app.update(BranchFields {
            name: keyfile.localized(GROUP, "Name").cloned(),
            desc: keyfile.localized(GROUP, "Comment").cloned(),
            scm_dir: Some(scm_dir),
            scm_file: Some(scm_file),
            ..Default::default()
        });

        if let Some(icon) = keyfile.get(GROUP, "Icon") {
            self.icons.push((ident.clone(), ctx.resolve_package(icon)));
        }
        let docid = match keyfile.get(GROUP, "X-GNOME-DocPath") {
            Some(path) => path.split('/').next().unwrap_or_default(),
            None => local_name,
        };
        if !docid.is_empty() {
            if let Some(doc) = ctx.child_ident("doc", docid) {
                self.docs.push((ident.clone(), doc));
            }
        }

        ctx.record_stamp(&stamp);
        ctx.add_child(app);
        Ok(())
    }

    async fn post_process(&mut self, ctx: &mut ScanContext<'_>) -> Result<()> {
        let icons_dir = ctx.config.icons_dir();
        for (ident, icon) in std::mem::take(&mut self.icons) {
            let images = &ctx.images;
            let Some(app) = ctx.unit.branch_mut(&ident) else {
                continue;
            };
            if let Err(e) = images.locate_icon(app, &icon, &icons_dir).await {
                warn!("Could not copy icon {} for {}: {}", icon, ident, e);
            }
        }

        for (ident, doc) in std::mem::take(&mut self.docs) {
            if ctx.lookup(&doc).await?.is_some() {
                let relation = Relation::documentation(&ident, &doc);
                ctx.unit.set_relations(RelationKind::Documentation, ident, vec![relation]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_file_pattern() {
        assert!(DESKTOP_FILE.is_match("gedit.desktop.in"));
        assert!(DESKTOP_FILE.is_match("gedit.desktop.in.in"));
        assert!(!DESKTOP_FILE.is_match("gedit.desktop"));
        assert_eq!(strip_suffixes("gedit.desktop.in.in", &[".desktop.in.in", ".desktop.in"]), "gedit");
    }
}
