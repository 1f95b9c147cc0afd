//! gtk-doc reference manuals declared in `Makefile.am`
//!
//! The main SGML file is read like a gnome-doc-utils document.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

use crate::model::{BranchDetails, BranchFields, BranchKind, DocumentSubtype};
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};

use super::gdu::process_docfile;

const INCLUDE: &str = "gtk-doc.make";

pub struct GtkDocPlugin;

#[async_trait]
impl ScanPlugin for GtkDocPlugin {
    fn name(&self) -> &'static str {
        "gtkdoc"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File]
    }

    fn produces(&self) -> &'static [BranchKind] {
        &[BranchKind::Document]
    }

    async fn process_file(&mut self, ctx: &mut ScanContext<'_>, dir: &Path, basename: &str) -> Result<()> {
        if basename != "Makefile.am" {
            return Ok(());
        }
        let path = dir.join(basename);
        let makefile = match ctx.automake(&path).await {
            Ok(makefile) => makefile,
            Err(e) => {
                warn!("Could not parse {}: {}", path.display(), e);
                return Ok(());
            }
        };
        if !makefile.includes(INCLUDE) {
            return Ok(());
        }

        let doc_module = match makefile.expanded("DOC_MODULE") {
            Ok(Some(module)) if !module.trim().is_empty() => module.trim().to_string(),
            Ok(_) => {
                warn!("No DOC_MODULE in {}", path.display());
                return Ok(());
            }
            Err(e) => {
                warn!("Could not expand DOC_MODULE in {}: {}", path.display(), e);
                return Ok(());
            }
        };
        let Some(ident) = ctx.child_ident("ref", &doc_module) else {
            return Ok(());
        };
        debug!("Found gtk-doc manual {}", ident);

        let main_file = match makefile.expanded("DOC_MAIN_SGML_FILE") {
            Ok(Some(file)) if !file.trim().is_empty() => file.trim().to_string(),
            Ok(_) => format!("{doc_module}-docs.sgml"),
            Err(e) => {
                warn!("Could not expand DOC_MAIN_SGML_FILE in {}: {}", path.display(), e);
                format!("{doc_module}-docs.sgml")
            }
        };

        let details = BranchDetails::Document { subtype: DocumentSubtype::GtkDoc, xmlfiles: Vec::new() };
        let mut document = ctx.get_or_create(&ident, details).await?;
        if let BranchDetails::Document { subtype, .. } = &mut document.details {
            *subtype = DocumentSubtype::GtkDoc;
        }
        let docfile = dir.join(&main_file);
        document.update(BranchFields {
            scm_dir: Some(ctx.checkout_path(dir)),
            scm_file: Some(main_file),
            ..Default::default()
        });
        process_docfile(ctx, &mut document, &docfile).await?;
        ctx.add_child(document);
        Ok(())
    }
}
