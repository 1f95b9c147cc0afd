//! gnome-doc-utils documents declared in `Makefile.am`
//!
//! Each document takes its title, description and credits from the DocBook
//! file in its `C` directory. A module with a single document lends it the
//! icon it got from its default child.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::model::{
    BranchDetails, BranchFields, BranchKind, BranchRecord, DocumentSubtype, Entity, EntityKind, LocalizedText, Relation,
    RelationKind, TranslationSubtype,
};
use crate::parsers::{Automake, Credit, DocbookInfo};
use crate::routine;
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};

use super::translations::refresh_translation_stats;

const INCLUDE: &str = "gnome-doc-utils.make";

#[derive(Default)]
pub struct GduPlugin {
    /// Documents registered in this scan
    documents: Vec<String>,
}

#[async_trait]
impl ScanPlugin for GduPlugin {
    fn name(&self) -> &'static str {
        "gdu"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File, Hook::Finish]
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
            Ok(Some(module)) if !module.trim().is_empty() => ctx.resolve_package(module.trim()),
            Ok(_) => {
                warn!("No DOC_MODULE in {}", path.display());
                return Ok(());
            }
            Err(e) => {
                warn!("Could not expand DOC_MODULE in {}: {}", path.display(), e);
                return Ok(());
            }
        };
        let Some(ident) = ctx.child_ident("doc", &doc_module) else {
            return Ok(());
        };
        debug!("Found gnome-doc-utils document {}", ident);

        let rel = ctx.checkout_path(dir);
        let scm_dir = join_rel(&rel, "C");
        let xmlfiles = match xml_files(&makefile, &doc_module) {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not expand document files in {}: {}", path.display(), e);
                vec![format!("{doc_module}.xml")]
            }
        };

        let details = BranchDetails::Document { subtype: DocumentSubtype::GduDocbook, xmlfiles: Vec::new() };
        let mut document = ctx.get_or_create(&ident, details).await?;
        document.update(BranchFields {
            scm_dir: Some(scm_dir.clone()),
            scm_file: Some(format!("{doc_module}.xml")),
            ..Default::default()
        });

        let files: Vec<String> = xmlfiles.iter().map(|f| join_rel(&scm_dir, f)).collect();
        if let Some((datetime, person)) = ctx.db.last_revision_for_files(&ctx.branch.ident, &files).await? {
            document.mod_datetime = Some(datetime);
            document.mod_person = Some(person);
        }
        if let BranchDetails::Document { subtype, xmlfiles: stored } = &mut document.details {
            *subtype = DocumentSubtype::GduDocbook;
            *stored = xmlfiles;
        }

        if makefile.contains("DOC_LINGUAS") {
            let langs = makefile.words("DOC_LINGUAS").unwrap_or_else(|e| {
                warn!("Could not expand DOC_LINGUAS in {}: {}", path.display(), e);
                Vec::new()
            });
            let mut members = Vec::with_capacity(langs.len());
            for lang in langs {
                let details = BranchDetails::Translation { subtype: TranslationSubtype::Xml2po, stats: None };
                let mut translation = ctx.get_or_create(&format!("/l10n/{lang}{ident}"), details).await?;
                if let BranchDetails::Translation { subtype, .. } = &mut translation.details {
                    *subtype = TranslationSubtype::Xml2po;
                }
                translation.parent = Some(ident.clone());
                translation.update(BranchFields {
                    scm_dir: Some(join_rel(&rel, &lang)),
                    scm_file: Some(format!("{lang}.po")),
                    ..Default::default()
                });
                refresh_translation_stats(ctx, &mut translation).await?;
                members.push(translation.ident.clone());
                ctx.unit.stage_branch(translation);
            }
            ctx.unit.reconcile(ident.clone(), BranchKind::Translation, members);
        }

        let docfile = dir.join("C").join(format!("{doc_module}.xml"));
        process_docfile(ctx, &mut document, &docfile).await?;

        self.documents.push(document.ident.clone());
        ctx.add_child(document);
        Ok(())
    }

    async fn finish(&mut self, ctx: &mut ScanContext<'_>) -> Result<()> {
        let [ident] = self.documents.as_slice() else {
            return Ok(());
        };
        if let Some(document) = ctx.unit.branch_mut(ident) {
            document.icon_dir = ctx.branch.icon_dir.clone();
            document.icon_name = ctx.branch.icon_name.clone();
        }
        Ok(())
    }
}

/// Title and description (overwriting) and credits of a document
pub(super) async fn process_docfile(ctx: &mut ScanContext<'_>, document: &mut BranchRecord, docfile: &Path) -> Result<()> {
    if !tokio::fs::try_exists(docfile).await.unwrap_or(false) {
        warn!("No such file {}", docfile.display());
        return Ok(());
    }
    let stamp = ctx.file_stamp(docfile, routine!("docbook")).await?;
    if stamp.unchanged {
        debug!("Skipping file {}", stamp.path);
        return Ok(());
    }
    info!("Processing file {}", stamp.path);

    let info = match DocbookInfo::from_path(docfile).await {
        Ok(info) => info,
        Err(e) => {
            warn!("Could not read {}: {}", docfile.display(), e);
            document.error = Some(e.to_string());
            return Ok(());
        }
    };
    document.error = None;
    document.update(BranchFields {
        name: info.title.map(LocalizedText::c),
        desc: info.desc.map(LocalizedText::c),
        ..Default::default()
    });

    let mut relations: Vec<Relation> = Vec::with_capacity(info.credits.len());
    for credit in &info.credits {
        let person = credited_entity(ctx, credit).await?;
        match relations.iter_mut().find(|r| r.pred == person.ident) {
            Some(relation) => relation.maintainer |= credit.maintainer,
            None => relations.push(Relation::credit(&document.ident, &person.ident, credit.maintainer)),
        }
        ctx.unit.stage_entity(person);
    }
    ctx.unit.set_relations(RelationKind::DocumentEntity, document.ident.clone(), relations);
    ctx.record_stamp(&stamp);
    Ok(())
}

/// The person known by the credit's email, else a ghost named after it;
/// either way only unset fields are filled in.
async fn credited_entity(ctx: &ScanContext<'_>, credit: &Credit) -> Result<Entity> {
    let known = match credit.email.as_deref() {
        Some(email) => ctx.db.entity_by_email(email).await?,
        None => None,
    };
    let mut entity = match known {
        Some(person) => ctx.unit.entity(&person.ident).cloned().unwrap_or(person),
        None => {
            let ident = Entity::ghost_ident(&credit.name);
            match ctx.unit.entity(&ident) {
                Some(ghost) => ghost.clone(),
                None => ctx.db.get_entity(&ident).await?.unwrap_or_else(|| Entity::new(ident, EntityKind::Ghost)),
            }
        }
    };
    entity.extend(Some(&credit.name), credit.email.as_deref());
    Ok(entity)
}

/// Sorted source files of a document: the main file, includes and entities
fn xml_files(makefile: &Automake, doc_module: &str) -> Result<Vec<String>, crate::error::ParseError> {
    let mut files = vec![format!("{doc_module}.xml")];
    files.extend(makefile.words("DOC_INCLUDES")?);
    files.extend(makefile.words("DOC_ENTITIES")?);
    files.sort();
    Ok(files)
}

fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() { name.to_string() } else { format!("{dir}/{name}") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_files_are_sorted() {
        let makefile = Automake::parse_str(
            "include $(top_srcdir)/gnome-doc-utils.make\n\
             DOC_MODULE = gedit\n\
             DOC_ENTITIES = legal.xml\n\
             DOC_INCLUDES = prefs.xml \\\n\tabout.xml\n",
        );
        assert!(makefile.includes(INCLUDE));
        assert_eq!(xml_files(&makefile, "gedit").unwrap(), ["about.xml", "gedit.xml", "legal.xml", "prefs.xml"]);
    }

    #[test]
    fn test_join_rel() {
        assert_eq!(join_rel("", "C"), "C");
        assert_eq!(join_rel("help", "C"), "help/C");
    }
}
