//! intltool translation domains: `POTFILES.in` marks a domain, `LINGUAS`
//! next to it lists its translations.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::model::{BranchDetails, BranchFields, BranchKind, TranslationSubtype};
use crate::routine;
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};
use crate::util::base_name;

use super::translations::refresh_translation_stats;

pub struct IntltoolPlugin;

#[async_trait]
impl ScanPlugin for IntltoolPlugin {
    fn name(&self) -> &'static str {
        "intltool"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File]
    }

    fn produces(&self) -> &'static [BranchKind] {
        &[BranchKind::Domain]
    }

    async fn process_file(&mut self, ctx: &mut ScanContext<'_>, dir: &Path, basename: &str) -> Result<()> {
        if basename != "POTFILES.in" {
            return Ok(());
        }

        let scm_dir = ctx.checkout_path(dir);
        let podir = match base_name(&scm_dir) {
            "" => ctx.branch.repo.module.clone(),
            name => name.to_string(),
        };
        let Some(ident) = ctx.child_ident("i18n", &podir) else {
            return Ok(());
        };

        let mut domain = ctx.get_or_create(&ident, BranchDetails::Domain).await?;
        domain.update(BranchFields { scm_dir: Some(scm_dir.clone()), ..Default::default() });

        let linguas = dir.join("LINGUAS");
        if !linguas.is_file() {
            warn!("No LINGUAS file in {}", scm_dir);
            domain.error = Some("No LINGUAS file".to_string());
            ctx.add_child(domain);
            return Ok(());
        }
        domain.error = None;

        let stamp = ctx.file_stamp(&linguas, routine!("linguas")).await?;
        if stamp.unchanged {
            debug!("Skipping file {}", stamp.path);
            for mut translation in ctx.db.children(&ident, Some(BranchKind::Translation)).await? {
                refresh_translation_stats(ctx, &mut translation).await?;
                ctx.unit.stage_branch(translation);
            }
            ctx.add_child(domain);
            return Ok(());
        }
        info!("Processing file {}", stamp.path);

        let langs = match tokio::fs::read_to_string(&linguas).await {
            Ok(text) => parse_linguas(&text),
            Err(e) => {
                warn!("Could not read {}: {}", linguas.display(), e);
                domain.error = Some(e.to_string());
                ctx.add_child(domain);
                return Ok(());
            }
        };

        let mut members = Vec::with_capacity(langs.len());
        for lang in langs {
            let details = BranchDetails::Translation { subtype: TranslationSubtype::Intltool, stats: None };
            let mut translation = ctx.get_or_create(&format!("/l10n/{lang}{ident}"), details).await?;
            if let BranchDetails::Translation { subtype, .. } = &mut translation.details {
                *subtype = TranslationSubtype::Intltool;
            }
            translation.parent = Some(ident.clone());
            translation.update(BranchFields {
                scm_dir: Some(scm_dir.clone()),
                scm_file: Some(format!("{lang}.po")),
                ..Default::default()
            });
            refresh_translation_stats(ctx, &mut translation).await?;
            members.push(translation.ident.clone());
            ctx.unit.stage_branch(translation);
        }

        ctx.unit.reconcile(ident, BranchKind::Translation, members);
        ctx.record_stamp(&stamp);
        ctx.add_child(domain);
        Ok(())
    }
}

/// Language codes of a `LINGUAS` file, `#` lines skipped
pub fn parse_linguas(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linguas() {
        let text = "# please keep this list sorted\nde fr\n\nja\n";
        assert_eq!(parse_linguas(text), ["de", "fr", "ja"]);
    }
}
