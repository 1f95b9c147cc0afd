//! Module maintainers from the root `MAINTAINERS` file

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::model::{Entity, EntityKind, Relation, RelationKind};
use crate::routine;
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};
use crate::scm::HistorySource;

/// One stanza of a `MAINTAINERS` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub name: String,
    pub userid: String,
    pub email: Option<String>,
}

pub struct MaintainersPlugin;

#[async_trait]
impl ScanPlugin for MaintainersPlugin {
    fn name(&self) -> &'static str {
        "maintainers"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File]
    }

    async fn process_file(&mut self, ctx: &mut ScanContext<'_>, dir: &Path, basename: &str) -> Result<()> {
        if basename != "MAINTAINERS" || dir != ctx.root() {
            return Ok(());
        }
        let path = dir.join(basename);
        let stamp = ctx.file_stamp(&path, routine!("maintainers")).await?;
        if stamp.unchanged {
            debug!("Skipping file {}", stamp.path);
            return Ok(());
        }
        info!("Processing file {}", stamp.path);

        let text = match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return Ok(());
            }
        };

        let server_id = ctx.checkout.server_id();
        let mut relations = Vec::new();
        for maintainer in parse_maintainers(&text) {
            let ident = Entity::userid_ident(&maintainer.userid, &server_id);
            let mut person = match ctx.unit.entity(&ident) {
                Some(person) => person.clone(),
                None => ctx
                    .db
                    .get_entity(&ident)
                    .await?
                    .unwrap_or_else(|| Entity::new(ident.clone(), EntityKind::Person)),
            };
            person.update(Some(&maintainer.name), maintainer.email.as_deref());
            relations.push(Relation::maintainer(&ctx.branch.ident, &ident));
            ctx.unit.stage_entity(person);
        }

        let branch = ctx.branch.ident.clone();
        ctx.unit.set_relations(RelationKind::ModuleEntity, branch, relations);
        ctx.record_stamp(&stamp);
        Ok(())
    }
}

/// Stanzas separated by blank lines: a name line, then `E-mail:` and
/// `Userid:` lines. Stanzas without a userid are dropped.
pub fn parse_maintainers(text: &str) -> Vec<Maintainer> {
    let mut maintainers = Vec::new();
    let mut name: Option<String> = None;
    let mut email = None;
    let mut userid = None;

    let mut flush = |name: &mut Option<String>, email: &mut Option<String>, userid: &mut Option<String>| {
        if let (Some(n), Some(u)) = (name.take(), userid.take()) {
            maintainers.push(Maintainer { name: n, userid: u, email: email.take() });
        }
        *email = None;
    };

    for line in text.lines().map(str::trim_end) {
        if line.starts_with('#') {
            continue;
        }
        if line.is_empty() {
            flush(&mut name, &mut email, &mut userid);
            continue;
        }
        if name.is_none() {
            name = Some(line.to_string());
        } else if let Some(value) = line.strip_prefix("E-mail:") {
            email = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Userid:") {
            userid = Some(value.trim().to_string());
        }
    }
    flush(&mut name, &mut email, &mut userid);
    maintainers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_maintainers() {
        let text = "\
# Maintainers of this module
Jane Doe
E-mail: jane@example.org
Userid: jdoe

Someone Without Account
E-mail: someone@example.org

John Roe
Userid: jroe
";
        let maintainers = parse_maintainers(text);
        assert_eq!(maintainers.len(), 2);
        assert_eq!(maintainers[0].name, "Jane Doe");
        assert_eq!(maintainers[0].email.as_deref(), Some("jane@example.org"));
        assert_eq!(maintainers[1], Maintainer { name: "John Roe".into(), userid: "jroe".into(), email: None });
    }
}
