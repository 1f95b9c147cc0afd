//! Panel applets described by OAF server files (`*.server.in`)

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::model::{BranchDetails, BranchFields, BranchKind, C_LOCALE, LocalizedText};
use crate::routine;
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};

use super::tool_or_raw;

static SERVER_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*\.server(\.in)+$").unwrap());
static SERVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<oaf_server\b([^>]*)>(.*?)</oaf_server>").unwrap());
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<oaf_attribute\b([^>]*?)(?:/>|>(.*?)</oaf_attribute>)").unwrap());
static ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<item\b([^>]*?)/?>").unwrap());
static XML_ATTR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"([\w:]+)\s*=\s*"([^"]*)""#).unwrap());

const APPLET_SHELL: &str = "IDL:GNOME/Vertigo/PanelAppletShell:1.0";

/// A panel applet entry of a server file
#[derive(Debug, Clone, PartialEq)]
pub struct OafApplet {
    /// `iid` without the `OAFIID:` and `GNOME_` prefixes
    pub iid: String,
    pub name: LocalizedText,
    pub desc: LocalizedText,
    pub icon: String,
}

#[derive(Default)]
pub struct AppletsPlugin {
    files: Vec<PathBuf>,
}

#[async_trait]
impl ScanPlugin for AppletsPlugin {
    fn name(&self) -> &'static str {
        "applets"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File, Hook::PostProcess]
    }

    fn produces(&self) -> &'static [BranchKind] {
        &[BranchKind::Applet]
    }

    async fn process_file(&mut self, _ctx: &mut ScanContext<'_>, dir: &Path, basename: &str) -> Result<()> {
        if SERVER_FILE.is_match(basename) {
            self.files.push(dir.join(basename));
        }
        Ok(())
    }

    async fn post_process(&mut self, ctx: &mut ScanContext<'_>) -> Result<()> {
        for path in std::mem::take(&mut self.files) {
            process_server_file(ctx, &path).await?;
        }
        Ok(())
    }
}

async fn process_server_file(ctx: &mut ScanContext<'_>, path: &Path) -> Result<()> {
    let (scm_dir, scm_file) = ctx.split_path(path);
    let stamp = ctx.file_stamp(path, routine!("oaf-server")).await?;
    if stamp.unchanged {
        debug!("Skipping file {}", stamp.path);
        for applet in ctx.known_children(BranchKind::Applet, &scm_dir, &scm_file).await? {
            ctx.add_child(applet);
        }
        return Ok(());
    }
    info!("Processing file {}", stamp.path);

    let rel = ctx.checkout_path(path);
    let text = match tool_or_raw(ctx, "intltool-merge", &["-x", "-q", "-u", "po", rel.as_str(), "-"], path).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not process file {}: {}", stamp.path, e);
            return Ok(());
        }
    };

    let icons_dir = ctx.config.icons_dir();
    for found in parse_applets(&text) {
        let Some(ident) = ctx.child_ident("applet", &found.iid) else {
            continue;
        };
        let details = BranchDetails::Applet { iid: found.iid.clone() };
        let mut applet = ctx.get_or_create(&ident, details.clone()).await?;
        applet.details = details;
        applet.update(BranchFields {
            name: Some(found.name),
            desc: Some(found.desc),
            scm_dir: Some(scm_dir.clone()),
            scm_file: Some(scm_file.clone()),
            ..Default::default()
        });
        if let Err(e) = ctx.images.locate_icon(&mut applet, &found.icon, &icons_dir).await {
            warn!("Could not copy icon {} for {}: {}", found.icon, ident, e);
        }
        ctx.add_child(applet);
    }

    ctx.record_stamp(&stamp);
    Ok(())
}

/// Panel applets with an icon among the servers of an OAF file
pub fn parse_applets(text: &str) -> Vec<OafApplet> {
    let mut applets = Vec::new();
    for server in SERVER.captures_iter(text) {
        let Some(iid) = xml_attr(&server[1], "iid").filter(|i| !i.is_empty()) else {
            continue;
        };
        let iid = iid.strip_prefix("OAFIID:").unwrap_or(&iid);
        let iid = iid.strip_prefix("GNOME_").unwrap_or(iid).to_string();

        let mut is_applet = false;
        let mut name = LocalizedText::new();
        let mut desc = LocalizedText::new();
        let mut icon = None;
        for attribute in ATTRIBUTE.captures_iter(&server[2]) {
            let head = &attribute[1];
            let lang = xml_attr(head, "xml:lang").filter(|l| !l.is_empty());
            let lang = lang.as_deref().unwrap_or(C_LOCALE);
            let value = xml_attr(head, "value").filter(|v| !v.is_empty());
            match xml_attr(head, "name").as_deref() {
                Some("repo_ids") => {
                    let items = attribute.get(2).map(|m| m.as_str()).unwrap_or_default();
                    is_applet = ITEM
                        .captures_iter(items)
                        .any(|item| xml_attr(&item[1], "value").as_deref() == Some(APPLET_SHELL));
                }
                Some("name") => {
                    if let Some(value) = value {
                        name.insert(lang, value);
                    }
                }
                Some("description") => {
                    if let Some(value) = value {
                        desc.insert(lang, value);
                    }
                }
                Some("panel:icon") => icon = value,
                _ => {}
            }
        }

        if let (true, Some(icon)) = (is_applet, icon) {
            applets.push(OafApplet { iid, name, desc, icon });
        }
    }
    applets
}

/// Value of an XML attribute; intltool's `_name` source form counts as `name`.
fn xml_attr(head: &str, key: &str) -> Option<String> {
    XML_ATTR
        .captures_iter(head)
        .find(|caps| {
            let name = &caps[1];
            name == key || name.strip_prefix('_') == Some(key)
        })
        .map(|caps| unescape(&caps[2]))
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
