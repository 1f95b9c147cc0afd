use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::scm::RepositoryRecord;

use super::localized::LocalizedText;

/// Kind of a branch record, stored alongside the details column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BranchKind {
    Module,
    Document,
    Translation,
    Domain,
    Application,
    Library,
    Applet,
    Capplet,
}

impl BranchKind {
    pub const ALL: [BranchKind; 8] = [
        BranchKind::Module,
        BranchKind::Document,
        BranchKind::Translation,
        BranchKind::Domain,
        BranchKind::Application,
        BranchKind::Library,
        BranchKind::Applet,
        BranchKind::Capplet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKind::Module => "Module",
            BranchKind::Document => "Document",
            BranchKind::Translation => "Translation",
            BranchKind::Domain => "Domain",
            BranchKind::Application => "Application",
            BranchKind::Library => "Library",
            BranchKind::Applet => "Applet",
            BranchKind::Capplet => "Capplet",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BranchKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BranchKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown branch kind '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentSubtype {
    GduDocbook,
    GtkDoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationSubtype {
    Intltool,
    Xml2po,
}

/// Message counts of one PO file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoStats {
    pub translated: u32,
    pub fuzzy: u32,
    pub untranslated: u32,
    pub images_translated: u32,
    pub images_fuzzy: u32,
    pub images_untranslated: u32,
}

impl PoStats {
    pub fn total(&self) -> u32 {
        self.translated + self.fuzzy + self.untranslated
    }

    /// Percentage of translated messages, 0 for an empty catalogue
    pub fn percent(&self) -> u32 {
        match self.total() {
            0 => 0,
            total => self.translated * 100 / total,
        }
    }
}

/// Per-kind extra fields, serialized into the `details` column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BranchDetails {
    Module {
        #[serde(default)]
        package_name: Option<String>,
        #[serde(default)]
        package_version: Option<String>,
    },
    Document {
        subtype: DocumentSubtype,
        #[serde(default)]
        xmlfiles: Vec<String>,
    },
    Translation {
        subtype: TranslationSubtype,
        #[serde(default)]
        stats: Option<PoStats>,
    },
    Domain,
    Application {
        #[serde(default)]
        exec: Option<String>,
    },
    Library,
    Applet {
        iid: String,
    },
    Capplet {
        #[serde(default)]
        exec: Option<String>,
    },
}

impl BranchDetails {
    pub fn kind(&self) -> BranchKind {
        match self {
            BranchDetails::Module { .. } => BranchKind::Module,
            BranchDetails::Document { .. } => BranchKind::Document,
            BranchDetails::Translation { .. } => BranchKind::Translation,
            BranchDetails::Domain => BranchKind::Domain,
            BranchDetails::Application { .. } => BranchKind::Application,
            BranchDetails::Library => BranchKind::Library,
            BranchDetails::Applet { .. } => BranchKind::Applet,
            BranchDetails::Capplet { .. } => BranchKind::Capplet,
        }
    }

    pub fn module() -> Self {
        BranchDetails::Module { package_name: None, package_version: None }
    }

    /// `Exec` line of an application or capplet
    pub fn exec(&self) -> Option<&str> {
        match self {
            BranchDetails::Application { exec } | BranchDetails::Capplet { exec } => exec.as_deref(),
            _ => None,
        }
    }
}

/// Optional field values for [`BranchRecord::extend`] and [`BranchRecord::update`]
#[derive(Debug, Clone, Default)]
pub struct BranchFields {
    pub name: Option<LocalizedText>,
    pub desc: Option<LocalizedText>,
    pub icon_dir: Option<String>,
    pub icon_name: Option<String>,
    pub scm_dir: Option<String>,
    pub scm_file: Option<String>,
}

/// A persisted branch: a module branch or one of the artifacts found in it
#[derive(Debug, Clone, PartialEq)]
pub struct BranchRecord {
    pub ident: String,
    pub parent: Option<String>,
    pub repo: RepositoryRecord,
    pub scm_dir: Option<String>,
    pub scm_file: Option<String>,
    pub name: LocalizedText,
    pub desc: LocalizedText,
    pub icon_dir: Option<String>,
    pub icon_name: Option<String>,
    pub error: Option<String>,
    pub mod_datetime: Option<i64>,
    pub mod_person: Option<String>,
    pub score: i64,
    pub score_diff: i64,
    pub updated: Option<i64>,
    pub details: BranchDetails,
}

impl BranchRecord {
    pub fn new(ident: impl Into<String>, repo: RepositoryRecord, details: BranchDetails) -> Self {
        Self {
            ident: ident.into(),
            parent: None,
            repo,
            scm_dir: None,
            scm_file: None,
            name: LocalizedText::new(),
            desc: LocalizedText::new(),
            icon_dir: None,
            icon_name: None,
            error: None,
            mod_datetime: None,
            mod_person: None,
            score: 0,
            score_diff: 0,
            updated: None,
            details,
        }
    }

    /// The module branch record for a repository location
    pub fn module(repo: RepositoryRecord) -> Result<Self, crate::error::ScmError> {
        let ident = repo.module_ident()?;
        Ok(Self::new(ident, repo, BranchDetails::module()))
    }

    pub fn kind(&self) -> BranchKind {
        self.details.kind()
    }

    /// `(server, module, branch)` components of a `/prefix/server/module/.../branch` ident
    pub fn ident_parts(&self) -> Option<(&str, &str, &str)> {
        let mut parts = self.ident.trim_start_matches('/').split('/');
        let _prefix = parts.next()?;
        let server = parts.next()?;
        let module = parts.next()?;
        let branch = parts.last()?;
        Some((server, module, branch))
    }

    /// The `<local-name>` segment of a child ident
    pub fn ident_local_name(&self) -> Option<&str> {
        let mut parts = self.ident.rsplit('/');
        let _branch = parts.next()?;
        parts.next()
    }

    /// Identifier of an artifact named `name` found in this branch
    pub fn child_ident(&self, prefix: &str, name: &str) -> Option<String> {
        let (server, module, branch) = self.ident_parts()?;
        Some(format!("/{prefix}/{server}/{module}/{name}/{branch}"))
    }

    pub fn package_name(&self) -> Option<&str> {
        match &self.details {
            BranchDetails::Module { package_name, .. } => package_name.as_deref(),
            _ => None,
        }
    }

    /// Fill in only what is still unset.
    pub fn extend(&mut self, fields: BranchFields) {
        if let Some(name) = fields.name {
            self.name.extend(&name);
        }
        if let Some(desc) = fields.desc {
            self.desc.extend(&desc);
        }
        fill(&mut self.icon_dir, fields.icon_dir);
        fill(&mut self.icon_name, fields.icon_name);
        fill(&mut self.scm_dir, fields.scm_dir);
        fill(&mut self.scm_file, fields.scm_file);
    }

    /// Overwrite every field that is given.
    pub fn update(&mut self, fields: BranchFields) {
        if let Some(name) = fields.name {
            self.name.update(&name);
        }
        if let Some(desc) = fields.desc {
            self.desc.update(&desc);
        }
        if fields.icon_dir.is_some() {
            self.icon_dir = fields.icon_dir;
        }
        if fields.icon_name.is_some() {
            self.icon_name = fields.icon_name;
        }
        if fields.scm_dir.is_some() {
            self.scm_dir = fields.scm_dir;
        }
        if fields.scm_file.is_some() {
            self.scm_file = fields.scm_file;
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.as_deref().is_none_or(str::is_empty) {
        if let Some(value) = value {
            *slot = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm::ScmKind;

    fn module_record() -> BranchRecord {
        let repo = RepositoryRecord::new(ScmKind::Git, "git://git.gnome.org/", "gedit", None, None);
        BranchRecord::module(repo).unwrap()
    }

    #[test]
    fn test_child_ident() {
        let record = module_record();
        assert_eq!(record.ident, "/mod/git.gnome.org/gedit/master");
        assert_eq!(
            record.child_ident("app", "gedit").as_deref(),
            Some("/app/git.gnome.org/gedit/gedit/master")
        );
    }

    #[test]
    fn test_ident_parts_of_child() {
        let mut record = module_record();
        record.ident = "/doc/git.gnome.org/gedit/gedit-help/master".to_string();
        assert_eq!(record.ident_parts(), Some(("git.gnome.org", "gedit", "master")));
    }

    #[test]
    fn test_extend_does_not_overwrite() {
        let mut record = module_record();
        record.name = LocalizedText::c("Editor");
        record.icon_name = Some(String::new());
        record.extend(BranchFields {
            name: Some(LocalizedText::c("Other")),
            icon_name: Some("gedit".into()),
            ..Default::default()
        });
        assert_eq!(record.name.c_text(), Some("Editor"));
        assert_eq!(record.icon_name.as_deref(), Some("gedit"));
    }

    #[test]
    fn test_update_overwrites() {
        let mut record = module_record();
        record.name = LocalizedText::c("Editor");
        record.scm_dir = Some("data".into());
        record.update(BranchFields { name: Some(LocalizedText::c("Other")), ..Default::default() });
        assert_eq!(record.name.c_text(), Some("Other"));
        assert_eq!(record.scm_dir.as_deref(), Some("data"));
    }

    #[test]
    fn test_details_roundtrip_kind() {
        let details = BranchDetails::Translation { subtype: TranslationSubtype::Xml2po, stats: None };
        let json = serde_json::to_string(&details).unwrap();
        let back: BranchDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), BranchKind::Translation);
        assert_eq!("Capplet".parse::<BranchKind>().unwrap(), BranchKind::Capplet);
    }
}
