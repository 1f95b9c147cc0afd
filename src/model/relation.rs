use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Application or library to its documentation
    Documentation,
    /// Module branch to a person working on it
    ModuleEntity,
    /// Document to a person credited in it
    DocumentEntity,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Documentation => "Documentation",
            RelationKind::ModuleEntity => "ModuleEntity",
            RelationKind::DocumentEntity => "DocumentEntity",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Documentation" => Ok(RelationKind::Documentation),
            "ModuleEntity" => Ok(RelationKind::ModuleEntity),
            "DocumentEntity" => Ok(RelationKind::DocumentEntity),
            other => Err(anyhow::anyhow!("unknown relation kind '{other}'")),
        }
    }
}

/// A directed link between two records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    pub subj: String,
    pub pred: String,
    pub maintainer: bool,
}

impl Relation {
    pub fn documentation(subj: impl Into<String>, doc: impl Into<String>) -> Self {
        Self { kind: RelationKind::Documentation, subj: subj.into(), pred: doc.into(), maintainer: false }
    }

    pub fn maintainer(branch: impl Into<String>, person: impl Into<String>) -> Self {
        Self { kind: RelationKind::ModuleEntity, subj: branch.into(), pred: person.into(), maintainer: true }
    }

    pub fn credit(doc: impl Into<String>, person: impl Into<String>, maintainer: bool) -> Self {
        Self { kind: RelationKind::DocumentEntity, subj: doc.into(), pred: person.into(), maintainer }
    }
}
