mod branch;
mod entity;
mod localized;
mod output;
mod relation;
mod revision;

pub use branch::{
    BranchDetails, BranchFields, BranchKind, BranchRecord, DocumentSubtype, PoStats, TranslationSubtype,
};
pub use entity::{Entity, EntityKind};
pub use localized::{C_LOCALE, LocalizedText};
pub use output::{OutputFile, output_path};
pub use relation::{Relation, RelationKind};
pub use revision::{AuthorIdentity, Commit, CommitFile, RevisionRecord};
