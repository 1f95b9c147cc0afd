use time::OffsetDateTime;

use super::entity::{Entity, EntityKind};

/// Who wrote a commit, as reported by the version control system
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorIdentity {
    pub userid: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthorIdentity {
    pub fn userid(userid: impl Into<String>) -> Self {
        Self { userid: Some(userid.into()), ..Default::default() }
    }

    /// Resolve to an entity ident: userid first, then email, then a ghost.
    pub fn resolve(&self, server_id: &str) -> (String, EntityKind) {
        if let Some(userid) = self.userid.as_deref().filter(|u| !u.is_empty()) {
            return (Entity::userid_ident(userid, server_id), EntityKind::Person);
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            return (Entity::email_ident(email), EntityKind::Person);
        }
        let name = self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("unknown");
        (Entity::ghost_ident(name), EntityKind::Ghost)
    }
}

/// One file touched by a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFile {
    pub filename: String,
    pub revision: String,
    pub previous: Option<String>,
}

impl CommitFile {
    pub fn new(filename: impl Into<String>, revision: impl Into<String>, previous: Option<String>) -> Self {
        Self { filename: filename.into(), revision: revision.into(), previous }
    }
}

/// A commit normalized across CVS, SVN and Git
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub id: String,
    pub author: AuthorIdentity,
    pub datetime: OffsetDateTime,
    pub comment: String,
    pub files: Vec<CommitFile>,
}

/// A persisted revision of a branch
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionRecord {
    pub ident: String,
    pub branch_ident: String,
    pub person_ident: String,
    pub alias_ident: Option<String>,
    pub revision: String,
    pub datetime: i64,
    pub comment: String,
    pub files: Vec<CommitFile>,
}

impl RevisionRecord {
    pub fn ident_for(branch_ident: &str, revision: &str) -> String {
        format!("{branch_ident}/{revision}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_priority() {
        let full = AuthorIdentity {
            userid: Some("jdoe".into()),
            email: Some("jane@example.org".into()),
            name: Some("Jane".into()),
        };
        assert_eq!(full.resolve("gnome.org").0, "/person/jdoe@gnome.org");

        let email = AuthorIdentity { userid: None, ..full.clone() };
        assert_eq!(email.resolve("gnome.org").0, "/person/jane@example.org");

        let ghost = AuthorIdentity { name: Some("Jane Doe".into()), ..Default::default() };
        assert_eq!(ghost.resolve("gnome.org"), ("/ghost/Jane%20Doe".to_string(), EntityKind::Ghost));
    }
}
