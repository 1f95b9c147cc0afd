use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::localized::LocalizedText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Person,
    Ghost,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "Person",
            EntityKind::Ghost => "Ghost",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Person" => Ok(EntityKind::Person),
            "Ghost" => Ok(EntityKind::Ghost),
            other => Err(anyhow::anyhow!("unknown entity kind '{other}'")),
        }
    }
}

/// A person, or a ghost standing in for an author known only by name.
///
/// The ident never changes once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub ident: String,
    pub kind: EntityKind,
    pub name: LocalizedText,
    pub email: Option<String>,
}

impl Entity {
    pub fn new(ident: impl Into<String>, kind: EntityKind) -> Self {
        Self { ident: ident.into(), kind, name: LocalizedText::new(), email: None }
    }

    pub fn userid_ident(userid: &str, server_id: &str) -> String {
        format!("/person/{userid}@{server_id}")
    }

    pub fn email_ident(email: &str) -> String {
        format!("/person/{email}")
    }

    pub fn ghost_ident(name: &str) -> String {
        format!("/ghost/{}", urlencoding::encode(name))
    }

    /// Fill in name and email only where unset.
    pub fn extend(&mut self, name: Option<&str>, email: Option<&str>) {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.name.extend(&LocalizedText::c(name));
        }
        if self.email.as_deref().is_none_or(str::is_empty) {
            if let Some(email) = email.filter(|e| !e.is_empty()) {
                self.email = Some(email.to_string());
            }
        }
    }

    /// Overwrite name and email with the given values.
    pub fn update(&mut self, name: Option<&str>, email: Option<&str>) {
        if let Some(name) = name {
            self.name.update(&LocalizedText::c(name));
        }
        if let Some(email) = email {
            self.email = Some(email.to_string());
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.c_text().unwrap_or(&self.ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ghost_ident_is_urlencoded() {
        assert_eq!(Entity::ghost_ident("Jane Doe"), "/ghost/Jane%20Doe");
    }

    #[test]
    fn test_extend_then_update() {
        let mut person = Entity::new(Entity::userid_ident("jdoe", "gnome.org"), EntityKind::Person);
        person.extend(Some("Jane"), Some("jane@example.org"));
        person.extend(Some("J. Doe"), Some("other@example.org"));
        assert_eq!(person.display_name(), "Jane");
        assert_eq!(person.email.as_deref(), Some("jane@example.org"));

        person.update(Some("Jane Doe"), None);
        assert_eq!(person.display_name(), "Jane Doe");
        assert_eq!(person.email.as_deref(), Some("jane@example.org"));
    }
}
