use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScmError;

/// Version control system a repository record points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    Cvs,
    Svn,
    Git,
}

impl ScmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScmKind::Cvs => "cvs",
            ScmKind::Svn => "svn",
            ScmKind::Git => "git",
        }
    }

    pub fn default_branch(&self) -> &'static str {
        match self {
            ScmKind::Cvs => "HEAD",
            ScmKind::Svn => "trunk",
            ScmKind::Git => "master",
        }
    }

    /// Metadata directory the walk must never descend into
    pub fn ignore_dir(&self) -> &'static str {
        match self {
            ScmKind::Cvs => "CVS",
            ScmKind::Svn => ".svn",
            ScmKind::Git => ".git",
        }
    }
}

impl fmt::Display for ScmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScmKind {
    type Err = ScmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cvs" => Ok(ScmKind::Cvs),
            "svn" => Ok(ScmKind::Svn),
            "git" => Ok(ScmKind::Git),
            other => Err(ScmError::config(format!("unknown scm kind '{other}'"))),
        }
    }
}

/// Where a branch lives: (kind, server, module, branch, path) names exactly
/// one checkout directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub kind: ScmKind,
    pub server: String,
    pub module: String,
    pub branch: String,
    pub path: Option<String>,
}

impl RepositoryRecord {
    /// Build a record, filling in the kind's default branch when none is given.
    pub fn new(
        kind: ScmKind,
        server: impl Into<String>,
        module: impl Into<String>,
        branch: Option<&str>,
        path: Option<&str>,
    ) -> Self {
        let branch = match branch {
            Some(b) if !b.is_empty() => b.to_string(),
            _ => kind.default_branch().to_string(),
        };
        Self {
            kind,
            server: server.into(),
            module: module.into(),
            branch,
            path: path.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    /// Check the fields a checkout cannot do without.
    pub fn validate(&self) -> Result<(), ScmError> {
        if self.module.is_empty() {
            return Err(ScmError::config("repository record has no module"));
        }
        if self.server.is_empty() {
            return Err(ScmError::config("repository record has no server"));
        }
        server_name(self.kind, &self.server)?;
        Ok(())
    }

    pub fn server_name(&self) -> Result<String, ScmError> {
        server_name(self.kind, &self.server)
    }

    /// Identifier of the module branch living at this location
    pub fn module_ident(&self) -> Result<String, ScmError> {
        Ok(format!(
            "/mod/{}/{}/{}",
            self.server_name()?,
            self.module,
            self.branch
        ))
    }
}

/// Short host name used in identifiers and on-disk paths.
///
/// CVS roots look like `:pserver:user@host:/path`; git and svn servers are
/// URLs whose host is taken, plus a following `~user` segment if present.
pub fn server_name(kind: ScmKind, server: &str) -> Result<String, ScmError> {
    let unparseable = || ScmError::config(format!("cannot parse server name from '{server}'"));
    match kind {
        ScmKind::Cvs => {
            let field = server.split(':').nth(2).ok_or_else(unparseable)?;
            let host = field.rsplit_once('@').map_or(field, |(_, host)| host);
            if host.is_empty() {
                return Err(unparseable());
            }
            Ok(host.to_string())
        }
        ScmKind::Svn | ScmKind::Git => {
            let (_, rest) = server.split_once("://").ok_or_else(unparseable)?;
            let mut segments = rest.split('/');
            let host = segments.next().filter(|h| !h.is_empty()).ok_or_else(unparseable)?;
            match segments.next() {
                Some(user) if user.starts_with('~') => Ok(format!("{host}{user}")),
                _ => Ok(host.to_string()),
            }
        }
    }
}

/// Last two dot labels of a server name, used to scope person identifiers.
pub fn server_id(server_name: &str) -> String {
    let labels: Vec<&str> = server_name.split('.').collect();
    if labels.len() <= 2 {
        server_name.to_string()
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cvs_server_name() {
        let name = server_name(ScmKind::Cvs, ":pserver:anonymous@anoncvs.gnome.org:/cvs/gnome").unwrap();
        assert_eq!(name, "anoncvs.gnome.org");
    }

    #[test]
    fn test_url_server_name() {
        assert_eq!(server_name(ScmKind::Git, "git://git.gnome.org/").unwrap(), "git.gnome.org");
        assert_eq!(
            server_name(ScmKind::Svn, "http://svn.example.org/~jdoe/repo").unwrap(),
            "svn.example.org~jdoe"
        );
        assert!(server_name(ScmKind::Git, "git.gnome.org").is_err());
    }

    #[test]
    fn test_server_id() {
        assert_eq!(server_id("svn.gnome.org"), "gnome.org");
        assert_eq!(server_id("gnome.org"), "gnome.org");
        assert_eq!(server_id("localhost"), "localhost");
    }

    #[test]
    fn test_default_branch() {
        let rec = RepositoryRecord::new(ScmKind::Svn, "http://svn.gnome.org/svn/", "gedit", None, None);
        assert_eq!(rec.branch, "trunk");
        assert_eq!(rec.module_ident().unwrap(), "/mod/svn.gnome.org/gedit/trunk");
    }

    #[test]
    fn test_validate_rejects_missing_module() {
        let rec = RepositoryRecord::new(ScmKind::Git, "git://git.gnome.org/", "", None, None);
        assert!(matches!(rec.validate(), Err(ScmError::Config(_))));
        assert!("hg".parse::<ScmKind>().is_err());
    }
}
