use std::collections::BTreeMap;

use crate::model::{BranchKind, BranchRecord};

/// Children discovered in one scan, by kind, in discovery order
#[derive(Debug, Default, Clone)]
pub struct ChildSet {
    kinds: BTreeMap<BranchKind, Vec<String>>,
}

impl ChildSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `kind` subject to reconciliation even if nothing is found.
    pub fn declare(&mut self, kind: BranchKind) {
        self.kinds.entry(kind).or_default();
    }

    pub fn add(&mut self, kind: BranchKind, ident: &str) {
        let members = self.kinds.entry(kind).or_default();
        if !members.iter().any(|m| m == ident) {
            members.push(ident.to_string());
        }
    }

    pub fn get(&self, kind: BranchKind) -> &[String] {
        self.kinds.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: BranchKind, ident: &str) -> bool {
        self.get(kind).iter().any(|m| m == ident)
    }

    /// Declared kinds with their members
    pub fn iter(&self) -> impl Iterator<Item = (BranchKind, &[String])> {
        self.kinds.iter().map(|(kind, members)| (*kind, members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.kinds.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pick the child that gives the module its display name and icon.
///
/// An application named after the module wins; then a lone application
/// (with no applets), a lone applet (with no applications), the application
/// whose `Exec` is the module name, and finally a lone capplet.
pub fn default_child<'a>(
    module: &str,
    applications: &[&'a BranchRecord],
    applets: &[&'a BranchRecord],
    capplets: &[&'a BranchRecord],
) -> Option<&'a BranchRecord> {
    if let Some(app) = applications
        .iter()
        .find(|app| app.ident_local_name() == Some(module))
    {
        return Some(*app);
    }
    match (applications.len(), applets.len()) {
        (1, 0) => Some(applications[0]),
        (0, 1) => Some(applets[0]),
        (n, _) if n > 0 => applications.iter().copied().find(|app| app.details.exec() == Some(module)),
        (0, m) if m > 0 => None,
        _ if capplets.len() == 1 => Some(capplets[0]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BranchDetails;
    use crate::scm::{RepositoryRecord, ScmKind};

    fn record(ident: &str, details: BranchDetails) -> BranchRecord {
        let repo = RepositoryRecord::new(ScmKind::Git, "git://git.gnome.org/", "gnome-utils", None, None);
        BranchRecord::new(ident, repo, details)
    }

    #[test]
    fn test_child_set_keeps_order_and_dedupes() {
        let mut set = ChildSet::new();
        set.declare(BranchKind::Library);
        set.add(BranchKind::Domain, "/i18n/b");
        set.add(BranchKind::Domain, "/i18n/a");
        set.add(BranchKind::Domain, "/i18n/b");
        assert_eq!(set.get(BranchKind::Domain), ["/i18n/b", "/i18n/a"]);
        assert!(set.get(BranchKind::Library).is_empty());
        assert_eq!(set.iter().count(), 2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_default_child_by_exec() {
        let a = record(
            "/app/git.gnome.org/gnome-utils/baobab/master",
            BranchDetails::Application { exec: Some("baobab".into()) },
        );
        let b = record(
            "/app/git.gnome.org/gnome-utils/dictionary/master",
            BranchDetails::Application { exec: Some("gnome-utils".into()) },
        );
        let chosen = default_child("gnome-utils", &[&a, &b], &[], &[]).unwrap();
        assert_eq!(chosen.ident, b.ident);
    }

    #[test]
    fn test_default_child_single_kinds() {
        let app = record("/app/s/m/one/master", BranchDetails::Application { exec: None });
        let applet = record("/applet/s/m/clock/master", BranchDetails::Applet { iid: "clock".into() });
        let capplet = record("/capplet/s/m/prefs/master", BranchDetails::Capplet { exec: None });
        assert_eq!(default_child("m", &[&app], &[], &[]).map(|r| r.ident.as_str()), Some(app.ident.as_str()));
        assert_eq!(default_child("m", &[], &[&applet], &[]).map(|r| r.ident.as_str()), Some(applet.ident.as_str()));
        assert!(default_child("m", &[], &[&applet, &applet], &[&capplet]).is_none());
        assert_eq!(default_child("m", &[], &[], &[&capplet]).map(|r| r.ident.as_str()), Some(capplet.ident.as_str()));
    }
}
