use std::path::{Path, PathBuf};

/// A derived file written under the web files root and tracked in the store
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// Top-level directory, e.g. `graphs`
    pub kind: String,
    pub ident: String,
    pub filename: String,
    pub datetime: i64,
    pub data: serde_json::Value,
}

impl OutputFile {
    /// `<root>/<kind>/<ident>/<filename>`
    pub fn path_under(&self, root: &Path) -> PathBuf {
        output_path(root, &self.kind, &self.ident, &self.filename)
    }
}

pub fn output_path(root: &Path, kind: &str, ident: &str, filename: &str) -> PathBuf {
    let mut path = root.join(kind);
    for part in ident.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("/web"), "graphs", "/mod/git.gnome.org/gedit/master", "commits-0.json");
        assert_eq!(path, PathBuf::from("/web/graphs/mod/git.gnome.org/gedit/master/commits-0.json"));
    }
}
