use std::borrow::Cow;
use std::path::Path;

/// Path of `path` relative to `root`, with `/` separators.
///
/// Returns "" for the root itself and `None` when `path` is outside `root`.
pub fn relative_path<'a>(root: &Path, path: &'a Path) -> Option<Cow<'a, str>> {
    let rel = path.strip_prefix(root).ok()?;
    let text = rel.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        Some(text)
    } else {
        Some(Cow::Owned(text.replace(std::path::MAIN_SEPARATOR, "/")))
    }
}

/// Strip any of `suffixes` (tried in order) from a file name.
///
/// Used for artifacts like `gedit.desktop.in.in` where the local name is the
/// part before the build-time suffixes.
pub fn strip_suffixes<'a>(file_name: &'a str, suffixes: &[&str]) -> &'a str {
    for suffix in suffixes {
        if let Some(stem) = file_name.strip_suffix(suffix) {
            return stem;
        }
    }
    file_name
}

/// Final path component of a `/`-separated path
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relative_path() {
        let root = PathBuf::from("/scm/git.gnome.org/gedit/master");
        let file = root.join("po").join("LINGUAS");
        assert_eq!(relative_path(&root, &file).as_deref(), Some("po/LINGUAS"));
        assert_eq!(relative_path(&root, &root).as_deref(), Some(""));
        assert!(relative_path(&root, Path::new("/elsewhere")).is_none());
    }

    #[test]
    fn test_strip_suffixes() {
        let suffixes = [".desktop.in.in", ".desktop.in"];
        assert_eq!(strip_suffixes("gedit.desktop.in.in", &suffixes), "gedit");
        assert_eq!(strip_suffixes("gedit.desktop.in", &suffixes), "gedit");
        assert_eq!(strip_suffixes("README", &suffixes), "README");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("help/gedit"), "gedit");
        assert_eq!(base_name("po/"), "po");
        assert_eq!(base_name("po"), "po");
    }
}
