//! Variable extraction from `Makefile.am`
//!
//! Make directives are ignored; only `NAME = value` assignments and the
//! canonicalized lines are kept.

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::ParseError;

/// Nesting limit for `$(VAR)` substitution
pub const MAX_EXPANSION_DEPTH: usize = 32;

// Compiled once via LazyLock
static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(\s*[+:]?=)(.*)$").unwrap());
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$[({]([A-Za-z_][A-Za-z0-9_]*)[)}]").unwrap());

#[derive(Debug, Clone, Default)]
pub struct Automake {
    variables: FxHashMap<String, String>,
    lines: Vec<String>,
}

impl Automake {
    pub async fn from_path(path: &Path) -> Result<Self, ParseError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::parse_str(&String::from_utf8_lossy(&bytes)))
    }

    pub fn parse_str(text: &str) -> Self {
        let mut parsed = Self::default();
        let mut lines = text.lines().map(strip_comment);

        while let Some(line) = lines.next() {
            let Some(caps) = ASSIGNMENT.captures(line.trim_start()) else {
                parsed.lines.push(line.trim().to_string());
                continue;
            };
            let name = caps[1].to_string();
            let op = caps[2].to_string();
            let mut value = caps[3].trim().to_string();
            while let Some(head) = value.strip_suffix('\\') {
                value = head.trim_end().to_string();
                match lines.next() {
                    Some(next) => {
                        value.push(' ');
                        value.push_str(next.trim());
                    }
                    None => break,
                }
            }
            let value = value.trim().to_string();

            parsed.lines.push(format!("{name}{op}{value}"));
            if op.trim() == "+=" {
                let entry = parsed.variables.entry(name).or_default();
                if !entry.is_empty() {
                    entry.push(' ');
                }
                entry.push_str(&value);
            } else {
                parsed.variables.insert(name, value);
            }
        }

        parsed
    }

    /// Canonicalized lines: comments stripped, continuations joined
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Raw (unexpanded) value of a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Whether any line includes `file` (`include $(top_srcdir)/gtk-doc.make`)
    pub fn includes(&self, file: &str) -> bool {
        self.lines
            .iter()
            .any(|l| l.starts_with("include ") && l.trim_end().ends_with(file))
    }

    /// Expanded value of a variable
    pub fn expanded(&self, name: &str) -> Result<Option<String>, ParseError> {
        match self.get(name) {
            Some(raw) => expand_with(&self.variables, raw).map(Some),
            None => Ok(None),
        }
    }

    /// Whitespace-separated words of an expanded variable
    pub fn words(&self, name: &str) -> Result<Vec<String>, ParseError> {
        Ok(self
            .expanded(name)?
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default())
    }

    /// Substitute `$(VAR)` and `${VAR}` references in `text`.
    pub fn expand(&self, text: &str) -> Result<String, ParseError> {
        expand_with(&self.variables, text)
    }
}

/// Expand references against `vars`.
///
/// Unknown variables are left in place. A variable whose value reduces to its
/// own reference is left unexpanded; any longer cycle is an error.
pub fn expand_with(vars: &FxHashMap<String, String>, text: &str) -> Result<String, ParseError> {
    let mut visiting = FxHashSet::default();
    expand_inner(vars, text, &mut visiting, 0)
}

fn expand_inner(
    vars: &FxHashMap<String, String>,
    text: &str,
    visiting: &mut FxHashSet<String>,
    depth: usize,
) -> Result<String, ParseError> {
    if depth > MAX_EXPANSION_DEPTH {
        return Err(ParseError::TooDeep(MAX_EXPANSION_DEPTH));
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in REFERENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[1];
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let Some(value) = vars.get(name) else {
            out.push_str(whole.as_str());
            continue;
        };
        if value.trim() == whole.as_str() {
            // VAR = $(VAR)
            out.push_str(whole.as_str());
            continue;
        }
        if !visiting.insert(name.to_string()) {
            return Err(ParseError::Cycle(name.to_string()));
        }
        let expanded = expand_inner(vars, value, visiting, depth + 1)?;
        visiting.remove(name);
        out.push_str(&expanded);
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAKEFILE: &str = "\
include $(top_srcdir)/gnome-doc-utils.make
dist-hook: doc-dist-hook

DOC_MODULE = gedit  # the manual
DOC_ENTITIES = legal.xml \\
\tfigures.xml
DOC_INCLUDES =
DOC_FIGURES = figures/gedit_window.png
DOC_LINGUAS = de es \\
    fr
DOC_MAIN = $(DOC_MODULE).xml
";

    #[test]
    fn test_variables_and_continuations() {
        let am = Automake::parse_str(MAKEFILE);
        assert_eq!(am.get("DOC_MODULE"), Some("gedit"));
        assert_eq!(am.get("DOC_INCLUDES"), Some(""));
        assert_eq!(am.words("DOC_LINGUAS").unwrap(), ["de", "es", "fr"]);
        assert_eq!(am.words("DOC_ENTITIES").unwrap(), ["legal.xml", "figures.xml"]);
        assert!(am.includes("gnome-doc-utils.make"));
        assert!(!am.includes("gtk-doc.make"));
        assert!(am.lines().iter().any(|l| l == "DOC_MODULE =gedit"));
    }

    #[test]
    fn test_expand() {
        let am = Automake::parse_str(MAKEFILE);
        assert_eq!(am.expanded("DOC_MAIN").unwrap().as_deref(), Some("gedit.xml"));
        assert_eq!(am.expand("${DOC_MODULE}-$(UNKNOWN)").unwrap(), "gedit-$(UNKNOWN)");
    }

    #[test]
    fn test_self_reference_is_left_alone() {
        let am = Automake::parse_str("A = $(A)\nB = x$(A)\n");
        assert_eq!(am.expanded("B").unwrap().as_deref(), Some("x$(A)"));
    }

    #[test]
    fn test_cycle_is_an_error() {
        let am = Automake::parse_str("A = $(B)\nB = $(A)x\n");
        assert!(matches!(am.expanded("A"), Err(ParseError::Cycle(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut text = String::from("V0 = end\n");
        for i in 1..=40 {
            text.push_str(&format!("V{i} = $(V{})\n", i - 1));
        }
        let am = Automake::parse_str(&text);
        assert!(matches!(am.expanded("V40"), Err(ParseError::TooDeep(_))));
        assert_eq!(am.expanded("V10").unwrap().as_deref(), Some("end"));
    }
}
