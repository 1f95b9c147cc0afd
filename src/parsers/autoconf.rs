//! Package name and version from `configure.ac` / `configure.in` (or the
//! generated `configure` script)

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::LazyLock;

use crate::error::ParseError;

use super::automake::MAX_EXPANSION_DEPTH;

static SHELL_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([A-Z_]+)='?([^']*)'?").unwrap());
static SHELL_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").unwrap());

const MACROS: [&str; 3] = ["AC_INIT", "AM_INIT_AUTOMAKE", "AS_VERSION"];

#[derive(Debug, Clone, Default)]
pub struct Autoconf {
    vars: FxHashMap<String, String>,
    args: FxHashMap<&'static str, Vec<String>>,
    package_name: String,
    package_version: String,
}

impl Autoconf {
    pub fn parse_str(text: &str) -> Result<Self, ParseError> {
        let mut parsed = Self::default();
        let mut bodies: FxHashMap<&'static str, String> = FxHashMap::default();
        let mut open: Option<&'static str> = None;

        for line in text.lines() {
            let mut rest = line;
            if open.is_none() {
                if let Some(&name) = MACROS.iter().find(|m| line.starts_with(&format!("{m}("))) {
                    open = Some(name);
                    bodies.insert(name, String::new());
                    rest = &line[name.len() + 1..];
                } else if let Some(caps) = SHELL_VAR.captures(line) {
                    let mut value = caps[2].trim();
                    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                        value = &value[1..value.len() - 1];
                    }
                    let value = parsed.subst(value)?;
                    parsed.vars.insert(caps[1].to_string(), value);
                }
            }
            if let Some(name) = open {
                let body = bodies.entry(name).or_default();
                match rest.find(')') {
                    Some(end) => {
                        body.push_str(&rest[..end]);
                        open = None;
                    }
                    None => body.push_str(rest.trim()),
                }
            }
        }

        for (name, body) in bodies {
            let mut args = Vec::new();
            for arg in body.split(',') {
                let arg = arg.trim();
                let arg = match arg.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
                    Some(quoted) => quoted.trim().to_string(),
                    None => parsed.subst(arg)?,
                };
                args.push(arg);
            }
            parsed.args.insert(name, args);
        }

        let mut init = parsed.macro_args("AC_INIT").to_vec();
        if init.len() < 2 {
            init = parsed.macro_args("AM_INIT_AUTOMAKE").to_vec();
        }
        if init.len() < 2 {
            init = vec![String::new(), String::new()];
        }
        if let Some(vers) = parsed.args.get("AS_VERSION").filter(|a| !a.is_empty()) {
            init[0] = vers[0].trim().to_string();
            init[1] = vers.iter().skip(2).take(3).map(|s| s.trim()).collect::<Vec<_>>().join(".");
        }

        let mut name = parsed.variable("PACKAGE_TARNAME")?;
        if name.is_empty() {
            name = parsed.variable("PACKAGE_NAME")?;
        }
        if name.is_empty() {
            name = init.get(3).unwrap_or(&init[0]).clone();
        }
        parsed.vars.entry("PACKAGE".to_string()).or_insert_with(|| name.clone());

        let mut version = parsed.vars.get("PACKAGE_VERSION").map(|v| v.trim().to_string()).unwrap_or_default();
        if version.is_empty() {
            version = init[1].clone();
        }
        parsed.package_version = parsed.subst(&version)?;
        parsed.package_name = name;
        Ok(parsed)
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn package_version(&self) -> &str {
        &self.package_version
    }

    pub fn macro_args(&self, name: &str) -> &[String] {
        self.args.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Substituted, trimmed value of a shell variable ("" when unset)
    pub fn variable(&self, name: &str) -> Result<String, ParseError> {
        match self.vars.get(name) {
            Some(value) => Ok(self.subst(value)?.trim().to_string()),
            None => Ok(String::new()),
        }
    }

    fn subst(&self, text: &str) -> Result<String, ParseError> {
        subst_inner(&self.vars, text, &mut FxHashSet::default(), 0)
    }
}

fn subst_inner(
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
    for caps in SHELL_REF.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();
        let name = &caps[1];
        match vars.get(name) {
            Some(value) if value.as_str() != text && value.trim() != whole.as_str() => {
                if !visiting.insert(name.to_string()) {
                    return Err(ParseError::Cycle(name.to_string()));
                }
                out.push_str(&subst_inner(vars, value, visiting, depth + 1)?);
                visiting.remove(name);
            }
            _ => out.push_str(whole.as_str()),
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}
