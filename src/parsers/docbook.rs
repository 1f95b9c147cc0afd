//! Title, description and credits from the info block of a DocBook file
//!
//! Only the handful of elements a document listing needs are read; the
//! file is never validated and XIncludes are not followed.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::ParseError;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9]*)([^>]*)>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static MAINTAINER_ROLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\brole\s*=\s*["']maintainer["']"#).unwrap());
static DESCRIPTION_ROLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\brole\s*=\s*["']description["']"#).unwrap());

const CREDIT_ELEMENTS: [&str; 7] = ["author", "editor", "othercredit", "collab", "corpauthor", "corpcredit", "publisher"];
const NAME_PARTS: [&str; 5] = ["honorific", "firstname", "othername", "surname", "lineage"];

/// Someone credited in a document's info block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub name: String,
    pub email: Option<String>,
    /// Credited with `role="maintainer"`
    pub maintainer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocbookInfo {
    pub title: Option<String>,
    /// `<abstract role="description">`
    pub desc: Option<String>,
    pub credits: Vec<Credit>,
}

impl DocbookInfo {
    pub async fn from_path(path: &Path) -> Result<Self, ParseError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::parse_str(&String::from_utf8_lossy(&bytes)))
    }

    /// The title comes from the first `*info` element, else from the first
    /// `<title>` anywhere in the document.
    pub fn parse_str(text: &str) -> Self {
        let text = COMMENT.replace_all(text, "");
        let info = elements(&text, |name| name.ends_with("info")).into_iter().next().map(|e| e.content);

        let title = info
            .and_then(|info| first_text(info, "title"))
            .or_else(|| first_text(&text, "title"));
        let desc = info.and_then(|info| {
            elements(info, |name| name == "abstract")
                .into_iter()
                .find(|e| DESCRIPTION_ROLE.is_match(e.attrs))
                .and_then(|e| plain_text(e.content))
        });
        let credits = info.map(credits).unwrap_or_default();

        Self { title, desc, credits }
    }
}

struct Element<'a> {
    name: &'a str,
    attrs: &'a str,
    content: &'a str,
}

/// Outermost elements accepted by `wanted`, in document order. Elements
/// that are not wanted are looked into.
fn elements<'a>(text: &'a str, wanted: impl Fn(&str) -> bool) -> Vec<Element<'a>> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(caps) = OPEN_TAG.captures_at(text, pos) {
        let (Some(whole), Some(name), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };
        pos = whole.end();
        let (name, attrs) = (name.as_str(), attrs.as_str());
        if !wanted(name) {
            continue;
        }
        if attrs.ends_with('/') {
            found.push(Element { name, attrs, content: "" });
            continue;
        }
        let close = format!("</{name}>");
        let Some(end) = text[pos..].find(&close) else {
            continue;
        };
        found.push(Element { name, attrs, content: &text[pos..pos + end] });
        pos += end + close.len();
    }
    found
}

fn first_text(text: &str, name: &str) -> Option<String> {
    elements(text, |n| n == name).into_iter().find_map(|e| plain_text(e.content))
}

/// Element content with markup removed and whitespace collapsed
fn plain_text(content: &str) -> Option<String> {
    let stripped = ANY_TAG.replace_all(content, " ");
    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    let text = WHITESPACE.replace_all(decoded.trim(), " ").into_owned();
    (!text.is_empty()).then_some(text)
}

fn credits(info: &str) -> Vec<Credit> {
    elements(info, |name| CREDIT_ELEMENTS.contains(&name))
        .into_iter()
        .filter_map(|e| {
            let (name, email) = match e.name {
                "author" | "editor" | "othercredit" => person_name(e.content),
                "collab" => (first_text(e.content, "collabname"), None),
                "publisher" => (first_text(e.content, "publishername"), None),
                _ => (plain_text(e.content), None),
            };
            Some(Credit { name: name?, email, maintainer: MAINTAINER_ROLE.is_match(e.attrs) })
        })
        .collect()
}

/// Display name and email of a person element
fn person_name(content: &str) -> (Option<String>, Option<String>) {
    let email = first_text(content, "email");
    if let Some(personname) = elements(content, |n| n == "personname").into_iter().next() {
        return (person_name(personname.content).0, email);
    }
    let parts: Vec<String> = NAME_PARTS.iter().filter_map(|part| first_text(content, part)).collect();
    let name = (!parts.is_empty()).then(|| parts.join(" "));
    (name, email)
}
