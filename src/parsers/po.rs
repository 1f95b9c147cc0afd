//! Gettext PO catalogues: message counts and point lookups

use regex::Regex;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::ParseError;
use crate::model::PoStats;

static IMAGE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@@image: '([^']*)';").unwrap());

const IMAGE_PREFIX: &str = "@@image: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Translated,
    Fuzzy,
    Untranslated,
}

#[derive(Debug, Default)]
struct Entry {
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgctxt: Option<String>,
    msgstrs: Vec<(usize, String)>,
    fuzzy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    None,
    Comment,
    MsgId,
    MsgIdPlural,
    MsgCtxt,
    MsgStr(usize),
}

/// Streaming PO parser. Feed lines, then [`Po::finish`].
#[derive(Debug)]
pub struct Po {
    key: Key,
    entry: Entry,
    stats: PoStats,
    translations: FxHashMap<String, Vec<String>>,
    images: FxHashMap<String, MessageStatus>,
}

impl Default for Po {
    fn default() -> Self {
        Self::new()
    }
}

impl Po {
    pub fn new() -> Self {
        Self {
            key: Key::None,
            entry: Entry::default(),
            stats: PoStats::default(),
            translations: FxHashMap::default(),
            images: FxHashMap::default(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, ParseError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::parse_str(&String::from_utf8_lossy(&bytes)))
    }

    pub fn parse_str(text: &str) -> Self {
        let mut po = Self::new();
        for line in text.lines() {
            po.feed(line);
        }
        po.finish();
        po
    }

    /// Pass one line to the parser.
    pub fn feed(&mut self, line: &str) {
        let line = line.trim();
        if line.starts_with("#~") {
            return;
        }

        let mut value = line;
        if let Some(rest) = line.strip_prefix("msgid_plural ") {
            self.key = Key::MsgIdPlural;
            value = rest;
        } else if let Some(rest) = line.strip_prefix("msgid ") {
            if self.entry.msgid.is_some() {
                self.finish();
            }
            self.key = Key::MsgId;
            value = rest;
        } else if let Some(rest) = line.strip_prefix("msgctxt ") {
            if self.entry.msgid.is_some() {
                self.finish();
            }
            self.key = Key::MsgCtxt;
            value = rest;
        } else if let Some(rest) = line.strip_prefix("msgstr[") {
            let Some((index, rest)) = rest.split_once(']') else {
                return;
            };
            self.key = Key::MsgStr(index.trim().parse().unwrap_or(0));
            value = rest.trim();
        } else if let Some(rest) = line.strip_prefix("msgstr ") {
            self.key = Key::MsgStr(0);
            value = rest;
        } else if line.starts_with('#') {
            if matches!(self.key, Key::MsgStr(_)) {
                self.finish();
            }
            self.key = Key::Comment;
            if line.starts_with("#,") && line.split([',', ' ']).any(|flag| flag == "fuzzy") {
                self.entry.fuzzy = true;
            }
            return;
        } else if line.is_empty() {
            self.finish();
            return;
        }

        let Some(text) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
            return;
        };
        let slot = match self.key {
            Key::MsgId => self.entry.msgid.get_or_insert_with(String::new),
            Key::MsgIdPlural => self.entry.msgid_plural.get_or_insert_with(String::new),
            Key::MsgCtxt => self.entry.msgctxt.get_or_insert_with(String::new),
            Key::MsgStr(index) => {
                let pos = match self.entry.msgstrs.iter().position(|(i, _)| *i == index) {
                    Some(pos) => pos,
                    None => {
                        self.entry.msgstrs.push((index, String::new()));
                        self.entry.msgstrs.len() - 1
                    }
                };
                &mut self.entry.msgstrs[pos].1
            }
            Key::None | Key::Comment => return,
        };
        slot.push_str(text);
    }

    /// Close the entry being read, if any.
    pub fn finish(&mut self) {
        self.key = Key::None;
        let entry = std::mem::take(&mut self.entry);
        let Some(msgid) = entry.msgid else {
            return;
        };
        // the header entry carries catalogue metadata, not a message
        if msgid.is_empty() && entry.msgctxt.is_none() {
            return;
        }

        let mut msgstrs = entry.msgstrs;
        msgstrs.sort_by_key(|(i, _)| *i);
        let first = msgstrs.first().map(|(_, s)| s.as_str()).unwrap_or("");
        let status = if first.is_empty() {
            MessageStatus::Untranslated
        } else if entry.fuzzy {
            MessageStatus::Fuzzy
        } else {
            MessageStatus::Translated
        };

        match status {
            MessageStatus::Translated => self.stats.translated += 1,
            MessageStatus::Fuzzy => self.stats.fuzzy += 1,
            MessageStatus::Untranslated => self.stats.untranslated += 1,
        }
        if msgid.starts_with(IMAGE_PREFIX) {
            match status {
                MessageStatus::Translated => self.stats.images_translated += 1,
                MessageStatus::Fuzzy => self.stats.images_fuzzy += 1,
                MessageStatus::Untranslated => self.stats.images_untranslated += 1,
            }
            if let Some(caps) = IMAGE_NAME.captures(&msgid) {
                self.images.insert(caps[1].to_string(), status);
            }
        }

        let key = match entry.msgctxt {
            Some(ctxt) => format!("{ctxt}\u{4}{msgid}"),
            None => msgid,
        };
        self.translations.insert(key, msgstrs.into_iter().map(|(_, s)| s).collect());
    }

    pub fn stats(&self) -> PoStats {
        self.stats
    }

    /// Status of a documentation figure, from its `@@image:` message
    pub fn image_status(&self, image: &str) -> Option<MessageStatus> {
        self.images.get(image).copied()
    }

    /// First translated string of a message without context
    pub fn translation(&self, msgid: &str) -> Option<&str> {
        self.translations.get(msgid)?.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PO: &str = r#"
msgid ""
msgstr ""
"Content-Type: text/plain; charset=UTF-8\n"

#: ../data/gedit.desktop.in.h:1
msgid "Text Editor"
msgstr "Texteditor"

#, fuzzy
msgid "Edit text files"
msgstr "Textdateien"

msgid "Open"
msgstr ""

msgid "One file"
msgid_plural "%d files"
msgstr[0] "Eine Datei"
msgstr[1] "%d Dateien"

#. When image changes, this message will be marked fuzzy or untranslated for you.
msgid "@@image: 'figures/gedit_window.png'; md5=abc"
msgstr "@@image: 'figures/gedit_window.png'; md5=abc"

msgid "@@image: 'figures/toolbar.png'; md5=def"
msgstr ""

#~ msgid "Old"
#~ msgstr "Alt"
"#;

    #[test]
    fn test_stats() {
        let po = Po::parse_str(PO);
        let stats = po.stats();
        assert_eq!(stats.translated, 3);
        assert_eq!(stats.fuzzy, 1);
        assert_eq!(stats.untranslated, 2);
        assert_eq!(stats.images_translated, 1);
        assert_eq!(stats.images_untranslated, 1);
        assert_eq!(stats.total(), 6);
    }

    #[test]
    fn test_lookups() {
        let po = Po::parse_str(PO);
        assert_eq!(po.translation("Text Editor"), Some("Texteditor"));
        assert_eq!(po.translation("Old"), None);
        assert_eq!(po.image_status("figures/gedit_window.png"), Some(MessageStatus::Translated));
        assert_eq!(po.image_status("figures/toolbar.png"), Some(MessageStatus::Untranslated));
    }

    #[test]
    fn test_streaming_feed() {
        let mut po = Po::new();
        for line in ["msgid \"a\"", "msgstr \"b\"", "msgid \"c\"", "msgstr \"\""] {
            po.feed(line);
        }
        po.finish();
        assert_eq!(po.stats().translated, 1);
        assert_eq!(po.stats().untranslated, 1);
    }
}
