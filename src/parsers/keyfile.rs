//! Desktop-entry style key files (`.desktop`, `.desktop.in`)

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::model::{C_LOCALE, LocalizedText};

#[derive(Debug, Clone, Default)]
pub struct KeyFile {
    groups: BTreeMap<String, BTreeMap<String, LocalizedText>>,
}

impl KeyFile {
    /// Parse key file text.
    ///
    /// `Key[lang]=value` is folded into the `Key` entry; intltool's `_Key`
    /// source keys count as `Key`. A plain key given twice is an error.
    pub fn parse_str(text: &str) -> Result<Self, ParseError> {
        let mut groups: BTreeMap<String, BTreeMap<String, LocalizedText>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                groups.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }
            let (Some(group), Some((key, value))) = (current.as_ref(), line.split_once('=')) else {
                return Err(ParseError::Malformed { line: idx + 1, text: raw.to_string() });
            };

            let key = key.trim();
            let key = key.strip_prefix('_').unwrap_or(key);
            let (key, lang) = match key.split_once('[') {
                Some((base, rest)) => (base.trim(), rest.trim_end_matches(']').trim()),
                None => (key, C_LOCALE),
            };
            let entries = groups.entry(group.clone()).or_default();
            let entry = entries.entry(key.to_string()).or_default();
            if lang == C_LOCALE && entry.c_text().is_some() {
                return Err(ParseError::DuplicateKey { group: group.clone(), key: key.to_string() });
            }
            entry.insert(lang, value.trim());
        }

        Ok(Self { groups })
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// All translations of a key
    pub fn localized(&self, group: &str, key: &str) -> Option<&LocalizedText> {
        self.groups.get(group)?.get(key)
    }

    /// Untranslated value of a key
    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.localized(group, key)?.c_text()
    }

    /// `;`-separated list value
    pub fn get_list(&self, group: &str, key: &str) -> Vec<&str> {
        self.get(group, key)
            .map(|v| v.split(';').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}
