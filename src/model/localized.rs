use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The untranslated language key
pub const C_LOCALE: &str = "C";

/// Text keyed by language code, `C` holding the untranslated value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text with only an untranslated value
    pub fn c(text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(C_LOCALE.to_string(), text.into());
        Self(map)
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    /// Untranslated value, if any
    pub fn c_text(&self) -> Option<&str> {
        self.get(C_LOCALE)
    }

    pub fn insert(&mut self, lang: impl Into<String>, text: impl Into<String>) {
        self.0.insert(lang.into(), text.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fill in languages that have no value yet.
    pub fn extend(&mut self, other: &LocalizedText) {
        for (lang, text) in &other.0 {
            self.0.entry(lang.clone()).or_insert_with(|| text.clone());
        }
    }

    /// Overwrite every language present in `other`, keeping the rest.
    pub fn update(&mut self, other: &LocalizedText) {
        for (lang, text) in &other.0 {
            self.0.insert(lang.clone(), text.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_keeps_existing_languages() {
        let mut text = LocalizedText::c("Editor");
        let other: LocalizedText = [("C", "Text Editor"), ("de", "Texteditor")].into_iter().collect();
        text.extend(&other);
        assert_eq!(text.c_text(), Some("Editor"));
        assert_eq!(text.get("de"), Some("Texteditor"));
    }

    #[test]
    fn test_update_merges_per_language() {
        let mut text: LocalizedText = [("C", "Editor"), ("fr", "Éditeur")].into_iter().collect();
        text.update(&LocalizedText::c("Text Editor"));
        assert_eq!(text.c_text(), Some("Text Editor"));
        assert_eq!(text.get("fr"), Some("Éditeur"));
    }
}
