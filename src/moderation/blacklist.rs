// Per-language keyword blacklist.
//
// Matching is a case-insensitive substring test. Word lists keep insertion
// order so matched terms come back in the same order every time.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Result of checking one text against one language's list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlacklistMatch {
    /// Blacklisted terms found in the text, in list order
    pub matched: Vec<String>,
    /// False when no list is registered for the language
    pub supported: bool,
}

impl BlacklistMatch {
    pub fn is_hit(&self) -> bool {
        !self.matched.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct KeywordBlacklist {
    lists: BTreeMap<String, Vec<String>>,
}

impl Default for KeywordBlacklist {
    fn default() -> Self {
        let mut blacklist = Self::empty();
        blacklist.add_keywords("en", ["abuse", "hate", "violence", "explicit"]);
        blacklist.add_keywords("es", ["abuso", "odio", "violencia", "explícito"]);
        blacklist.add_keywords("fr", ["abus", "haine", "violence", "explicite"]);
        blacklist
    }
}

impl KeywordBlacklist {
    /// A blacklist with no languages registered.
    pub fn empty() -> Self {
        Self {
            lists: BTreeMap::new(),
        }
    }

    /// Merge lists from a JSON file shaped `{"en": ["word", ...], ...}`.
    /// A language present in the file replaces the built-in list for it.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read blacklist file {}", path.display()))?;
        let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
            .with_context(|| format!("Blacklist file {} is not a language map", path.display()))?;

        for (language, words) in parsed {
            self.lists.remove(&language);
            self.add_keywords(&language, words);
        }
        info!(path = %path.display(), languages = self.lists.len(), "Loaded keyword blacklist");
        Ok(())
    }

    /// Add words to a language's list, creating the list if needed. Duplicates are ignored.
    pub fn add_keywords<I, S>(&mut self, language: &str, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.lists.entry(language.to_string()).or_default();
        for word in words {
            let word = word.into();
            if !word.is_empty() && !list.iter().any(|w| w.eq_ignore_ascii_case(&word)) {
                list.push(word);
            }
        }
    }

    /// Remove words from a language's list. Unknown languages are ignored.
    pub fn remove_keywords<I, S>(&mut self, language: &str, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(list) = self.lists.get_mut(language) {
            for word in words {
                list.retain(|w| w != word.as_ref());
            }
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    /// Check `text` against the list for `language`.
    pub fn check(&self, text: &str, language: &str) -> BlacklistMatch {
        let Some(list) = self.lists.get(language) else {
            debug!(language, "No blacklist registered for language");
            return BlacklistMatch::default();
        };

        let text_lower = text.to_lowercase();
        let matched = list
            .iter()
            .filter(|word| text_lower.contains(&word.to_lowercase()))
            .cloned()
            .collect();

        BlacklistMatch {
            matched,
            supported: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_substring_match() {
        let blacklist = KeywordBlacklist::default();
        let result = blacklist.check("I HATE mondays", "en");
        assert!(result.supported);
        assert_eq!(result.matched, vec!["hate".to_string()]);
    }

    #[test]
    fn test_matches_come_back_in_list_order() {
        let blacklist = KeywordBlacklist::default();
        let result = blacklist.check("violence and hate and abuse", "en");
        assert_eq!(result.matched, vec!["abuse", "hate", "violence"]);
    }

    #[test]
    fn test_unknown_language_is_zero_matches() {
        let blacklist = KeywordBlacklist::default();
        let result = blacklist.check("hate", "ko");
        assert!(!result.supported);
        assert!(!result.is_hit());
    }

    #[test]
    fn test_add_and_remove_keywords() {
        let mut blacklist = KeywordBlacklist::empty();
        blacklist.add_keywords("de", ["hass", "Hass", "gewalt"]);
        assert_eq!(blacklist.check("Hass", "de").matched, vec!["hass"]);

        blacklist.remove_keywords("de", ["hass"]);
        assert!(!blacklist.check("hass", "de").is_hit());
        assert!(blacklist.check("gewalt", "de").is_hit());
    }

    #[test]
    fn test_load_file_replaces_language() {
        let dir = std::env::temp_dir().join("deepshield-blacklist-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("blacklist.json");
        std::fs::write(&path, r#"{"en": ["scam"], "it": ["odio"]}"#).unwrap();

        let mut blacklist = KeywordBlacklist::default();
        blacklist.load_file(&path).unwrap();

        assert!(!blacklist.check("hate", "en").is_hit());
        assert!(blacklist.check("total scam", "en").is_hit());
        assert!(blacklist.check("odio", "it").is_hit());
        assert!(blacklist.check("odio", "es").is_hit(), "other languages untouched");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
