//! Offline word list used when the provider cannot be reached.
//!
//! Only short texts are eligible: each whitespace token (or the whole phrase)
//! is looked up case-insensitively and replaced when found.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{AnuvadError, Result};
use crate::language::Language;

/// Common survey vocabulary shipped with the binary.
const BUILTIN: &[(Language, &[(&str, &str)])] = &[
    (
        Language::Kannada,
        &[
            ("yes", "ಹೌದು"),
            ("no", "ಇಲ್ಲ"),
            ("submit", "ಸಲ್ಲಿಸಿ"),
            ("next", "ಮುಂದೆ"),
            ("back", "ಹಿಂದೆ"),
            ("name", "ಹೆಸರು"),
            ("age", "ವಯಸ್ಸು"),
            ("male", "ಪುರುಷ"),
            ("female", "ಮಹಿಳೆ"),
            ("village", "ಗ್ರಾಮ"),
            ("district", "ಜಿಲ್ಲೆ"),
            ("save", "ಉಳಿಸಿ"),
            ("cancel", "ರದ್ದುಮಾಡಿ"),
        ],
    ),
    (
        Language::Hindi,
        &[
            ("yes", "हाँ"),
            ("no", "नहीं"),
            ("submit", "जमा करें"),
            ("next", "आगे"),
            ("back", "पीछे"),
            ("name", "नाम"),
            ("age", "आयु"),
            ("male", "पुरुष"),
            ("female", "महिला"),
            ("village", "गाँव"),
            ("district", "ज़िला"),
            ("save", "सहेजें"),
            ("cancel", "रद्द करें"),
        ],
    ),
];

#[derive(Debug, Clone, Default)]
pub struct OfflineDictionary {
    entries: HashMap<Language, HashMap<String, String>>,
}

impl OfflineDictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut dictionary = Self::empty();
        for (language, words) in BUILTIN {
            for (source, target) in *words {
                dictionary.insert(*language, source, target);
            }
        }
        dictionary
    }

    /// Built-in entries overlaid with a TOML file:
    ///
    /// ```toml
    /// [kn]
    /// "household size" = "ಕುಟುಂಬದ ಗಾತ್ರ"
    /// ```
    pub fn load_with_overrides<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnuvadError::Dictionary(format!("{}: {}", path.display(), e)))?;
        let tables: HashMap<String, HashMap<String, String>> = toml::from_str(&content)?;

        let mut dictionary = Self::builtin();
        let mut added = 0;
        for (code, words) in tables {
            let language: Language = code.parse()?;
            for (source, target) in words {
                dictionary.insert(language, &source, &target);
                added += 1;
            }
        }
        info!("Loaded {} offline dictionary entries from {}", added, path.display());
        Ok(dictionary)
    }

    pub fn insert(&mut self, language: Language, source: &str, target: &str) {
        self.entries
            .entry(language)
            .or_default()
            .insert(source.trim().to_lowercase(), target.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Substitute known words in `text`.
    ///
    /// Returns `None` when the text is longer than `max_tokens` tokens or when
    /// nothing matched.
    pub fn substitute(&self, text: &str, language: Language, max_tokens: usize) -> Option<String> {
        let words = self.entries.get(&language)?;
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > max_tokens {
            return None;
        }

        if let Some(phrase) = words.get(&tokens.join(" ").to_lowercase()) {
            return Some(phrase.clone());
        }

        let mut matched = false;
        let substituted: Vec<String> = tokens
            .iter()
            .map(|token| {
                let (core, trailing) = split_trailing_punctuation(token);
                match words.get(&core.to_lowercase()) {
                    Some(word) => {
                        matched = true;
                        format!("{}{}", word, trailing)
                    }
                    None => token.to_string(),
                }
            })
            .collect();

        if matched {
            debug!(%language, "Offline substitution for {:?}", text);
            Some(substituted.join(" "))
        } else {
            None
        }
    }
}

fn split_trailing_punctuation(token: &str) -> (&str, &str) {
    let core = token.trim_end_matches(|c: char| c.is_ascii_punctuation());
    (core, &token[core.len()..])
}
