use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnuvadError;

/// Languages the survey UI can be rendered in.
///
/// `English` is the language every form is authored in. Lookups for it are
/// pass-through and never reach the cache or the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    English,
    Kannada,
    Hindi,
    Tamil,
    Telugu,
    Malayalam,
    Marathi,
    Bengali,
    Gujarati,
    Punjabi,
    Odia,
}

impl Language {
    /// The authoring language.
    pub const SOURCE: Language = Language::English;

    pub const ALL: [Language; 11] = [
        Language::English,
        Language::Kannada,
        Language::Hindi,
        Language::Tamil,
        Language::Telugu,
        Language::Malayalam,
        Language::Marathi,
        Language::Bengali,
        Language::Gujarati,
        Language::Punjabi,
        Language::Odia,
    ];

    /// ISO 639-1 code sent to the provider.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Kannada => "kn",
            Language::Hindi => "hi",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::Malayalam => "ml",
            Language::Marathi => "mr",
            Language::Bengali => "bn",
            Language::Gujarati => "gu",
            Language::Punjabi => "pa",
            Language::Odia => "or",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Kannada => "Kannada",
            Language::Hindi => "Hindi",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Malayalam => "Malayalam",
            Language::Marathi => "Marathi",
            Language::Bengali => "Bengali",
            Language::Gujarati => "Gujarati",
            Language::Punjabi => "Punjabi",
            Language::Odia => "Odia",
        }
    }

    /// True when no translation is needed.
    pub fn is_identity(self) -> bool {
        self == Self::SOURCE
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::SOURCE
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = AnuvadError;

    /// Accepts ISO codes ("kn"), regional tags ("kn-IN") and English names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let primary = normalized
            .split(['-', '_'])
            .next()
            .unwrap_or_default();

        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == primary || lang.name().to_lowercase() == normalized)
            .ok_or_else(|| AnuvadError::UnknownLanguage(s.to_string()))
    }
}

impl TryFrom<String> for Language {
    type Error = AnuvadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}
