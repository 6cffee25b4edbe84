//! Crisis phrase detection.
//!
//! Matching is plain case-insensitive substring containment over an ordered
//! phrase list; the first phrase found wins. No scoring, no language model.

use chrono::{DateTime, TimeZone};

use crate::models::DistressEvent;

pub static DEFAULT_DISTRESS_KEYWORDS: &[&str] = &[
    "want to die",
    "kill myself",
    "suicide",
    "end my life",
    "hopeless",
    "can't handle",
    "give up",
    "worthless",
    "hurt myself",
    "self harm",
    "no point",
    "better off dead",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Match { keyword: String },
    NoMatch,
}

impl Classification {
    pub fn is_match(&self) -> bool {
        matches!(self, Classification::Match { .. })
    }

    pub fn keyword(&self) -> Option<&str> {
        match self {
            Classification::Match { keyword } => Some(keyword),
            Classification::NoMatch => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistressClassifier {
    keywords: Vec<String>,
}

impl Default for DistressClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISTRESS_KEYWORDS.iter().copied())
    }
}

impl DistressClassifier {
    /// Build from an ordered phrase list. Blank phrases are dropped so they
    /// cannot match every message.
    pub fn new<I, K>(keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| normalize(k.as_ref().trim()))
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn classify(&self, text: &str) -> Classification {
        let text = normalize(text);
        self.keywords
            .iter()
            .find(|k| text.contains(k.as_str()))
            .map(|k| Classification::Match { keyword: k.clone() })
            .unwrap_or(Classification::NoMatch)
    }

    /// Classify and, on a match, capture the event with a display timestamp.
    pub fn detect<Tz>(&self, text: &str, at: &DateTime<Tz>) -> Option<DistressEvent>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let Classification::Match { keyword } = self.classify(text) else {
            return None;
        };
        Some(DistressEvent {
            raw_text: text.to_string(),
            matched_keyword: keyword,
            timestamp: display_timestamp(at),
        })
    }
}

/// `M/D/YYYY, h:mm:ss AM`
pub fn display_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Lowercase and fold typographic apostrophes so "can’t" matches "can't".
fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2018}', '\u{2019}'], "'")
}
