use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TRANSLATION_TAG: &str = "translation";
pub const UNKNOWN_TITLE: &str = "Unknown";

pub fn tagged_as_translation(tags: &[String]) -> bool {
    tags.iter()
        .any(|t| t.trim().eq_ignore_ascii_case(TRANSLATION_TAG))
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LanguageVariant {
    Simplified,
    Traditional,
    Both,
}

impl LanguageVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageVariant::Simplified => "simplified",
            LanguageVariant::Traditional => "traditional",
            LanguageVariant::Both => "both",
        }
    }
}

impl std::fmt::Display for LanguageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationCandidate {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub updated: i64,

    #[serde(default)]
    pub subs: u64,

    #[serde(default)]
    pub score: f64,

    /// Absent in files written before classification moved into the index.
    #[serde(default)]
    pub lang_type: Option<LanguageVariant>,
}

impl TranslationCandidate {
    pub fn variant(&self) -> LanguageVariant {
        self.lang_type.unwrap_or(LanguageVariant::Both)
    }
}

/// Last-seen metadata of any catalog item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceEntry {
    pub title: String,
    pub updated: i64,
    pub tags: Vec<String>,
}

impl ReferenceEntry {
    pub fn placeholder() -> Self {
        ReferenceEntry {
            title: UNKNOWN_TITLE.to_string(),
            updated: 0,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndexEntry {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub updated: i64,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub translations: Vec<TranslationCandidate>,
}

impl IndexEntry {
    pub fn new(meta: ReferenceEntry, translations: Vec<TranslationCandidate>) -> Self {
        IndexEntry {
            title: meta.title,
            updated: meta.updated,
            tags: meta.tags,
            translations,
        }
    }

    pub fn is_translation_package(&self) -> bool {
        tagged_as_translation(&self.tags)
    }
}

/// original id -> metadata and every candidate translation that depends on it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct RelationIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl RelationIndex {
    pub fn from_entries(entries: BTreeMap<String, IndexEntry>) -> Self {
        RelationIndex { entries }
    }

    pub fn get(&self, original_id: &str) -> Option<&IndexEntry> {
        self.entries.get(original_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut IndexEntry)> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn candidate_count(&self) -> usize {
        self.entries.values().map(|e| e.translations.len()).sum()
    }
}
