use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::index::{tagged_as_translation, ReferenceEntry, TranslationCandidate};
use crate::model::record::RawRecord;
use crate::services::language::{self, ClassifierPolicy};

static RE_CHINESE_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(汉化|漢化|中文|简体|簡體|繁体|繁體|chinese|(?:^|[^a-z0-9])(?:cn|zh|tw|hk|cht|chs|sc|tc)(?:[^a-z0-9]|$))",
    )
    .expect("chinese intent pattern")
});

pub struct Normalized {
    pub reference: ReferenceEntry,
    pub candidate: Option<TranslationCandidate>,
}

pub fn has_chinese_intent(title: &str) -> bool {
    RE_CHINESE_INTENT.is_match(title)
}

pub fn is_valid_translation(record: &RawRecord) -> bool {
    tagged_as_translation(&record.tags) && has_chinese_intent(&record.title)
}

pub fn normalize(record: &RawRecord, policy: ClassifierPolicy) -> Normalized {
    let reference = ReferenceEntry {
        title: record.title.clone(),
        updated: record.updated,
        tags: record.tags.clone(),
    };

    // A translation with nothing to translate has no original to hang off.
    let candidate = if is_valid_translation(record) && !record.children.is_empty() {
        Some(TranslationCandidate {
            id: record.id.clone(),
            title: record.title.clone(),
            tags: record.tags.clone(),
            updated: record.updated,
            subs: record.subscriptions,
            score: record.vote_score(),
            lang_type: Some(language::detect(&record.title, policy)),
        })
    } else {
        None
    };

    Normalized {
        reference,
        candidate,
    }
}
