use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::index::LanguageVariant;

// Short locale codes only count when not glued to other ASCII letters/digits,
// so "SC" inside "SCENARIO" stays silent while "[SC]" and "汉化SC" match.
static RE_TRADITIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(繁|(?:^|[^a-z0-9])(?:tw|hk|cht|tc)(?:[^a-z0-9]|$)|traditional)")
        .expect("traditional pattern")
});

static RE_SIMPLIFIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(简|簡|(?:^|[^a-z0-9])(?:cn|chs|sc)(?:[^a-z0-9]|$)|simplified)")
        .expect("simplified pattern")
});

/// How a title with only simplified markers is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierPolicy {
    /// Simplified-only titles are `Both`: nothing is ever labelled `Simplified`.
    #[default]
    Canonical,
    /// Simplified-only titles are `Simplified`.
    Strict,
}

pub fn detect(title: &str, policy: ClassifierPolicy) -> LanguageVariant {
    let traditional = RE_TRADITIONAL.is_match(title);
    let simplified = RE_SIMPLIFIED.is_match(title);

    match (traditional, simplified) {
        (true, true) => LanguageVariant::Both,
        (true, false) => LanguageVariant::Traditional,
        (false, true) if policy == ClassifierPolicy::Strict => LanguageVariant::Simplified,
        _ => LanguageVariant::Both,
    }
}
