use std::cmp::Ordering;

use crate::model::index::{IndexEntry, LanguageVariant, TranslationCandidate};
use crate::model::selection::SelectionResult;
use crate::services::ranking::RankingPolicy;

/// Variants a user with `preferred` accepts on the first pass. `Both` is always fine.
pub fn accepted_variants(preferred: LanguageVariant) -> Vec<LanguageVariant> {
    match preferred {
        LanguageVariant::Both => vec![LanguageVariant::Both],
        other => vec![LanguageVariant::Both, other],
    }
}

/// Second-pass variant when nothing acceptable exists. Traditional readers
/// can live with simplified text; simplified readers get nothing instead of
/// traditional.
pub fn fallback_variant(preferred: LanguageVariant) -> Option<LanguageVariant> {
    match preferred {
        LanguageVariant::Traditional => Some(LanguageVariant::Simplified),
        _ => None,
    }
}

pub fn filter_candidates(
    candidates: &[TranslationCandidate],
    preferred: LanguageVariant,
) -> Vec<&TranslationCandidate> {
    let accepted = accepted_variants(preferred);
    let filtered: Vec<&TranslationCandidate> = candidates
        .iter()
        .filter(|c| accepted.contains(&c.variant()))
        .collect();

    if !filtered.is_empty() {
        return filtered;
    }

    match fallback_variant(preferred) {
        Some(fallback) => candidates.iter().filter(|c| c.variant() == fallback).collect(),
        None => filtered,
    }
}

/// Highest-ranked candidate; the earliest one wins a full tie.
pub fn best<'a>(
    candidates: &[&'a TranslationCandidate],
    policy: &dyn RankingPolicy,
) -> Option<&'a TranslationCandidate> {
    let mut best: Option<&'a TranslationCandidate> = None;
    for &c in candidates {
        match best {
            Some(current) if policy.compare(c, current) != Ordering::Greater => {}
            _ => best = Some(c),
        }
    }
    best
}

pub fn select(
    original_id: &str,
    entry: &IndexEntry,
    preferred: LanguageVariant,
    policy: &dyn RankingPolicy,
) -> Option<SelectionResult> {
    if entry.is_translation_package() {
        return None;
    }

    let filtered = filter_candidates(&entry.translations, preferred);
    best(&filtered, policy).map(|c| SelectionResult {
        original_id: original_id.to_string(),
        candidate: c.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ranking::{RawMetric, TieredRecency, VersionTiers};
    use LanguageVariant::*;

    fn cand(id: &str, subs: u64, variant: LanguageVariant) -> TranslationCandidate {
        TranslationCandidate {
            id: id.to_string(),
            title: format!("pack {id}"),
            tags: vec!["Translation".into()],
            updated: 1_720_000_000,
            subs,
            score: 0.0,
            lang_type: Some(variant),
        }
    }

    fn entry(tags: &[&str], translations: Vec<TranslationCandidate>) -> IndexEntry {
        IndexEntry {
            title: "Core".into(),
            updated: 1,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            translations,
        }
    }

    #[test]
    fn preferred_variant_and_both_are_accepted() {
        let e = entry(&["Mod"], vec![cand("t", 900, Traditional), cand("b", 10, Both)]);

        let pick = select("1", &e, Simplified, &RawMetric).unwrap();
        assert_eq!(pick.candidate.id, "b");

        let pick = select("1", &e, Traditional, &RawMetric).unwrap();
        assert_eq!(pick.candidate.id, "t");
        assert_eq!(pick.original_id, "1");
    }

    #[test]
    fn traditional_falls_back_to_simplified_but_not_reverse() {
        let only_simplified = entry(&["Mod"], vec![cand("s", 5, Simplified)]);
        let pick = select("1", &only_simplified, Traditional, &RawMetric).unwrap();
        assert_eq!(pick.candidate.id, "s");

        let only_traditional = entry(&["Mod"], vec![cand("t", 5, Traditional)]);
        assert!(select("1", &only_traditional, Simplified, &RawMetric).is_none());
    }

    #[test]
    fn translation_originals_are_never_targets() {
        let e = entry(&["translation"], vec![cand("b", 5, Both)]);
        assert!(select("1", &e, Simplified, &RawMetric).is_none());
    }

    #[test]
    fn first_candidate_wins_full_tie() {
        let a = cand("a", 5, Both);
        let b = cand("b", 5, Both);
        let policy = TieredRecency::new(VersionTiers::default(), 90.0);
        assert_eq!(best(&[&a, &b], &policy).unwrap().id, "a");
        assert_eq!(best(&[&b, &a], &policy).unwrap().id, "b");
        assert!(best(&[], &policy).is_none());
    }
}
