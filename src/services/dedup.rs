use std::collections::BTreeSet;

use tracing::debug;

use crate::model::index::RelationIndex;
use crate::model::selection::{PendingSubscription, SelectionResult, SubscriptionPlan};

/// Folds per-original picks into one plan. Selections are visited by ascending
/// original id, so a pack shared by several originals is attributed to the
/// lowest of them.
pub fn plan(
    mut selections: Vec<SelectionResult>,
    index: &RelationIndex,
    subscribed: &BTreeSet<String>,
) -> SubscriptionPlan {
    selections.sort_by(|a, b| a.original_id.cmp(&b.original_id));

    let mut out = SubscriptionPlan::default();

    for sel in selections {
        let is_translation = index
            .get(&sel.original_id)
            .map(|e| e.is_translation_package())
            .unwrap_or(false);
        if is_translation {
            out.skipped_self_reference += 1;
            continue;
        }

        let trans_id = sel.candidate.id;

        if subscribed.contains(&trans_id) {
            out.skipped_already_subscribed += 1;
            continue;
        }

        if out.targets.contains(&trans_id) {
            debug!(id = %trans_id, origin = %sel.original_id, "Shared translation already planned");
            out.skipped_shared += 1;
            continue;
        }

        out.targets.insert(trans_id.clone());
        out.pending.push(PendingSubscription {
            id: trans_id,
            title: sel.candidate.title,
            origin: sel.original_id,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::index::{IndexEntry, TranslationCandidate};
    use std::collections::BTreeMap;

    fn cand(id: &str) -> TranslationCandidate {
        TranslationCandidate {
            id: id.to_string(),
            title: format!("pack {id}"),
            tags: vec![],
            updated: 0,
            subs: 0,
            score: 0.0,
            lang_type: None,
        }
    }

    fn sel(original: &str, candidate: &str) -> SelectionResult {
        SelectionResult {
            original_id: original.to_string(),
            candidate: cand(candidate),
        }
    }

    fn index(originals: &[(&str, &[&str])]) -> RelationIndex {
        let mut entries = BTreeMap::new();
        for (id, tags) in originals {
            entries.insert(
                id.to_string(),
                IndexEntry {
                    title: format!("mod {id}"),
                    updated: 0,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    translations: vec![],
                },
            );
        }
        RelationIndex::from_entries(entries)
    }

    #[test]
    fn shared_pack_is_planned_once_for_first_original() {
        let idx = index(&[("O1", &["Mod"]), ("O2", &["Mod"])]);
        let plan = plan(vec![sel("O2", "X"), sel("O1", "X")], &idx, &BTreeSet::new());

        assert_eq!(plan.targets.len(), 1);
        assert_eq!(plan.pending.len(), 1);
        assert_eq!(plan.pending[0].origin, "O1");
        assert_eq!(plan.skipped_shared, 1);
    }

    #[test]
    fn subscribed_and_translation_originals_are_skipped() {
        let idx = index(&[("O1", &["Mod"]), ("O2", &["Translation"]), ("O3", &["Library"])]);
        let subscribed: BTreeSet<String> = ["X".to_string()].into_iter().collect();

        let plan = plan(
            vec![sel("O1", "X"), sel("O2", "Y"), sel("O3", "Z")],
            &idx,
            &subscribed,
        );

        assert_eq!(plan.skipped_already_subscribed, 1);
        assert_eq!(plan.skipped_self_reference, 1);
        assert_eq!(plan.targets.iter().collect::<Vec<_>>(), vec!["Z"]);
        assert_eq!(plan.title_of("Z"), "pack Z");
    }
}
