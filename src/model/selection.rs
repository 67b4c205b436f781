use serde::Serialize;
use std::collections::BTreeSet;

use super::index::TranslationCandidate;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub original_id: String,
    pub candidate: TranslationCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSubscription {
    pub id: String,
    pub title: String,
    pub origin: String,
}

/// Deduplicated work for the reconciler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriptionPlan {
    pub pending: Vec<PendingSubscription>,
    pub targets: BTreeSet<String>,
    pub skipped_self_reference: usize,
    pub skipped_already_subscribed: usize,
    pub skipped_shared: usize,
}

impl SubscriptionPlan {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn title_of(&self, id: &str) -> &str {
        self.pending
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.title.as_str())
            .unwrap_or(super::index::UNKNOWN_TITLE)
    }
}
