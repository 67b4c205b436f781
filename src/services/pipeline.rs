use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::SubscriptionClient;
use crate::error::{Error, Result};
use crate::model::index::{LanguageVariant, RelationIndex};
use crate::model::selection::{SelectionResult, SubscriptionPlan};
use crate::services::language::ClassifierPolicy;
use crate::services::ranking::RankingPolicy;
use crate::services::reconcile::{ReconcileReport, Reconciler, VerifyPolicy};
use crate::services::{dedup, selector, store};

pub struct PipelineConfig<'a> {
    pub app_id: u32,
    pub index_file: &'a Path,
    pub classifier: ClassifierPolicy,
    pub language: LanguageVariant,
    pub ranking: &'a dyn RankingPolicy,
    pub verify: VerifyPolicy,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub subscribed_before: usize,
    pub originals_considered: usize,
    pub selected: usize,
    pub plan: SubscriptionPlan,
    pub dry_run: bool,
    pub reconcile: Option<ReconcileReport>,
}

/// Best pick for every subscribed original the index knows about.
pub fn select_all(
    index: &RelationIndex,
    subscribed: &BTreeSet<String>,
    preferred: LanguageVariant,
    policy: &dyn RankingPolicy,
) -> (usize, Vec<SelectionResult>) {
    let mut considered = 0usize;
    let mut selections = Vec::new();

    for original_id in subscribed {
        let Some(entry) = index.get(original_id) else {
            continue;
        };
        considered += 1;

        if let Some(sel) = selector::select(original_id, entry, preferred, policy) {
            selections.push(sel);
        }
    }

    (considered, selections)
}

pub async fn run<C>(
    client: &C,
    cfg: PipelineConfig<'_>,
    cancel: CancellationToken,
) -> Result<PipelineReport>
where
    C: SubscriptionClient + ?Sized,
{
    if !client.is_entitled(cfg.app_id).await? {
        return Err(Error::NotEntitled { app_id: cfg.app_id });
    }

    let index = store::load(cfg.index_file, cfg.classifier)?;

    let subscribed = client.subscribed_ids().await?;
    info!(count = subscribed.len(), "Current subscriptions read");

    let (considered, selections) = select_all(&index, &subscribed, cfg.language, cfg.ranking);
    let selected = selections.len();
    let plan = dedup::plan(selections, &index, &subscribed);

    info!(
        considered,
        selected,
        pending = plan.pending.len(),
        already_subscribed = plan.skipped_already_subscribed,
        shared = plan.skipped_shared,
        ranking = cfg.ranking.name(),
        language = %cfg.language,
        "Selection finished"
    );

    let mut report = PipelineReport {
        subscribed_before: subscribed.len(),
        originals_considered: considered,
        selected,
        plan,
        dry_run: cfg.dry_run,
        reconcile: None,
    };

    if report.plan.is_empty() || cfg.dry_run {
        return Ok(report);
    }

    for item in &report.plan.pending {
        info!(id = %item.id, title = %item.title, origin = %item.origin, "Queued");
    }

    let mut reconciler = Reconciler::new(client, cfg.verify, cancel);
    report.reconcile = Some(reconciler.run(&report.plan.targets, &subscribed).await);

    Ok(report)
}
