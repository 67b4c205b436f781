//! Candidate ranking.
//!
//! Two strategies exist and neither is "the" right one: `tiered` favours the
//! release line a pack was last updated for and then trades recency against
//! adoption, `raw-metric` simply prefers the most subscribed pack.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::index::TranslationCandidate;

const SECONDS_PER_DAY: f64 = 86_400.0;
pub const DEFAULT_WEIGHT_LOG_SUBS: f64 = 90.0;
pub const LEGACY_TIER: &str = "legacy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    pub name: String,
    /// `YYYY-MM-DD`, interpreted as UTC midnight.
    pub released: String,
}

pub fn default_tiers() -> Vec<TierSpec> {
    [
        ("1.6", "2025-07-12"),
        ("1.5", "2024-04-12"),
        ("1.4", "2022-10-21"),
        ("1.3", "2021-07-21"),
    ]
    .into_iter()
    .map(|(name, released)| TierSpec {
        name: name.to_string(),
        released: released.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone)]
struct Tier {
    released_at: i64,
    name: String,
    rank: u32,
}

/// Release lines, newest first.
#[derive(Debug, Clone)]
pub struct VersionTiers {
    tiers: Vec<Tier>,
}

impl VersionTiers {
    pub fn parse(specs: &[TierSpec]) -> Self {
        let mut parsed: Vec<(i64, String)> = Vec::with_capacity(specs.len());

        for spec in specs {
            match NaiveDate::parse_from_str(spec.released.trim(), "%Y-%m-%d") {
                Ok(date) => {
                    let ts = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
                    parsed.push((ts, spec.name.clone()));
                }
                Err(e) => {
                    warn!(tier = %spec.name, released = %spec.released, error = %e, "Ignoring tier with invalid date");
                }
            }
        }

        // Rank 1 is the oldest release line.
        parsed.sort_by_key(|(ts, _)| *ts);
        let mut tiers: Vec<Tier> = parsed
            .into_iter()
            .enumerate()
            .map(|(i, (released_at, name))| Tier {
                released_at,
                name,
                rank: i as u32 + 1,
            })
            .collect();
        tiers.reverse();

        VersionTiers { tiers }
    }

    pub fn tier_of(&self, updated: i64) -> (u32, &str) {
        self.tiers
            .iter()
            .find(|t| updated >= t.released_at)
            .map(|t| (t.rank, t.name.as_str()))
            .unwrap_or((0, LEGACY_TIER))
    }
}

impl Default for VersionTiers {
    fn default() -> Self {
        VersionTiers::parse(&default_tiers())
    }
}

pub trait RankingPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Greater` means `a` is the better pick.
    fn compare(&self, a: &TranslationCandidate, b: &TranslationCandidate) -> Ordering;
}

pub struct TieredRecency {
    tiers: VersionTiers,
    weight_log_subs: f64,
}

impl TieredRecency {
    pub fn new(tiers: VersionTiers, weight_log_subs: f64) -> Self {
        TieredRecency {
            tiers,
            weight_log_subs,
        }
    }

    /// A tenfold subscriber count is worth `weight_log_subs` days of freshness.
    pub fn sort_key(&self, c: &TranslationCandidate) -> (u32, f64) {
        let (tier, _) = self.tiers.tier_of(c.updated);
        let days = c.updated as f64 / SECONDS_PER_DAY;
        let adoption = (c.subs.max(1) as f64).log10() * self.weight_log_subs;
        (tier, days + adoption)
    }
}

impl RankingPolicy for TieredRecency {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn compare(&self, a: &TranslationCandidate, b: &TranslationCandidate) -> Ordering {
        let (tier_a, score_a) = self.sort_key(a);
        let (tier_b, score_b) = self.sort_key(b);
        tier_a.cmp(&tier_b).then(score_a.total_cmp(&score_b))
    }
}

pub struct RawMetric;

impl RankingPolicy for RawMetric {
    fn name(&self) -> &'static str {
        "raw-metric"
    }

    fn compare(&self, a: &TranslationCandidate, b: &TranslationCandidate) -> Ordering {
        a.subs
            .cmp(&b.subs)
            .then(a.score.total_cmp(&b.score))
            .then(a.updated.cmp(&b.updated))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingStrategy {
    #[default]
    Tiered,
    RawMetric,
}

impl RankingStrategy {
    pub fn build(self, tiers: &[TierSpec], weight_log_subs: f64) -> Box<dyn RankingPolicy> {
        match self {
            RankingStrategy::Tiered => Box::new(TieredRecency::new(
                VersionTiers::parse(tiers),
                weight_log_subs,
            )),
            RankingStrategy::RawMetric => Box::new(RawMetric),
        }
    }
}

impl FromStr for RankingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiered" => Ok(RankingStrategy::Tiered),
            "raw-metric" | "raw_metric" | "raw" => Ok(RankingStrategy::RawMetric),
            other => Err(format!("unknown ranking strategy '{other}' (expected tiered or raw-metric)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;
    // 2024-06-01, inside the 1.5 line.
    const MID_1_5: i64 = 1_717_200_000;

    fn cand(id: &str, updated: i64, subs: u64, score: f64) -> TranslationCandidate {
        TranslationCandidate {
            id: id.to_string(),
            title: String::new(),
            tags: Vec::new(),
            updated,
            subs,
            score,
            lang_type: None,
        }
    }

    #[test]
    fn tiers_map_to_newest_qualifying_release() {
        let tiers = VersionTiers::default();
        assert_eq!(tiers.tier_of(MID_1_5), (3, "1.5"));
        assert_eq!(tiers.tier_of(1_752_278_400), (4, "1.6")); // 2025-07-12 00:00 UTC
        assert_eq!(tiers.tier_of(1_752_278_399), (3, "1.5"));
        assert_eq!(tiers.tier_of(1_500_000_000), (0, LEGACY_TIER));
    }

    #[test]
    fn invalid_tier_dates_are_dropped() {
        let tiers = VersionTiers::parse(&[
            TierSpec { name: "beta".into(), released: "soon".into() },
            TierSpec { name: "1.0".into(), released: "2018-10-17".into() },
        ]);
        assert_eq!(tiers.tier_of(MID_1_5), (1, "1.0"));
    }

    #[test]
    fn adoption_outweighs_small_recency_gap() {
        let policy = TieredRecency::new(VersionTiers::default(), DEFAULT_WEIGHT_LOG_SUBS);
        let fresh = cand("a", MID_1_5 + 10 * DAY, 10, 0.0);
        let popular = cand("b", MID_1_5, 1_000, 0.0);

        // 10 days of recency < log10(100) * 90 = 180
        assert_eq!(policy.compare(&popular, &fresh), Ordering::Greater);

        let much_fresher = cand("c", MID_1_5 + 200 * DAY, 10, 0.0);
        assert_eq!(policy.compare(&much_fresher, &popular), Ordering::Greater);
    }

    #[test]
    fn newer_tier_wins_regardless_of_score() {
        let policy = TieredRecency::new(VersionTiers::default(), DEFAULT_WEIGHT_LOG_SUBS);
        let old_popular = cand("a", 1_752_278_399, 1_000_000, 0.0);
        let new_obscure = cand("b", 1_752_278_400, 0, 0.0);
        assert_eq!(policy.compare(&new_obscure, &old_popular), Ordering::Greater);
    }

    #[test]
    fn raw_metric_is_lexicographic() {
        let p = RawMetric;
        assert_eq!(p.compare(&cand("a", 0, 10, 0.1), &cand("b", 99, 9, 0.9)), Ordering::Greater);
        assert_eq!(p.compare(&cand("a", 0, 10, 0.9), &cand("b", 99, 10, 0.1)), Ordering::Greater);
        assert_eq!(p.compare(&cand("a", 0, 10, 0.5), &cand("b", 99, 10, 0.5)), Ordering::Less);
    }

    #[test]
    fn strategy_from_str() {
        assert_eq!("raw-metric".parse::<RankingStrategy>().unwrap(), RankingStrategy::RawMetric);
        assert_eq!("Tiered".parse::<RankingStrategy>().unwrap(), RankingStrategy::Tiered);
        assert!("best".parse::<RankingStrategy>().is_err());
    }
}
