// Deal ranking
// Deduplicates the merged deal set and puts it in presentation order. The
// order is a pure function of the input sequence, never of arrival timing.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::deal::{DateRange, Deal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonCriteria {
    Price,
    Rating,
    Value,
    Savings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealComparison {
    pub rank: usize,
    pub score: f64,
    pub deal: Deal,
}

// Weight of savings against rating in the value score
const VALUE_SAVINGS_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, Copy, Default)]
pub struct DealRanker;

impl DealRanker {
    pub fn new() -> Self {
        Self
    }

    pub fn rank(&self, deals: Vec<Deal>) -> Vec<Deal> {
        let mut ranked = dedup(deals);
        // sort_by is stable, so equal deals keep their insertion order
        ranked.sort_by(presentation_order);
        ranked
    }

    /// Scores each deal on one criterion (0-100, higher is better) and
    /// returns them best first with 1-based ranks. Equal scores keep the
    /// presentation order of `rank`.
    pub fn compare(&self, deals: Vec<Deal>, criteria: ComparisonCriteria) -> Vec<DealComparison> {
        let ranked = self.rank(deals);
        let cheapest = ranked
            .iter()
            .map(|d| d.price.amount)
            .fold(f64::INFINITY, f64::min);

        let mut scored: Vec<(f64, Deal)> = ranked
            .into_iter()
            .map(|deal| (score(&deal, criteria, cheapest), deal))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, deal))| DealComparison {
                rank: i + 1,
                score,
                deal,
            })
            .collect()
    }
}

fn dedup(deals: Vec<Deal>) -> Vec<Deal> {
    let mut slots: HashMap<(String, String, DateRange), usize> = HashMap::with_capacity(deals.len());
    let mut kept: Vec<Deal> = Vec::with_capacity(deals.len());

    for deal in deals {
        let key = (deal.provider.clone(), deal.title.clone(), deal.date_range);
        match slots.get(&key) {
            Some(&slot) => {
                if deal.price.amount < kept[slot].price.amount {
                    tracing::debug!(
                        provider = %deal.provider,
                        title = %deal.title,
                        "replacing duplicate deal with cheaper entry"
                    );
                    kept[slot] = deal;
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(deal);
            }
        }
    }
    kept
}

fn presentation_order(a: &Deal, b: &Deal) -> Ordering {
    b.savings_percent
        .cmp(&a.savings_percent)
        .then_with(|| b.rating.total_cmp(&a.rating))
        .then_with(|| a.price.amount.total_cmp(&b.price.amount))
}

fn score(deal: &Deal, criteria: ComparisonCriteria, cheapest: f64) -> f64 {
    let rating_score = deal.rating / 5.0 * 100.0;
    let raw = match criteria {
        ComparisonCriteria::Price => {
            if deal.price.amount > 0.0 {
                cheapest / deal.price.amount * 100.0
            } else {
                100.0
            }
        }
        ComparisonCriteria::Rating => rating_score,
        ComparisonCriteria::Savings => deal.savings_percent as f64,
        ComparisonCriteria::Value => {
            deal.savings_percent as f64 * VALUE_SAVINGS_WEIGHT
                + rating_score * (1.0 - VALUE_SAVINGS_WEIGHT)
        }
    };
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}
