use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use crate::helper_functions::{column_dates, column_f64, month_key, month_span, round_to};
use crate::models::{AnalyzerError, IMPRESSIONS_SPONSORED, IMPRESSIONS_TOTAL, UNIQUE_IMPRESSIONS};

#[derive(Debug, Serialize)]
pub struct MonthlyReach {
    pub month: String,
    pub impressions: i64,
    pub unique_impressions: i64,
    pub reach_ratio: f64,
    /// Month-over-month impression change; `null` for the first month and
    /// after a zero month.
    pub imp_change_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ReachMetrics {
    pub total_impressions: i64,
    pub total_unique_impressions: i64,
    pub avg_daily_impressions: f64,
    pub max_daily_impressions: i64,
    pub max_daily_unique_impressions: i64,
    pub overall_reach_ratio: f64,
    pub has_sponsored: bool,
    pub monthly: Vec<MonthlyReach>,
}

/// Reach metrics from impression data: totals, daily mean and peak, the
/// unique/total reach ratio, and a monthly trend.
pub fn calculate_reach(df: &DataFrame) -> Result<ReachMetrics, AnalyzerError> {
    let dates = column_dates(df)?;
    let impressions = column_f64(df, IMPRESSIONS_TOTAL)?;
    let unique = column_f64(df, UNIQUE_IMPRESSIONS)?;
    let sponsored = column_f64(df, IMPRESSIONS_SPONSORED)?;

    let total_imp: f64 = impressions.iter().sum();
    let total_unique: f64 = unique.iter().sum();
    let max_daily = impressions.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let max_daily_unique = unique.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg_daily = if impressions.is_empty() {
        0.0
    } else {
        total_imp / impressions.len() as f64
    };

    let mut by_month: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for i in 0..dates.len() {
        let entry = by_month.entry(month_key(dates[i])).or_insert((0.0, 0.0));
        entry.0 += impressions[i];
        entry.1 += unique[i];
    }

    // One row per calendar month in the span, including empty months.
    let mut monthly = Vec::new();
    let mut previous: Option<f64> = None;
    if let (Some(&first), Some(&last)) = (dates.first(), dates.last()) {
        for month in month_span(first, last) {
            let (imp, uniq) = by_month.get(&month).copied().unwrap_or((0.0, 0.0));
            let reach_ratio = if imp > 0.0 { round_to(uniq / imp, 3) } else { 0.0 };
            let imp_change_pct = match previous {
                Some(prev) if prev > 0.0 => Some(round_to((imp - prev) / prev * 100.0, 1)),
                _ => None,
            };
            previous = Some(imp);
            monthly.push(MonthlyReach {
                month,
                impressions: imp as i64,
                unique_impressions: uniq as i64,
                reach_ratio,
                imp_change_pct,
            });
        }
    }

    Ok(ReachMetrics {
        total_impressions: total_imp as i64,
        total_unique_impressions: total_unique as i64,
        avg_daily_impressions: round_to(avg_daily, 1),
        max_daily_impressions: if impressions.is_empty() { 0 } else { max_daily as i64 },
        max_daily_unique_impressions: if unique.is_empty() { 0 } else { max_daily_unique as i64 },
        overall_reach_ratio: if total_imp > 0.0 {
            round_to(total_unique / total_imp, 3)
        } else {
            0.0
        },
        has_sponsored: sponsored.iter().sum::<f64>() > 0.0,
        monthly,
    })
}
