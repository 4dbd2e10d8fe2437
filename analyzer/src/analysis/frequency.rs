use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use crate::helper_functions::{
    column_dates, column_f64, month_key, month_span, round_to, trailing_mean_shrinking,
    weekday_index, WEEKDAY_NAMES,
};
use crate::models::{
    AnalysisOptions, AnalyzerError, ENGAGEMENT_RATE_TOTAL, IMPRESSIONS_TOTAL, TOTAL_ENGAGEMENT,
};

#[derive(Debug, Serialize)]
pub struct MonthlyActivity {
    pub month: String,
    pub active_days: usize,
    pub spike_days: usize,
    pub total_days: usize,
}

#[derive(Debug, Serialize)]
pub struct WeekdayPerformance {
    pub weekday: String,
    /// The means are `null` for a weekday the date range never touched.
    pub avg_impressions: Option<f64>,
    pub avg_engagement: Option<f64>,
    pub avg_rate: Option<f64>,
}

/// Posting activity approximated from daily aggregates: the export has no
/// per-post rows, so active days and impression spikes stand in for
/// posting frequency.
#[derive(Debug, Serialize)]
pub struct FrequencyMetrics {
    pub total_days: usize,
    pub active_days: usize,
    pub activity_rate_pct: f64,
    pub estimated_spike_days: usize,
    pub avg_spikes_per_month: f64,
    pub monthly_activity: Vec<MonthlyActivity>,
    /// Mean performance per weekday, ordered Monday through Sunday.
    pub day_of_week_performance: Vec<WeekdayPerformance>,
    pub best_posting_days: Vec<String>,
}

pub fn calculate_post_frequency(
    df: &DataFrame,
    options: &AnalysisOptions,
) -> Result<FrequencyMetrics, AnalyzerError> {
    let dates = column_dates(df)?;
    let impressions = column_f64(df, IMPRESSIONS_TOTAL)?;
    let engagement = column_f64(df, TOTAL_ENGAGEMENT)?;
    let rates = column_f64(df, ENGAGEMENT_RATE_TOTAL)?;

    let total_days = dates.len();
    let active_days = engagement.iter().filter(|&&e| e > 0.0).count();

    // A spike day's impressions exceed the configured multiple of the
    // trailing 7-day mean (shrinking window at the start of the range).
    let baseline = trailing_mean_shrinking(&impressions, 7);
    let is_spike: Vec<bool> = impressions
        .iter()
        .zip(baseline.iter())
        .map(|(&imp, &base)| imp > base * options.spike_factor)
        .collect();
    let spike_days = is_spike.iter().filter(|&&s| s).count();

    let mut by_month: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    for i in 0..total_days {
        let entry = by_month.entry(month_key(dates[i])).or_insert((0, 0, 0));
        if engagement[i] > 0.0 {
            entry.0 += 1;
        }
        if is_spike[i] {
            entry.1 += 1;
        }
        entry.2 += 1;
    }
    // One row per calendar month in the span, including empty months.
    let mut monthly_activity = Vec::new();
    if let (Some(&first), Some(&last)) = (dates.first(), dates.last()) {
        for month in month_span(first, last) {
            let (active, spikes, days) = by_month.get(&month).copied().unwrap_or((0, 0, 0));
            monthly_activity.push(MonthlyActivity {
                month,
                active_days: active,
                spike_days: spikes,
                total_days: days,
            });
        }
    }

    // Per-weekday means, Monday first.
    let mut weekday_sums = [(0.0f64, 0.0f64, 0.0f64, 0usize); 7];
    for i in 0..total_days {
        let slot = &mut weekday_sums[weekday_index(dates[i])];
        slot.0 += impressions[i];
        slot.1 += engagement[i];
        slot.2 += rates[i];
        slot.3 += 1;
    }
    let day_of_week_performance: Vec<WeekdayPerformance> = weekday_sums
        .iter()
        .enumerate()
        .map(|(idx, &(imp, eng, rate, count))| WeekdayPerformance {
            weekday: WEEKDAY_NAMES[idx].to_string(),
            avg_impressions: (count > 0).then(|| round_to(imp / count as f64, 2)),
            avg_engagement: (count > 0).then(|| round_to(eng / count as f64, 2)),
            avg_rate: (count > 0).then(|| round_to(rate / count as f64, 2)),
        })
        .collect();

    // Only weekdays with observations compete for the top slots.
    let mut ranked: Vec<&WeekdayPerformance> = day_of_week_performance
        .iter()
        .filter(|w| w.avg_impressions.is_some())
        .collect();
    ranked.sort_by(|a, b| {
        b.avg_impressions
            .partial_cmp(&a.avg_impressions)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let best_posting_days = ranked
        .iter()
        .take(3)
        .map(|w| w.weekday.clone())
        .collect();

    Ok(FrequencyMetrics {
        total_days,
        active_days,
        activity_rate_pct: if total_days > 0 {
            round_to(active_days as f64 / total_days as f64 * 100.0, 1)
        } else {
            0.0
        },
        estimated_spike_days: spike_days,
        avg_spikes_per_month: if total_days > 0 {
            round_to(spike_days as f64 / (total_days as f64 / 30.0), 1)
        } else {
            0.0
        },
        monthly_activity,
        day_of_week_performance,
        best_posting_days,
    })
}
