use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use crate::helper_functions::{
    column_dates, column_f64, month_key, month_span, round_to, trailing_mean_strict,
};
use crate::models::{
    AnalyzerError, CLICKS_TOTAL, COMMENTS_TOTAL, ENGAGEMENT_RATE_TOTAL, IMPRESSIONS_TOTAL,
    REACTIONS_TOTAL, REPOSTS_TOTAL, TOTAL_ENGAGEMENT,
};

const ROLLING_WINDOW: usize = 7;

#[derive(Debug, Serialize)]
pub struct EngagementComponents {
    pub clicks: i64,
    pub reactions: i64,
    pub comments: i64,
    pub reposts: i64,
    pub clicks_pct: f64,
    pub reactions_pct: f64,
    pub comments_pct: f64,
    pub reposts_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyEngagement {
    pub month: String,
    pub total_engagement: i64,
    /// Mean of the source-provided daily rate; `null` for a month with no
    /// rows.
    pub avg_rate: Option<f64>,
    /// Month engagement over month impressions, recomputed independently.
    pub calculated_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct RollingRate {
    pub date: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct EngagementMetrics {
    /// Total engagement over total impressions across the full range,
    /// computed independently of the source-provided rate.
    pub overall_rate: f64,
    pub daily_avg_rate: f64,
    pub max_daily_rate: f64,
    pub min_daily_rate: f64,
    pub total_engagement: i64,
    pub components: EngagementComponents,
    pub monthly: Vec<MonthlyEngagement>,
    /// Strict 7-day trailing mean of the source rate: the first six days
    /// produce no value and are dropped, not zero-filled.
    pub rolling_7d: Vec<RollingRate>,
}

pub fn calculate_engagement_rate(df: &DataFrame) -> Result<EngagementMetrics, AnalyzerError> {
    let dates = column_dates(df)?;
    let engagement = column_f64(df, TOTAL_ENGAGEMENT)?;
    let impressions = column_f64(df, IMPRESSIONS_TOTAL)?;
    let rates = column_f64(df, ENGAGEMENT_RATE_TOTAL)?;
    let clicks = column_f64(df, CLICKS_TOTAL)?;
    let reactions = column_f64(df, REACTIONS_TOTAL)?;
    let comments = column_f64(df, COMMENTS_TOTAL)?;
    let reposts = column_f64(df, REPOSTS_TOTAL)?;

    let total_eng: f64 = engagement.iter().sum();
    let total_imp: f64 = impressions.iter().sum();
    let overall_rate = if total_imp > 0.0 { total_eng / total_imp } else { 0.0 };

    let n = rates.len() as f64;
    let daily_avg = if rates.is_empty() { 0.0 } else { rates.iter().sum::<f64>() / n };
    let max_rate = rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_rate = rates.iter().cloned().fold(f64::INFINITY, f64::min);

    let components = component_breakdown(&clicks, &reactions, &comments, &reposts, total_eng);

    // Monthly sums of counts plus the mean source rate per month.
    let mut by_month: BTreeMap<String, (f64, f64, f64, usize)> = BTreeMap::new();
    for i in 0..dates.len() {
        let entry = by_month
            .entry(month_key(dates[i]))
            .or_insert((0.0, 0.0, 0.0, 0));
        entry.0 += engagement[i];
        entry.1 += impressions[i];
        entry.2 += rates[i];
        entry.3 += 1;
    }
    // One row per calendar month in the span, including empty months.
    let mut monthly = Vec::new();
    if let (Some(&first), Some(&last)) = (dates.first(), dates.last()) {
        for month in month_span(first, last) {
            let (eng, imp, rate_sum, days) =
                by_month.get(&month).copied().unwrap_or((0.0, 0.0, 0.0, 0));
            monthly.push(MonthlyEngagement {
                month,
                total_engagement: eng as i64,
                avg_rate: (days > 0).then(|| round_to(rate_sum / days as f64, 4)),
                calculated_rate: if imp > 0.0 { round_to(eng / imp, 4) } else { 0.0 },
            });
        }
    }

    let rolling_7d = rolling_rates(&dates, &rates);

    Ok(EngagementMetrics {
        overall_rate: round_to(overall_rate, 4),
        daily_avg_rate: round_to(daily_avg, 4),
        max_daily_rate: if rates.is_empty() { 0.0 } else { round_to(max_rate, 4) },
        min_daily_rate: if rates.is_empty() { 0.0 } else { round_to(min_rate, 4) },
        total_engagement: total_eng as i64,
        components,
        monthly,
        rolling_7d,
    })
}

fn component_breakdown(
    clicks: &[f64],
    reactions: &[f64],
    comments: &[f64],
    reposts: &[f64],
    total_eng: f64,
) -> EngagementComponents {
    let sums = [
        clicks.iter().sum::<f64>(),
        reactions.iter().sum::<f64>(),
        comments.iter().sum::<f64>(),
        reposts.iter().sum::<f64>(),
    ];
    let pct = |v: f64| {
        if total_eng > 0.0 {
            round_to(v / total_eng * 100.0, 1)
        } else {
            0.0
        }
    };
    EngagementComponents {
        clicks: sums[0] as i64,
        reactions: sums[1] as i64,
        comments: sums[2] as i64,
        reposts: sums[3] as i64,
        clicks_pct: pct(sums[0]),
        reactions_pct: pct(sums[1]),
        comments_pct: pct(sums[2]),
        reposts_pct: pct(sums[3]),
    }
}

/// Full-window trailing means of the daily rate, tagged with the date the
/// window ends on.
fn rolling_rates(dates: &[NaiveDate], rates: &[f64]) -> Vec<RollingRate> {
    trailing_mean_strict(rates, ROLLING_WINDOW)
        .into_iter()
        .zip(&dates[dates.len().min(ROLLING_WINDOW - 1)..])
        .map(|(rate, &date)| RollingRate {
            date,
            rate: round_to(rate, 4),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper_functions::date_series;
    use crate::models::DATE;
    use polars::df;

    fn frame(n: usize, rate: f64) -> DataFrame {
        let dates: Vec<NaiveDate> = (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect();
        let ones = vec![1.0; n];
        let mut df = df![
            TOTAL_ENGAGEMENT => vec![4.0; n],
            IMPRESSIONS_TOTAL => vec![100.0; n],
            ENGAGEMENT_RATE_TOTAL => vec![rate; n],
            CLICKS_TOTAL => ones.clone(),
            REACTIONS_TOTAL => ones.clone(),
            COMMENTS_TOTAL => ones.clone(),
            REPOSTS_TOTAL => ones,
        ]
        .unwrap();
        df.with_column(date_series(DATE, &dates).unwrap()).unwrap();
        df
    }

    #[test]
    fn rolling_series_drops_first_six_days() {
        for (n, expected) in [(5usize, 0usize), (7, 1), (14, 8)] {
            let metrics = calculate_engagement_rate(&frame(n, 0.04)).unwrap();
            assert_eq!(metrics.rolling_7d.len(), expected, "n = {n}");
        }
        let metrics = calculate_engagement_rate(&frame(7, 0.04)).unwrap();
        assert_eq!(
            metrics.rolling_7d[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()
        );
        assert_eq!(metrics.rolling_7d[0].rate, 0.04);
    }

    #[test]
    fn recomputed_rate_matches_counts() {
        let metrics = calculate_engagement_rate(&frame(10, 0.04)).unwrap();
        assert_eq!(metrics.overall_rate, 0.04); // 4 engagement per 100 impressions
        assert_eq!(metrics.total_engagement, 40);
        assert_eq!(metrics.monthly.len(), 1);
        assert_eq!(metrics.monthly[0].calculated_rate, 0.04);
    }

    #[test]
    fn empty_months_carry_null_average_rate() {
        let dates = [
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        ];
        let mut df = df![
            TOTAL_ENGAGEMENT => &[4.0, 4.0],
            IMPRESSIONS_TOTAL => &[100.0, 100.0],
            ENGAGEMENT_RATE_TOTAL => &[0.04, 0.04],
            CLICKS_TOTAL => &[1.0, 1.0],
            REACTIONS_TOTAL => &[1.0, 1.0],
            COMMENTS_TOTAL => &[1.0, 1.0],
            REPOSTS_TOTAL => &[1.0, 1.0],
        ]
        .unwrap();
        df.with_column(date_series(DATE, &dates).unwrap()).unwrap();

        let metrics = calculate_engagement_rate(&df).unwrap();
        let months: Vec<&str> = metrics.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["2024-01", "2024-02", "2024-03"]);
        assert_eq!(metrics.monthly[1].total_engagement, 0);
        assert_eq!(metrics.monthly[1].avg_rate, None);
        assert_eq!(metrics.monthly[0].avg_rate, Some(0.04));
    }

    #[test]
    fn max_rate_tracks_negative_daily_rates() {
        // A source export can carry corrected (negative) rates; the maximum
        // must not be floored at zero.
        let metrics = calculate_engagement_rate(&frame(3, -0.02)).unwrap();
        assert_eq!(metrics.max_daily_rate, -0.02);
        assert_eq!(metrics.min_daily_rate, -0.02);
    }

    #[test]
    fn component_percentages_are_guarded_against_zero_total() {
        let components = component_breakdown(&[0.0], &[0.0], &[0.0], &[0.0], 0.0);
        assert_eq!(components.clicks_pct, 0.0);
        let components = component_breakdown(&[3.0], &[1.0], &[0.0], &[0.0], 4.0);
        assert_eq!(components.clicks_pct, 75.0);
        assert_eq!(components.reactions_pct, 25.0);
    }
}
