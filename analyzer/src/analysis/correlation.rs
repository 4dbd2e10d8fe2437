use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::helper_functions::{
    column_dates, column_f64, month_key, month_span, pearson_correlation, round_to,
};
use crate::models::{
    AnalyzerError, DATE, FOLLOWERS_TOTAL, IMPRESSIONS_TOTAL, TOTAL_ENGAGEMENT,
};

#[derive(Debug, Serialize)]
pub struct MonthlyJoined {
    pub month: String,
    pub impressions: i64,
    pub followers_gained: i64,
}

/// Relationship between content performance and follower growth over the
/// dates both tables cover. With zero overlap only `overlap_days` is
/// emitted; every statistic is skipped rather than invented.
#[derive(Debug, Serialize)]
pub struct CorrelationMetrics {
    pub overlap_days: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impressions_follower_corr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_follower_corr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_impressions_follower_corr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_per_1000_impressions: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub monthly: Vec<MonthlyJoined>,
}

impl CorrelationMetrics {
    fn no_overlap() -> Self {
        Self {
            overlap_days: 0,
            impressions_follower_corr: None,
            engagement_follower_corr: None,
            monthly_impressions_follower_corr: None,
            followers_per_1000_impressions: None,
            monthly: Vec::new(),
        }
    }
}

pub fn correlate_content_and_followers(
    content: &DataFrame,
    followers: &DataFrame,
) -> Result<CorrelationMetrics, AnalyzerError> {
    let left = content.select([DATE, IMPRESSIONS_TOTAL, TOTAL_ENGAGEMENT])?;
    let right = followers.select([DATE, FOLLOWERS_TOTAL])?;
    let joined = left.inner_join(&right, [DATE], [DATE])?;

    let overlap_days = joined.height();
    if overlap_days == 0 {
        warn!("content and follower date ranges do not intersect");
        return Ok(CorrelationMetrics::no_overlap());
    }

    let dates = column_dates(&joined)?;
    let impressions = column_f64(&joined, IMPRESSIONS_TOTAL)?;
    let engagement = column_f64(&joined, TOTAL_ENGAGEMENT)?;
    let gains = column_f64(&joined, FOLLOWERS_TOTAL)?;

    let total_imp: f64 = impressions.iter().sum();
    let total_gains: f64 = gains.iter().sum();
    let per_1000 = if total_imp > 0.0 {
        round_to(total_gains / total_imp * 1000.0, 3)
    } else {
        0.0
    };

    let mut by_month: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for i in 0..dates.len() {
        let entry = by_month.entry(month_key(dates[i])).or_insert((0.0, 0.0));
        entry.0 += impressions[i];
        entry.1 += gains[i];
    }
    // One row per calendar month in the overlap span; an empty month
    // contributes a zero pair to the monthly correlation.
    let mut monthly_imp = Vec::new();
    let mut monthly_gains = Vec::new();
    let mut monthly = Vec::new();
    if let (Some(&first), Some(&last)) = (dates.iter().min(), dates.iter().max()) {
        for month in month_span(first, last) {
            let (imp, gained) = by_month.get(&month).copied().unwrap_or((0.0, 0.0));
            monthly_imp.push(imp);
            monthly_gains.push(gained);
            monthly.push(MonthlyJoined {
                month,
                impressions: imp as i64,
                followers_gained: gained as i64,
            });
        }
    }

    Ok(CorrelationMetrics {
        overlap_days,
        impressions_follower_corr: pearson_correlation(&impressions, &gains)
            .map(|c| round_to(c, 3)),
        engagement_follower_corr: pearson_correlation(&engagement, &gains)
            .map(|c| round_to(c, 3)),
        monthly_impressions_follower_corr: pearson_correlation(&monthly_imp, &monthly_gains)
            .map(|c| round_to(c, 3)),
        followers_per_1000_impressions: Some(per_1000),
        monthly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper_functions::date_series;
    use chrono::NaiveDate;
    use polars::df;

    fn content_frame(start: NaiveDate, impressions: Vec<f64>) -> DataFrame {
        let engagement: Vec<f64> = impressions.iter().map(|v| v / 10.0).collect();
        let dates: Vec<NaiveDate> = (0..impressions.len())
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        let mut df = df![
            IMPRESSIONS_TOTAL => impressions,
            TOTAL_ENGAGEMENT => engagement,
        ]
        .unwrap();
        df.with_column(date_series(DATE, &dates).unwrap()).unwrap();
        df
    }

    fn follower_frame(start: NaiveDate, gains: Vec<f64>) -> DataFrame {
        let dates: Vec<NaiveDate> = (0..gains.len())
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        let mut df = df![FOLLOWERS_TOTAL => gains].unwrap();
        df.with_column(date_series(DATE, &dates).unwrap()).unwrap();
        df
    }

    #[test]
    fn zero_overlap_returns_sentinel() {
        let content = content_frame(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![100.0, 200.0],
        );
        let followers = follower_frame(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            vec![5.0, 5.0],
        );
        let metrics = correlate_content_and_followers(&content, &followers).unwrap();

        assert_eq!(metrics.overlap_days, 0);
        assert!(metrics.impressions_follower_corr.is_none());
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json, serde_json::json!({ "overlap_days": 0 }));
    }

    #[test]
    fn proportional_series_correlate_perfectly() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let impressions = vec![100.0, 200.0, 300.0, 400.0];
        let gains: Vec<f64> = impressions.iter().map(|v| v / 100.0).collect();
        let metrics = correlate_content_and_followers(
            &content_frame(start, impressions),
            &follower_frame(start, gains),
        )
        .unwrap();

        assert_eq!(metrics.overlap_days, 4);
        assert_eq!(metrics.impressions_follower_corr, Some(1.0));
        assert_eq!(metrics.engagement_follower_corr, Some(1.0));
        // 10 followers across 1000 impressions.
        assert_eq!(metrics.followers_per_1000_impressions, Some(10.0));
    }

    #[test]
    fn monthly_table_spans_months_without_shared_dates() {
        // Shared dates in January and March only.
        let dates = [
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        ];
        let mut content = df![
            IMPRESSIONS_TOTAL => &[100.0, 200.0],
            TOTAL_ENGAGEMENT => &[10.0, 20.0],
        ]
        .unwrap();
        content
            .with_column(date_series(DATE, &dates).unwrap())
            .unwrap();
        let mut followers = df![FOLLOWERS_TOTAL => &[1.0, 2.0]].unwrap();
        followers
            .with_column(date_series(DATE, &dates).unwrap())
            .unwrap();

        let metrics = correlate_content_and_followers(&content, &followers).unwrap();
        let months: Vec<&str> = metrics.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["2024-01", "2024-02", "2024-03"]);
        assert_eq!(metrics.monthly[1].impressions, 0);
        assert_eq!(metrics.monthly[1].followers_gained, 0);
        // The zero-filled February pair keeps the monthly series aligned.
        assert_eq!(metrics.monthly_impressions_follower_corr, Some(1.0));
    }

    #[test]
    fn partial_overlap_joins_on_shared_dates_only() {
        let content = content_frame(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![100.0; 10],
        );
        let followers = follower_frame(
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            vec![2.0; 10],
        );
        let metrics = correlate_content_and_followers(&content, &followers).unwrap();
        assert_eq!(metrics.overlap_days, 3);
        // Constant series have zero variance, so no correlation is reported.
        assert!(metrics.impressions_follower_corr.is_none());
        assert_eq!(metrics.followers_per_1000_impressions, Some(20.0));
    }
}
