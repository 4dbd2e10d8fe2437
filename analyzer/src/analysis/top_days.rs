use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use crate::helper_functions::{column_dates, column_f64};
use crate::models::{
    AnalyzerError, CLICKS_TOTAL, COMMENTS_TOTAL, ENGAGEMENT_RATE_TOTAL, IMPRESSIONS_TOTAL,
    REACTIONS_TOTAL, TOTAL_ENGAGEMENT,
};

#[derive(Debug, Serialize)]
pub struct TopDay {
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub reactions: i64,
    pub comments: i64,
    pub engagement_rate: f64,
    pub total_engagement: i64,
}

/// The top `n` days by total impressions, earliest first on ties.
pub fn top_performing_days(df: &DataFrame, n: usize) -> Result<Vec<TopDay>, AnalyzerError> {
    let dates = column_dates(df)?;
    let impressions = column_f64(df, IMPRESSIONS_TOTAL)?;
    let clicks = column_f64(df, CLICKS_TOTAL)?;
    let reactions = column_f64(df, REACTIONS_TOTAL)?;
    let comments = column_f64(df, COMMENTS_TOTAL)?;
    let rates = column_f64(df, ENGAGEMENT_RATE_TOTAL)?;
    let engagement = column_f64(df, TOTAL_ENGAGEMENT)?;

    let mut order: Vec<usize> = (0..dates.len()).collect();
    // Stable sort keeps the (date-ascending) input order on ties.
    order.sort_by(|&a, &b| {
        impressions[b]
            .partial_cmp(&impressions[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(order
        .into_iter()
        .take(n)
        .map(|i| TopDay {
            date: dates[i],
            impressions: impressions[i] as i64,
            clicks: clicks[i] as i64,
            reactions: reactions[i] as i64,
            comments: comments[i] as i64,
            engagement_rate: rates[i],
            total_engagement: engagement[i] as i64,
        })
        .collect())
}
