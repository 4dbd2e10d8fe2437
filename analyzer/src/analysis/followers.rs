use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use crate::helper_functions::{
    column_dates, column_f64, month_key, month_span, round_to, weekday_index, WEEKDAY_NAMES,
};
use crate::models::{
    AnalyzerError, FOLLOWERS_ORGANIC, FOLLOWERS_SPONSORED, FOLLOWERS_TOTAL,
};

/// Months of history required before the first-3 vs last-3 growth trend
/// is considered meaningful.
const TREND_MIN_MONTHS: usize = 6;

#[derive(Debug, Serialize)]
pub struct MaxGainDay {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyFollowers {
    pub month: String,
    pub gained: i64,
    /// Cumulative follower total at the end of the month.
    pub cumulative_end: i64,
    pub change_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct WeekdayGains {
    pub weekday: String,
    /// `null` for a weekday the date range never touched.
    pub avg_gained: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct FollowerMetrics {
    pub total_gained: i64,
    pub organic_gained: i64,
    pub sponsored_gained: i64,
    pub all_organic: bool,
    pub avg_daily_gain: f64,
    pub max_daily_gain: Option<MaxGainDay>,
    pub zero_follower_days: usize,
    pub monthly: Vec<MonthlyFollowers>,
    pub best_month: Option<String>,
    pub worst_month: Option<String>,
    /// Mean monthly gain of the last three months against the first three,
    /// as a percentage. Exactly 0 below six months of history.
    pub growth_trend_pct: f64,
    pub day_of_week_gains: Vec<WeekdayGains>,
}

pub fn calculate_follower_growth(df: &DataFrame) -> Result<FollowerMetrics, AnalyzerError> {
    let dates = column_dates(df)?;
    let gains = column_f64(df, FOLLOWERS_TOTAL)?;
    let organic = column_f64(df, FOLLOWERS_ORGANIC)?;
    let sponsored = column_f64(df, FOLLOWERS_SPONSORED)?;

    let total_gained: f64 = gains.iter().sum();
    let sponsored_gained: f64 = sponsored.iter().sum();

    // First occurrence wins on ties.
    let mut max_daily_gain: Option<MaxGainDay> = None;
    for (i, &count) in gains.iter().enumerate() {
        if max_daily_gain
            .as_ref()
            .is_none_or(|m| count as i64 > m.count)
        {
            max_daily_gain = Some(MaxGainDay {
                date: dates[i],
                count: count as i64,
            });
        }
    }

    // Monthly gains with the closing cumulative value per month.
    let mut cumulative = 0.0;
    let mut by_month: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for i in 0..dates.len() {
        cumulative += gains[i];
        let entry = by_month.entry(month_key(dates[i])).or_insert((0.0, 0.0));
        entry.0 += gains[i];
        entry.1 = cumulative;
    }

    // One row per calendar month in the span. An empty month gains nothing
    // and carries the running cumulative value forward.
    let mut monthly = Vec::new();
    let mut previous: Option<f64> = None;
    let mut carried = 0.0;
    if let (Some(&first), Some(&last)) = (dates.first(), dates.last()) {
        for month in month_span(first, last) {
            let (gained, cum_end) = match by_month.get(&month) {
                Some(&(gained, cum_end)) => {
                    carried = cum_end;
                    (gained, cum_end)
                }
                None => (0.0, carried),
            };
            let change_pct = match previous {
                Some(prev) if prev > 0.0 => Some(round_to((gained - prev) / prev * 100.0, 1)),
                _ => None,
            };
            previous = Some(gained);
            monthly.push(MonthlyFollowers {
                month,
                gained: gained as i64,
                cumulative_end: cum_end as i64,
                change_pct,
            });
        }
    }

    // First occurrence wins on ties.
    let mut best: Option<&MonthlyFollowers> = None;
    let mut worst: Option<&MonthlyFollowers> = None;
    for m in &monthly {
        if best.is_none_or(|b| m.gained > b.gained) {
            best = Some(m);
        }
        if worst.is_none_or(|w| m.gained < w.gained) {
            worst = Some(m);
        }
    }
    let best_month = best.map(|m| m.month.clone());
    let worst_month = worst.map(|m| m.month.clone());
    let growth_trend_pct = growth_trend(&monthly);

    let mut weekday_sums = [(0.0f64, 0usize); 7];
    for i in 0..dates.len() {
        let slot = &mut weekday_sums[weekday_index(dates[i])];
        slot.0 += gains[i];
        slot.1 += 1;
    }
    let day_of_week_gains = weekday_sums
        .iter()
        .enumerate()
        .map(|(idx, &(sum, count))| WeekdayGains {
            weekday: WEEKDAY_NAMES[idx].to_string(),
            avg_gained: (count > 0).then(|| round_to(sum / count as f64, 2)),
        })
        .collect();

    Ok(FollowerMetrics {
        total_gained: total_gained as i64,
        organic_gained: organic.iter().sum::<f64>() as i64,
        sponsored_gained: sponsored_gained as i64,
        all_organic: sponsored_gained == 0.0,
        avg_daily_gain: if gains.is_empty() {
            0.0
        } else {
            round_to(total_gained / gains.len() as f64, 2)
        },
        max_daily_gain,
        zero_follower_days: gains.iter().filter(|&&g| g == 0.0).count(),
        monthly,
        best_month,
        worst_month,
        growth_trend_pct,
        day_of_week_gains,
    })
}

fn growth_trend(monthly: &[MonthlyFollowers]) -> f64 {
    if monthly.len() < TREND_MIN_MONTHS {
        return 0.0;
    }
    let mean = |slice: &[MonthlyFollowers]| {
        slice.iter().map(|m| m.gained as f64).sum::<f64>() / slice.len() as f64
    };
    let first_3 = mean(&monthly[..3]);
    let last_3 = mean(&monthly[monthly.len() - 3..]);
    if first_3 > 0.0 {
        round_to((last_3 - first_3) / first_3 * 100.0, 1)
    } else {
        0.0
    }
}
