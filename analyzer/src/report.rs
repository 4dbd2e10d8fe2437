use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;

use crate::analysis::correlation::{correlate_content_and_followers, CorrelationMetrics};
use crate::analysis::engagement::{calculate_engagement_rate, EngagementMetrics};
use crate::analysis::followers::{calculate_follower_growth, FollowerMetrics};
use crate::analysis::frequency::{calculate_post_frequency, FrequencyMetrics};
use crate::analysis::reach::{calculate_reach, ReachMetrics};
use crate::analysis::top_days::{top_performing_days, TopDay};
use crate::helper_functions::column_dates;
use crate::models::{AnalysisOptions, AnalyzerError};

pub struct ReportSources {
    pub content_path: String,
    pub follower_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataSummary {
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follower_file: Option<String>,
    pub date_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follower_date_range: Option<String>,
    pub total_days: usize,
    pub columns: usize,
}

/// The complete analysis output. Serialized to pretty JSON with dates as
/// ISO-8601 text; rebuilding from the same inputs is deterministic.
#[derive(Debug, Serialize)]
pub struct Report {
    pub data_summary: DataSummary,
    pub reach: ReachMetrics,
    pub engagement_rate: EngagementMetrics,
    pub post_frequency: FrequencyMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<FollowerMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationMetrics>,
    pub top_performing_days: Vec<TopDay>,
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

fn date_range(df: &DataFrame) -> Result<String, AnalyzerError> {
    let dates = column_dates(df)?;
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => Ok(format!("{first} to {last}")),
        _ => Ok("empty".to_string()),
    }
}

pub fn build_report(
    content: &DataFrame,
    followers: Option<&DataFrame>,
    sources: &ReportSources,
    options: &AnalysisOptions,
) -> Result<Report, AnalyzerError> {
    let follower_metrics = followers.map(calculate_follower_growth).transpose()?;
    let correlation = followers
        .map(|f| correlate_content_and_followers(content, f))
        .transpose()?;
    let follower_date_range = followers.map(date_range).transpose()?;

    Ok(Report {
        data_summary: DataSummary {
            source_file: file_name(&sources.content_path),
            follower_file: sources.follower_path.as_deref().map(file_name),
            date_range: date_range(content)?,
            follower_date_range,
            total_days: content.height(),
            columns: content.width(),
        },
        reach: calculate_reach(content)?,
        engagement_rate: calculate_engagement_rate(content)?,
        post_frequency: calculate_post_frequency(content, options)?,
        followers: follower_metrics,
        correlation,
        top_performing_days: top_performing_days(content, options.top_days)?,
    })
}

pub fn save_report(report: &Report, path: &str) -> Result<(), AnalyzerError> {
    serde_json::to_writer_pretty(File::create(path)?, report)
        .map_err(|e| AnalyzerError::Io(e.into()))?;
    Ok(())
}

/// Headline figures for the console. Formatting is cosmetic; the values
/// are the contract.
pub fn print_summary(report: &Report) {
    let line = "=".repeat(60);
    println!("\n{line}");
    println!("  ANALYSIS COMPLETE");
    println!("{line}");
    println!("  Date Range:        {}", report.data_summary.date_range);
    println!("  Total Days:        {}", report.data_summary.total_days);
    println!("  Total Impressions: {}", report.reach.total_impressions);
    println!(
        "  Unique Reach:      {}",
        report.reach.total_unique_impressions
    );
    println!(
        "  Total Engagement:  {}",
        report.engagement_rate.total_engagement
    );
    println!(
        "  Avg Eng. Rate:     {:.2}%",
        report.engagement_rate.daily_avg_rate * 100.0
    );
    println!(
        "  Active Days:       {}/{}",
        report.post_frequency.active_days, report.post_frequency.total_days
    );
    println!(
        "  Best Posting Days: {}",
        report.post_frequency.best_posting_days.join(", ")
    );
    if let Some(followers) = &report.followers {
        println!("  Followers Gained:  {}", followers.total_gained);
        println!("  Growth Trend:      {:+.1}%", followers.growth_trend_pct);
    }
    println!("{line}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper_functions::date_series;
    use crate::models::{
        CLICKS_TOTAL, COMMENTS_TOTAL, DATE, ENGAGEMENT_RATE_TOTAL, FOLLOWERS_ORGANIC,
        FOLLOWERS_SPONSORED, FOLLOWERS_TOTAL, IMPRESSIONS_SPONSORED, IMPRESSIONS_TOTAL,
        REACTIONS_TOTAL, REPOSTS_TOTAL, TOTAL_ENGAGEMENT, UNIQUE_IMPRESSIONS,
    };
    use chrono::NaiveDate;
    use polars::df;

    fn content_frame(n: usize) -> DataFrame {
        let dates: Vec<NaiveDate> = (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect();
        let mut df = df![
            IMPRESSIONS_TOTAL => vec![100.0; n],
            IMPRESSIONS_SPONSORED => vec![0.0; n],
            UNIQUE_IMPRESSIONS => vec![80.0; n],
            CLICKS_TOTAL => vec![1.0; n],
            REACTIONS_TOTAL => vec![2.0; n],
            COMMENTS_TOTAL => vec![1.0; n],
            REPOSTS_TOTAL => vec![0.0; n],
            ENGAGEMENT_RATE_TOTAL => vec![0.04; n],
            TOTAL_ENGAGEMENT => vec![4.0; n],
        ]
        .unwrap();
        df.with_column(date_series(DATE, &dates).unwrap()).unwrap();
        df
    }

    fn follower_frame(start: NaiveDate, n: usize) -> DataFrame {
        let dates: Vec<NaiveDate> = (0..n)
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        let mut df = df![
            FOLLOWERS_TOTAL => vec![3.0; n],
            FOLLOWERS_ORGANIC => vec![3.0; n],
            FOLLOWERS_SPONSORED => vec![0.0; n],
        ]
        .unwrap();
        df.with_column(date_series(DATE, &dates).unwrap()).unwrap();
        df
    }

    fn sources() -> ReportSources {
        ReportSources {
            content_path: "data/content.csv".to_string(),
            follower_path: Some("data/followers.csv".to_string()),
        }
    }

    #[test]
    fn assembles_all_sections() {
        let content = content_frame(10);
        let followers = follower_frame(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 10);
        let report = build_report(
            &content,
            Some(&followers),
            &sources(),
            &AnalysisOptions::default(),
        )
        .unwrap();

        assert_eq!(report.data_summary.source_file, "content.csv");
        assert_eq!(report.data_summary.date_range, "2024-01-01 to 2024-01-10");
        assert_eq!(report.data_summary.total_days, 10);
        assert_eq!(report.reach.total_impressions, 1000);
        assert!(report.followers.is_some());
        assert_eq!(report.correlation.as_ref().unwrap().overlap_days, 10);
        assert_eq!(report.top_performing_days.len(), 10);
    }

    #[test]
    fn omits_follower_sections_without_a_follower_table() {
        let content = content_frame(5);
        let report = build_report(
            &content,
            None,
            &ReportSources {
                content_path: "content.csv".to_string(),
                follower_path: None,
            },
            &AnalysisOptions::default(),
        )
        .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("followers").is_none());
        assert!(json.get("correlation").is_none());
        assert!(json.get("reach").is_some());
    }

    #[test]
    fn disjoint_tables_keep_the_report_renderable() {
        let content = content_frame(5);
        let followers = follower_frame(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(), 5);
        let report = build_report(
            &content,
            Some(&followers),
            &sources(),
            &AnalysisOptions::default(),
        )
        .unwrap();

        let correlation = report.correlation.unwrap();
        assert_eq!(correlation.overlap_days, 0);
        assert!(correlation.impressions_follower_corr.is_none());
        assert!(report.followers.is_some());
    }

    #[test]
    fn serialization_is_deterministic_and_dates_are_iso() {
        let content = content_frame(8);
        let report = || {
            build_report(
                &content,
                None,
                &ReportSources {
                    content_path: "content.csv".to_string(),
                    follower_path: None,
                },
                &AnalysisOptions::default(),
            )
            .unwrap()
        };
        let first = serde_json::to_string_pretty(&report()).unwrap();
        let second = serde_json::to_string_pretty(&report()).unwrap();
        assert_eq!(first, second);

        let json: serde_json::Value = serde_json::from_str(&first).unwrap();
        let rolling = &json["engagement_rate"]["rolling_7d"];
        assert_eq!(rolling[0]["date"], "2024-01-07");

        let file = tempfile::NamedTempFile::new().unwrap();
        save_report(&report(), &file.path().to_string_lossy()).unwrap();
        let written: serde_json::Value =
            serde_json::from_reader(File::open(file.path()).unwrap()).unwrap();
        assert_eq!(written, json);
    }
}
