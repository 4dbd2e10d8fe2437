use polars::prelude::*;
use thiserror::Error;

/// Column names of the cleaned content export.
pub const DATE: &str = "Date";
pub const IMPRESSIONS_TOTAL: &str = "Impressions (total)";
pub const IMPRESSIONS_ORGANIC: &str = "Impressions (organic)";
pub const IMPRESSIONS_SPONSORED: &str = "Impressions (sponsored)";
pub const UNIQUE_IMPRESSIONS: &str = "Unique impressions (organic)";
pub const CLICKS_TOTAL: &str = "Clicks (total)";
pub const REACTIONS_TOTAL: &str = "Reactions (total)";
pub const COMMENTS_TOTAL: &str = "Comments (total)";
pub const REPOSTS_TOTAL: &str = "Reposts (total)";
pub const ENGAGEMENT_RATE_TOTAL: &str = "Engagement rate (total)";
/// Derived at load time when the export does not carry it.
pub const TOTAL_ENGAGEMENT: &str = "Total Engagement";

/// Column names of the cleaned follower export (daily deltas, not cumulative).
pub const FOLLOWERS_SPONSORED: &str = "Sponsored followers";
pub const FOLLOWERS_ORGANIC: &str = "Organic followers";
pub const FOLLOWERS_AUTO_INVITED: &str = "Auto-invited followers";
pub const FOLLOWERS_TOTAL: &str = "Total followers";
/// Derived at load time.
pub const FOLLOWERS_CUMULATIVE: &str = "Cumulative followers";
pub const FOLLOWERS_ROLLING_7D: &str = "Rolling 7d followers";

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("required column `{0}` is missing")]
    MissingColumn(String),
    #[error("unparseable date `{value}`: no accepted format matched")]
    DateParse { value: String },
    #[error("column `{0}` contains null values")]
    NullValues(String),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait Dataset {
    fn load(&self) -> Result<DataFrame, AnalyzerError>;
}

/// Tunable analysis thresholds. The defaults match the historical values
/// of the export tooling; the spike factor is exposed on the CLI.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// A day is a spike when its impressions exceed this multiple of the
    /// trailing 7-day mean.
    pub spike_factor: f64,
    /// Accepted range for the source-provided engagement rate.
    pub rate_min: f64,
    pub rate_max: f64,
    /// Row count of the top-performing-days table.
    pub top_days: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            spike_factor: 1.5,
            rate_min: 0.0,
            rate_max: 1.0,
            top_days: 10,
        }
    }
}
