use polars::prelude::*;
use tracing::{debug, info};

use super::{parse_date_column, require_columns};
use crate::helper_functions::{column_f64, read_csv, trailing_mean_shrinking};
use crate::models::{
    AnalyzerError, Dataset, FOLLOWERS_CUMULATIVE, FOLLOWERS_ORGANIC, FOLLOWERS_ROLLING_7D,
    FOLLOWERS_SPONSORED, FOLLOWERS_TOTAL,
};

/// The cleaned daily follower export: one row per calendar day with
/// follower deltas by acquisition channel.
pub struct FollowerDataset {
    pub path: String,
}

/// Add the running cumulative total and the trailing 7-day mean of daily
/// gains. The moving average uses a shrinking window for the first six
/// days rather than being undefined there.
fn derive_running_columns(df: DataFrame) -> Result<DataFrame, AnalyzerError> {
    let gains = column_f64(&df, FOLLOWERS_TOTAL)?;

    let mut running = 0i64;
    let cumulative: Vec<i64> = gains
        .iter()
        .map(|&g| {
            running += g as i64;
            running
        })
        .collect();
    let rolling = trailing_mean_shrinking(&gains, 7);

    let mut df = df;
    df.with_column(Series::new(PlSmallStr::from(FOLLOWERS_CUMULATIVE), cumulative))?;
    df.with_column(Series::new(PlSmallStr::from(FOLLOWERS_ROLLING_7D), rolling))?;
    Ok(df)
}

impl Dataset for FollowerDataset {
    fn load(&self) -> Result<DataFrame, AnalyzerError> {
        info!("Reading follower export from: {}", &self.path);
        let df = read_csv(&self.path)?;
        debug!("Loaded {} rows", df.shape().0);

        require_columns(&df, &[FOLLOWERS_SPONSORED, FOLLOWERS_ORGANIC, FOLLOWERS_TOTAL])?;
        let df = parse_date_column(df)?;
        let df = derive_running_columns(df)?;
        debug!(
            "After preparation, shape: {} rows, {} cols",
            df.shape().0,
            df.shape().1
        );
        Ok(df)
    }
}
